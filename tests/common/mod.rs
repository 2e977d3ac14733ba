/*!
 * Common test utilities for the hermes test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Routes library logs to the test output; safe to call from every test
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Writes a mono 16-bit WAV of the given length; sample `i` has value `i % 1000`
pub fn write_test_wav(dir: &Path, filename: &str, duration_ms: u64, sample_rate: u32) -> Result<PathBuf> {
    let path = dir.join(filename);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    let frames = duration_ms * u64::from(sample_rate) / 1000;
    for i in 0..frames {
        writer.write_sample((i % 1000) as i16)?;
    }
    writer.finalize()?;
    Ok(path)
}

/// Number of frames and sample rate of a WAV file
pub fn wav_frames(path: &Path) -> Result<(u32, u32)> {
    let reader = hound::WavReader::open(path)?;
    Ok((reader.duration(), reader.spec().sample_rate))
}

/// Two transcription annotations (0-1000ms, 1000-2000ms), each with a
/// translation, and a gloss tier subdividing the first one
pub fn sample_eaf(media_file: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ANNOTATION_DOCUMENT AUTHOR="Field Team" DATE="2024-03-01T10:00:00+10:30" FORMAT="3.0" VERSION="3.0">
    <HEADER MEDIA_FILE="" TIME_UNITS="milliseconds">
        <MEDIA_DESCRIPTOR MEDIA_URL="file:///recordings/{media}" MIME_TYPE="audio/x-wav" RELATIVE_MEDIA_URL="./{media}"/>
    </HEADER>
    <TIME_ORDER>
        <TIME_SLOT TIME_SLOT_ID="ts1" TIME_VALUE="0"/>
        <TIME_SLOT TIME_SLOT_ID="ts2" TIME_VALUE="1000"/>
        <TIME_SLOT TIME_SLOT_ID="ts3" TIME_VALUE="2000"/>
    </TIME_ORDER>
    <TIER LINGUISTIC_TYPE_REF="utterance" TIER_ID="Transcription" LANG_REF="kaurna" PARTICIPANT="Speaker A">
        <ANNOTATION>
            <ALIGNABLE_ANNOTATION ANNOTATION_ID="a1" TIME_SLOT_REF1="ts1" TIME_SLOT_REF2="ts2">
                <ANNOTATION_VALUE>Ninna marni?</ANNOTATION_VALUE>
            </ALIGNABLE_ANNOTATION>
        </ANNOTATION>
        <ANNOTATION>
            <ALIGNABLE_ANNOTATION ANNOTATION_ID="a2" TIME_SLOT_REF1="ts2" TIME_SLOT_REF2="ts3">
                <ANNOTATION_VALUE>Marni ai</ANNOTATION_VALUE>
            </ALIGNABLE_ANNOTATION>
        </ANNOTATION>
    </TIER>
    <TIER LINGUISTIC_TYPE_REF="translation" PARENT_REF="Transcription" TIER_ID="Translation" LANG_REF="eng">
        <ANNOTATION>
            <REF_ANNOTATION ANNOTATION_ID="a3" ANNOTATION_REF="a1">
                <ANNOTATION_VALUE>How are you?</ANNOTATION_VALUE>
            </REF_ANNOTATION>
        </ANNOTATION>
        <ANNOTATION>
            <REF_ANNOTATION ANNOTATION_ID="a4" ANNOTATION_REF="a2">
                <ANNOTATION_VALUE>I am good</ANNOTATION_VALUE>
            </REF_ANNOTATION>
        </ANNOTATION>
    </TIER>
    <TIER LINGUISTIC_TYPE_REF="gloss" PARENT_REF="Transcription" TIER_ID="Gloss">
        <ANNOTATION>
            <REF_ANNOTATION ANNOTATION_ID="a5" ANNOTATION_REF="a1">
                <ANNOTATION_VALUE>2SG.NOM</ANNOTATION_VALUE>
            </REF_ANNOTATION>
        </ANNOTATION>
        <ANNOTATION>
            <REF_ANNOTATION ANNOTATION_ID="a6" ANNOTATION_REF="a1" PREVIOUS_ANNOTATION="a5">
                <ANNOTATION_VALUE>good</ANNOTATION_VALUE>
            </REF_ANNOTATION>
        </ANNOTATION>
    </TIER>
    <LINGUISTIC_TYPE GRAPHIC_REFERENCES="false" LINGUISTIC_TYPE_ID="utterance" TIME_ALIGNABLE="true"/>
    <LINGUISTIC_TYPE CONSTRAINTS="Symbolic_Association" LINGUISTIC_TYPE_ID="translation" TIME_ALIGNABLE="false"/>
    <LINGUISTIC_TYPE CONSTRAINTS="Symbolic_Subdivision" LINGUISTIC_TYPE_ID="gloss" TIME_ALIGNABLE="false"/>
    <LANGUAGE LANG_ID="kaurna" LANG_LABEL="Kaurna"/>
    <LANGUAGE LANG_ID="eng" LANG_LABEL="English (eng)"/>
</ANNOTATION_DOCUMENT>
"#,
        media = media_file
    )
}

/// Writes `sample_eaf` next to a WAV of the given length and returns both paths
pub fn create_sample_session(dir: &Path, media_duration_ms: u64) -> Result<(PathBuf, PathBuf)> {
    let media = write_test_wav(dir, "session.wav", media_duration_ms, 8000)?;
    let document = create_test_file(dir, "session.eaf", &sample_eaf("session.wav"))?;
    Ok((document, media))
}
