/*!
 * Tests for media decoding and segmentation on real files
 */

use hermes::alignment::{TierAligner, TierSelection};
use hermes::app_config::SegmentConfig;
use hermes::document::parse_document;
use hermes::errors::{MediaError, RecordError};
use hermes::media::{MediaHandle, MediaSegmenter, SampleData};

use crate::common;

#[tokio::test]
async fn test_open_withWavFile_shouldReportDurationAndFormat() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::write_test_wav(temp_dir.path(), "take.wav", 1500, 16000).unwrap();

    let handle = MediaHandle::open(&path, &SegmentConfig::default()).await.unwrap();

    assert_eq!(handle.sample_rate(), 16000);
    assert_eq!(handle.channels(), 1);
    assert_eq!(handle.frames(), 24000);
    assert_eq!(handle.duration_ms(), 1500);
    assert_eq!(handle.path(), path.as_path());
}

#[tokio::test]
async fn test_open_withUppercaseExtension_shouldStillDecodeDirectly() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::write_test_wav(temp_dir.path(), "TAKE.WAV", 500, 8000).unwrap();

    let handle = MediaHandle::open(&path, &SegmentConfig::default()).await.unwrap();

    assert_eq!(handle.duration_ms(), 500);
}

#[tokio::test]
async fn test_open_withMissingFile_shouldReturnNotFound() {
    let temp_dir = common::create_temp_dir().unwrap();
    let missing = temp_dir.path().join("nothing.wav");

    let result = MediaHandle::open(&missing, &SegmentConfig::default()).await;

    assert!(matches!(result, Err(MediaError::NotFound(p)) if p == missing));
}

#[tokio::test]
async fn test_open_withCorruptWav_shouldReturnDecodeError() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(temp_dir.path(), "broken.wav", "definitely not RIFF").unwrap();

    let result = MediaHandle::open(&path, &SegmentConfig::default()).await;

    assert!(matches!(result, Err(MediaError::Decode { .. })));
}

#[tokio::test]
async fn test_segment_withSessionRecords_shouldCopyExactSamples() {
    let temp_dir = common::create_temp_dir().unwrap();
    let (document, media) = common::create_sample_session(temp_dir.path(), 2000).unwrap();
    let doc = parse_document(&std::fs::read(&document).unwrap()).unwrap();
    let aligned = TierAligner::new()
        .align(&doc, &TierSelection::new("Transcription"))
        .unwrap();
    let handle = MediaHandle::open(&media, &SegmentConfig::default()).await.unwrap();

    let batch = MediaSegmenter::new(false).segment_all(&handle, &aligned.records);

    assert!(batch.failures.is_empty());
    assert_eq!(batch.clips.len(), 2);
    assert_eq!(batch.clips[0].frames(), 8000);
    assert_eq!(batch.clips[1].frames(), 8000);
    assert!((batch.clips[1].duration_ms() - 1000.0).abs() < f64::EPSILON);

    // Second clip starts at frame 8000, whose value is 8000 % 1000
    match &batch.clips[1].samples {
        SampleData::Int(samples) => {
            assert_eq!(samples[0], 0);
            assert_eq!(samples[1], 1);
            assert_eq!(samples[999], 999);
        }
        SampleData::Float(_) => panic!("16-bit source should decode to integer samples"),
    }
}

#[tokio::test]
async fn test_segment_withShortMedia_shouldReportMediaDuration() {
    let temp_dir = common::create_temp_dir().unwrap();
    let (document, media) = common::create_sample_session(temp_dir.path(), 1500).unwrap();
    let doc = parse_document(&std::fs::read(&document).unwrap()).unwrap();
    let aligned = TierAligner::new()
        .align(&doc, &TierSelection::new("Transcription"))
        .unwrap();
    let handle = MediaHandle::open(&media, &SegmentConfig::default()).await.unwrap();

    let batch = MediaSegmenter::new(false).segment_all(&handle, &aligned.records);

    assert_eq!(batch.clips.len(), 1);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].annotation_id, "a2");
    assert_eq!(
        batch.failures[0].error,
        RecordError::TimingOutOfRange {
            end_ms: 2000,
            media_duration_ms: 1500
        }
    );
}
