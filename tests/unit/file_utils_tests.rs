/*!
 * Tests for file and folder utilities
 */

use std::fs;

use hermes::document::MediaDescriptor;
use hermes::file_utils::{FileManager, FileType};

use crate::common;

#[test]
fn test_default_output_dir_shouldSitNextToDocument() {
    let output = FileManager::default_output_dir("/data/sessions/elder_01.eaf");

    assert_eq!(output, std::path::PathBuf::from("/data/sessions/elder_01_bundle"));
}

#[test]
fn test_resolve_media_path_withRelativeUrl_shouldResolveAgainstDocument() {
    let temp_dir = common::create_temp_dir().unwrap();
    let (document, media) = common::create_sample_session(temp_dir.path(), 500).unwrap();
    let descriptors = vec![MediaDescriptor {
        media_url: "file:///nowhere/session.wav".to_string(),
        relative_media_url: Some("./session.wav".to_string()),
        mime_type: Some("audio/x-wav".to_string()),
    }];

    let resolved = FileManager::resolve_media_path(&document, &descriptors).unwrap();

    assert_eq!(fs::canonicalize(resolved).unwrap(), fs::canonicalize(media).unwrap());
}

#[test]
fn test_resolve_media_path_withStaleAbsoluteUrl_shouldFallBackToSibling() {
    let temp_dir = common::create_temp_dir().unwrap();
    let (document, media) = common::create_sample_session(temp_dir.path(), 500).unwrap();
    let descriptors = vec![MediaDescriptor {
        media_url: "file:///recordings/2019/session.wav".to_string(),
        relative_media_url: None,
        mime_type: None,
    }];

    let resolved = FileManager::resolve_media_path(&document, &descriptors).unwrap();

    assert_eq!(resolved, media);
}

#[test]
fn test_resolve_media_path_withPercentEncodedAbsoluteUrl_shouldDecodeName() {
    let temp_dir = common::create_temp_dir().unwrap();
    let document = common::create_test_file(temp_dir.path(), "session.eaf", "").unwrap();
    let media = common::write_test_wav(temp_dir.path(), "Ämne take.wav", 100, 8000).unwrap();
    let descriptors = vec![MediaDescriptor {
        media_url: format!("file://{}/%C3%84mne%20take.wav", temp_dir.path().display()),
        relative_media_url: None,
        mime_type: Some("audio/x-wav".to_string()),
    }];

    let resolved = FileManager::resolve_media_path(&document, &descriptors);

    assert_eq!(resolved, Some(media));
}

#[test]
fn test_resolve_media_path_withPercentEncodedRelativeUrl_shouldDecodeName() {
    let temp_dir = common::create_temp_dir().unwrap();
    let document = common::create_test_file(temp_dir.path(), "session.eaf", "").unwrap();
    let media = common::write_test_wav(temp_dir.path(), "Ämne take.wav", 100, 8000).unwrap();
    let descriptors = vec![MediaDescriptor {
        media_url: "file:///recordings/elsewhere.wav".to_string(),
        relative_media_url: Some("./%C3%84mne%20take.wav".to_string()),
        mime_type: None,
    }];

    let resolved = FileManager::resolve_media_path(&document, &descriptors).unwrap();

    assert_eq!(fs::canonicalize(resolved).unwrap(), fs::canonicalize(media).unwrap());
}

#[test]
fn test_resolve_media_path_withNothingOnDisk_shouldReturnNone() {
    let temp_dir = common::create_temp_dir().unwrap();
    let document = common::create_test_file(temp_dir.path(), "lonely.eaf", "").unwrap();
    let descriptors = vec![MediaDescriptor {
        media_url: "file:///recordings/missing.wav".to_string(),
        relative_media_url: Some("../missing.wav".to_string()),
        mime_type: None,
    }];

    assert!(FileManager::resolve_media_path(&document, &descriptors).is_none());
    assert!(FileManager::resolve_media_path(&document, &[]).is_none());
}

#[test]
fn test_detect_file_type_shouldUseExtensionThenContent() {
    let temp_dir = common::create_temp_dir().unwrap();
    let eaf = common::create_test_file(temp_dir.path(), "a.eaf", "").unwrap();
    let wav = common::write_test_wav(temp_dir.path(), "b.wav", 10, 8000).unwrap();
    let mp3 = common::create_test_file(temp_dir.path(), "c.MP3", "").unwrap();
    let sniffed_wav = fs::copy(&wav, temp_dir.path().join("d.bin")).map(|_| temp_dir.path().join("d.bin")).unwrap();
    let sniffed_eaf = common::create_test_file(
        temp_dir.path(),
        "e.xml",
        &common::sample_eaf("session.wav"),
    )
    .unwrap();
    let unknown = common::create_test_file(temp_dir.path(), "f.txt", "plain text").unwrap();

    assert_eq!(FileManager::detect_file_type(&eaf).unwrap(), FileType::Annotation);
    assert_eq!(FileManager::detect_file_type(&wav).unwrap(), FileType::Wav);
    assert_eq!(FileManager::detect_file_type(&mp3).unwrap(), FileType::Media);
    assert_eq!(FileManager::detect_file_type(&sniffed_wav).unwrap(), FileType::Wav);
    assert_eq!(FileManager::detect_file_type(&sniffed_eaf).unwrap(), FileType::Annotation);
    assert_eq!(FileManager::detect_file_type(&unknown).unwrap(), FileType::Unknown);
}

#[test]
fn test_detect_file_type_withMissingFile_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();

    assert!(FileManager::detect_file_type(temp_dir.path().join("missing.eaf")).is_err());
}
