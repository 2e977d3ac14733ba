/*!
 * Integration tests for the full application lifecycle
 */

use std::time::Duration;

use hermes::alignment::TierSelection;
use hermes::app_config::{Config, ManifestFormat};
use hermes::app_controller::{Controller, ExportJob};
use hermes::pipeline::PipelineState;

use crate::common;

fn job(document: std::path::PathBuf) -> ExportJob {
    ExportJob {
        document,
        media: None,
        output_dir: None,
        selection: TierSelection::new("Transcription").with_dependent("Translation"),
    }
}

/// Test the controller with an invalid configuration
#[test]
fn test_controller_withInvalidConfig_shouldFail() {
    let mut config = Config::default();
    config.export.concurrent_writes = 0;

    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_inspect_withSampleSession_shouldListTiersAndMedia() {
    let temp_dir = common::create_temp_dir().unwrap();
    let (document, _) = common::create_sample_session(temp_dir.path(), 500).unwrap();
    let controller = Controller::new_for_test().unwrap();

    let overview = controller.inspect(&document).unwrap();
    let listing = Controller::format_overview(&overview);

    assert_eq!(overview.tiers.len(), 3);
    assert!(listing.starts_with("Tiers (3):"));
    assert!(listing.contains("Translation"));
    assert!(listing.contains("dependent on Transcription (SymbolicAssociation)"));
    assert!(listing.contains("[Kaurna]"));
    assert!(listing.contains("./session.wav"));
    assert!(listing.ends_with("3 time slot(s), 6 annotation(s)"));
}

#[test]
fn test_inspect_withWavFile_shouldRejectIt() {
    let temp_dir = common::create_temp_dir().unwrap();
    let media = common::write_test_wav(temp_dir.path(), "session.wav", 100, 8000).unwrap();
    let controller = Controller::new_for_test().unwrap();

    let error = controller.inspect(&media).unwrap_err();

    assert!(error.to_string().contains("Not an annotation document"));
}

#[tokio::test]
async fn test_run_withMediaFromHeader_shouldExportNextToDocument() {
    let temp_dir = common::create_temp_dir().unwrap();
    let (document, _) = common::create_sample_session(temp_dir.path(), 2000).unwrap();
    let controller = Controller::new_for_test().unwrap();

    let summary = controller.run(job(document)).await.unwrap();

    assert_eq!(summary.state, PipelineState::Done);
    assert_eq!(summary.succeeded(), 2);
    let bundle = temp_dir.path().join("session_bundle");
    assert!(bundle.join("0001_ninna_marni.wav").exists());
    assert!(bundle.join("0002_marni_ai.wav").exists());
    assert_eq!(summary.manifest_path, Some(bundle.join("manifest.json")));
}

#[test]
fn test_run_withConfiguredTsvAndAuthor_shouldHonorConfig() {
    common::init_test_logger();
    let temp_dir = common::create_temp_dir().unwrap();
    let (document, media) = common::create_sample_session(temp_dir.path(), 2000).unwrap();
    let output = temp_dir.path().join("out");

    let mut config = Config::default();
    config.manifest.format = ManifestFormat::Tsv;
    config.manifest.file_name = "lexicon".to_string();
    config.manifest.author = "Field Team".to_string();
    let controller = Controller::with_config(config).unwrap();

    let summary = tokio_test::block_on(async {
        controller
            .run(ExportJob {
                media: Some(media),
                output_dir: Some(output.clone()),
                ..job(document)
            })
            .await
    })
    .unwrap();

    assert_eq!(summary.manifest_path, Some(output.join("lexicon.tsv")));
    assert!(!output.join("failures.tsv").exists());
}

#[tokio::test]
async fn test_run_withoutResolvableMedia_shouldFailBeforeExport() {
    let temp_dir = common::create_temp_dir().unwrap();
    let document = common::create_test_file(
        temp_dir.path(),
        "session.eaf",
        &common::sample_eaf("elsewhere.wav"),
    )
    .unwrap();
    let controller = Controller::new_for_test().unwrap();

    let error = controller.run(job(document)).await.unwrap_err();

    assert!(error.to_string().contains("No media given"));
    assert!(!temp_dir.path().join("session_bundle").exists());
}

#[tokio::test]
async fn test_run_withUnknownTier_shouldReturnError() {
    let temp_dir = common::create_temp_dir().unwrap();
    let (document, _) = common::create_sample_session(temp_dir.path(), 2000).unwrap();
    let controller = Controller::new_for_test().unwrap();

    let result = controller
        .run(ExportJob {
            selection: TierSelection::new("Words"),
            ..job(document)
        })
        .await;

    let error = result.unwrap_err();
    assert!(format!("{:#}", error).contains("Unknown tier 'Words'"));
}

#[test]
fn test_format_duration_shouldPickLargestUnit() {
    assert_eq!(Controller::format_duration(Duration::from_millis(1250)), "1.250s");
    assert_eq!(Controller::format_duration(Duration::from_secs(75)), "1m 15s");
    assert_eq!(Controller::format_duration(Duration::from_secs(3725)), "1h 2m 5s");
}
