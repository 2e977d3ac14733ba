/*!
 * Tests for error types and their messages
 */

use std::path::PathBuf;

use hermes::errors::{
    AlignmentError, AppError, DocumentError, FailureStage, PipelineError, RecordError, RecordFailure,
};

#[test]
fn test_documentError_malformed_shouldReportPosition() {
    let error = DocumentError::malformed(42, "missing ANNOTATION_DOCUMENT root element");

    assert_eq!(
        error.to_string(),
        "Malformed document at byte 42: missing ANNOTATION_DOCUMENT root element"
    );
}

#[test]
fn test_alignmentError_unknownTier_shouldListAvailableTiers() {
    let error = AlignmentError::UnknownTier {
        tier: "Words".to_string(),
        available: "Transcription, Translation".to_string(),
    };

    assert_eq!(
        error.to_string(),
        "Unknown tier 'Words' (available: Transcription, Translation)"
    );
}

#[test]
fn test_recordFailure_display_shouldNameStageAndCause() {
    let failure = RecordFailure {
        index: 2,
        annotation_id: "a2".to_string(),
        stage: FailureStage::Segmenting,
        error: RecordError::TimingOutOfRange {
            end_ms: 2000,
            media_duration_ms: 1500,
        },
    };

    assert_eq!(
        failure.to_string(),
        "Record 2 (a2) failed while segmenting: Timing out of range: record ends at 2000ms but media lasts 1500ms"
    );
}

#[test]
fn test_failureStage_serialize_shouldBeLowercase() {
    assert_eq!(serde_json::to_string(&FailureStage::Exporting).unwrap(), "\"exporting\"");
}

#[test]
fn test_appError_fromDocumentError_shouldWrapInPipelineError() {
    let error: AppError = DocumentError::UnknownParentTier {
        tier: "Gloss".to_string(),
        parent: "Words".to_string(),
    }
    .into();

    assert!(matches!(error, AppError::Pipeline(PipelineError::Document(_))));
    assert!(error.to_string().contains("unknown parent tier 'Words'"));
}

#[test]
fn test_pipelineError_read_shouldMentionPath() {
    let error = PipelineError::Read {
        path: PathBuf::from("session.eaf"),
        message: "permission denied".to_string(),
    };

    let message = error.to_string();
    assert!(message.contains("session.eaf"));
    assert!(message.contains("permission denied"));
}

#[test]
fn test_appError_fromIoError_shouldBeFileError() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");

    let error: AppError = io_error.into();

    assert!(matches!(error, AppError::File(ref m) if m == "gone"));
}
