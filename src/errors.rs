/*!
 * Error types for the hermes application.
 *
 * Document-level errors are fatal and abort a run before any media I/O.
 * Record-level errors are collected per record and never abort a batch.
 * All of them use the thiserror crate for ergonomic error definitions.
 */

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Fatal errors raised while reading an annotation document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    /// The document is not a well-formed annotation document
    #[error("Malformed document at byte {position}: {message}")]
    MalformedDocument {
        /// Byte offset in the source where the problem was detected
        position: u64,
        /// Description of the problem
        message: String,
    },

    /// A referenced time slot has no anchored slot to interpolate from
    #[error("Unresolvable timing for time slot '{slot_id}': no anchored time slot to interpolate from")]
    UnresolvableTiming {
        /// Identifier of the time slot
        slot_id: String,
    },

    /// A dependent tier names a parent tier that does not exist
    #[error("Tier '{tier}' references unknown parent tier '{parent}'")]
    UnknownParentTier {
        /// The dependent tier
        tier: String,
        /// The missing parent tier name
        parent: String,
    },
}

impl DocumentError {
    /// Shorthand for a malformed document error
    pub fn malformed(position: u64, message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            position,
            message: message.into(),
        }
    }
}

/// Failure to resolve one annotation's absolute interval
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The annotation id is not in the document
    #[error("Unknown annotation '{0}'")]
    UnknownAnnotation(String),

    /// An alignable annotation references a time slot that is not declared
    #[error("Annotation '{annotation_id}' references missing time slot '{slot_id}'")]
    MissingTimeSlot {
        annotation_id: String,
        slot_id: String,
    },

    /// A reference annotation points to a parent annotation that is not declared
    #[error("Annotation '{annotation_id}' references missing parent annotation '{parent_id}'")]
    MissingParentAnnotation {
        annotation_id: String,
        parent_id: String,
    },

    /// Following parent references leads back to the same annotation
    #[error("Annotation '{0}' is part of a reference cycle")]
    ReferenceCycle(String),
}

/// Fatal errors raised by the tier aligner
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlignmentError {
    /// The requested tier does not exist in the document
    #[error("Unknown tier '{tier}' (available: {available})")]
    UnknownTier {
        /// Requested tier name
        tier: String,
        /// Comma separated list of tiers that do exist
        available: String,
    },
}

/// Errors raised while opening or decoding source media
#[derive(Error, Debug)]
pub enum MediaError {
    /// The media file does not exist
    #[error("Media file not found: {0:?}")]
    NotFound(PathBuf),

    /// The WAV data could not be decoded
    #[error("Failed to decode media {path:?}: {message}")]
    Decode {
        path: PathBuf,
        message: String,
    },

    /// The external transcoder failed or timed out
    #[error("Transcoding failed: {0}")]
    Transcode(String),

    /// Underlying I/O error
    #[error("Media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-record failures collected during segmentation and export
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The record ends after the media does
    #[error("Timing out of range: record ends at {end_ms}ms but media lasts {media_duration_ms}ms")]
    TimingOutOfRange {
        end_ms: u64,
        media_duration_ms: u64,
    },

    /// The record has a zero or negative length interval
    #[error("Empty interval [{start_ms}ms, {end_ms}ms)")]
    EmptyInterval {
        start_ms: u64,
        end_ms: u64,
    },

    /// The source media could not be opened, so no clip could be cut
    #[error("Media unavailable: {0}")]
    MediaUnavailable(String),

    /// Writing the clip to disk failed
    #[error("Failed to write {path:?}: {message}")]
    WriteFailed {
        path: PathBuf,
        message: String,
    },
}

/// Stage in which a record failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Segmenting,
    Exporting,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Segmenting => write!(f, "segmenting"),
            Self::Exporting => write!(f, "exporting"),
        }
    }
}

/// A record that produced no clip, tagged with where it failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// 1-based index of the record on the primary tier
    pub index: usize,
    pub annotation_id: String,
    pub stage: FailureStage,
    pub error: RecordError,
}

impl fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Record {} ({}) failed while {}: {}",
            self.index, self.annotation_id, self.stage, self.error
        )
    }
}

/// Fatal pipeline errors; only document-level problems abort a run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Parsing the annotation document failed
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Aligning tiers failed
    #[error("Alignment error: {0}")]
    Alignment(#[from] AlignmentError),

    /// The annotation document could not be read from disk
    #[error("Failed to read annotation document {path:?}: {message}")]
    Read {
        path: PathBuf,
        message: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Error from media handling
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Error in configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<DocumentError> for AppError {
    fn from(error: DocumentError) -> Self {
        Self::Pipeline(PipelineError::Document(error))
    }
}
