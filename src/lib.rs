/*!
 * # Hermes - language resources from ELAN annotations
 *
 * A Rust library that turns a tiered, time-coded annotation document and its
 * recording into a language resource bundle: short audio clips paired with
 * their transcriptions and translations, plus a manifest.
 *
 * ## Features
 *
 * - Parse ELAN annotation documents, including interpolated time slots and
 *   symbolic subdivisions
 * - Cross-reference a primary tier with any number of dependent tiers
 * - Cut WAV recordings directly, other media through ffmpeg
 * - Write collision-free, atomically written clips on a bounded worker pool
 * - JSON or TSV manifests with per-record failure reporting
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `document`: annotation document model and parser
 * - `alignment`: primary/dependent tier cross-referencing
 * - `media`: media decoding and clip segmentation
 * - `export`: clip naming, writing and manifests
 * - `pipeline`: the orchestrator running the stages in order
 * - `app_config`: Configuration management
 * - `app_controller`: Main application controller
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod alignment;
pub mod app_config;
pub mod app_controller;
pub mod document;
pub mod errors;
pub mod export;
pub mod file_utils;
pub mod language_utils;
pub mod media;
pub mod pipeline;

// Re-export main types for easier usage
pub use alignment::{AlignedRecord, AlignmentResult, TierAligner, TierSelection};
pub use app_config::Config;
pub use document::{AnnotationDocument, DocumentOverview, parse_document};
pub use errors::{
    AlignmentError, AppError, DocumentError, MediaError, PipelineError, RecordError, RecordFailure,
};
pub use language_utils::{display_language, get_language_name, language_codes_match, normalize_to_part2t};
pub use pipeline::{DocumentSource, Pipeline, PipelineConfig, RunRequest, RunSummary};
