/*!
 * Annotation-to-bundle pipeline.
 */

pub mod orchestrator;

pub use orchestrator::{
    DocumentSource, Pipeline, PipelineConfig, PipelineProgress, PipelineStage, PipelineState,
    RecordOutcome, RunRequest, RunSummary,
};
