/*!
 * Pipeline orchestrator for turning an annotation document into a bundle.
 *
 * The run moves through four strictly sequential stages:
 * 1. Parsing: annotation bytes to document model
 * 2. Aligning: primary tier crossed with dependent tiers
 * 3. Segmenting: one clip per aligned record
 * 4. Exporting: clips and manifest written to the output directory
 *
 * Only Parsing and Aligning can fail the run. Later stages collect per-record
 * failures and always finish with a summary.
 */

use log::{debug, error, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::alignment::{AlignmentResult, AlignmentWarning, TierAligner, TierSelection};
use crate::app_config::{ManifestFormat, SegmentConfig};
use crate::document::{AnnotationDocument, DocumentOverview, parse_document};
use crate::errors::{PipelineError, RecordFailure};
use crate::export::{ExportContext, ExportOptions, ManifestMetadata, ResourceEntry, ResourceExporter};
use crate::language_utils::{display_language, get_language_name, matches_language};
use crate::media::{MediaHandle, MediaSegmenter, SegmentBatch};

/// Stages a run passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Parsing,
    Aligning,
    Segmenting,
    Exporting,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsing => write!(f, "parsing"),
            Self::Aligning => write!(f, "aligning"),
            Self::Segmenting => write!(f, "segmenting"),
            Self::Exporting => write!(f, "exporting"),
        }
    }
}

/// Lifecycle of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Parsing,
    Aligning,
    Segmenting,
    Exporting,
    Done,
    /// The run stopped in the given stage
    Failed(PipelineStage),
}

impl PipelineState {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Parsing)
                | (Parsing, Aligning)
                | (Aligning, Segmenting)
                | (Segmenting, Exporting)
                | (Exporting, Done)
                | (Parsing, Failed(PipelineStage::Parsing))
                | (Aligning, Failed(PipelineStage::Aligning))
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    // Share of the whole run completed when the state starts, and its weight
    fn span(&self) -> (f32, f32) {
        match self {
            Self::Idle => (0.0, 0.0),
            Self::Parsing => (0.0, 0.1),
            Self::Aligning => (0.1, 0.1),
            Self::Segmenting => (0.2, 0.3),
            Self::Exporting => (0.5, 0.5),
            Self::Done | Self::Failed(_) => (1.0, 0.0),
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Parsing => write!(f, "parsing"),
            Self::Aligning => write!(f, "aligning"),
            Self::Segmenting => write!(f, "segmenting"),
            Self::Exporting => write!(f, "exporting"),
            Self::Done => write!(f, "done"),
            Self::Failed(stage) => write!(f, "failed while {}", stage),
        }
    }
}

/// Configuration for the bundle pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Export zero-length records as empty clips instead of failing them
    pub keep_degenerate: bool,

    /// Sample rate for transcoded media (source rate if unset)
    pub transcode_sample_rate: Option<u32>,

    /// ffmpeg timeout in seconds
    pub ffmpeg_timeout_secs: u64,

    /// Clip and manifest writing options
    pub export: ExportOptions,

    /// Primary tier language; the tier's own language when unset
    pub transcription_language: Option<String>,

    /// Translation language; the translation tier's language when unset
    pub translation_language: Option<String>,

    /// Resource author
    pub author: String,

    /// Dependent tier used as translation
    pub translation_tier: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let segment = SegmentConfig::default();
        Self {
            keep_degenerate: segment.keep_degenerate,
            transcode_sample_rate: segment.transcode_sample_rate,
            ffmpeg_timeout_secs: segment.ffmpeg_timeout_secs,
            export: ExportOptions::default(),
            transcription_language: None,
            translation_language: None,
            author: String::new(),
            translation_tier: None,
        }
    }
}

impl PipelineConfig {
    /// Keep or drop zero-length records.
    pub fn with_keep_degenerate(mut self, keep: bool) -> Self {
        self.keep_degenerate = keep;
        self
    }

    /// Set custom export options.
    pub fn with_export_options(mut self, export: ExportOptions) -> Self {
        self.export = export;
        self
    }

    /// Set the manifest format.
    pub fn with_manifest_format(mut self, format: ManifestFormat) -> Self {
        self.export.manifest_format = format;
        self
    }

    /// Set the number of clips written concurrently.
    pub fn with_concurrent_writes(mut self, workers: usize) -> Self {
        self.export.concurrent_writes = workers;
        self
    }

    /// Set the manifest languages.
    pub fn with_languages(mut self, transcription: &str, translation: &str) -> Self {
        self.transcription_language = Some(transcription.to_string());
        self.translation_language = Some(translation.to_string());
        self
    }

    /// Set the resource author.
    pub fn with_author(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }

    /// Choose the dependent tier exported as translation.
    pub fn with_translation_tier(mut self, tier: &str) -> Self {
        self.translation_tier = Some(tier.to_string());
        self
    }

    pub fn segment_config(&self) -> SegmentConfig {
        SegmentConfig {
            keep_degenerate: self.keep_degenerate,
            transcode_sample_rate: self.transcode_sample_rate,
            ffmpeg_timeout_secs: self.ffmpeg_timeout_secs,
        }
    }
}

/// Progress information during pipeline execution.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineProgress {
    /// Current state
    pub state: PipelineState,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Overall progress (0.0 - 1.0)
    pub overall_progress: f32,

    /// Current status message
    pub status: String,
}

impl PipelineProgress {
    pub fn new(state: PipelineState) -> Self {
        let mut progress = Self {
            state,
            stage_progress: 0.0,
            overall_progress: 0.0,
            status: String::new(),
        };
        progress.update(0.0, "");
        progress
    }

    /// Update progress for the current stage.
    pub fn update(&mut self, stage_progress: f32, status: &str) {
        self.stage_progress = stage_progress.clamp(0.0, 1.0);
        self.status = status.to_string();

        let (offset, weight) = self.state.span();
        self.overall_progress = offset + self.stage_progress * weight;
    }

    /// Move on to the next state.
    pub fn next_state(&mut self, state: PipelineState) {
        self.state = state;
        self.update(0.0, &format!("Starting {}", state));
    }
}

/// Where the annotation document comes from
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Raw annotation XML
    Bytes(Vec<u8>),
    /// Annotation file on disk
    File(PathBuf),
    /// Document parsed earlier, e.g. by an inspect call
    Parsed(Arc<AnnotationDocument>),
}

/// Everything a run needs
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub document: DocumentSource,
    pub selection: TierSelection,
    pub media: PathBuf,
    pub output_dir: PathBuf,
    /// Name recorded as the manifest's source document
    pub document_name: Option<String>,
}

impl RunRequest {
    pub fn new(
        document: DocumentSource,
        selection: TierSelection,
        media: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let document_name = match &document {
            DocumentSource::File(path) => file_name(path),
            _ => None,
        };
        Self {
            document,
            selection,
            media: media.into(),
            output_dir: output_dir.into(),
            document_name,
        }
    }

    /// Record a source document name in the manifest.
    pub fn with_document_name(mut self, name: &str) -> Self {
        self.document_name = Some(name.to_string());
        self
    }
}

/// Final result of one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Exported(ResourceEntry),
    Failed(RecordFailure),
}

impl RecordOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::Exported(entry) => entry.index,
            Self::Failed(failure) => failure.index,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exported(_))
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Terminal state, always `Done` for a returned summary
    pub state: PipelineState,

    /// One outcome per aligned record, ordered by index
    pub outcomes: Vec<RecordOutcome>,

    /// Annotations skipped during alignment
    pub warnings: Vec<AlignmentWarning>,

    /// Written manifest, if any
    pub manifest_path: Option<PathBuf>,

    /// Why no manifest was written
    pub manifest_error: Option<String>,

    /// Total duration of the run
    pub duration: Duration,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.outcomes.iter().filter_map(|o| match o {
            RecordOutcome::Exported(entry) => Some(entry),
            RecordOutcome::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            RecordOutcome::Failed(failure) => Some(failure),
            RecordOutcome::Exported(_) => None,
        })
    }

    /// Human readable failure reasons
    pub fn failure_reasons(&self) -> Vec<String> {
        self.failures().map(|f| f.to_string()).collect()
    }

    /// Get a summary of the run.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        parts.push(format!("Duration: {:.2}s", self.duration.as_secs_f32()));
        parts.push(format!(
            "Records: {} exported, {} failed",
            self.succeeded(),
            self.failed()
        ));

        if !self.warnings.is_empty() {
            parts.push(format!("Skipped: {} annotation(s)", self.warnings.len()));
        }

        match (&self.manifest_path, &self.manifest_error) {
            (Some(path), _) => parts.push(format!("Manifest: {}", path.display())),
            (None, Some(error)) => parts.push(format!("Manifest error: {}", error)),
            (None, None) => {}
        }

        parts.join(" | ")
    }
}

type ProgressCallback = Arc<dyn Fn(&PipelineProgress) + Send + Sync>;

/// The bundle pipeline orchestrator.
pub struct Pipeline {
    config: PipelineConfig,
    state: PipelineState,
    progress_callback: Option<ProgressCallback>,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: PipelineState::Idle,
            progress_callback: None,
        }
    }

    /// Report progress to `callback` during runs.
    pub fn with_progress_callback(mut self, callback: impl Fn(&PipelineProgress) + Send + Sync + 'static) -> Self {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// State of the last run
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Parse a document and describe its tiers, without touching media
    pub fn inspect(bytes: &[u8]) -> Result<DocumentOverview, PipelineError> {
        Ok(parse_document(bytes)?.overview())
    }

    /// Run the whole pipeline
    pub async fn run(&mut self, request: RunRequest) -> Result<RunSummary, PipelineError> {
        let start_time = Instant::now();
        self.state = PipelineState::Idle;
        let mut progress = PipelineProgress::new(PipelineState::Idle);

        // Stage 1: Parsing
        self.advance(PipelineState::Parsing, &mut progress);
        let document = match self.load_document(&request.document).await {
            Ok(document) => document,
            Err(e) => return Err(self.fail(PipelineStage::Parsing, e)),
        };
        self.report(&mut progress, 1.0, &format!("Parsed {} tier(s)", document.tiers().len()));

        // Stage 2: Aligning
        self.advance(PipelineState::Aligning, &mut progress);
        let alignment = match TierAligner::new().align(&document, &request.selection) {
            Ok(alignment) => alignment,
            Err(e) => return Err(self.fail(PipelineStage::Aligning, e.into())),
        };
        self.report(
            &mut progress,
            1.0,
            &format!("Aligned {} record(s)", alignment.records.len()),
        );

        // Stage 3: Segmenting
        self.advance(PipelineState::Segmenting, &mut progress);
        let batch = self.segment(&request.media, &alignment).await;
        self.report(
            &mut progress,
            1.0,
            &format!("Cut {} clip(s), {} failure(s)", batch.clips.len(), batch.failures.len()),
        );

        // Stage 4: Exporting
        self.advance(PipelineState::Exporting, &mut progress);
        let context = ExportContext {
            output_dir: request.output_dir.clone(),
            metadata: self.manifest_metadata(&document, &alignment, &request),
        };
        let exporter = ResourceExporter::new(self.config.export.clone());
        let callback = self.progress_callback.clone();
        let report = exporter
            .export_with_progress(batch.clips, batch.failures, &context, move |written, total| {
                if let Some(callback) = &callback {
                    let mut progress = PipelineProgress::new(PipelineState::Exporting);
                    progress.update(
                        written as f32 / total.max(1) as f32,
                        &format!("Wrote {}/{} clip(s)", written, total),
                    );
                    callback(&progress);
                }
            })
            .await;

        let mut outcomes: Vec<RecordOutcome> = report
            .entries
            .into_iter()
            .map(RecordOutcome::Exported)
            .chain(report.failures.into_iter().map(RecordOutcome::Failed))
            .collect();
        outcomes.sort_by_key(|o| o.index());

        self.advance(PipelineState::Done, &mut progress);
        let summary = RunSummary {
            state: self.state,
            outcomes,
            warnings: alignment.warnings,
            manifest_path: report.manifest_path,
            manifest_error: report.manifest_error,
            duration: start_time.elapsed(),
        };
        self.report(&mut progress, 1.0, &summary.summary());
        info!("Run finished: {}", summary.summary());
        Ok(summary)
    }

    async fn load_document(&self, source: &DocumentSource) -> Result<Arc<AnnotationDocument>, PipelineError> {
        match source {
            DocumentSource::Bytes(bytes) => Ok(Arc::new(parse_document(bytes)?)),
            DocumentSource::File(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| PipelineError::Read {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                Ok(Arc::new(parse_document(&bytes)?))
            }
            DocumentSource::Parsed(document) => Ok(document.clone()),
        }
    }

    /// Open the media for the duration of the batch and cut every record
    async fn segment(&self, media: &Path, alignment: &AlignmentResult) -> SegmentBatch {
        let segmenter = MediaSegmenter::new(self.config.keep_degenerate);
        match MediaHandle::open(media, &self.config.segment_config()).await {
            Ok(handle) => segmenter.segment_all(&handle, &alignment.records),
            Err(e) => {
                warn!("Cannot open media {:?}: {}", media, e);
                SegmentBatch::unavailable(&alignment.records, &e.to_string())
            }
        }
    }

    fn manifest_metadata(
        &self,
        document: &AnnotationDocument,
        alignment: &AlignmentResult,
        request: &RunRequest,
    ) -> ManifestMetadata {
        let tier_language = |tier: &str| -> Option<(String, String)> {
            let lang_ref = document.tier(tier)?.language.clone()?;
            let label = document.language_label(&lang_ref);
            Some((lang_ref, label))
        };

        let translation_tier = self.translation_tier(alignment, &tier_language);

        let transcription_language = self
            .config
            .transcription_language
            .clone()
            .filter(|l| !l.trim().is_empty())
            .or_else(|| tier_language(&alignment.primary_tier).map(|(lang_ref, label)| language_name(&lang_ref, label)))
            .unwrap_or_default();

        let translation_language = self
            .config
            .translation_language
            .clone()
            .filter(|l| !l.trim().is_empty())
            .or_else(|| {
                translation_tier
                    .as_deref()
                    .and_then(|tier| tier_language(tier))
                    .map(|(lang_ref, label)| language_name(&lang_ref, label))
            })
            .unwrap_or_default();

        ManifestMetadata {
            transcription_language: display_language(&transcription_language),
            translation_language: display_language(&translation_language),
            author: self.config.author.clone(),
            source_document: request.document_name.clone(),
            source_media: file_name(&request.media),
            primary_tier: alignment.primary_tier.clone(),
            dependent_tiers: alignment.dependent_tiers.clone(),
            translation_tier,
        }
    }

    /// Configured translation tier if selected, else the first dependent in the
    /// translation language, else the first dependent
    fn translation_tier(
        &self,
        alignment: &AlignmentResult,
        tier_language: &dyn Fn(&str) -> Option<(String, String)>,
    ) -> Option<String> {
        if let Some(tier) = &self.config.translation_tier {
            if alignment.dependent_tiers.contains(tier) {
                return Some(tier.clone());
            }
            warn!("Translation tier '{}' is not among the selected dependent tiers", tier);
        }

        if let Some(language) = self.config.translation_language.as_deref() {
            let by_language = alignment.dependent_tiers.iter().find(|tier| {
                tier_language(tier.as_str())
                    .map(|(lang_ref, label)| {
                        matches_language(language, &lang_ref) || matches_language(language, &label)
                    })
                    .unwrap_or(false)
            });
            if let Some(tier) = by_language {
                return Some(tier.clone());
            }
        }

        alignment.dependent_tiers.first().cloned()
    }

    fn advance(&mut self, next: PipelineState, progress: &mut PipelineProgress) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        debug!("Pipeline: {} -> {}", self.state, next);
        self.state = next;
        progress.next_state(next);
        if let Some(callback) = &self.progress_callback {
            callback(progress);
        }
    }

    fn report(&self, progress: &mut PipelineProgress, stage_progress: f32, status: &str) {
        progress.update(stage_progress, status);
        if let Some(callback) = &self.progress_callback {
            callback(progress);
        }
    }

    fn fail(&mut self, stage: PipelineStage, error: PipelineError) -> PipelineError {
        error!("Pipeline failed while {}: {}", stage, error);
        self.state = PipelineState::Failed(stage);
        error
    }
}

// ISO language references are named in English, anything else keeps its label
fn language_name(lang_ref: &str, label: String) -> String {
    get_language_name(lang_ref).unwrap_or(label)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().to_string())
}
