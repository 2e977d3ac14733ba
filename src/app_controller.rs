use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::alignment::TierSelection;
use crate::app_config::Config;
use crate::document::{DocumentOverview, parse_document};
use crate::errors::AppError;
use crate::file_utils::{FileManager, FileType};
use crate::pipeline::{DocumentSource, Pipeline, RunRequest, RunSummary};

// @module: Application controller for bundle export

/// One export request from the outer surface
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Annotation document
    pub document: PathBuf,
    /// Source recording; taken from the document header when unset
    pub media: Option<PathBuf>,
    /// Bundle directory; `<document>_bundle` next to the document when unset
    pub output_dir: Option<PathBuf>,
    pub selection: TierSelection,
}

/// Main application controller for bundle export
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Describe the tiers of an annotation document
    pub fn inspect(&self, document: &Path) -> Result<DocumentOverview> {
        self.check_annotation_file(document)?;
        let bytes = FileManager::read_bytes(document)?;
        let overview = Pipeline::inspect(&bytes)
            .map_err(AppError::from)
            .with_context(|| format!("Failed to inspect {:?}", document))?;
        debug!("Inspected {:?}: {} tier(s)", document, overview.tiers.len());
        Ok(overview)
    }

    /// Run the export workflow with a progress bar
    pub async fn run(&self, job: ExportJob) -> Result<RunSummary> {
        self.check_annotation_file(&job.document)?;

        let bytes = FileManager::read_bytes(&job.document)?;
        let document = parse_document(&bytes)
            .map_err(AppError::from)
            .with_context(|| format!("Failed to parse {:?}", job.document))?;

        let media = match job.media.clone() {
            Some(media) => media,
            None => FileManager::resolve_media_path(&job.document, &document.header.media).ok_or_else(|| {
                anyhow!(
                    "No media given and none of the media files linked in {:?} could be found",
                    job.document
                )
            })?,
        };
        let output_dir = job
            .output_dir
            .clone()
            .unwrap_or_else(|| FileManager::default_output_dir(&job.document));

        info!("Exporting {:?} with media {:?} into {:?}", job.document, media, output_dir);

        let progress_bar = ProgressBar::new(100);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {percent}% {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));

        let bar = progress_bar.clone();
        let mut pipeline = Pipeline::new(self.config.to_pipeline_config()).with_progress_callback(move |progress| {
            bar.set_position((progress.overall_progress * 100.0).round() as u64);
            bar.set_message(progress.status.clone());
        });

        let mut request = RunRequest::new(
            DocumentSource::Parsed(Arc::new(document)),
            job.selection.clone(),
            media,
            output_dir,
        );
        if let Some(name) = job.document.file_name() {
            request = request.with_document_name(&name.to_string_lossy());
        }

        let result = pipeline.run(request).await;
        progress_bar.finish_and_clear();

        let summary = result.map_err(AppError::from).context("Export failed")?;

        for warning in &summary.warnings {
            warn!("{}", warning);
        }
        for failure in summary.failures() {
            warn!("{}", failure);
        }
        info!(
            "Exported {} of {} record(s) in {}",
            summary.succeeded(),
            summary.outcomes.len(),
            Self::format_duration(summary.duration)
        );
        if let Some(path) = &summary.manifest_path {
            info!("Success: {}", path.display());
        }

        Ok(summary)
    }

    fn check_annotation_file(&self, document: &Path) -> Result<()> {
        match FileManager::detect_file_type(document)? {
            FileType::Annotation => Ok(()),
            other => Err(anyhow!(
                "Not an annotation document ({:?}): {:?}",
                other,
                document
            )),
        }
    }

    /// Plain text tier listing for the inspect command
    pub fn format_overview(overview: &DocumentOverview) -> String {
        let mut out = String::new();
        let width = overview.tiers.iter().map(|t| t.name.len()).max().unwrap_or(0);

        let _ = writeln!(out, "Tiers ({}):", overview.tiers.len());
        for tier in &overview.tiers {
            let relation = match (&tier.parent, tier.constraint) {
                (Some(parent), Some(constraint)) => format!("dependent on {} ({:?})", parent, constraint),
                (Some(parent), None) => format!("dependent on {}", parent),
                (None, _) => tier.kind.to_string(),
            };
            let _ = writeln!(
                out,
                "  {:<width$}  {:>5} annotation(s)  {}{}",
                tier.name,
                tier.annotation_count,
                relation,
                tier.language
                    .as_deref()
                    .map(|l| format!("  [{}]", l))
                    .unwrap_or_default(),
                width = width
            );
        }

        if !overview.media.is_empty() {
            let _ = writeln!(out, "Media:");
            for media in &overview.media {
                let _ = writeln!(
                    out,
                    "  {}",
                    media.relative_media_url.as_deref().unwrap_or(&media.media_url)
                );
            }
        }

        let _ = write!(
            out,
            "{} time slot(s), {} annotation(s)",
            overview.time_slot_count, overview.annotation_count
        );
        out
    }

    // Format duration in a human-readable format (HH:MM:SS)
    pub fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
