/*!
 * Resource exporter.
 *
 * Names are reserved for every clip before any write starts, then clips are
 * written on a bounded pool of blocking tasks. Each file is written to a
 * temporary file in the output directory and moved into place without
 * clobbering, so a crash never leaves a truncated clip under its final name.
 * The manifest is written last.
 */

use chrono::Utc;
use futures::stream::{self, StreamExt};
use hound::WavWriter;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;
use tokio::sync::Semaphore;

use crate::alignment::AlignedRecord;
use crate::app_config::{DependentTextPolicy, ManifestFormat};
use crate::document::Interval;
use crate::errors::{FailureStage, RecordError, RecordFailure};
use crate::media::{ClipBuffer, SampleData};

use super::manifest::{Manifest, ManifestEntry, ManifestFailure, TierText};
use super::naming::{FilenameReserver, NamingOptions, clip_stem};

/// How clips and the manifest are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub naming: NamingOptions,
    pub dependent_text: DependentTextPolicy,
    pub separator: String,
    /// Upper bound on clips written at the same time
    pub concurrent_writes: usize,
    pub manifest_format: ManifestFormat,
    /// Manifest file name without extension
    pub manifest_file_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            naming: NamingOptions::default(),
            dependent_text: DependentTextPolicy::Concatenate,
            separator: " ".to_string(),
            concurrent_writes: 4,
            manifest_format: ManifestFormat::Json,
            manifest_file_name: "manifest".to_string(),
        }
    }
}

/// Bundle-level metadata copied into the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestMetadata {
    pub transcription_language: String,
    pub translation_language: String,
    pub author: String,
    pub source_document: Option<String>,
    pub source_media: Option<String>,
    pub primary_tier: String,
    pub dependent_tiers: Vec<String>,
    /// Dependent tier whose text fills the `translation` field
    pub translation_tier: Option<String>,
}

/// Where and for what a bundle is exported
#[derive(Debug, Clone)]
pub struct ExportContext {
    pub output_dir: PathBuf,
    pub metadata: ManifestMetadata,
}

/// One clip successfully written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub index: usize,
    pub annotation_id: String,
    pub path: PathBuf,
    pub primary_text: String,
    pub translation: Option<String>,
    /// Dependent tier texts keyed by tier name
    pub tiers: BTreeMap<String, TierText>,
    pub interval: Interval,
    pub degenerate: bool,
}

impl ResourceEntry {
    /// File name relative to the output directory
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl From<&ResourceEntry> for ManifestEntry {
    fn from(entry: &ResourceEntry) -> Self {
        Self {
            index: entry.index,
            annotation_id: entry.annotation_id.clone(),
            transcription: entry.primary_text.clone(),
            translation: entry.translation.clone(),
            tiers: entry.tiers.clone(),
            audio: vec![entry.file_name()],
            start_ms: entry.interval.start_ms,
            end_ms: entry.interval.end_ms,
            degenerate: entry.degenerate,
        }
    }
}

/// Result of one export
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    /// Written clips ordered by record index
    pub entries: Vec<ResourceEntry>,
    /// All failed records, the ones handed in plus write failures, ordered by index
    pub failures: Vec<RecordFailure>,
    pub manifest_path: Option<PathBuf>,
    /// Failure table written next to a TSV manifest
    pub failures_path: Option<PathBuf>,
    /// Why the manifest could not be written
    pub manifest_error: Option<String>,
}

/// Writes clips and the manifest into an output directory
#[derive(Debug, Clone, Default)]
pub struct ResourceExporter {
    options: ExportOptions,
}

impl ResourceExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export clips without progress reporting
    pub async fn export(
        &self,
        clips: Vec<ClipBuffer>,
        failures: Vec<RecordFailure>,
        context: &ExportContext,
    ) -> ExportReport {
        self.export_with_progress(clips, failures, context, |_, _| {}).await
    }

    /// Export clips, calling `progress_callback(written, total)` after each clip
    pub async fn export_with_progress(
        &self,
        clips: Vec<ClipBuffer>,
        mut failures: Vec<RecordFailure>,
        context: &ExportContext,
        progress_callback: impl Fn(usize, usize) + Clone + Send + Sync + 'static,
    ) -> ExportReport {
        let output_dir = context.output_dir.clone();

        if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
            let message = format!("cannot create output directory {:?}: {}", output_dir, e);
            error!("{}", message);
            failures.extend(clips.iter().map(|clip| write_failure(&clip.record, &output_dir, &e.to_string())));
            failures.sort_by_key(|f| f.index);
            return ExportReport {
                failures,
                manifest_error: Some(message),
                ..Default::default()
            };
        }

        // Reserve every name up front so concurrent writers never race for one
        let reserver = FilenameReserver::new(&output_dir);
        let jobs: Vec<(ClipBuffer, PathBuf)> = clips
            .into_iter()
            .map(|clip| {
                let stem = clip_stem(clip.record.index, &clip.record.text, &self.options.naming);
                let path = reserver.reserve(&stem, "wav");
                (clip, path)
            })
            .collect();

        let total = jobs.len();
        let workers = self.options.concurrent_writes.max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        let written = Arc::new(AtomicUsize::new(0));

        let results = stream::iter(jobs)
            .map(|(clip, path)| {
                let semaphore = semaphore.clone();
                let written = written.clone();
                let progress_callback = progress_callback.clone();

                async move {
                    let record = clip.record.clone();
                    let result = match semaphore.acquire_owned().await {
                        Ok(_permit) => {
                            let target = path.clone();
                            tokio::task::spawn_blocking(move || write_clip_atomic(&target, &clip))
                                .await
                                .unwrap_or_else(|e| {
                                    Err(RecordError::WriteFailed {
                                        path: path.clone(),
                                        message: format!("writer task failed: {}", e),
                                    })
                                })
                        }
                        Err(e) => Err(RecordError::WriteFailed {
                            path: path.clone(),
                            message: format!("writer pool closed: {}", e),
                        }),
                    };

                    let current = written.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total);

                    (record, path, result)
                }
            })
            .buffer_unordered(workers)
            .collect::<Vec<_>>()
            .await;

        let mut entries = Vec::with_capacity(results.len());
        for (record, path, result) in results {
            match result {
                Ok(()) => {
                    debug!("Wrote clip {:?}", path);
                    entries.push(self.resource_entry(&record, path, &context.metadata));
                }
                Err(error) => {
                    let failure = RecordFailure {
                        index: record.index,
                        annotation_id: record.annotation_id.clone(),
                        stage: FailureStage::Exporting,
                        error,
                    };
                    warn!("{}", failure);
                    failures.push(failure);
                }
            }
        }
        entries.sort_by_key(|e| e.index);
        failures.sort_by_key(|f| f.index);

        info!(
            "Wrote {} clip(s) to {:?}, {} record(s) failed",
            entries.len(),
            output_dir,
            failures.len()
        );

        let mut report = ExportReport {
            entries,
            failures,
            ..Default::default()
        };
        self.write_manifest(&reserver, context, &mut report).await;
        report
    }

    fn resource_entry(&self, record: &AlignedRecord, path: PathBuf, metadata: &ManifestMetadata) -> ResourceEntry {
        let separator = self.options.separator.as_str();
        let tiers = metadata
            .dependent_tiers
            .iter()
            .map(|tier| {
                let text = match self.options.dependent_text {
                    DependentTextPolicy::Concatenate => TierText::Joined(record.joined_text(tier, separator)),
                    DependentTextPolicy::Separate => TierText::Separate(
                        record.dependent_texts(tier).into_iter().map(str::to_string).collect(),
                    ),
                };
                (tier.clone(), text)
            })
            .collect();

        let translation = metadata
            .translation_tier
            .as_deref()
            .map(|tier| record.joined_text(tier, separator));

        ResourceEntry {
            index: record.index,
            annotation_id: record.annotation_id.clone(),
            path,
            primary_text: record.text.clone(),
            translation,
            tiers,
            interval: record.interval,
            degenerate: record.degenerate,
        }
    }

    async fn write_manifest(&self, reserver: &FilenameReserver, context: &ExportContext, report: &mut ExportReport) {
        let metadata = &context.metadata;
        let manifest = Manifest {
            transcription_language: metadata.transcription_language.clone(),
            translation_language: metadata.translation_language.clone(),
            author: metadata.author.clone(),
            created: Utc::now(),
            source_document: metadata.source_document.clone(),
            source_media: metadata.source_media.clone(),
            primary_tier: metadata.primary_tier.clone(),
            dependent_tiers: metadata.dependent_tiers.clone(),
            words: report.entries.iter().map(ManifestEntry::from).collect(),
            failures: report.failures.iter().map(ManifestFailure::from).collect(),
        };

        let format = self.options.manifest_format;
        let (contents, failures_table) = match format {
            ManifestFormat::Json => match manifest.to_json() {
                Ok(json) => (json, None),
                Err(e) => {
                    report.manifest_error = Some(format!("cannot serialize manifest: {}", e));
                    return;
                }
            },
            ManifestFormat::Tsv => (manifest.to_tsv(&self.options.separator), manifest.failures_tsv()),
        };

        let manifest_path = reserver.reserve(&self.options.manifest_file_name, format.extension());
        match write_text(manifest_path.clone(), contents).await {
            Ok(()) => {
                info!("Wrote manifest {:?}", manifest_path);
                report.manifest_path = Some(manifest_path);
            }
            Err(e) => {
                error!("{}", e);
                report.manifest_error = Some(e.to_string());
                return;
            }
        }

        if let Some(table) = failures_table {
            let failures_path = reserver.reserve("failures", "tsv");
            match write_text(failures_path.clone(), table).await {
                Ok(()) => report.failures_path = Some(failures_path),
                Err(e) => {
                    error!("{}", e);
                    report.manifest_error = Some(e.to_string());
                }
            }
        }
    }
}

fn write_failure(record: &AlignedRecord, path: &Path, message: &str) -> RecordFailure {
    RecordFailure {
        index: record.index,
        annotation_id: record.annotation_id.clone(),
        stage: FailureStage::Exporting,
        error: RecordError::WriteFailed {
            path: path.to_path_buf(),
            message: message.to_string(),
        },
    }
}

/// Write a WAV clip through a temporary file in the target directory
fn write_clip_atomic(path: &Path, clip: &ClipBuffer) -> Result<(), RecordError> {
    let fail = |message: String| RecordError::WriteFailed {
        path: path.to_path_buf(),
        message,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| fail(e.to_string()))?;
    {
        let mut writer = WavWriter::new(BufWriter::new(temp.as_file_mut()), clip.spec)
            .map_err(|e| fail(e.to_string()))?;
        match &clip.samples {
            SampleData::Int(samples) => {
                for &sample in samples {
                    writer.write_sample(sample).map_err(|e| fail(e.to_string()))?;
                }
            }
            SampleData::Float(samples) => {
                for &sample in samples {
                    writer.write_sample(sample).map_err(|e| fail(e.to_string()))?;
                }
            }
        }
        writer.finalize().map_err(|e| fail(e.to_string()))?;
    }

    temp.persist_noclobber(path).map_err(|e| fail(e.error.to_string()))?;
    Ok(())
}

/// Write a text file atomically without replacing an existing file
async fn write_text(path: PathBuf, contents: String) -> Result<(), RecordError> {
    let target = path.clone();
    tokio::task::spawn_blocking(move || {
        let fail = |message: String| RecordError::WriteFailed {
            path: target.clone(),
            message,
        };
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| fail(e.to_string()))?;
        temp.write_all(contents.as_bytes()).map_err(|e| fail(e.to_string()))?;
        temp.flush().map_err(|e| fail(e.to_string()))?;
        temp.persist_noclobber(&target).map_err(|e| fail(e.error.to_string()))?;
        Ok(())
    })
    .await
    .unwrap_or_else(|e| {
        Err(RecordError::WriteFailed {
            path,
            message: format!("writer task failed: {}", e),
        })
    })
}
