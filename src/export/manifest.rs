/*!
 * Bundle manifest.
 *
 * The JSON form follows the lexical markup layout used by language resource
 * tools: bundle-level language metadata plus a `words` list whose entries
 * point at their audio clips. The TSV form is a flat table for spreadsheets.
 */

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::{FailureStage, RecordFailure};

/// Text of one tier for one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TierText {
    /// All matches joined into one string
    Joined(String),
    /// One string per match
    Separate(Vec<String>),
}

impl TierText {
    /// Single-line rendering, used where only one field is available
    pub fn flatten(&self, separator: &str) -> String {
        match self {
            Self::Joined(text) => text.clone(),
            Self::Separate(texts) => texts.join(separator),
        }
    }
}

/// One exported clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestEntry {
    pub index: usize,
    pub annotation_id: String,
    pub transcription: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    /// Dependent tier texts keyed by tier name
    pub tiers: BTreeMap<String, TierText>,
    /// Clip file names relative to the manifest
    pub audio: Vec<String>,
    pub start_ms: u64,
    pub end_ms: u64,
    pub degenerate: bool,
}

/// One record without a clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestFailure {
    pub index: usize,
    pub annotation_id: String,
    pub stage: FailureStage,
    pub reason: String,
}

impl From<&RecordFailure> for ManifestFailure {
    fn from(failure: &RecordFailure) -> Self {
        Self {
            index: failure.index,
            annotation_id: failure.annotation_id.clone(),
            stage: failure.stage,
            reason: failure.error.to_string(),
        }
    }
}

/// The whole manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Manifest {
    pub transcription_language: String,
    pub translation_language: String,
    pub author: String,
    pub created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_media: Option<String>,
    pub primary_tier: String,
    pub dependent_tiers: Vec<String>,
    pub words: Vec<ManifestEntry>,
    pub failures: Vec<ManifestFailure>,
}

impl Manifest {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Entry table; one column per dependent tier after the primary text
    pub fn to_tsv(&self, separator: &str) -> String {
        let mut out = String::new();
        let mut header = vec![
            "file".to_string(),
            "start_ms".to_string(),
            "end_ms".to_string(),
            tsv_field(&self.primary_tier),
        ];
        header.extend(self.dependent_tiers.iter().map(|t| tsv_field(t)));
        out.push_str(&header.join("\t"));
        out.push('\n');

        for word in &self.words {
            let mut row = vec![
                tsv_field(&word.audio.join(",")),
                word.start_ms.to_string(),
                word.end_ms.to_string(),
                tsv_field(&word.transcription),
            ];
            for tier in &self.dependent_tiers {
                let text = word
                    .tiers
                    .get(tier)
                    .map(|t| t.flatten(separator))
                    .unwrap_or_default();
                row.push(tsv_field(&text));
            }
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        out
    }

    /// Failure table, `None` when every record was exported
    pub fn failures_tsv(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let mut out = String::from("index\tannotation_id\tstage\treason\n");
        for failure in &self.failures {
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\n",
                failure.index,
                tsv_field(&failure.annotation_id),
                failure.stage,
                tsv_field(&failure.reason)
            ));
        }
        Some(out)
    }
}

// Tabs and line breaks would break the row structure
fn tsv_field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}
