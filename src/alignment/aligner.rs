/*!
 * Tier aligner.
 *
 * Walks the primary tier in order and, for every selected dependent tier,
 * attaches the annotations whose interval overlaps the primary interval.
 * Records that cannot be timed are excluded with a warning; unknown tiers
 * abort the alignment.
 */

use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::document::{Annotation, AnnotationDocument, Interval};
use crate::errors::{AlignmentError, ResolutionError};

/// Primary tier plus the dependent tiers to cross-reference
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TierSelection {
    /// Tier defining the segmentation boundaries
    pub primary: String,
    /// Tiers whose annotations are attached to each primary record
    pub dependents: Vec<String>,
}

impl TierSelection {
    /// Select a primary tier without dependents
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            dependents: Vec::new(),
        }
    }

    /// Add a dependent tier
    pub fn with_dependent(mut self, tier: impl Into<String>) -> Self {
        self.dependents.push(tier.into());
        self
    }

    /// Dependent tiers without duplicates or the primary tier, in selection order
    pub fn normalized_dependents(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.dependents.len());
        for tier in &self.dependents {
            if tier != &self.primary && !out.contains(tier) {
                out.push(tier.clone());
            }
        }
        out
    }
}

/// A dependent annotation attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependentAnnotation {
    pub annotation_id: String,
    pub text: String,
    pub interval: Interval,
}

/// One primary annotation with its matched dependent annotations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRecord {
    /// 1-based position of the annotation within the primary tier
    pub index: usize,
    pub annotation_id: String,
    pub text: String,
    pub interval: Interval,
    /// Zero or negative length interval
    pub degenerate: bool,
    /// Matches per dependent tier, ordered by their own start time
    pub dependents: BTreeMap<String, Vec<DependentAnnotation>>,
}

impl AlignedRecord {
    /// Texts of the matches on a dependent tier
    pub fn dependent_texts(&self, tier: &str) -> Vec<&str> {
        self.dependents
            .get(tier)
            .map(|matches| matches.iter().map(|m| m.text.as_str()).collect())
            .unwrap_or_default()
    }

    /// Non-empty texts of a dependent tier joined with `separator`
    pub fn joined_text(&self, tier: &str, separator: &str) -> String {
        self.dependent_texts(tier)
            .into_iter()
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// A primary or dependent annotation skipped because it could not be timed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentWarning {
    pub tier: String,
    pub annotation_id: String,
    pub reason: ResolutionError,
}

impl fmt::Display for AlignmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Skipped annotation {} on tier {}: {}",
            self.annotation_id, self.tier, self.reason
        )
    }
}

/// Output of the aligner
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlignmentResult {
    pub primary_tier: String,
    pub dependent_tiers: Vec<String>,
    pub records: Vec<AlignedRecord>,
    pub warnings: Vec<AlignmentWarning>,
}

impl AlignmentResult {
    pub fn degenerate_count(&self) -> usize {
        self.records.iter().filter(|r| r.degenerate).count()
    }
}

/// Aligns a primary tier with dependent tiers
#[derive(Debug, Clone, Copy, Default)]
pub struct TierAligner;

struct TimedAnnotation<'a> {
    annotation: &'a Annotation,
    interval: Interval,
}

impl TierAligner {
    pub fn new() -> Self {
        Self
    }

    /// Align the selected tiers of a document
    pub fn align(
        &self,
        document: &AnnotationDocument,
        selection: &TierSelection,
    ) -> Result<AlignmentResult, AlignmentError> {
        let dependent_tiers = selection.normalized_dependents();
        for tier in std::iter::once(&selection.primary).chain(dependent_tiers.iter()) {
            if document.tier(tier).is_none() {
                return Err(AlignmentError::UnknownTier {
                    tier: tier.clone(),
                    available: document.tier_names().join(", "),
                });
            }
        }

        let mut warnings = Vec::new();

        let timed_dependents: Vec<(&String, Vec<TimedAnnotation>)> = dependent_tiers
            .iter()
            .map(|tier| (tier, timed_annotations(document, tier, &mut warnings)))
            .collect();

        let mut records = Vec::new();
        for (position, annotation) in document.tier_annotations(&selection.primary).enumerate() {
            let interval = match document.resolve_interval(&annotation.id) {
                Ok(interval) => interval,
                Err(reason) => {
                    let warning = AlignmentWarning {
                        tier: selection.primary.clone(),
                        annotation_id: annotation.id.clone(),
                        reason,
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                    continue;
                }
            };

            let mut dependents = BTreeMap::new();
            for (tier, candidates) in &timed_dependents {
                let matches = candidates
                    .iter()
                    .take_while(|c| c.interval.start_ms <= interval.end_ms)
                    .filter(|c| {
                        c.interval.overlaps(&interval)
                            || document.descends_from(&c.annotation.id, &annotation.id)
                    })
                    .map(|c| DependentAnnotation {
                        annotation_id: c.annotation.id.clone(),
                        text: c.annotation.value.clone(),
                        interval: c.interval,
                    })
                    .collect::<Vec<_>>();
                dependents.insert((*tier).clone(), matches);
            }

            records.push(AlignedRecord {
                index: position + 1,
                annotation_id: annotation.id.clone(),
                text: annotation.value.clone(),
                interval,
                degenerate: interval.is_degenerate(),
                dependents,
            });
        }

        debug!(
            "Aligned {} records on tier {} with {} dependent tier(s), {} warning(s)",
            records.len(),
            selection.primary,
            dependent_tiers.len(),
            warnings.len()
        );

        Ok(AlignmentResult {
            primary_tier: selection.primary.clone(),
            dependent_tiers,
            records,
            warnings,
        })
    }
}

/// Resolve all annotations of a tier, sorted by start; failures become warnings
fn timed_annotations<'a>(
    document: &'a AnnotationDocument,
    tier: &str,
    warnings: &mut Vec<AlignmentWarning>,
) -> Vec<TimedAnnotation<'a>> {
    let mut timed = Vec::new();
    for annotation in document.tier_annotations(tier) {
        match document.resolve_interval(&annotation.id) {
            Ok(interval) => timed.push(TimedAnnotation {
                annotation,
                interval,
            }),
            Err(reason) => {
                let warning = AlignmentWarning {
                    tier: tier.to_string(),
                    annotation_id: annotation.id.clone(),
                    reason,
                };
                warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }
    timed.sort_by_key(|t| t.interval.start_ms);
    timed
}
