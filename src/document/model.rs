/*!
 * In-memory model of a parsed ELAN annotation document.
 *
 * The model is built once by the parser and is immutable afterwards.
 * Annotations are stored by id; each tier keeps the ordered ids of its
 * annotations, sorted by resolved start time.
 */

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::errors::ResolutionError;

use super::tiers::TierForest;

/// Absolute `[start, end)` interval in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Interval {
    /// Inclusive start in ms
    pub start_ms: u64,
    /// Exclusive end in ms
    pub end_ms: u64,
}

impl Interval {
    /// Create a new interval
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Duration in ms, zero when the interval is empty or inverted
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// An interval with no positive length
    pub fn is_degenerate(&self) -> bool {
        self.end_ms <= self.start_ms
    }

    /// Whether two intervals share a non-zero stretch of time
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start_ms.max(other.start_ms) < self.end_ms.min(other.end_ms)
    }

    /// Split into `count` equal parts and return part `position`
    pub fn subdivide(&self, position: usize, count: usize) -> Interval {
        if count <= 1 {
            return *self;
        }
        let duration = self.duration_ms() as u128;
        let count = count as u128;
        let position = (position as u128).min(count - 1);
        let start = self.start_ms + (duration * position / count) as u64;
        let end = self.start_ms + (duration * (position + 1) / count) as u64;
        Interval::new(start, end)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}ms, {}ms)", self.start_ms, self.end_ms)
    }
}

/// A named point in time, possibly unanchored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlot {
    /// Slot identifier (`TIME_SLOT_ID`)
    pub id: String,
    /// Declared offset in ms, `None` for unanchored slots
    pub value_ms: Option<u64>,
}

impl TimeSlot {
    pub fn new(id: impl Into<String>, value_ms: Option<u64>) -> Self {
        Self {
            id: id.into(),
            value_ms,
        }
    }
}

/// How a tier is anchored in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TierKind {
    /// Aligned directly to time slots
    Independent,
    /// Anchored through a parent tier
    Dependent,
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierKind::Independent => write!(f, "independent"),
            TierKind::Dependent => write!(f, "dependent"),
        }
    }
}

/// Linguistic type stereotype restricting how a dependent tier relates to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Constraint {
    TimeSubdivision,
    IncludedIn,
    SymbolicSubdivision,
    SymbolicAssociation,
}

impl Constraint {
    /// Parse the `CONSTRAINTS` attribute of a linguistic type
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value {
            "Time_Subdivision" => Some(Self::TimeSubdivision),
            "Included_In" => Some(Self::IncludedIn),
            "Symbolic_Subdivision" => Some(Self::SymbolicSubdivision),
            "Symbolic_Association" => Some(Self::SymbolicAssociation),
            _ => None,
        }
    }
}

/// Declared linguistic type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinguisticType {
    pub id: String,
    pub constraint: Option<Constraint>,
    pub time_alignable: bool,
}

/// Declared document language (`LANGUAGE` element)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageDef {
    pub id: String,
    pub label: Option<String>,
}

/// Media linked from the document header
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MediaDescriptor {
    pub media_url: String,
    pub relative_media_url: Option<String>,
    pub mime_type: Option<String>,
}

/// Document header information
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentHeader {
    pub author: Option<String>,
    pub date: Option<String>,
    pub media: Vec<MediaDescriptor>,
}

/// Named, ordered channel of annotations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    pub name: String,
    pub kind: TierKind,
    pub parent: Option<String>,
    pub linguistic_type: String,
    pub constraint: Option<Constraint>,
    pub participant: Option<String>,
    pub annotator: Option<String>,
    pub language: Option<String>,
    /// Annotation ids, ordered by resolved start time
    pub annotation_ids: Vec<String>,
}

/// How an annotation is anchored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationAnchor {
    /// Directly aligned to a pair of time slots
    Aligned {
        start_slot: String,
        end_slot: String,
    },
    /// Inherits timing from a parent annotation
    Reference {
        parent_id: String,
        previous_id: Option<String>,
    },
}

/// Position of a symbolic subdivision among its siblings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subdivision {
    pub position: usize,
    pub count: usize,
}

/// A single annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub id: String,
    pub tier: String,
    pub anchor: AnnotationAnchor,
    pub value: String,
    /// Set for children of a symbolic subdivision tier
    pub subdivision: Option<Subdivision>,
}

impl Annotation {
    /// Parent annotation id for reference annotations
    pub fn parent_id(&self) -> Option<&str> {
        match &self.anchor {
            AnnotationAnchor::Reference { parent_id, .. } => Some(parent_id),
            AnnotationAnchor::Aligned { .. } => None,
        }
    }
}

/// Summary of one tier for tier selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierSummary {
    pub name: String,
    pub kind: TierKind,
    pub parent: Option<String>,
    pub linguistic_type: String,
    pub constraint: Option<Constraint>,
    pub language: Option<String>,
    pub participant: Option<String>,
    pub annotation_count: usize,
}

/// Result of the parse-and-validate entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentOverview {
    pub tiers: Vec<TierSummary>,
    pub media: Vec<MediaDescriptor>,
    pub languages: Vec<LanguageDef>,
    pub time_slot_count: usize,
    pub annotation_count: usize,
}

impl DocumentOverview {
    /// Find a tier summary by name
    pub fn tier(&self, name: &str) -> Option<&TierSummary> {
        self.tiers.iter().find(|t| t.name == name)
    }
}

/// Complete annotation document
#[derive(Debug, Clone)]
pub struct AnnotationDocument {
    pub header: DocumentHeader,
    pub(crate) time_slots: Vec<TimeSlot>,
    pub(crate) slot_offsets: HashMap<String, u64>,
    pub(crate) tiers: Vec<Tier>,
    pub(crate) tier_index: HashMap<String, usize>,
    pub(crate) forest: TierForest,
    pub(crate) annotations: HashMap<String, Annotation>,
    pub(crate) linguistic_types: Vec<LinguisticType>,
    pub(crate) languages: Vec<LanguageDef>,
}

impl AnnotationDocument {
    /// All tiers in declaration order
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Look up a tier by name
    pub fn tier(&self, name: &str) -> Option<&Tier> {
        self.tier_index.get(name).map(|&i| &self.tiers[i])
    }

    /// Tier names in declaration order
    pub fn tier_names(&self) -> Vec<&str> {
        self.tiers.iter().map(|t| t.name.as_str()).collect()
    }

    /// The tier forest (parent → children adjacency)
    pub fn forest(&self) -> &TierForest {
        &self.forest
    }

    /// Declared time slots in document order
    pub fn time_slots(&self) -> &[TimeSlot] {
        &self.time_slots
    }

    /// Resolved offset of a time slot
    pub fn slot_offset(&self, slot_id: &str) -> Option<u64> {
        self.slot_offsets.get(slot_id).copied()
    }

    pub fn linguistic_types(&self) -> &[LinguisticType] {
        &self.linguistic_types
    }

    pub fn languages(&self) -> &[LanguageDef] {
        &self.languages
    }

    /// Human readable label for a language reference, falling back to the id
    pub fn language_label(&self, lang_ref: &str) -> String {
        self.languages
            .iter()
            .find(|l| l.id == lang_ref)
            .and_then(|l| l.label.clone())
            .unwrap_or_else(|| lang_ref.to_string())
    }

    /// Look up an annotation by id
    pub fn annotation(&self, id: &str) -> Option<&Annotation> {
        self.annotations.get(id)
    }

    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    /// Annotations of a tier in tier order; empty for unknown tiers
    pub fn tier_annotations<'a>(&'a self, tier: &str) -> impl Iterator<Item = &'a Annotation> + use<'a> {
        self.tier(tier)
            .map(|t| t.annotation_ids.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |id| self.annotations.get(id))
    }

    /// Resolve the absolute interval of an annotation
    pub fn resolve_interval(&self, id: &str) -> Result<Interval, ResolutionError> {
        let mut visiting = HashSet::new();
        self.resolve_with(id, &mut visiting)
    }

    fn resolve_with<'a>(
        &'a self,
        id: &str,
        visiting: &mut HashSet<&'a str>,
    ) -> Result<Interval, ResolutionError> {
        let annotation = self
            .annotations
            .get(id)
            .ok_or_else(|| ResolutionError::UnknownAnnotation(id.to_string()))?;

        if !visiting.insert(annotation.id.as_str()) {
            return Err(ResolutionError::ReferenceCycle(annotation.id.clone()));
        }

        match &annotation.anchor {
            AnnotationAnchor::Aligned { start_slot, end_slot } => {
                let start = self.aligned_slot(annotation, start_slot)?;
                let end = self.aligned_slot(annotation, end_slot)?;
                Ok(Interval::new(start, end))
            }
            AnnotationAnchor::Reference { parent_id, .. } => {
                if !self.annotations.contains_key(parent_id) {
                    return Err(ResolutionError::MissingParentAnnotation {
                        annotation_id: annotation.id.clone(),
                        parent_id: parent_id.clone(),
                    });
                }
                let parent = self.resolve_with(parent_id, visiting)?;
                Ok(match annotation.subdivision {
                    Some(sub) => parent.subdivide(sub.position, sub.count),
                    None => parent,
                })
            }
        }
    }

    fn aligned_slot(&self, annotation: &Annotation, slot_id: &str) -> Result<u64, ResolutionError> {
        self.slot_offset(slot_id)
            .ok_or_else(|| ResolutionError::MissingTimeSlot {
                annotation_id: annotation.id.clone(),
                slot_id: slot_id.to_string(),
            })
    }

    /// Whether `ancestor_id` is reachable from `id` by following parent references
    pub fn descends_from(&self, id: &str, ancestor_id: &str) -> bool {
        let mut current = self.annotations.get(id);
        let mut steps = 0;
        while let Some(annotation) = current {
            let Some(parent_id) = annotation.parent_id() else {
                return false;
            };
            if parent_id == ancestor_id {
                return true;
            }
            steps += 1;
            if steps > self.annotations.len() {
                return false;
            }
            current = self.annotations.get(parent_id);
        }
        false
    }

    /// Tier names, kinds and counts for tier selection
    pub fn overview(&self) -> DocumentOverview {
        let tiers = self
            .tiers
            .iter()
            .map(|t| TierSummary {
                name: t.name.clone(),
                kind: t.kind,
                parent: t.parent.clone(),
                linguistic_type: t.linguistic_type.clone(),
                constraint: t.constraint,
                language: t.language.as_deref().map(|l| self.language_label(l)),
                participant: t.participant.clone(),
                annotation_count: t.annotation_ids.len(),
            })
            .collect();

        DocumentOverview {
            tiers,
            media: self.header.media.clone(),
            languages: self.languages.clone(),
            time_slot_count: self.time_slots.len(),
            annotation_count: self.annotations.len(),
        }
    }
}
