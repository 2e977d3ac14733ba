/*!
 * ELAN (`.eaf`) annotation document parser.
 *
 * Streams the XML with quick-xml and collects time slots, tiers,
 * linguistic types and annotations into a builder, then validates the
 * whole document in one pass: tier forest, time slot resolution and
 * annotation ordering. Parsing is a pure transform from bytes to model.
 */

use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::{HashMap, HashSet};

use crate::errors::DocumentError;

use super::model::{
    Annotation, AnnotationAnchor, AnnotationDocument, Constraint, DocumentHeader, LanguageDef,
    LinguisticType, MediaDescriptor, Subdivision, Tier, TierKind, TimeSlot,
};
use super::tiers::TierForest;
use super::timing::resolve_time_slots;

const ROOT_ELEMENT: &[u8] = b"ANNOTATION_DOCUMENT";
const SUPPORTED_TIME_UNITS: &str = "milliseconds";

/// Parse raw annotation document bytes into the document model
pub fn parse_document(bytes: &[u8]) -> Result<AnnotationDocument, DocumentError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut builder = DocumentBuilder::default();
    let mut state = ParserState::default();
    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            DocumentError::malformed(reader.error_position() as u64, format!("invalid XML: {}", e))
        })?;

        match event {
            Event::Start(ref e) => handle_element(e, false, position, &mut state, &mut builder)?,
            Event::Empty(ref e) => handle_element(e, true, position, &mut state, &mut builder)?,
            Event::Text(ref t) if state.in_value => {
                let text = t.unescape().map_err(|e| {
                    DocumentError::malformed(position, format!("invalid annotation text: {}", e))
                })?;
                state.value.push_str(&text);
            }
            Event::CData(ref c) if state.in_value => {
                state.value.push_str(&String::from_utf8_lossy(c.as_ref()));
            }
            Event::End(ref e) => handle_end(e.name().as_ref(), &mut state, &mut builder)?,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !state.seen_root {
        return Err(DocumentError::malformed(0, "missing ANNOTATION_DOCUMENT root element"));
    }

    builder.finish()
}

#[derive(Default)]
struct ParserState {
    seen_root: bool,
    current_tier: Option<usize>,
    pending: Option<PendingAnnotation>,
    in_value: bool,
    value: String,
}

struct PendingAnnotation {
    id: String,
    anchor: AnnotationAnchor,
    position: u64,
}

#[derive(Default)]
struct DocumentBuilder {
    header: DocumentHeader,
    time_slots: Vec<TimeSlot>,
    slot_ids: HashSet<String>,
    tiers: Vec<Tier>,
    tier_index: HashMap<String, usize>,
    annotations: Vec<(Annotation, u64)>,
    annotation_ids: HashSet<String>,
    linguistic_types: Vec<LinguisticType>,
    languages: Vec<LanguageDef>,
}

/// Attribute map of one element
struct Attributes {
    values: HashMap<String, String>,
    element: String,
    position: u64,
}

impl Attributes {
    fn read(e: &BytesStart, position: u64) -> Result<Self, DocumentError> {
        let element = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut values = HashMap::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| {
                DocumentError::malformed(position, format!("invalid attribute on <{}>: {}", element, err))
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| {
                    DocumentError::malformed(position, format!("invalid value for {}: {}", key, err))
                })?
                .into_owned();
            values.insert(key, value);
        }
        Ok(Self {
            values,
            element,
            position,
        })
    }

    fn optional(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, DocumentError> {
        self.optional(key).ok_or_else(|| {
            DocumentError::malformed(
                self.position,
                format!("<{}> is missing required attribute {}", self.element, key),
            )
        })
    }
}

fn handle_element(
    e: &BytesStart,
    is_empty: bool,
    position: u64,
    state: &mut ParserState,
    builder: &mut DocumentBuilder,
) -> Result<(), DocumentError> {
    let name = e.name();
    let name = name.as_ref();

    if !state.seen_root {
        if name != ROOT_ELEMENT {
            return Err(DocumentError::malformed(
                position,
                format!(
                    "expected ANNOTATION_DOCUMENT root element, found <{}>",
                    String::from_utf8_lossy(name)
                ),
            ));
        }
        state.seen_root = true;
        let attrs = Attributes::read(e, position)?;
        builder.header.author = attrs.optional("AUTHOR");
        builder.header.date = attrs.optional("DATE");
        return Ok(());
    }

    match name {
        b"HEADER" => {
            let attrs = Attributes::read(e, position)?;
            if let Some(units) = attrs.optional("TIME_UNITS") {
                if units != SUPPORTED_TIME_UNITS {
                    return Err(DocumentError::malformed(
                        position,
                        format!("unsupported TIME_UNITS '{}'", units),
                    ));
                }
            }
        }
        b"MEDIA_DESCRIPTOR" => {
            let attrs = Attributes::read(e, position)?;
            builder.header.media.push(MediaDescriptor {
                media_url: attrs.optional("MEDIA_URL").unwrap_or_default(),
                relative_media_url: attrs.optional("RELATIVE_MEDIA_URL"),
                mime_type: attrs.optional("MIME_TYPE"),
            });
        }
        b"TIME_SLOT" => {
            let attrs = Attributes::read(e, position)?;
            builder.add_time_slot(&attrs)?;
        }
        b"TIER" => {
            let attrs = Attributes::read(e, position)?;
            let index = builder.add_tier(&attrs)?;
            state.current_tier = if is_empty { None } else { Some(index) };
        }
        b"ALIGNABLE_ANNOTATION" | b"REF_ANNOTATION" => {
            if state.current_tier.is_none() {
                return Err(DocumentError::malformed(position, "annotation outside of a tier"));
            }
            let attrs = Attributes::read(e, position)?;
            let anchor = if name == b"ALIGNABLE_ANNOTATION" {
                AnnotationAnchor::Aligned {
                    start_slot: attrs.required("TIME_SLOT_REF1")?,
                    end_slot: attrs.required("TIME_SLOT_REF2")?,
                }
            } else {
                AnnotationAnchor::Reference {
                    parent_id: attrs.required("ANNOTATION_REF")?,
                    previous_id: attrs.optional("PREVIOUS_ANNOTATION"),
                }
            };
            state.pending = Some(PendingAnnotation {
                id: attrs.required("ANNOTATION_ID")?,
                anchor,
                position,
            });
            state.value.clear();
            if is_empty {
                finish_annotation(state, builder)?;
            }
        }
        b"ANNOTATION_VALUE" => {
            if !is_empty {
                state.in_value = true;
                state.value.clear();
            }
        }
        b"LINGUISTIC_TYPE" => {
            let attrs = Attributes::read(e, position)?;
            builder.linguistic_types.push(LinguisticType {
                id: attrs.required("LINGUISTIC_TYPE_ID")?,
                constraint: attrs.optional("CONSTRAINTS").and_then(|c| Constraint::from_attribute(&c)),
                time_alignable: attrs
                    .optional("TIME_ALIGNABLE")
                    .map(|v| v.eq_ignore_ascii_case("true"))
                    .unwrap_or(true),
            });
        }
        b"LANGUAGE" => {
            let attrs = Attributes::read(e, position)?;
            builder.languages.push(LanguageDef {
                id: attrs.required("LANG_ID")?,
                label: attrs.optional("LANG_LABEL"),
            });
        }
        _ => {}
    }

    Ok(())
}

fn handle_end(
    name: &[u8],
    state: &mut ParserState,
    builder: &mut DocumentBuilder,
) -> Result<(), DocumentError> {
    match name {
        b"ANNOTATION_VALUE" => state.in_value = false,
        b"ALIGNABLE_ANNOTATION" | b"REF_ANNOTATION" => finish_annotation(state, builder)?,
        b"TIER" => state.current_tier = None,
        _ => {}
    }
    Ok(())
}

fn finish_annotation(
    state: &mut ParserState,
    builder: &mut DocumentBuilder,
) -> Result<(), DocumentError> {
    let (Some(pending), Some(tier_index)) = (state.pending.take(), state.current_tier) else {
        return Ok(());
    };
    state.in_value = false;

    if !builder.annotation_ids.insert(pending.id.clone()) {
        return Err(DocumentError::malformed(
            pending.position,
            format!("duplicate ANNOTATION_ID '{}'", pending.id),
        ));
    }

    let tier = &mut builder.tiers[tier_index];
    tier.annotation_ids.push(pending.id.clone());
    builder.annotations.push((
        Annotation {
            id: pending.id,
            tier: tier.name.clone(),
            anchor: pending.anchor,
            value: state.value.trim().to_string(),
            subdivision: None,
        },
        pending.position,
    ));
    state.value.clear();
    Ok(())
}

impl DocumentBuilder {
    fn add_time_slot(&mut self, attrs: &Attributes) -> Result<(), DocumentError> {
        let id = attrs.required("TIME_SLOT_ID")?;
        if !self.slot_ids.insert(id.clone()) {
            return Err(DocumentError::malformed(
                attrs.position,
                format!("duplicate TIME_SLOT_ID '{}'", id),
            ));
        }
        let value_ms = match attrs.optional("TIME_VALUE") {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                DocumentError::malformed(
                    attrs.position,
                    format!("time slot '{}' has invalid TIME_VALUE '{}'", id, raw),
                )
            })?),
            None => None,
        };
        self.time_slots.push(TimeSlot::new(id, value_ms));
        Ok(())
    }

    fn add_tier(&mut self, attrs: &Attributes) -> Result<usize, DocumentError> {
        let name = attrs.required("TIER_ID")?;
        if self.tier_index.contains_key(&name) {
            return Err(DocumentError::malformed(
                attrs.position,
                format!("duplicate TIER_ID '{}'", name),
            ));
        }
        let parent = attrs.optional("PARENT_REF");
        let index = self.tiers.len();
        self.tier_index.insert(name.clone(), index);
        self.tiers.push(Tier {
            name,
            kind: if parent.is_some() {
                TierKind::Dependent
            } else {
                TierKind::Independent
            },
            parent,
            linguistic_type: attrs.optional("LINGUISTIC_TYPE_REF").unwrap_or_default(),
            constraint: None,
            participant: attrs.optional("PARTICIPANT"),
            annotator: attrs.optional("ANNOTATOR"),
            language: attrs.optional("LANG_REF"),
            annotation_ids: Vec::new(),
        });
        Ok(index)
    }

    fn finish(mut self) -> Result<AnnotationDocument, DocumentError> {
        let edges: Vec<(String, Option<String>)> = self
            .tiers
            .iter()
            .map(|t| (t.name.clone(), t.parent.clone()))
            .collect();
        let forest = TierForest::build(&edges)?;

        for tier in &mut self.tiers {
            tier.constraint = self
                .linguistic_types
                .iter()
                .find(|lt| lt.id == tier.linguistic_type)
                .and_then(|lt| lt.constraint);
        }

        let slot_offsets = self.resolve_slots()?;
        self.assign_subdivisions();
        self.check_aligned_order(&slot_offsets)?;

        let mut annotations = HashMap::with_capacity(self.annotations.len());
        for (annotation, _) in self.annotations {
            annotations.insert(annotation.id.clone(), annotation);
        }

        let mut document = AnnotationDocument {
            header: self.header,
            time_slots: self.time_slots,
            slot_offsets,
            tiers: self.tiers,
            tier_index: self.tier_index,
            forest,
            annotations,
            linguistic_types: self.linguistic_types,
            languages: self.languages,
        };
        sort_tiers_by_start(&mut document);

        debug!(
            "Parsed document: {} tiers, {} time slots, {} annotations",
            document.tiers.len(),
            document.time_slots.len(),
            document.annotations.len()
        );
        Ok(document)
    }

    fn resolve_slots(&self) -> Result<HashMap<String, u64>, DocumentError> {
        let resolved = resolve_time_slots(&self.time_slots);
        let mut offsets = HashMap::with_capacity(self.time_slots.len());
        for (slot, offset) in self.time_slots.iter().zip(resolved) {
            if let Some(offset) = offset {
                offsets.insert(slot.id.clone(), offset);
            }
        }

        // Declared but unresolved slots only matter when an annotation uses them
        for (annotation, _) in &self.annotations {
            if let AnnotationAnchor::Aligned { start_slot, end_slot } = &annotation.anchor {
                for slot in [start_slot, end_slot] {
                    if self.slot_ids.contains(slot) && !offsets.contains_key(slot) {
                        return Err(DocumentError::UnresolvableTiming {
                            slot_id: slot.clone(),
                        });
                    }
                }
            }
        }
        Ok(offsets)
    }

    fn check_aligned_order(&self, offsets: &HashMap<String, u64>) -> Result<(), DocumentError> {
        for (annotation, position) in &self.annotations {
            if let AnnotationAnchor::Aligned { start_slot, end_slot } = &annotation.anchor {
                if let (Some(start), Some(end)) = (offsets.get(start_slot), offsets.get(end_slot)) {
                    if start > end {
                        return Err(DocumentError::malformed(
                            *position,
                            format!(
                                "annotation '{}' on tier '{}' starts at {}ms after it ends at {}ms",
                                annotation.id, annotation.tier, start, end
                            ),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Order children of each parent on symbolic subdivision tiers and record their positions
    fn assign_subdivisions(&mut self) {
        let subdivided: HashSet<String> = self
            .tiers
            .iter()
            .filter(|t| t.constraint == Some(Constraint::SymbolicSubdivision))
            .map(|t| t.name.clone())
            .collect();
        if subdivided.is_empty() {
            return;
        }

        // (tier, parent) -> indices into self.annotations in document order
        let mut groups: HashMap<(String, String), Vec<usize>> = HashMap::new();
        let mut group_order: Vec<(String, String)> = Vec::new();
        for (i, (annotation, _)) in self.annotations.iter().enumerate() {
            if !subdivided.contains(&annotation.tier) {
                continue;
            }
            if let Some(parent) = annotation.parent_id() {
                let key = (annotation.tier.clone(), parent.to_string());
                let entry = groups.entry(key.clone()).or_default();
                if entry.is_empty() {
                    group_order.push(key);
                }
                entry.push(i);
            }
        }

        for key in group_order {
            let members = &groups[&key];
            let ordered = chain_order(members, &self.annotations);
            let count = ordered.len();
            for (position, index) in ordered.into_iter().enumerate() {
                self.annotations[index].0.subdivision = Some(Subdivision { position, count });
            }
        }
    }
}

/// Follow `PREVIOUS_ANNOTATION` links; anything not on the chain keeps document order
fn chain_order(members: &[usize], annotations: &[(Annotation, u64)]) -> Vec<usize> {
    let ids: HashMap<&str, usize> = members
        .iter()
        .map(|&i| (annotations[i].0.id.as_str(), i))
        .collect();
    let mut successor: HashMap<usize, usize> = HashMap::new();
    let mut has_predecessor: HashSet<usize> = HashSet::new();
    for &i in members {
        if let AnnotationAnchor::Reference {
            previous_id: Some(previous),
            ..
        } = &annotations[i].0.anchor
        {
            if let Some(&p) = ids.get(previous.as_str()) {
                if p != i && !successor.contains_key(&p) {
                    successor.insert(p, i);
                    has_predecessor.insert(i);
                }
            }
        }
    }

    let mut ordered = Vec::with_capacity(members.len());
    let mut placed = HashSet::new();
    for &start in members.iter().filter(|i| !has_predecessor.contains(i)) {
        let mut current = Some(start);
        while let Some(i) = current {
            if !placed.insert(i) {
                break;
            }
            ordered.push(i);
            current = successor.get(&i).copied();
        }
    }
    for &i in members {
        if placed.insert(i) {
            ordered.push(i);
        }
    }
    ordered
}

/// Stable sort of every tier by resolved start; unresolvable annotations keep their place
fn sort_tiers_by_start(document: &mut AnnotationDocument) {
    let mut sorted = Vec::with_capacity(document.tiers.len());
    for tier in &document.tiers {
        let mut carried = 0u64;
        let mut keyed: Vec<(u64, String)> = Vec::with_capacity(tier.annotation_ids.len());
        for id in &tier.annotation_ids {
            match document.resolve_interval(id) {
                Ok(interval) => carried = interval.start_ms,
                Err(e) => warn!("Annotation {} on tier {} cannot be timed: {}", id, tier.name, e),
            }
            keyed.push((carried, id.clone()));
        }
        keyed.sort_by_key(|(start, _)| *start);
        sorted.push(keyed.into_iter().map(|(_, id)| id).collect::<Vec<_>>());
    }
    for (tier, ids) in document.tiers.iter_mut().zip(sorted) {
        tier.annotation_ids = ids;
    }
}
