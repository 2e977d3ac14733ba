/*!
 * Tests for tier alignment against a realistic session
 */

use hermes::alignment::{TierAligner, TierSelection};
use hermes::document::{Interval, parse_document};
use hermes::errors::AlignmentError;

use crate::common;

fn session_selection() -> TierSelection {
    TierSelection::new("Transcription")
        .with_dependent("Translation")
        .with_dependent("Gloss")
}

#[test]
fn test_align_withSampleSession_shouldAttachTranslationsAndGlosses() {
    let doc = parse_document(common::sample_eaf("session.wav").as_bytes()).unwrap();

    let result = TierAligner::new().align(&doc, &session_selection()).unwrap();

    assert_eq!(result.records.len(), 2);
    assert!(result.warnings.is_empty());

    let first = &result.records[0];
    assert_eq!(first.index, 1);
    assert_eq!(first.text, "Ninna marni?");
    assert_eq!(first.interval, Interval::new(0, 1000));
    assert_eq!(first.dependent_texts("Translation"), vec!["How are you?"]);
    assert_eq!(first.dependent_texts("Gloss"), vec!["2SG.NOM", "good"]);

    let second = &result.records[1];
    assert_eq!(second.interval, Interval::new(1000, 2000));
    assert_eq!(second.dependent_texts("Translation"), vec!["I am good"]);
    assert!(second.dependent_texts("Gloss").is_empty());
}

#[test]
fn test_align_adjacentAnnotations_shouldNotShareDependents() {
    let doc = parse_document(common::sample_eaf("session.wav").as_bytes()).unwrap();

    let result = TierAligner::new().align(&doc, &session_selection()).unwrap();

    // a3 ends exactly where a2 starts and must stay with a1 only
    assert_eq!(result.records[1].dependent_texts("Translation").len(), 1);
    assert_eq!(result.records[0].joined_text("Gloss", " "), "2SG.NOM good");
}

#[test]
fn test_align_withMisspelledTier_shouldListAvailableTiers() {
    let doc = parse_document(common::sample_eaf("session.wav").as_bytes()).unwrap();

    let result = TierAligner::new().align(&doc, &TierSelection::new("Transcription").with_dependent("Translaton"));

    match result {
        Err(AlignmentError::UnknownTier { tier, available }) => {
            assert_eq!(tier, "Translaton");
            assert!(available.contains("Translation"));
            assert!(available.contains("Gloss"));
        }
        other => panic!("expected unknown tier error, got {:?}", other.map(|r| r.records.len())),
    }
}

#[test]
fn test_align_withPrimaryAlsoListedAsDependent_shouldIgnoreIt() {
    let doc = parse_document(common::sample_eaf("session.wav").as_bytes()).unwrap();
    let selection = TierSelection::new("Transcription")
        .with_dependent("Transcription")
        .with_dependent("Translation")
        .with_dependent("Translation");

    let result = TierAligner::new().align(&doc, &selection).unwrap();

    assert_eq!(result.dependent_tiers, vec!["Translation".to_string()]);
    assert_eq!(result.records[0].dependents.len(), 1);
}

#[test]
fn test_align_withDependentAsPrimary_shouldUseInheritedIntervals() {
    let doc = parse_document(common::sample_eaf("session.wav").as_bytes()).unwrap();

    let result = TierAligner::new()
        .align(&doc, &TierSelection::new("Gloss").with_dependent("Transcription"))
        .unwrap();

    assert_eq!(result.records.len(), 2);
    assert_eq!(result.records[0].interval, Interval::new(0, 500));
    assert_eq!(result.records[1].interval, Interval::new(500, 1000));
    assert_eq!(result.records[1].dependent_texts("Transcription"), vec!["Ninna marni?"]);
}
