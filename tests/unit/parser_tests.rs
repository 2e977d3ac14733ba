/*!
 * Tests for annotation document parsing
 */

use hermes::document::{AnnotationAnchor, Interval, TierKind, parse_document};
use hermes::errors::{DocumentError, ResolutionError};

use crate::common;

fn wrap(time_order: &str, tiers: &str) -> String {
    format!(
        r#"<ANNOTATION_DOCUMENT AUTHOR="" DATE="2024-01-01">
<HEADER TIME_UNITS="milliseconds"/>
<TIME_ORDER>{}</TIME_ORDER>
{}
<LINGUISTIC_TYPE LINGUISTIC_TYPE_ID="lt"/>
<LINGUISTIC_TYPE LINGUISTIC_TYPE_ID="sub" CONSTRAINTS="Symbolic_Subdivision" TIME_ALIGNABLE="false"/>
</ANNOTATION_DOCUMENT>"#,
        time_order, tiers
    )
}

#[test]
fn test_parse_withSampleSession_shouldExposeTiersInDocumentOrder() {
    let doc = parse_document(common::sample_eaf("session.wav").as_bytes()).unwrap();

    assert_eq!(doc.tier_names(), vec!["Transcription", "Translation", "Gloss"]);
    assert_eq!(doc.tier("Gloss").unwrap().kind, TierKind::Dependent);
    assert_eq!(doc.header.author.as_deref(), Some("Field Team"));
    assert_eq!(doc.language_label("eng"), "English (eng)");
    assert_eq!(doc.annotation_count(), 6);
}

#[test]
fn test_parse_withSubdivision_shouldSplitParentEvenly() {
    let doc = parse_document(common::sample_eaf("session.wav").as_bytes()).unwrap();

    assert_eq!(doc.resolve_interval("a5").unwrap(), Interval::new(0, 500));
    assert_eq!(doc.resolve_interval("a6").unwrap(), Interval::new(500, 1000));
}

#[test]
fn test_parse_withUnanchoredSlots_shouldInterpolateLinearly() {
    let xml = wrap(
        r#"<TIME_SLOT TIME_SLOT_ID="ts1" TIME_VALUE="0"/>
           <TIME_SLOT TIME_SLOT_ID="ts2"/>
           <TIME_SLOT TIME_SLOT_ID="ts3"/>
           <TIME_SLOT TIME_SLOT_ID="ts4" TIME_VALUE="3000"/>"#,
        r#"<TIER TIER_ID="T" LINGUISTIC_TYPE_REF="lt">
            <ANNOTATION><ALIGNABLE_ANNOTATION ANNOTATION_ID="a1" TIME_SLOT_REF1="ts1" TIME_SLOT_REF2="ts2"><ANNOTATION_VALUE>one</ANNOTATION_VALUE></ALIGNABLE_ANNOTATION></ANNOTATION>
            <ANNOTATION><ALIGNABLE_ANNOTATION ANNOTATION_ID="a2" TIME_SLOT_REF1="ts2" TIME_SLOT_REF2="ts3"><ANNOTATION_VALUE>two</ANNOTATION_VALUE></ALIGNABLE_ANNOTATION></ANNOTATION>
            <ANNOTATION><ALIGNABLE_ANNOTATION ANNOTATION_ID="a3" TIME_SLOT_REF1="ts3" TIME_SLOT_REF2="ts4"><ANNOTATION_VALUE>three</ANNOTATION_VALUE></ALIGNABLE_ANNOTATION></ANNOTATION>
        </TIER>"#,
    );

    let doc = parse_document(xml.as_bytes()).unwrap();

    assert_eq!(doc.resolve_interval("a1").unwrap(), Interval::new(0, 1000));
    assert_eq!(doc.resolve_interval("a2").unwrap(), Interval::new(1000, 2000));
    assert_eq!(doc.resolve_interval("a3").unwrap(), Interval::new(2000, 3000));
}

#[test]
fn test_parse_withNoAnchoredSlots_shouldFailUnresolvableTiming() {
    let xml = wrap(
        r#"<TIME_SLOT TIME_SLOT_ID="ts1"/><TIME_SLOT TIME_SLOT_ID="ts2"/>"#,
        r#"<TIER TIER_ID="T" LINGUISTIC_TYPE_REF="lt">
            <ANNOTATION><ALIGNABLE_ANNOTATION ANNOTATION_ID="a1" TIME_SLOT_REF1="ts1" TIME_SLOT_REF2="ts2"><ANNOTATION_VALUE>x</ANNOTATION_VALUE></ALIGNABLE_ANNOTATION></ANNOTATION>
        </TIER>"#,
    );

    let result = parse_document(xml.as_bytes());

    assert!(matches!(result, Err(DocumentError::UnresolvableTiming { .. })));
}

#[test]
fn test_parse_withUnknownParentTier_shouldFail() {
    let xml = wrap(
        r#"<TIME_SLOT TIME_SLOT_ID="ts1" TIME_VALUE="0"/>"#,
        r#"<TIER TIER_ID="Child" PARENT_REF="Ghost" LINGUISTIC_TYPE_REF="lt"/>"#,
    );

    let result = parse_document(xml.as_bytes());

    assert_eq!(
        result.err(),
        Some(DocumentError::UnknownParentTier {
            tier: "Child".to_string(),
            parent: "Ghost".to_string()
        })
    );
}

#[test]
fn test_parse_withTierCycle_shouldBeMalformed() {
    let xml = wrap(
        r#"<TIME_SLOT TIME_SLOT_ID="ts1" TIME_VALUE="0"/>"#,
        r#"<TIER TIER_ID="A" PARENT_REF="B" LINGUISTIC_TYPE_REF="lt"/>
           <TIER TIER_ID="B" PARENT_REF="A" LINGUISTIC_TYPE_REF="lt"/>"#,
    );

    let result = parse_document(xml.as_bytes());

    assert!(matches!(result, Err(DocumentError::MalformedDocument { .. })));
}

#[test]
fn test_parse_withDanglingParentAnnotation_shouldFailOnlyThatAnnotation() {
    let xml = wrap(
        r#"<TIME_SLOT TIME_SLOT_ID="ts1" TIME_VALUE="0"/><TIME_SLOT TIME_SLOT_ID="ts2" TIME_VALUE="900"/>"#,
        r#"<TIER TIER_ID="T" LINGUISTIC_TYPE_REF="lt">
            <ANNOTATION><ALIGNABLE_ANNOTATION ANNOTATION_ID="a1" TIME_SLOT_REF1="ts1" TIME_SLOT_REF2="ts2"><ANNOTATION_VALUE>x</ANNOTATION_VALUE></ALIGNABLE_ANNOTATION></ANNOTATION>
        </TIER>
        <TIER TIER_ID="D" PARENT_REF="T" LINGUISTIC_TYPE_REF="lt">
            <ANNOTATION><REF_ANNOTATION ANNOTATION_ID="r1" ANNOTATION_REF="a1"><ANNOTATION_VALUE>ok</ANNOTATION_VALUE></REF_ANNOTATION></ANNOTATION>
            <ANNOTATION><REF_ANNOTATION ANNOTATION_ID="r2" ANNOTATION_REF="missing"><ANNOTATION_VALUE>lost</ANNOTATION_VALUE></REF_ANNOTATION></ANNOTATION>
        </TIER>"#,
    );

    let doc = parse_document(xml.as_bytes()).unwrap();

    assert_eq!(doc.resolve_interval("r1").unwrap(), Interval::new(0, 900));
    assert!(matches!(
        doc.resolve_interval("r2"),
        Err(ResolutionError::MissingParentAnnotation { .. })
    ));
    assert!(matches!(
        doc.annotation("r2").unwrap().anchor,
        AnnotationAnchor::Reference { .. }
    ));
}

#[test]
fn test_parse_withNonMillisecondUnits_shouldBeMalformed() {
    let xml = r#"<ANNOTATION_DOCUMENT><HEADER TIME_UNITS="NTSC-frames"/></ANNOTATION_DOCUMENT>"#;

    assert!(matches!(
        parse_document(xml.as_bytes()),
        Err(DocumentError::MalformedDocument { .. })
    ));
}

#[test]
fn test_parse_withMalformedXml_shouldReportPosition() {
    let xml = common::sample_eaf("session.wav").replace("</TIER>", "");

    match parse_document(xml.as_bytes()) {
        Err(DocumentError::MalformedDocument { position, .. }) => assert!(position > 0),
        other => panic!("expected malformed document, got {:?}", other.map(|d| d.tier_names().len())),
    }
}

#[test]
fn test_overview_shouldListTiersWithCountsAndLanguages() {
    let doc = parse_document(common::sample_eaf("session.wav").as_bytes()).unwrap();

    let overview = doc.overview();

    let translation = overview.tier("Translation").unwrap();
    assert_eq!(translation.annotation_count, 2);
    assert_eq!(translation.parent.as_deref(), Some("Transcription"));
    assert_eq!(translation.language.as_deref(), Some("English (eng)"));
    assert_eq!(overview.time_slot_count, 3);
    assert_eq!(overview.media[0].relative_media_url.as_deref(), Some("./session.wav"));
}
