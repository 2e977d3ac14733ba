/*!
 * Annotation document model and parser.
 *
 * - `model`: immutable document model (time slots, tiers, annotations)
 * - `parser`: ELAN XML → model
 * - `timing`: interpolation of unanchored time slots
 * - `tiers`: tier forest validation
 */

pub mod model;
pub mod parser;
pub mod tiers;
pub mod timing;

pub use model::{
    Annotation, AnnotationAnchor, AnnotationDocument, Constraint, DocumentHeader,
    DocumentOverview, Interval, LanguageDef, LinguisticType, MediaDescriptor, Tier, TierKind,
    TierSummary, TimeSlot,
};
pub use parser::parse_document;
pub use tiers::TierForest;
