/*!
 * Cross-referencing of a primary tier with dependent tiers.
 */

pub mod aligner;

pub use aligner::{
    AlignedRecord, AlignmentResult, AlignmentWarning, DependentAnnotation, TierAligner,
    TierSelection,
};
