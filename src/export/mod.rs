/*!
 * Resource bundle export.
 *
 * - `naming`: clip filenames and collision-free reservation
 * - `manifest`: JSON and TSV manifest layouts
 * - `exporter`: concurrent atomic clip writing and manifest emission
 */

pub mod exporter;
pub mod manifest;
pub mod naming;

pub use exporter::{
    ExportContext, ExportOptions, ExportReport, ManifestMetadata, ResourceEntry, ResourceExporter,
};
pub use manifest::{Manifest, ManifestEntry, ManifestFailure, TierText};
pub use naming::{FilenameReserver, NamingOptions, clip_stem, sanitize_excerpt};
