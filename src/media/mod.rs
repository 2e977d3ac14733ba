/*!
 * Source media access.
 *
 * - `handle`: decoding media into memory (WAV directly, anything else via ffmpeg)
 * - `segmenter`: cutting per-record clips at annotation boundaries
 */

pub mod handle;
pub mod segmenter;

pub use handle::{FfmpegDecoder, MediaDecoder, MediaHandle, SampleData, WavDecoder};
pub use segmenter::{ClipBuffer, MediaSegmenter, SegmentBatch};
