/*!
 * Media segmenter: cuts one clip per aligned record out of decoded media.
 */

use hound::WavSpec;
use log::{debug, warn};

use crate::alignment::AlignedRecord;
use crate::errors::{FailureStage, RecordError, RecordFailure};

use super::handle::{MediaHandle, SampleData};

/// Samples of one record, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ClipBuffer {
    pub record: AlignedRecord,
    pub spec: WavSpec,
    pub samples: SampleData,
}

impl ClipBuffer {
    pub fn frames(&self) -> u64 {
        (self.samples.len() / usize::from(self.spec.channels.max(1))) as u64
    }

    /// Exact clip duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        if self.spec.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 * 1000.0 / f64::from(self.spec.sample_rate)
    }
}

/// Clips and failures of one segmentation pass, both ordered by record start
#[derive(Debug, Clone, Default)]
pub struct SegmentBatch {
    pub clips: Vec<ClipBuffer>,
    pub failures: Vec<RecordFailure>,
}

impl SegmentBatch {
    /// Every record failed because the media could not be opened
    pub fn unavailable(records: &[AlignedRecord], reason: &str) -> Self {
        let failures = records
            .iter()
            .map(|record| RecordFailure {
                index: record.index,
                annotation_id: record.annotation_id.clone(),
                stage: FailureStage::Segmenting,
                error: RecordError::MediaUnavailable(reason.to_string()),
            })
            .collect();
        Self {
            clips: Vec::new(),
            failures,
        }
    }
}

/// Cuts records out of a media handle
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaSegmenter {
    keep_degenerate: bool,
}

impl MediaSegmenter {
    pub fn new(keep_degenerate: bool) -> Self {
        Self { keep_degenerate }
    }

    /// Segment every record; failures never stop the batch
    pub fn segment_all(&self, handle: &MediaHandle, records: &[AlignedRecord]) -> SegmentBatch {
        let mut ordered: Vec<&AlignedRecord> = records.iter().collect();
        ordered.sort_by_key(|r| (r.interval.start_ms, r.index));

        let mut batch = SegmentBatch::default();
        for record in ordered {
            match self.segment(handle, record) {
                Ok(clip) => {
                    debug!(
                        "Cut record {} ({}): {} frames",
                        record.index,
                        record.interval,
                        clip.frames()
                    );
                    batch.clips.push(clip);
                }
                Err(error) => {
                    let failure = RecordFailure {
                        index: record.index,
                        annotation_id: record.annotation_id.clone(),
                        stage: FailureStage::Segmenting,
                        error,
                    };
                    warn!("{}", failure);
                    batch.failures.push(failure);
                }
            }
        }
        batch
    }

    /// Cut a single record
    pub fn segment(&self, handle: &MediaHandle, record: &AlignedRecord) -> Result<ClipBuffer, RecordError> {
        let interval = record.interval;
        let media_duration_ms = handle.duration_ms();

        if interval.end_ms > media_duration_ms || interval.start_ms > media_duration_ms {
            return Err(RecordError::TimingOutOfRange {
                end_ms: interval.end_ms.max(interval.start_ms),
                media_duration_ms,
            });
        }

        if interval.is_degenerate() {
            if !self.keep_degenerate {
                return Err(RecordError::EmptyInterval {
                    start_ms: interval.start_ms,
                    end_ms: interval.end_ms,
                });
            }
            return Ok(ClipBuffer {
                record: record.clone(),
                spec: handle.spec(),
                samples: handle.samples().slice(0..0),
            });
        }

        let rate = u128::from(handle.sample_rate());
        let start_frame = (u128::from(interval.start_ms) * rate / 1000) as u64;
        let end_frame = (u128::from(interval.end_ms) * rate).div_ceil(1000) as u64;
        let end_frame = end_frame.min(handle.frames());

        let channels = usize::from(handle.channels());
        let range = (start_frame as usize * channels)..(end_frame as usize * channels);

        Ok(ClipBuffer {
            record: record.clone(),
            spec: handle.spec(),
            samples: handle.samples().slice(range),
        })
    }
}
