/*!
 * Source media decoding.
 *
 * WAV files are decoded directly with `hound`. Any other container is first
 * transcoded to 16-bit PCM WAV by ffmpeg into a temporary directory, then
 * decoded the same way. The decoded samples stay in memory for the whole
 * batch and are released when the handle is dropped.
 */

use async_trait::async_trait;
use hound::{SampleFormat, WavReader, WavSpec};
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::SegmentConfig;
use crate::errors::MediaError;

/// Interleaved decoded samples
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    /// Integer PCM, any bit depth up to 32
    Int(Vec<i32>),
    /// IEEE float PCM
    Float(Vec<f32>),
}

impl SampleData {
    /// Number of interleaved samples
    pub fn len(&self) -> usize {
        match self {
            Self::Int(samples) => samples.len(),
            Self::Float(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out the samples in `range`
    pub fn slice(&self, range: std::ops::Range<usize>) -> SampleData {
        match self {
            Self::Int(samples) => Self::Int(samples[range].to_vec()),
            Self::Float(samples) => Self::Float(samples[range].to_vec()),
        }
    }
}

/// Decoded source media
#[derive(Debug)]
pub struct MediaHandle {
    path: PathBuf,
    spec: WavSpec,
    samples: SampleData,
}

impl MediaHandle {
    /// Build a handle from already decoded samples
    pub fn from_samples(path: impl Into<PathBuf>, spec: WavSpec, samples: SampleData) -> Self {
        Self {
            path: path.into(),
            spec,
            samples,
        }
    }

    /// Open and decode a media file, choosing the decoder from its extension
    pub async fn open(path: &Path, config: &SegmentConfig) -> Result<Self, MediaError> {
        if !path.exists() {
            return Err(MediaError::NotFound(path.to_path_buf()));
        }

        let decoder: Box<dyn MediaDecoder> = if WavDecoder.accepts(path) {
            Box::new(WavDecoder)
        } else {
            Box::new(FfmpegDecoder::new(config.transcode_sample_rate, config.ffmpeg_timeout_secs))
        };
        debug!("Decoding {:?} with the {} decoder", path, decoder.name());
        let handle = decoder.decode(path).await?;

        info!(
            "Opened media {:?}: {} Hz, {} channel(s), {} ms",
            handle.path(),
            handle.sample_rate(),
            handle.channels(),
            handle.duration_ms()
        );
        Ok(handle)
    }

    /// Path of the original media file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.spec.channels
    }

    pub fn samples(&self) -> &SampleData {
        &self.samples
    }

    /// Number of frames (one sample per channel)
    pub fn frames(&self) -> u64 {
        (self.samples.len() / usize::from(self.spec.channels.max(1))) as u64
    }

    /// Duration in whole milliseconds, rounded down
    pub fn duration_ms(&self) -> u64 {
        if self.spec.sample_rate == 0 {
            return 0;
        }
        (u128::from(self.frames()) * 1000 / u128::from(self.spec.sample_rate)) as u64
    }
}

/// Decodes a media file into a [`MediaHandle`]
#[async_trait]
pub trait MediaDecoder: Send + Sync {
    /// Short decoder name for logs
    fn name(&self) -> &'static str;

    /// Whether this decoder can read the file directly
    fn accepts(&self, path: &Path) -> bool;

    /// Decode the whole file
    async fn decode(&self, path: &Path) -> Result<MediaHandle, MediaError>;
}

/// Reads WAV files with hound
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

#[async_trait]
impl MediaDecoder for WavDecoder {
    fn name(&self) -> &'static str {
        "wav"
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("wav") || ext.eq_ignore_ascii_case("wave"))
            .unwrap_or(false)
    }

    async fn decode(&self, path: &Path) -> Result<MediaHandle, MediaError> {
        let source = path.to_path_buf();
        tokio::task::spawn_blocking(move || read_wav(&source, &source))
            .await
            .map_err(|e| MediaError::Decode {
                path: path.to_path_buf(),
                message: format!("decoder task failed: {}", e),
            })?
    }
}

/// Decode `wav_path`, attributing the handle to `original`
fn read_wav(wav_path: &Path, original: &Path) -> Result<MediaHandle, MediaError> {
    let decode_error = |e: hound::Error| MediaError::Decode {
        path: original.to_path_buf(),
        message: e.to_string(),
    };

    let reader = WavReader::open(wav_path).map_err(decode_error)?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(MediaError::Decode {
            path: original.to_path_buf(),
            message: "WAV header declares zero channels or zero sample rate".to_string(),
        });
    }

    let samples = match spec.sample_format {
        SampleFormat::Int => SampleData::Int(
            reader
                .into_samples::<i32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(decode_error)?,
        ),
        SampleFormat::Float => SampleData::Float(
            reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(decode_error)?,
        ),
    };

    debug!("Decoded {} samples from {:?}", samples.len(), wav_path);
    Ok(MediaHandle::from_samples(original, spec, samples))
}

/// Transcodes arbitrary media to PCM WAV with ffmpeg, then decodes it
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    sample_rate: Option<u32>,
    timeout: Duration,
}

impl FfmpegDecoder {
    pub fn new(sample_rate: Option<u32>, timeout_secs: u64) -> Self {
        Self {
            sample_rate,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn build_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vn".to_string(),                 // Drop video streams
            "-acodec".to_string(),
            "pcm_s16le".to_string(),           // 16-bit PCM
        ];
        if let Some(rate) = self.sample_rate {
            args.push("-ar".to_string());
            args.push(rate.to_string());
        }
        args.push(output.to_string_lossy().to_string());
        args
    }

    /// Keep only the meaningful lines of ffmpeg's stderr
    fn filter_stderr(stderr: &str) -> String {
        let lines: Vec<&str> = stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| {
                let lower = line.to_lowercase();
                lower.contains("error") || lower.contains("invalid") || lower.contains("no such")
            })
            .collect();

        if lines.is_empty() {
            stderr.lines().last().unwrap_or("unknown ffmpeg error").trim().to_string()
        } else {
            lines.join("; ")
        }
    }
}

#[async_trait]
impl MediaDecoder for FfmpegDecoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn accepts(&self, _path: &Path) -> bool {
        true
    }

    async fn decode(&self, path: &Path) -> Result<MediaHandle, MediaError> {
        let temp_dir = tempfile::tempdir()?;
        let output = temp_dir.path().join("transcoded.wav");

        debug!("Transcoding {:?} with ffmpeg", path);
        let ffmpeg_future = Command::new("ffmpeg")
            .args(self.build_args(path, &output))
            .kill_on_drop(true)
            .output();

        let result = tokio::select! {
            result = ffmpeg_future => {
                result.map_err(|e| MediaError::Transcode(format!("failed to execute ffmpeg: {}", e)))?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(MediaError::Transcode(format!(
                    "ffmpeg timed out after {} seconds",
                    self.timeout.as_secs()
                )));
            }
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let filtered = Self::filter_stderr(&stderr);
            error!("Transcoding {:?} failed: {}", path, filtered);
            return Err(MediaError::Transcode(filtered));
        }

        let original = path.to_path_buf();
        let handle = tokio::task::spawn_blocking(move || read_wav(&output, &original))
            .await
            .map_err(|e| MediaError::Transcode(format!("decoder task failed: {}", e)))??;

        // The transcoded file is no longer needed once decoded
        drop(temp_dir);
        Ok(handle)
    }
}
