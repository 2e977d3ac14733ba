use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::export::{ExportOptions, NamingOptions};
use crate::pipeline::PipelineConfig;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Manifest metadata and format
    #[serde(default)]
    pub manifest: ManifestConfig,

    /// Clip naming and writing
    #[serde(default)]
    pub export: ExportConfig,

    /// Media decoding and segmentation
    #[serde(default)]
    pub segment: SegmentConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Manifest output format
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    // @format: Structured JSON document
    #[default]
    Json,
    // @format: Tab separated table
    Tsv,
}

impl ManifestFormat {
    // @returns: File extension without dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Tsv => "tsv",
        }
    }
}

impl std::fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for ManifestFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "tsv" => Ok(Self::Tsv),
            _ => Err(anyhow!("Invalid manifest format: {}", s)),
        }
    }
}

/// How clip filenames are built
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NamingScheme {
    // @scheme: 0001_hello_world.wav
    #[default]
    IndexAndText,
    // @scheme: 0001.wav
    IndexOnly,
    // @scheme: hello_world.wav
    TextOnly,
}

/// What to do with several dependent annotations matching one record
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DependentTextPolicy {
    /// Join all texts with the configured separator
    #[default]
    Concatenate,
    /// Keep every text as its own field
    Separate,
}

/// Manifest configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ManifestConfig {
    /// Language of the primary tier; taken from the tier when empty
    #[serde(default)]
    pub transcription_language: String,

    /// Language of the translation tier; taken from the tier when empty
    #[serde(default)]
    pub translation_language: String,

    /// Resource author
    #[serde(default)]
    pub author: String,

    /// Dependent tier exported as the translation field
    #[serde(default)]
    pub translation_tier: Option<String>,

    /// Output format
    #[serde(default)]
    pub format: ManifestFormat,

    /// Manifest file name without extension
    #[serde(default = "default_manifest_name")]
    pub file_name: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            transcription_language: String::new(),
            translation_language: String::new(),
            author: String::new(),
            translation_tier: None,
            format: ManifestFormat::default(),
            file_name: default_manifest_name(),
        }
    }
}

/// Export configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExportConfig {
    /// Clip naming scheme
    #[serde(default)]
    pub naming: NamingScheme,

    /// Maximum characters of primary text kept in a filename
    #[serde(default = "default_excerpt_max_chars")]
    pub excerpt_max_chars: usize,

    /// Zero padded width of the index in filenames
    #[serde(default = "default_index_width")]
    pub index_width: usize,

    /// Multiple dependent matches policy
    #[serde(default)]
    pub dependent_text: DependentTextPolicy,

    /// Separator used when concatenating dependent texts
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Maximum number of clips written concurrently
    #[serde(default = "default_concurrent_writes")]
    pub concurrent_writes: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            naming: NamingScheme::default(),
            excerpt_max_chars: default_excerpt_max_chars(),
            index_width: default_index_width(),
            dependent_text: DependentTextPolicy::default(),
            separator: default_separator(),
            concurrent_writes: default_concurrent_writes(),
        }
    }
}

/// Segmentation configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SegmentConfig {
    /// Keep zero-length records as empty placeholder clips
    #[serde(default)]
    pub keep_degenerate: bool,

    /// Sample rate requested when transcoding non-WAV media (source rate if unset)
    #[serde(default)]
    pub transcode_sample_rate: Option<u32>,

    /// ffmpeg timeout in seconds
    #[serde(default = "default_ffmpeg_timeout_secs")]
    pub ffmpeg_timeout_secs: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            keep_degenerate: false,
            transcode_sample_rate: None,
            ffmpeg_timeout_secs: default_ffmpeg_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_manifest_name() -> String {
    "manifest".to_string()
}

fn default_excerpt_max_chars() -> usize {
    32
}

fn default_index_width() -> usize {
    4
}

fn default_separator() -> String {
    " ".to_string()
}

fn default_concurrent_writes() -> usize {
    4
}

fn default_ffmpeg_timeout_secs() -> u64 {
    120 // 2 minutes, long recordings take a while to transcode
}

impl Config {
    /// Load a configuration file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.export.concurrent_writes == 0 {
            return Err(anyhow!("export.concurrent_writes must be at least 1"));
        }

        if self.export.naming != NamingScheme::IndexOnly && self.export.excerpt_max_chars == 0 {
            return Err(anyhow!(
                "export.excerpt_max_chars must be positive when filenames include text"
            ));
        }

        if self.export.index_width > 12 {
            return Err(anyhow!("export.index_width must be 12 or less"));
        }

        let name = self.manifest.file_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(anyhow!(
                "manifest.file_name must be a plain file name, got '{}'",
                self.manifest.file_name
            ));
        }

        if let Some(rate) = self.segment.transcode_sample_rate {
            if !(8_000..=192_000).contains(&rate) {
                return Err(anyhow!(
                    "segment.transcode_sample_rate must be between 8000 and 192000 Hz, got {}",
                    rate
                ));
            }
        }

        if self.segment.ffmpeg_timeout_secs == 0 {
            return Err(anyhow!("segment.ffmpeg_timeout_secs must be positive"));
        }

        Ok(())
    }

    /// Build the explicit pipeline configuration
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        let non_empty = |value: &str| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        PipelineConfig {
            keep_degenerate: self.segment.keep_degenerate,
            transcode_sample_rate: self.segment.transcode_sample_rate,
            ffmpeg_timeout_secs: self.segment.ffmpeg_timeout_secs,
            export: ExportOptions {
                naming: NamingOptions {
                    scheme: self.export.naming,
                    excerpt_max_chars: self.export.excerpt_max_chars,
                    index_width: self.export.index_width,
                },
                dependent_text: self.export.dependent_text,
                separator: self.export.separator.clone(),
                concurrent_writes: self.export.concurrent_writes,
                manifest_format: self.manifest.format,
                manifest_file_name: self.manifest.file_name.trim().to_string(),
            },
            transcription_language: non_empty(&self.manifest.transcription_language),
            translation_language: non_empty(&self.manifest.translation_language),
            author: self.manifest.author.clone(),
            translation_tier: self.manifest.translation_tier.as_deref().and_then(non_empty),
        }
    }
}
