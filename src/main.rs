// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use hermes::alignment::TierSelection;
use hermes::app_config::{self, Config, ManifestFormat};
use hermes::app_controller::{Controller, ExportJob};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for ManifestFormat to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliManifestFormat {
    Json,
    Tsv,
}

impl From<CliManifestFormat> for ManifestFormat {
    fn from(cli_format: CliManifestFormat) -> Self {
        match cli_format {
            CliManifestFormat::Json => ManifestFormat::Json,
            CliManifestFormat::Tsv => ManifestFormat::Tsv,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the tiers, media and languages of an annotation document
    Inspect {
        /// Annotation document (.eaf)
        #[arg(value_name = "EAF")]
        document: PathBuf,

        /// Configuration file path
        #[arg(short, long, default_value = "conf.json")]
        config_path: String,

        /// Set logging level
        #[arg(short, long, value_enum)]
        log_level: Option<CliLogLevel>,
    },

    /// Cut the recording into clips and write the resource bundle
    Export(ExportArgs),

    /// Generate shell completions for hermes
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Annotation document (.eaf)
    #[arg(value_name = "EAF")]
    document: PathBuf,

    /// Source recording; defaults to the media linked in the document
    #[arg(short, long)]
    media: Option<PathBuf>,

    /// Tier defining the clip boundaries
    #[arg(short, long)]
    primary: String,

    /// Tier whose annotations are attached to each clip (repeatable)
    #[arg(short, long = "dependent")]
    dependents: Vec<String>,

    /// Bundle directory; defaults to <document>_bundle
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export zero-length annotations as empty clips
    #[arg(short, long)]
    keep_degenerate: bool,

    /// Manifest format
    #[arg(short, long, value_enum)]
    format: Option<CliManifestFormat>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// Hermes - language resources from ELAN annotations
///
/// Cuts a recording at the boundaries of an annotation tier and writes the
/// clips together with their transcriptions and translations.
#[derive(Parser, Debug)]
#[command(name = "hermes")]
#[command(version)]
#[command(about = "Turns ELAN annotation files and their recordings into language resource bundles")]
#[command(long_about = "Hermes cuts a recording at the annotation boundaries of a primary tier and writes one clip per annotation plus a manifest.

EXAMPLES:
    hermes inspect session.eaf                                  # List tiers
    hermes export session.eaf -p Transcription -d Translation   # Export with media from the header
    hermes export session.eaf -m take2.wav -p Words -o bundle/  # Explicit media and output
    hermes export session.eaf -p Words -f tsv                   # Tab separated manifest
    hermes completions bash > hermes.bash                       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                color,
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with trace so the level can be lowered later
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "hermes", &mut std::io::stdout());
            Ok(())
        }
        Commands::Inspect {
            document,
            config_path,
            log_level,
        } => run_inspect(&document, &config_path, log_level),
        Commands::Export(args) => run_export(args).await,
    }
}

/// Load or create the configuration and apply the log level
fn load_config(config_path: &str, log_level: Option<CliLogLevel>) -> Result<Config> {
    if let Some(level) = &log_level {
        log::set_max_level(level_filter(&level.clone().into()));
    }

    let mut config = if Path::new(config_path).exists() {
        Config::load_from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        config
            .save_to_file(config_path)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        config
    };

    match log_level {
        Some(level) => config.log_level = level.into(),
        None => log::set_max_level(level_filter(&config.log_level)),
    }

    Ok(config)
}

fn run_inspect(document: &Path, config_path: &str, log_level: Option<CliLogLevel>) -> Result<()> {
    let config = load_config(config_path, log_level)?;
    let controller = Controller::with_config(config)?;

    let overview = controller.inspect(document)?;
    println!("{}", Controller::format_overview(&overview));
    Ok(())
}

async fn run_export(options: ExportArgs) -> Result<()> {
    let mut config = load_config(&options.config_path, options.log_level.clone())?;

    // Override config with CLI options if provided
    if options.keep_degenerate {
        config.segment.keep_degenerate = true;
    }
    if let Some(format) = options.format.clone() {
        config.manifest.format = format.into();
    }

    let controller = Controller::with_config(config)?;

    let mut selection = TierSelection::new(options.primary.clone());
    for tier in &options.dependents {
        selection = selection.with_dependent(tier.clone());
    }

    let summary = controller
        .run(ExportJob {
            document: options.document.clone(),
            media: options.media.clone(),
            output_dir: options.output.clone(),
            selection,
        })
        .await?;

    println!("{}", summary.summary());
    Ok(())
}
