use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use golter_core::{
    batch::{BatchOutcome, BatchProgress, TargetFormat},
    converter::{normalize_extension, QualityPreset},
    default_registry, load_config, load_default_config, validate_config, BatchProcessor, Config,
    ConversionOptions, ConverterRegistry,
};

/// Batch file conversion and compression.
#[derive(Debug, Parser)]
#[command(name = "golter", version, about)]
struct Cli {
    /// TOML configuration file. Without it, defaults plus GOLTER_* environment variables apply.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert files to another format.
    Convert {
        /// Target extension, with or without the leading dot.
        #[arg(long = "to", short = 't')]
        to: String,

        #[arg(long, short, value_enum)]
        quality: Option<Quality>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Re-encode files in their own format, writing `<name>_compressed.<ext>`.
    Compress {
        #[arg(long, short, value_enum)]
        quality: Option<Quality>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List supported source extensions, or the targets for one extension.
    Formats {
        extension: Option<String>,

        /// Print as a JSON array.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Quality {
    High,
    Balanced,
    Compact,
}

impl From<Quality> for QualityPreset {
    fn from(quality: Quality) -> Self {
        match quality {
            Quality::High => Self::High,
            Quality::Balanced => Self::Balanced,
            Quality::Compact => Self::Compact,
        }
    }
}

fn options_for(quality: Option<Quality>) -> ConversionOptions {
    match quality {
        Some(q) => ConversionOptions::with_quality(QualityPreset::from(q).label()),
        None => ConversionOptions::default(),
    }
}

/// Loads and validates configuration from `path`, or from defaults plus
/// environment when no file is given.
fn load_settings(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_default_config().context("Failed to load default config")?,
    };
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_settings(cli.config.as_deref())?;

    let registry = Arc::new(default_registry(&config.converter));
    info!("Registered converters: {}", registry.names().join(", "));

    match cli.command {
        Command::Convert { to, quality, files } => {
            let target = TargetFormat::parse(&to);
            if target.is_compress() {
                bail!("--to needs a target extension; use `compress` to re-encode in place");
            }
            run_batch(config, registry, files, target, options_for(quality)).await
        }
        Command::Compress { quality, files } => {
            run_batch(config, registry, files, TargetFormat::Compress, options_for(quality)).await
        }
        Command::Formats { extension, json } => {
            let formats = list_formats(&registry, extension.as_deref());
            if json {
                println!("{}", serde_json::to_string_pretty(&formats)?);
            } else if formats.is_empty() {
                println!("No supported formats");
            } else {
                println!("{}", formats.join("\n"));
            }
            Ok(0)
        }
    }
}

fn list_formats(registry: &ConverterRegistry, extension: Option<&str>) -> Vec<String> {
    match extension {
        Some(ext) => registry
            .supported_target_formats(&normalize_extension(ext))
            .into_iter()
            .collect(),
        None => registry.supported_source_extensions().into_iter().collect(),
    }
}

async fn run_batch(
    config: Config,
    registry: Arc<ConverterRegistry>,
    files: Vec<PathBuf>,
    target: TargetFormat,
    options: ConversionOptions,
) -> Result<i32> {
    let (progress_tx, mut progress_rx) =
        mpsc::channel::<BatchProgress>(config.batch.progress_buffer);
    let progress = tokio::spawn(async move {
        while let Some(p) = progress_rx.recv().await {
            info!("[{}/{}] {}", p.current, p.total, p.status);
        }
    });

    let processor = BatchProcessor::new(registry, config.batch);
    let result = processor
        .run(files, &target, &options, Some(progress_tx))
        .await
        .sorted_by_input();

    // The sender is gone once the batch returns
    let _ = progress.await;

    println!("{}", result.summary());

    Ok(exit_code(result.outcome()))
}

fn exit_code(outcome: BatchOutcome) -> i32 {
    match outcome {
        BatchOutcome::AllSucceeded | BatchOutcome::Empty => 0,
        BatchOutcome::PartialSuccess => 2,
        BatchOutcome::AllFailed => 1,
    }
}
