//! Batch module: concurrent conversion of many files.
//!
//! The `BatchProcessor` runs one job per input file:
//! - Resolve: pick a converter from the registry for the file's extension pair
//! - Convert: derive the output path and run the converter, timed
//!
//! At most `max_parallel_conversions` jobs (default 4, never more than the
//! number of files) hold a worker slot at once. Failures stay with their own
//! file; the batch as a whole always completes with one result per input.
//!
//! # Example
//!
//! ```ignore
//! use golter_core::batch::{BatchConfig, BatchProcessor, TargetFormat};
//! use golter_core::converter::{default_registry, ConversionOptions, ConverterConfig};
//!
//! let registry = Arc::new(default_registry(&ConverterConfig::default()));
//! let processor = BatchProcessor::new(registry, BatchConfig::default());
//!
//! let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel(64);
//! tokio::spawn(async move {
//!     while let Some(p) = progress_rx.recv().await {
//!         println!("[{}/{}] {}", p.current, p.total, p.status);
//!     }
//! });
//!
//! let result = processor
//!     .run(files, &TargetFormat::parse("png"), &ConversionOptions::default(), Some(progress_tx))
//!     .await;
//! println!("{}", result.summary());
//! ```

mod config;
mod output;
mod runner;
mod types;

pub use config::{BatchConfig, DEFAULT_MAX_PARALLEL};
pub use output::{derive_output_path, TargetFormat};
pub use runner::BatchProcessor;
pub use types::{
    format_duration, format_size, BatchOutcome, BatchProgress, BatchResult, ConversionJob,
    ConversionResult, JobError,
};
