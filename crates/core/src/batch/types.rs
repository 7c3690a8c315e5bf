//! Types for the batch module.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use super::output::{derive_output_path, TargetFormat};
use crate::converter::{extension_of, ConversionOptions, ConverterError};
use crate::registry::ResolveError;

/// Why a single job failed.
#[derive(Debug, Error)]
pub enum JobError {
    /// No converter handles the pair.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The converter ran and failed.
    #[error(transparent)]
    Convert(#[from] ConverterError),

    /// The job exceeded the configured per-job timeout.
    #[error("conversion timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The converter panicked.
    #[error("converter panicked: {0}")]
    Panicked(String),
}

/// One unit of work: a single input file.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub input_path: PathBuf,
    /// Normalized extension of the input.
    pub source_ext: String,
    /// Extension requested from the converter; equals `source_ext` when compressing.
    pub target_ext: String,
    pub output_path: PathBuf,
    pub options: ConversionOptions,
}

impl ConversionJob {
    pub fn new(input: impl Into<PathBuf>, target: &TargetFormat, options: ConversionOptions) -> Self {
        let input_path = input.into();
        Self {
            source_ext: extension_of(&input_path),
            target_ext: target.effective_extension(&input_path),
            output_path: derive_output_path(&input_path, target),
            input_path,
            options,
        }
    }

    /// File name used in progress notices and summaries.
    pub fn display_name(&self) -> String {
        file_name(&self.input_path)
    }
}

/// Outcome of one job. Exactly one exists per input file.
#[derive(Debug)]
pub struct ConversionResult {
    pub input_path: PathBuf,
    /// Set only on success.
    pub output_path: Option<PathBuf>,
    /// Set only on failure.
    pub error: Option<JobError>,
    /// Time spent converting, measured from when the job got a worker slot.
    pub duration: Duration,
    pub input_size_bytes: Option<u64>,
    pub output_size_bytes: Option<u64>,
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub(crate) fn failed(input_path: PathBuf, error: JobError, duration: Duration) -> Self {
        Self {
            input_path,
            output_path: None,
            error: Some(error),
            duration,
            input_size_bytes: None,
            output_size_bytes: None,
        }
    }

    /// Bytes saved by this conversion, negative when the output grew.
    pub fn bytes_saved(&self) -> Option<i64> {
        match (self.input_size_bytes, self.output_size_bytes) {
            (Some(input), Some(output)) if self.is_success() => Some(input as i64 - output as i64),
            _ => None,
        }
    }
}

/// Classification of a finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    AllSucceeded,
    PartialSuccess,
    AllFailed,
    /// No files were submitted.
    Empty,
}

/// Terminal snapshot of a batch.
#[derive(Debug)]
pub struct BatchResult {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Results in completion order.
    pub results: Vec<ConversionResult>,
    /// Wall-clock time of the whole batch.
    pub total_duration: Duration,
}

impl BatchResult {
    pub(crate) fn empty() -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            started_at: Utc::now(),
            results: Vec::new(),
            total_duration: Duration::ZERO,
        }
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn outcome(&self) -> BatchOutcome {
        let ok = self.succeeded().count();
        match (ok, self.results.len()) {
            (_, 0) => BatchOutcome::Empty,
            (ok, total) if ok == total => BatchOutcome::AllSucceeded,
            (0, _) => BatchOutcome::AllFailed,
            _ => BatchOutcome::PartialSuccess,
        }
    }

    /// Net bytes saved across successful conversions with known sizes.
    pub fn bytes_saved(&self) -> i64 {
        self.results.iter().filter_map(|r| r.bytes_saved()).sum()
    }

    /// Reorders results by input path.
    pub fn sorted_by_input(mut self) -> Self {
        self.results.sort_by(|a, b| a.input_path.cmp(&b.input_path));
        self
    }

    /// Human-readable report of the batch.
    pub fn summary(&self) -> String {
        let successes: Vec<String> = self
            .succeeded()
            .map(|r| {
                let output = r.output_path.as_deref().map(file_name).unwrap_or_default();
                let took = if r.duration > Duration::ZERO {
                    format!(" ({})", format_duration(r.duration))
                } else {
                    String::new()
                };
                format!("  ✓ {} → {}{}", file_name(&r.input_path), output, took)
            })
            .collect();
        let errors: Vec<String> = self
            .failed()
            .map(|r| {
                let reason = r.error.as_ref().map(|e| e.to_string()).unwrap_or_default();
                format!("  ✗ {}: {}", file_name(&r.input_path), reason)
            })
            .collect();
        let total = format_duration(self.total_duration);

        match self.outcome() {
            BatchOutcome::Empty => "No files to convert".to_string(),
            BatchOutcome::AllFailed => format!("All conversions failed:\n{}", errors.join("\n")),
            BatchOutcome::PartialSuccess => format!(
                "Converted {}/{} files in {}\n\n{}\n\nErrors:\n{}",
                successes.len(),
                self.results.len(),
                total,
                successes.join("\n"),
                errors.join("\n")
            ),
            BatchOutcome::AllSucceeded => {
                let saved = self.bytes_saved();
                let saved = if saved > 0 {
                    format!(" (saved {})", format_size(saved as u64))
                } else {
                    String::new()
                };
                format!(
                    "Successfully converted {} files in {}{}\n\n{}",
                    successes.len(),
                    total,
                    saved,
                    successes.join("\n")
                )
            }
        }
    }
}

/// Advisory progress notice. Notices may be dropped; the [`BatchResult`]
/// is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    /// Jobs finished so far.
    pub current: usize,
    pub total: usize,
    /// File name of the job this notice is about.
    pub file: String,
    pub status: String,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Formats a duration as `850ms`, `1.2s` or `3m 5s`.
pub fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{}ms", d.as_millis())
    } else if d < Duration::from_secs(60) {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", d.as_secs() / 60, d.as_secs() % 60)
    }
}

/// Formats a byte count with binary units.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    match bytes {
        b if b >= TB => format!("{:.2} TB", b as f64 / TB as f64),
        b if b >= GB => format!("{:.2} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(input: &str, output: &str, sizes: (u64, u64)) -> ConversionResult {
        ConversionResult {
            input_path: PathBuf::from(input),
            output_path: Some(PathBuf::from(output)),
            error: None,
            duration: Duration::from_millis(120),
            input_size_bytes: Some(sizes.0),
            output_size_bytes: Some(sizes.1),
        }
    }

    fn err(input: &str) -> ConversionResult {
        ConversionResult::failed(
            PathBuf::from(input),
            JobError::Resolve(ResolveError::NoConverter {
                source_ext: ".xyz".into(),
                target_ext: ".png".into(),
            }),
            Duration::ZERO,
        )
    }

    fn batch(results: Vec<ConversionResult>) -> BatchResult {
        BatchResult {
            results,
            total_duration: Duration::from_millis(1500),
            ..BatchResult::empty()
        }
    }

    #[test]
    fn test_job_new_derives_paths() {
        let job = ConversionJob::new("/in/Photo.JPG", &TargetFormat::Compress, ConversionOptions::default());
        assert_eq!(job.source_ext, ".jpg");
        assert_eq!(job.target_ext, ".jpg");
        assert_eq!(job.output_path, PathBuf::from("/in/Photo_compressed.JPG"));
        assert_eq!(job.display_name(), "Photo.JPG");

        let job = ConversionJob::new("a.md", &TargetFormat::parse("html"), ConversionOptions::default());
        assert_eq!(job.target_ext, ".html");
        assert_eq!(job.output_path, PathBuf::from("a.html"));
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(batch(vec![]).outcome(), BatchOutcome::Empty);
        assert_eq!(batch(vec![ok("a.jpg", "a.png", (1, 1))]).outcome(), BatchOutcome::AllSucceeded);
        assert_eq!(batch(vec![err("b.xyz")]).outcome(), BatchOutcome::AllFailed);
        assert_eq!(
            batch(vec![ok("a.jpg", "a.png", (1, 1)), err("b.xyz")]).outcome(),
            BatchOutcome::PartialSuccess
        );
    }

    #[test]
    fn test_bytes_saved_ignores_failures() {
        let b = batch(vec![
            ok("a.jpg", "a_compressed.jpg", (1000, 400)),
            ok("b.jpg", "b_compressed.jpg", (100, 150)),
            err("c.xyz"),
        ]);
        assert_eq!(b.bytes_saved(), 550);
        assert_eq!(b.results[2].bytes_saved(), None);
    }

    #[test]
    fn test_sorted_by_input() {
        let b = batch(vec![err("c.xyz"), ok("a.jpg", "a.png", (1, 1)), ok("b.jpg", "b.png", (1, 1))])
            .sorted_by_input();
        let names: Vec<_> = b.results.iter().map(|r| r.input_path.clone()).collect();
        assert_eq!(names, vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg"), PathBuf::from("c.xyz")]);
    }

    #[test]
    fn test_summary_partial() {
        let summary = batch(vec![ok("/x/a.jpg", "/x/a.png", (1, 1)), err("/x/b.xyz")]).summary();
        assert!(summary.starts_with("Converted 1/2 files in 1.5s"));
        assert!(summary.contains("✓ a.jpg → a.png (120ms)"));
        assert!(summary.contains("Errors:\n  ✗ b.xyz: no converter found for .xyz to .png"));
    }

    #[test]
    fn test_summary_all_succeeded_reports_savings() {
        let summary = batch(vec![ok("a.png", "a_compressed.png", (4096, 1024))]).summary();
        assert!(summary.starts_with("Successfully converted 1 files in 1.5s (saved 3.0 KB)"));
    }

    #[test]
    fn test_summary_all_failed() {
        let summary = batch(vec![err("b.xyz")]).summary();
        assert!(summary.starts_with("All conversions failed:\n  ✗ b.xyz"));
        assert_eq!(batch(vec![]).summary(), "No files to convert");
    }

    #[test]
    fn test_job_error_messages() {
        assert_eq!(
            JobError::Timeout { secs: 30 }.to_string(),
            "conversion timed out after 30s"
        );
        let convert: JobError = ConverterError::conversion_failed("boom", None).into();
        assert_eq!(convert.to_string(), "conversion failed: boom");
    }

    #[test]
    fn test_formatting_helpers() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_millis(1240)), "1.2s");
        assert_eq!(format_duration(Duration::from_secs(185)), "3m 5s");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
