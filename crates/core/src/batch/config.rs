//! Configuration for the batch module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default cap on conversions running at once.
pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// Configuration for batch execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum parallel conversions. The effective limit is this or the
    /// number of files, whichever is smaller.
    #[serde(default = "default_max_conversions")]
    pub max_parallel_conversions: usize,

    /// Per-job timeout in seconds. `None` lets a job run indefinitely.
    ///
    /// A timed-out job kills its external tool. In-process image encoding
    /// finishes in the background but discards its output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_timeout_secs: Option<u64>,

    /// Capacity of the progress channel callers are expected to create.
    #[serde(default = "default_progress_buffer")]
    pub progress_buffer: usize,
}

fn default_max_conversions() -> usize {
    DEFAULT_MAX_PARALLEL
}

fn default_progress_buffer() -> usize {
    64
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_parallel_conversions: default_max_conversions(),
            job_timeout_secs: None,
            progress_buffer: default_progress_buffer(),
        }
    }
}

impl BatchConfig {
    /// Sets the maximum parallel conversions.
    pub fn with_max_conversions(mut self, max: usize) -> Self {
        self.max_parallel_conversions = max;
        self
    }

    /// Sets the per-job timeout.
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Sets the progress channel capacity.
    pub fn with_progress_buffer(mut self, size: usize) -> Self {
        self.progress_buffer = size;
        self
    }

    /// Workers for a batch of `files` inputs: `min(cap, files)`, at least 1.
    pub fn concurrency_for(&self, files: usize) -> usize {
        self.max_parallel_conversions.min(files).max(1)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }
}
