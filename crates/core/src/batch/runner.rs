//! Batch processor implementation.

use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::converter::ConversionOptions;
use crate::registry::ConverterRegistry;

use super::config::BatchConfig;
use super::output::TargetFormat;
use super::types::{BatchProgress, BatchResult, ConversionJob, ConversionResult, JobError};

/// Sends best-effort progress notices shared by every job of a batch.
#[derive(Clone)]
struct ProgressReporter {
    tx: Option<mpsc::Sender<BatchProgress>>,
    completed: Arc<AtomicUsize>,
    total: usize,
}

impl ProgressReporter {
    fn send(&self, current: usize, file: &str, status: String) {
        if let Some(ref tx) = self.tx {
            // Full or closed channel drops the notice
            let _ = tx.try_send(BatchProgress {
                current,
                total: self.total,
                file: file.to_string(),
                status,
            });
        }
    }

    fn started(&self, file: &str) {
        self.send(
            self.completed.load(Ordering::SeqCst),
            file,
            format!("Converting {file}..."),
        );
    }

    fn finished(&self, file: &str, error: Option<&JobError>) {
        let current = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let status = match error {
            None => format!("Converted {file}"),
            Some(e) => format!("Failed {file}: {e}"),
        };
        self.send(current, file, status);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn file_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path).await.ok().map(|m| m.len())
}

/// Runs batches of independent conversions with bounded parallelism.
///
/// One task per input file; at most `min(max_parallel_conversions, files)`
/// of them convert at once. A failing, panicking or timed-out job never
/// affects its siblings, and every input gets exactly one result.
///
/// Dropping the future returned by [`run`](Self::run) aborts all in-flight
/// jobs; external tools are killed along with them.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    registry: Arc<ConverterRegistry>,
    config: BatchConfig,
}

impl BatchProcessor {
    /// Creates a new batch processor.
    pub fn new(registry: Arc<ConverterRegistry>, config: BatchConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<ConverterRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Converts (or compresses) every file and waits for all of them.
    ///
    /// Never fails as a whole: per-file errors live in the returned
    /// [`BatchResult`]. Results arrive in completion order.
    pub async fn run(
        &self,
        files: Vec<PathBuf>,
        target: &TargetFormat,
        options: &ConversionOptions,
        progress_tx: Option<mpsc::Sender<BatchProgress>>,
    ) -> BatchResult {
        if files.is_empty() {
            debug!("empty batch, nothing to do");
            return BatchResult::empty();
        }

        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let total = files.len();
        let concurrency = self.config.concurrency_for(total);
        let timeout = self.config.job_timeout();

        info!(
            %batch_id,
            files = total,
            %target,
            concurrency,
            "Starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let reporter = ProgressReporter {
            tx: progress_tx,
            completed: Arc::new(AtomicUsize::new(0)),
            total,
        };

        // Inputs not yet reported, by path (paths may repeat)
        let mut outstanding: HashMap<PathBuf, usize> = HashMap::new();
        let mut tasks = JoinSet::new();

        for input in files {
            *outstanding.entry(input.clone()).or_default() += 1;

            let job = ConversionJob::new(input, target, options.clone());
            let registry = Arc::clone(&self.registry);
            let semaphore = Arc::clone(&semaphore);
            let reporter = reporter.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let input_path = job.input_path.clone();
                let name = job.display_name();
                let started = Instant::now();

                match AssertUnwindSafe(Self::run_job(job, registry, timeout, &reporter))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(payload) => {
                        let error = JobError::Panicked(panic_message(payload));
                        warn!(input = %input_path.display(), error = %error, "Conversion panicked");
                        reporter.finished(&name, Some(&error));
                        ConversionResult::failed(input_path, error, started.elapsed())
                    }
                }
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    if let Some(n) = outstanding.get_mut(&result.input_path) {
                        *n -= 1;
                    }
                    results.push(result);
                }
                Err(e) => warn!(error = %e, "Batch task did not complete"),
            }
        }

        // A task lost to the runtime still owes its input a result
        for (input, missing) in outstanding {
            for _ in 0..missing {
                results.push(ConversionResult::failed(
                    input.clone(),
                    JobError::Panicked("conversion task aborted".to_string()),
                    Duration::ZERO,
                ));
            }
        }

        let result = BatchResult {
            batch_id,
            started_at,
            results,
            total_duration: start.elapsed(),
        };

        info!(
            %batch_id,
            succeeded = result.succeeded().count(),
            failed = result.failed().count(),
            duration_ms = result.total_duration.as_millis() as u64,
            "Batch finished"
        );

        result
    }

    /// Resolves and runs one job. Called with a worker slot held.
    async fn run_job(
        job: ConversionJob,
        registry: Arc<ConverterRegistry>,
        timeout: Option<Duration>,
        reporter: &ProgressReporter,
    ) -> ConversionResult {
        let name = job.display_name();
        let started = Instant::now();
        reporter.started(&name);

        let outcome = match registry.resolve(&job.source_ext, &job.target_ext) {
            Err(e) => Err(JobError::from(e)),
            Ok(converter) => {
                debug!(
                    input = %job.input_path.display(),
                    output = %job.output_path.display(),
                    converter = converter.name(),
                    "Converting"
                );
                let convert = converter.convert(&job.input_path, &job.output_path, &job.options);
                match timeout {
                    Some(limit) => match tokio::time::timeout(limit, convert).await {
                        Ok(r) => r.map_err(JobError::from),
                        Err(_) => Err(JobError::Timeout {
                            secs: limit.as_secs(),
                        }),
                    },
                    None => convert.await.map_err(JobError::from),
                }
            }
        };
        let duration = started.elapsed();

        let result = match outcome {
            Ok(()) => {
                debug!(
                    input = %job.input_path.display(),
                    duration_ms = duration.as_millis() as u64,
                    "Converted"
                );
                ConversionResult {
                    input_size_bytes: file_size(&job.input_path).await,
                    output_size_bytes: file_size(&job.output_path).await,
                    input_path: job.input_path,
                    output_path: Some(job.output_path),
                    error: None,
                    duration,
                }
            }
            Err(error) => {
                warn!(input = %job.input_path.display(), error = %error, "Conversion failed");
                ConversionResult::failed(job.input_path, error, duration)
            }
        };

        reporter.finished(&name, result.error.as_ref());
        result
    }
}
