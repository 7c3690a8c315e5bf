//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::converter::{normalize_extension, ConversionOptions, Converter, ConverterError};

/// A recorded conversion call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    pub source: PathBuf,
    pub target: PathBuf,
    pub options: ConversionOptions,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Decrements the in-flight counter even if the call panics.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Declare the extension pairs it accepts
/// - Simulate slow conversions, failures and panics
/// - Track calls and the peak number of concurrent calls
///
/// Clones share state, so a test can keep one handle and register another.
///
/// # Example
///
/// ```rust,ignore
/// use golter_core::testing::MockConverter;
///
/// let mock = MockConverter::new("fake image").with_pair(".jpg", ".png");
/// mock.set_conversion_duration(Duration::from_millis(20)).await;
/// mock.fail_for_input("b.jpg").await;
///
/// let mut registry = ConverterRegistry::new();
/// registry.register(mock.clone());
///
/// // ... run a batch ...
///
/// assert!(mock.max_in_flight() <= 4);
/// assert_eq!(mock.conversion_count().await, 3);
/// ```
#[derive(Debug, Clone)]
pub struct MockConverter {
    name: String,
    /// Accepted (source, target) pairs, normalized.
    pairs: BTreeSet<(String, String)>,
    /// Whether a successful call writes a small file at the target path.
    write_output: bool,
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// If set, the next call will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Inputs that always fail.
    failing_inputs: Arc<RwLock<HashSet<PathBuf>>>,
    /// Inputs that make the call panic.
    panicking_inputs: Arc<RwLock<HashSet<PathBuf>>>,
    /// Simulated conversion duration in milliseconds.
    conversion_duration_ms: Arc<RwLock<u64>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new("mock")
    }
}

impl MockConverter {
    /// Create a mock converter that accepts no pairs yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pairs: BTreeSet::new(),
            write_output: false,
            conversions: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            failing_inputs: Arc::new(RwLock::new(HashSet::new())),
            panicking_inputs: Arc::new(RwLock::new(HashSet::new())),
            conversion_duration_ms: Arc::new(RwLock::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Accept one (source, target) pair. Extensions are normalized.
    pub fn with_pair(mut self, source_ext: &str, target_ext: &str) -> Self {
        self.pairs.insert((
            normalize_extension(source_ext),
            normalize_extension(target_ext),
        ));
        self
    }

    /// Accept every pair between the given extensions, including same-format.
    pub fn with_formats(mut self, exts: &[&str]) -> Self {
        for src in exts {
            for tgt in exts {
                self.pairs
                    .insert((normalize_extension(src), normalize_extension(tgt)));
            }
        }
        self
    }

    /// Write a small file at the target path on success.
    pub fn with_output_files(mut self) -> Self {
        self.write_output = true;
        self
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the number of conversions attempted.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Clear recorded conversions and the concurrency high-water mark.
    pub async fn clear_recorded(&self) {
        self.conversions.write().await.clear();
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every call for `input` fail.
    pub async fn fail_for_input(&self, input: impl AsRef<Path>) {
        self.failing_inputs
            .write()
            .await
            .insert(input.as_ref().to_path_buf());
    }

    /// Make every call for `input` panic.
    pub async fn panic_for_input(&self, input: impl AsRef<Path>) {
        self.panicking_inputs
            .write()
            .await
            .insert(input.as_ref().to_path_buf());
    }

    /// Set the simulated conversion duration.
    pub async fn set_conversion_duration(&self, duration: Duration) {
        *self.conversion_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Number of calls currently inside `convert`.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed inside `convert` at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn outcome(&self, source: &Path) -> Result<(), ConverterError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if self.failing_inputs.read().await.contains(source) {
            return Err(ConverterError::conversion_failed(
                format!("mock failure for {}", source.display()),
                Some("simulated stderr".to_string()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_convert(&self, source_ext: &str, target_ext: &str) -> bool {
        self.pairs.contains(&(
            normalize_extension(source_ext),
            normalize_extension(target_ext),
        ))
    }

    fn supported_source_extensions(&self) -> BTreeSet<String> {
        self.pairs.iter().map(|(src, _)| src.clone()).collect()
    }

    fn supported_target_formats(&self, source_ext: &str) -> BTreeSet<String> {
        let source_ext = normalize_extension(source_ext);
        self.pairs
            .iter()
            .filter(|(src, _)| *src == source_ext)
            .map(|(_, tgt)| tgt.clone())
            .collect()
    }

    async fn convert(
        &self,
        source: &Path,
        target: &Path,
        options: &ConversionOptions,
    ) -> Result<(), ConverterError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(self.in_flight.clone());

        // Simulate conversion time
        let duration_ms = *self.conversion_duration_ms.read().await;
        if duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        if self.panicking_inputs.read().await.contains(source) {
            panic!("mock converter panicked on {}", source.display());
        }

        let mut result = self.outcome(source).await;
        if result.is_ok() && self.write_output {
            result = tokio::fs::write(target, format!("converted by {}", self.name))
                .await
                .map_err(ConverterError::from);
        }

        self.conversions.write().await.push(RecordedConversion {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            options: options.clone(),
            success: result.is_ok(),
        });
        result
    }
}
