//! Batch lifecycle integration tests.
//!
//! These tests drive the batch processor with the mock converter and with the
//! bundled in-process converters:
//! - One result per input, whatever happens to each job
//! - Concurrency cap
//! - Failure isolation and resolution errors
//! - Output path derivation end to end
//! - Progress notices and per-job timeouts

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use golter_core::{
    batch::{BatchConfig, BatchOutcome, BatchProcessor, BatchProgress, JobError, TargetFormat},
    converter::{default_registry, ConversionOptions, ConverterConfig},
    registry::{ConverterRegistry, ResolveError},
    testing::{fixtures, MockConverter},
};

/// Test helper wiring a mock converter into a processor.
struct TestHarness {
    processor: BatchProcessor,
    converter: MockConverter,
    dir: TempDir,
}

impl TestHarness {
    async fn new(converter: MockConverter) -> Self {
        Self::with_config(converter, BatchConfig::default()).await
    }

    async fn with_config(converter: MockConverter, config: BatchConfig) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        converter.set_conversion_duration(Duration::from_millis(5)).await;

        let processor = BatchProcessor::new(fixtures::registry_with(converter.clone()), config);
        Self {
            processor,
            converter,
            dir,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn files(&self, ext: &str, count: usize) -> Vec<PathBuf> {
        fixtures::touch_files(self.dir.path(), ext, count).expect("Failed to create inputs")
    }
}

fn fake_image_converter() -> MockConverter {
    MockConverter::new("fake image").with_formats(&[".jpg", ".png", ".webp"])
}

#[tokio::test]
async fn test_every_input_gets_one_result() {
    let harness = TestHarness::new(fake_image_converter()).await;
    harness.converter.fail_for_input(harness.path("file_3.jpg")).await;

    let mut files = harness.files("jpg", 10);
    files.push(harness.path("unknown.xyz"));

    let result = harness
        .processor
        .run(files.clone(), &TargetFormat::parse("png"), &ConversionOptions::default(), None)
        .await;

    assert_eq!(result.results.len(), files.len());
    for file in &files {
        assert_eq!(
            result.results.iter().filter(|r| &r.input_path == file).count(),
            1,
            "expected exactly one result for {}",
            file.display()
        );
    }
    assert_eq!(result.succeeded().count(), 9);
    assert_eq!(result.outcome(), BatchOutcome::PartialSuccess);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_cap_respected() {
    let harness = TestHarness::new(fake_image_converter()).await;
    let files = harness.files("jpg", 100);

    let result = harness
        .processor
        .run(files, &TargetFormat::parse("png"), &ConversionOptions::default(), None)
        .await;

    assert_eq!(result.results.len(), 100);
    assert_eq!(result.outcome(), BatchOutcome::AllSucceeded);
    assert!(harness.converter.max_in_flight() <= 4);
    assert!(harness.converter.max_in_flight() >= 2);
    assert_eq!(harness.converter.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_configured_cap_respected() {
    let config = BatchConfig::default().with_max_conversions(2);
    let harness = TestHarness::with_config(fake_image_converter(), config).await;
    let files = harness.files("png", 20);

    harness
        .processor
        .run(files, &TargetFormat::Compress, &ConversionOptions::default(), None)
        .await;

    assert!(harness.converter.max_in_flight() <= 2);
}

#[tokio::test]
async fn test_failure_does_not_stop_siblings() {
    let harness = TestHarness::new(fake_image_converter()).await;
    let files = harness.files("jpg", 5);
    harness.converter.fail_for_input(&files[0]).await;

    let result = harness
        .processor
        .run(files.clone(), &TargetFormat::parse(".webp"), &ConversionOptions::default(), None)
        .await;

    assert_eq!(result.succeeded().count(), 4);
    let failed: Vec<_> = result.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].input_path, files[0]);
    assert!(failed[0].output_path.is_none());
    assert!(matches!(failed[0].error, Some(JobError::Convert(_))));
    assert_eq!(harness.converter.conversion_count().await, 5);
}

#[tokio::test]
async fn test_jpg_batch_to_png() {
    let converter = fake_image_converter();
    let processor = BatchProcessor::new(fixtures::registry_with(converter), BatchConfig::default());

    let files: Vec<PathBuf> = ["a.jpg", "b.jpg", "c.jpg"].iter().map(PathBuf::from).collect();
    let result = processor
        .run(files, &TargetFormat::parse(".png"), &ConversionOptions::default(), None)
        .await
        .sorted_by_input();

    assert_eq!(result.results.len(), 3);
    let outputs: Vec<_> = result
        .results
        .iter()
        .map(|r| r.output_path.clone().unwrap())
        .collect();
    assert_eq!(
        outputs,
        vec![PathBuf::from("a.png"), PathBuf::from("b.png"), PathBuf::from("c.png")]
    );
    assert!(result.results.iter().all(|r| r.error.is_none()));
}

#[tokio::test]
async fn test_unresolvable_file_reports_resolution_error() {
    let converter = fake_image_converter();
    let processor = BatchProcessor::new(fixtures::registry_with(converter.clone()), BatchConfig::default());

    let files = vec![PathBuf::from("a.jpg"), PathBuf::from("b.xyz")];
    let result = processor
        .run(files, &TargetFormat::parse("png"), &ConversionOptions::default(), None)
        .await
        .sorted_by_input();

    assert_eq!(result.results.len(), 2);
    assert_eq!(result.results[0].output_path, Some(PathBuf::from("a.png")));

    let failure = &result.results[1];
    assert_eq!(failure.input_path, PathBuf::from("b.xyz"));
    assert!(failure.output_path.is_none());
    match &failure.error {
        Some(JobError::Resolve(ResolveError::NoConverter {
            source_ext,
            target_ext,
        })) => {
            assert_eq!(source_ext, ".xyz");
            assert_eq!(target_ext, ".png");
        }
        other => panic!("expected resolution error, got {other:?}"),
    }
    let message = failure.error.as_ref().unwrap().to_string();
    assert!(message.contains(".xyz") && message.contains(".png"));

    // The converter never saw the unresolvable file
    assert_eq!(converter.conversion_count().await, 1);
}

#[tokio::test]
async fn test_output_naming() {
    let converter = MockConverter::new("fake doc").with_formats(&[".md", ".pdf"]);
    let processor = BatchProcessor::new(fixtures::registry_with(converter.clone()), BatchConfig::default());
    let opts = ConversionOptions::default();

    let same = processor
        .run(vec![PathBuf::from("x.md")], &TargetFormat::parse("md"), &opts, None)
        .await;
    assert_eq!(same.results[0].output_path, Some(PathBuf::from("x_converted.md")));

    let compressed = processor
        .run(vec![PathBuf::from("/docs/report.pdf")], &TargetFormat::Compress, &opts, None)
        .await;
    assert_eq!(
        compressed.results[0].output_path,
        Some(PathBuf::from("/docs/report_compressed.pdf"))
    );

    for call in converter.recorded_conversions().await {
        assert_ne!(call.source, call.target);
    }
}

#[tokio::test]
async fn test_progress_notices() {
    let harness = TestHarness::new(fake_image_converter()).await;
    let files = harness.files("jpg", 6);
    let (tx, mut rx) = mpsc::channel::<BatchProgress>(64);

    let result = harness
        .processor
        .run(files, &TargetFormat::parse("png"), &ConversionOptions::default(), Some(tx))
        .await;
    assert_eq!(result.results.len(), 6);

    let mut notices = Vec::new();
    while let Some(p) = rx.recv().await {
        notices.push(p);
    }

    // One start and one finish notice per file
    assert_eq!(notices.len(), 12);
    assert!(notices.iter().all(|p| p.total == 6));
    assert_eq!(notices.iter().map(|p| p.current).max(), Some(6));
    assert_eq!(
        notices.iter().filter(|p| p.status.starts_with("Converting")).count(),
        6
    );
}

#[tokio::test]
async fn test_full_progress_channel_never_blocks() {
    let harness = TestHarness::new(fake_image_converter()).await;
    let files = harness.files("jpg", 10);
    let (tx, _rx) = mpsc::channel::<BatchProgress>(1);

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        harness
            .processor
            .run(files, &TargetFormat::parse("png"), &ConversionOptions::default(), Some(tx)),
    )
    .await
    .expect("batch blocked on a full progress channel");

    assert_eq!(result.results.len(), 10);
}

#[tokio::test]
async fn test_job_timeout() {
    let config = BatchConfig::default().with_job_timeout(Duration::from_secs(1));
    let harness = TestHarness::with_config(fake_image_converter(), config).await;
    harness
        .converter
        .set_conversion_duration(Duration::from_secs(5))
        .await;

    let files = harness.files("jpg", 2);
    let result = harness
        .processor
        .run(files, &TargetFormat::parse("png"), &ConversionOptions::default(), None)
        .await;

    assert_eq!(result.outcome(), BatchOutcome::AllFailed);
    assert!(result
        .results
        .iter()
        .all(|r| matches!(r.error, Some(JobError::Timeout { secs: 1 }))));
    assert!(result.total_duration < Duration::from_secs(5));
}

#[tokio::test]
async fn test_empty_batch() {
    let harness = TestHarness::new(fake_image_converter()).await;
    let result = harness
        .processor
        .run(Vec::new(), &TargetFormat::parse("png"), &ConversionOptions::default(), None)
        .await;

    assert_eq!(result.outcome(), BatchOutcome::Empty);
    assert_eq!(harness.converter.conversion_count().await, 0);
}

#[tokio::test]
async fn test_first_registered_converter_handles_batch() {
    let first = MockConverter::new("first").with_pair(".jpg", ".png");
    let second = MockConverter::new("second").with_pair(".jpg", ".png");

    let mut registry = ConverterRegistry::new();
    registry.register(first.clone());
    registry.register(second.clone());
    let processor = BatchProcessor::new(Arc::new(registry), BatchConfig::default());

    processor
        .run(
            vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")],
            &TargetFormat::parse("png"),
            &ConversionOptions::default(),
            None,
        )
        .await;

    assert_eq!(first.conversion_count().await, 2);
    assert_eq!(second.conversion_count().await, 0);
}

#[tokio::test]
async fn test_bundled_converters_end_to_end() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let png = dir.path().join("pixel.png");
    image::RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10]))
        .save(&png)
        .expect("Failed to write png");
    let json = dir.path().join("settings.json");
    std::fs::write(&json, r#"{"theme": "dark", "limits": {"files": 4}}"#).unwrap();

    let registry = Arc::new(default_registry(&ConverterConfig::default()));
    let processor = BatchProcessor::new(registry, BatchConfig::default());

    let images = processor
        .run(vec![png.clone()], &TargetFormat::Compress, &ConversionOptions::with_quality("Compact"), None)
        .await;
    assert_eq!(images.outcome(), BatchOutcome::AllSucceeded, "{}", images.summary());
    let out = images.results[0].output_path.clone().unwrap();
    assert_eq!(out, dir.path().join("pixel_compressed.png"));
    assert!(images.results[0].output_size_bytes.is_some());
    assert!(image::open(&out).is_ok());

    let data = processor
        .run(vec![json], &TargetFormat::parse("yaml"), &ConversionOptions::default(), None)
        .await;
    assert_eq!(data.outcome(), BatchOutcome::AllSucceeded, "{}", data.summary());
    let yaml_text = std::fs::read_to_string(dir.path().join("settings.yaml")).unwrap();
    assert!(yaml_text.contains("theme: dark"));
}
