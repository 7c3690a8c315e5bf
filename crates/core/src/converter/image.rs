//! In-process image re-encoding.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageReader};
use std::collections::BTreeSet;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;

use super::command::ensure_input;
use super::error::ConverterError;
use super::extension::{extension_of, normalize_extension};
use super::options::{ConversionOptions, QualityPreset};
use super::traits::Converter;

const SOURCES: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];
const TARGETS: &[&str] = &[".jpg", ".png", ".webp"];

/// Default JPEG quality when no preset is given.
const DEFAULT_QUALITY: u8 = 80;

/// Raises the flag when the awaiting future goes away, e.g. on a job timeout.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Converts and recompresses JPEG, PNG and WebP images.
#[derive(Debug, Default, Clone)]
pub struct ImageConverter;

impl ImageConverter {
    pub fn new() -> Self {
        Self
    }

    fn is_supported(ext: &str) -> bool {
        SOURCES.contains(&normalize_extension(ext).as_str())
    }

    fn quality(options: &ConversionOptions) -> u8 {
        match options.quality_preset() {
            Some(QualityPreset::High) => 92,
            Some(QualityPreset::Balanced) => 75,
            Some(QualityPreset::Compact) => 55,
            None => DEFAULT_QUALITY,
        }
    }

    fn png_compression(quality: u8) -> CompressionType {
        match quality {
            90.. => CompressionType::Fast,
            70..=89 => CompressionType::Default,
            _ => CompressionType::Best,
        }
    }

    /// Encodes into a sibling temp file and renames it over `target`, so a
    /// failed encode never leaves a truncated image behind. Nothing is
    /// renamed once `cancelled` is set.
    fn encode(
        img: &DynamicImage,
        target: &Path,
        target_ext: &str,
        quality: u8,
        cancelled: &AtomicBool,
    ) -> Result<(), ConverterError> {
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            match target_ext {
                ".jpg" | ".jpeg" => {
                    // JPEG has no alpha channel
                    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
                    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))?;
                }
                ".png" => {
                    img.write_with_encoder(PngEncoder::new_with_quality(
                        &mut writer,
                        Self::png_compression(quality),
                        FilterType::Adaptive,
                    ))?;
                }
                ".webp" => {
                    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
                    rgba.write_with_encoder(WebPEncoder::new_lossless(&mut writer))?;
                }
                other => return Err(ConverterError::unsupported("image", other)),
            }
            std::io::Write::flush(&mut writer)?;
        }
        if cancelled.load(Ordering::SeqCst) {
            return Err(ConverterError::conversion_failed("conversion cancelled", None));
        }
        tmp.persist(target).map_err(|e| ConverterError::Io(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl Converter for ImageConverter {
    fn name(&self) -> &str {
        "Image Converter"
    }

    fn can_convert(&self, source_ext: &str, target_ext: &str) -> bool {
        Self::is_supported(source_ext) && Self::is_supported(target_ext)
    }

    fn supported_source_extensions(&self) -> BTreeSet<String> {
        SOURCES.iter().map(|s| s.to_string()).collect()
    }

    fn supported_target_formats(&self, source_ext: &str) -> BTreeSet<String> {
        if !Self::is_supported(source_ext) {
            return BTreeSet::new();
        }
        TARGETS.iter().map(|s| s.to_string()).collect()
    }

    async fn convert(
        &self,
        source: &Path,
        target: &Path,
        options: &ConversionOptions,
    ) -> Result<(), ConverterError> {
        let source_ext = extension_of(source);
        let target_ext = extension_of(target);
        if !self.can_convert(&source_ext, &target_ext) {
            return Err(ConverterError::unsupported(source_ext, target_ext));
        }
        ensure_input(source).await?;

        let quality = Self::quality(options);
        let source = source.to_path_buf();
        let target = target.to_path_buf();
        let cancelled = Arc::new(AtomicBool::new(false));
        let _guard = CancelOnDrop(Arc::clone(&cancelled));

        tokio::task::spawn_blocking(move || {
            let img = ImageReader::open(&source)?.with_guessed_format()?.decode()?;
            Self::encode(&img, &target, &target_ext, quality, &cancelled)
        })
        .await
        .map_err(|e| ConverterError::conversion_failed(format!("encoder task failed: {e}"), None))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn write_test_image(path: &Path) {
        let img = RgbaImage::from_fn(10, 10, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([10, 20, 30, 128])
            }
        });
        DynamicImage::ImageRgba8(img).save(path).unwrap();
    }

    #[test]
    fn test_routing() {
        let c = ImageConverter::new();
        assert!(c.can_convert("JPG", "png"));
        assert!(c.can_convert(".jpeg", ".webp"));
        assert!(c.can_convert(".png", ".png"));
        assert!(!c.can_convert(".png", ".gif"));
        assert!(!c.can_convert(".bmp", ".png"));
        assert_eq!(c.supported_target_formats("png").len(), 3);
        assert!(c.supported_target_formats(".gif").is_empty());
        assert!(c.supported_source_extensions().contains(".jpeg"));
    }

    #[test]
    fn test_quality_mapping() {
        assert_eq!(ImageConverter::quality(&ConversionOptions::default()), 80);
        assert_eq!(
            ImageConverter::quality(&ConversionOptions::with_quality("High")),
            92
        );
        assert_eq!(
            ImageConverter::quality(&ConversionOptions::with_quality("Low")),
            55
        );
        assert_eq!(ImageConverter::png_compression(92), CompressionType::Fast);
        assert_eq!(ImageConverter::png_compression(55), CompressionType::Best);
    }

    #[tokio::test]
    async fn test_convert_between_formats() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("in.png");
        write_test_image(&png);

        let c = ImageConverter::new();
        let opts = ConversionOptions::with_quality("Balanced");

        let jpg = dir.path().join("out.jpg");
        c.convert(&png, &jpg, &opts).await.unwrap();
        let decoded = image::open(&jpg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (10, 10));

        let webp = dir.path().join("out.webp");
        c.convert(&jpg, &webp, &opts).await.unwrap();
        assert!(image::open(&webp).is_ok());

        let recompressed = dir.path().join("in_compressed.png");
        c.convert(&png, &recompressed, &opts).await.unwrap();
        assert!(image::open(&recompressed).is_ok());
    }

    #[test]
    fn test_cancelled_encode_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("late.png");
        let img = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));

        let err = ImageConverter::encode(&img, &target, ".png", 80, &AtomicBool::new(true))
            .unwrap_err();
        assert!(err.to_string().contains("cancelled"));
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        ImageConverter::encode(&img, &target, ".png", 80, &AtomicBool::new(false)).unwrap();
        assert!(target.exists());
    }

    #[test]
    fn test_dropping_guard_raises_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = CancelOnDrop(Arc::clone(&flag));
        assert!(!flag.load(Ordering::SeqCst));
        drop(guard);
        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_convert_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageConverter::new()
            .convert(
                &dir.path().join("missing.png"),
                &dir.path().join("out.jpg"),
                &ConversionOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn test_convert_rejects_unsupported_target() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("in.png");
        write_test_image(&png);

        let err = ImageConverter::new()
            .convert(&png, &dir.path().join("out.gif"), &ConversionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::UnsupportedConversion { .. }));
        assert!(!dir.path().join("out.gif").exists());
    }

    #[tokio::test]
    async fn test_corrupt_input_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"not an image").unwrap();
        let out = dir.path().join("out.jpg");

        let err = ImageConverter::new()
            .convert(&bad, &out, &ConversionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::Image(_)));
        assert!(!out.exists());
    }
}
