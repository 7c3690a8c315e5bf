//! Audio transcoding through ffmpeg.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;

use super::command::{ensure_input, ensure_output, ExternalTool};
use super::config::ConverterConfig;
use super::error::ConverterError;
use super::extension::{extension_of, normalize_extension};
use super::options::{ConversionOptions, QualityPreset};
use super::traits::Converter;

const FORMATS: &[&str] = &[".mp3", ".wav", ".ogg", ".flac", ".m4a", ".aac"];

const FFMPEG_HINT: &str = "please install ffmpeg to convert audio (https://ffmpeg.org)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AudioQuality {
    pub bitrate: &'static str,
    pub sample_rate: &'static str,
}

impl AudioQuality {
    pub(crate) fn from_options(options: &ConversionOptions) -> Self {
        match options.quality_preset() {
            Some(QualityPreset::High) => Self {
                bitrate: "320k",
                sample_rate: "48000",
            },
            Some(QualityPreset::Compact) => Self {
                bitrate: "128k",
                sample_rate: "44100",
            },
            Some(QualityPreset::Balanced) | None => Self {
                bitrate: "192k",
                sample_rate: "44100",
            },
        }
    }
}

/// Converts between common audio formats with ffmpeg.
#[derive(Debug, Clone)]
pub struct AudioConverter {
    ffmpeg: ExternalTool,
}

impl AudioConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            ffmpeg: ExternalTool::new("ffmpeg", &config.ffmpeg_path, FFMPEG_HINT),
        }
    }

    fn is_supported(ext: &str) -> bool {
        FORMATS.contains(&normalize_extension(ext).as_str())
    }

    pub(crate) fn build_args(source: &Path, target: &Path, quality: &AudioQuality) -> Vec<String> {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let mut args: Vec<String> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            source.to_string_lossy().into_owned(),
            "-threads".into(),
            threads.to_string(),
        ];

        let codec_args: Vec<&str> = match extension_of(target).as_str() {
            ".mp3" => vec![
                "-c:a",
                "libmp3lame",
                "-b:a",
                quality.bitrate,
                "-ar",
                quality.sample_rate,
            ],
            ".ogg" => vec![
                "-c:a",
                "libvorbis",
                "-b:a",
                quality.bitrate,
                "-ar",
                quality.sample_rate,
            ],
            // Lossless, bitrate does not apply
            ".flac" => vec!["-c:a", "flac", "-ar", quality.sample_rate],
            ".wav" => vec!["-c:a", "pcm_s16le", "-ar", quality.sample_rate],
            ".m4a" | ".aac" => vec![
                "-c:a",
                "aac",
                "-b:a",
                quality.bitrate,
                "-ar",
                quality.sample_rate,
            ],
            _ => vec!["-b:a", quality.bitrate],
        };
        args.extend(codec_args.iter().map(|s| s.to_string()));

        args.push(target.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl Converter for AudioConverter {
    fn name(&self) -> &str {
        "Audio Converter (ffmpeg)"
    }

    fn can_convert(&self, source_ext: &str, target_ext: &str) -> bool {
        Self::is_supported(source_ext) && Self::is_supported(target_ext)
    }

    fn supported_source_extensions(&self) -> BTreeSet<String> {
        FORMATS.iter().map(|s| s.to_string()).collect()
    }

    fn supported_target_formats(&self, source_ext: &str) -> BTreeSet<String> {
        if !Self::is_supported(source_ext) {
            return BTreeSet::new();
        }
        FORMATS.iter().map(|s| s.to_string()).collect()
    }

    async fn convert(
        &self,
        source: &Path,
        target: &Path,
        options: &ConversionOptions,
    ) -> Result<(), ConverterError> {
        let (source_ext, target_ext) = (extension_of(source), extension_of(target));
        if !self.can_convert(&source_ext, &target_ext) {
            return Err(ConverterError::unsupported(source_ext, target_ext));
        }
        ensure_input(source).await?;

        let quality = AudioQuality::from_options(options);
        self.ffmpeg
            .run(Self::build_args(source, target, &quality))
            .await?;
        ensure_output(target).await
    }
}
