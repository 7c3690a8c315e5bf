//! Video transcoding through ffmpeg.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;

use super::command::{ensure_input, ensure_output, ExternalTool};
use super::config::ConverterConfig;
use super::error::ConverterError;
use super::extension::{extension_of, normalize_extension};
use super::options::{ConversionOptions, QualityPreset};
use super::traits::Converter;

const FORMATS: &[&str] = &[".mp4", ".avi", ".mkv", ".webm", ".gif", ".mov"];

const FFMPEG_HINT: &str = "please install ffmpeg to convert videos (https://ffmpeg.org)";

/// Encoding parameters derived from the quality preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VideoQuality {
    pub crf: &'static str,
    pub preset: &'static str,
    pub audio_bitrate: &'static str,
}

impl VideoQuality {
    pub(crate) fn from_options(options: &ConversionOptions) -> Self {
        match options.quality_preset() {
            Some(QualityPreset::High) => Self {
                crf: "18",
                preset: "slow",
                audio_bitrate: "256k",
            },
            Some(QualityPreset::Compact) => Self {
                crf: "28",
                preset: "fast",
                audio_bitrate: "128k",
            },
            Some(QualityPreset::Balanced) | None => Self {
                crf: "23",
                preset: "medium",
                audio_bitrate: "192k",
            },
        }
    }
}

/// Converts between common video containers (and animated GIF) with ffmpeg.
#[derive(Debug, Clone)]
pub struct VideoConverter {
    ffmpeg: ExternalTool,
}

impl VideoConverter {
    /// Creates a new video converter with the given configuration.
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            ffmpeg: ExternalTool::new("ffmpeg", &config.ffmpeg_path, FFMPEG_HINT),
        }
    }

    fn is_supported(ext: &str) -> bool {
        FORMATS.contains(&normalize_extension(ext).as_str())
    }

    /// Builds ffmpeg arguments for one conversion.
    pub(crate) fn build_args(source: &Path, target: &Path, quality: &VideoQuality) -> Vec<String> {
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
            ".gif" => vec![
                "-vf",
                "fps=15,scale=480:-1:flags=lanczos,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse",
                "-loop",
                "0",
            ],
            ".webm" => vec![
                "-c:v",
                "libvpx-vp9",
                "-crf",
                quality.crf,
                "-b:v",
                "0",
                "-c:a",
                "libopus",
                "-b:a",
                quality.audio_bitrate,
            ],
            ".mp4" => vec![
                "-c:v",
                "libx264",
                "-crf",
                quality.crf,
                "-preset",
                quality.preset,
                "-c:a",
                "aac",
                "-b:a",
                quality.audio_bitrate,
                "-movflags",
                "+faststart",
            ],
            ".mkv" => vec![
                "-c:v",
                "libx265",
                "-crf",
                quality.crf,
                "-preset",
                quality.preset,
                "-c:a",
                "aac",
                "-b:a",
                quality.audio_bitrate,
            ],
            ".avi" => vec![
                "-c:v",
                "mpeg4",
                "-q:v",
                quality.crf,
                "-c:a",
                "mp3",
                "-b:a",
                quality.audio_bitrate,
            ],
            ".mov" => vec![
                "-c:v",
                "libx264",
                "-crf",
                quality.crf,
                "-preset",
                quality.preset,
                "-c:a",
                "aac",
                "-b:a",
                quality.audio_bitrate,
            ],
            _ => vec!["-crf", quality.crf],
        };
        args.extend(codec_args.iter().map(|s| s.to_string()));

        args.push(target.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl Converter for VideoConverter {
    fn name(&self) -> &str {
        "Video Converter (ffmpeg)"
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
        self.ffmpeg.locate()?;

        let quality = VideoQuality::from_options(options);
        self.ffmpeg
            .run(Self::build_args(source, target, &quality))
            .await?;
        ensure_output(target).await
    }
}
