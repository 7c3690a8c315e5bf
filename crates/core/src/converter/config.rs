//! Configuration for the bundled converters.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Locations of the external tools the bundled converters shell out to.
///
/// Bare names are looked up on `PATH`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary (video and audio).
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to pandoc binary (markdown, HTML, DOCX, EPUB writing).
    #[serde(default = "default_pandoc_path")]
    pub pandoc_path: PathBuf,

    /// Path to Calibre's `ebook-convert`.
    #[serde(default = "default_ebook_convert_path")]
    pub ebook_convert_path: PathBuf,

    /// Path to Ghostscript (PDF compression).
    #[serde(default = "default_ghostscript_path")]
    pub ghostscript_path: PathBuf,

    /// Path to poppler's `pdftotext`.
    #[serde(default = "default_pdftotext_path")]
    pub pdftotext_path: PathBuf,

    /// Path to LibreOffice's `soffice` (spreadsheets).
    #[serde(default = "default_soffice_path")]
    pub soffice_path: PathBuf,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_pandoc_path() -> PathBuf {
    PathBuf::from("pandoc")
}

fn default_ebook_convert_path() -> PathBuf {
    PathBuf::from("ebook-convert")
}

fn default_ghostscript_path() -> PathBuf {
    PathBuf::from("gs")
}

fn default_pdftotext_path() -> PathBuf {
    PathBuf::from("pdftotext")
}

fn default_soffice_path() -> PathBuf {
    PathBuf::from("soffice")
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            pandoc_path: default_pandoc_path(),
            ebook_convert_path: default_ebook_convert_path(),
            ghostscript_path: default_ghostscript_path(),
            pdftotext_path: default_pdftotext_path(),
            soffice_path: default_soffice_path(),
        }
    }
}

impl ConverterConfig {
    /// Sets the ffmpeg path.
    pub fn with_ffmpeg(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    /// Sets the pandoc path.
    pub fn with_pandoc(mut self, path: impl Into<PathBuf>) -> Self {
        self.pandoc_path = path.into();
        self
    }

    /// Sets the Calibre `ebook-convert` path.
    pub fn with_ebook_convert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ebook_convert_path = path.into();
        self
    }

    /// All configured tool paths, labelled by config key.
    pub fn tool_paths(&self) -> [(&'static str, &PathBuf); 6] {
        [
            ("ffmpeg_path", &self.ffmpeg_path),
            ("pandoc_path", &self.pandoc_path),
            ("ebook_convert_path", &self.ebook_convert_path),
            ("ghostscript_path", &self.ghostscript_path),
            ("pdftotext_path", &self.pdftotext_path),
            ("soffice_path", &self.soffice_path),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.pandoc_path, PathBuf::from("pandoc"));
        assert_eq!(config.ebook_convert_path, PathBuf::from("ebook-convert"));
        assert_eq!(config.ghostscript_path, PathBuf::from("gs"));
    }

    #[test]
    fn test_config_builder() {
        let config = ConverterConfig::default()
            .with_ffmpeg("/opt/ffmpeg/bin/ffmpeg")
            .with_pandoc("/usr/local/bin/pandoc")
            .with_ebook_convert("/Applications/calibre.app/Contents/MacOS/ebook-convert");

        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.pandoc_path, PathBuf::from("/usr/local/bin/pandoc"));
        assert!(config
            .ebook_convert_path
            .ends_with("calibre.app/Contents/MacOS/ebook-convert"));
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: ConverterConfig = toml::from_str(r#"ffmpeg_path = "/x/ffmpeg""#).unwrap();
        assert_eq!(config.ffmpeg_path, PathBuf::from("/x/ffmpeg"));
        assert_eq!(config.soffice_path, PathBuf::from("soffice"));
    }

    #[test]
    fn test_tool_paths_lists_every_tool() {
        let config = ConverterConfig::default();
        let keys: Vec<_> = config.tool_paths().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys.len(), 6);
        assert!(keys.contains(&"pdftotext_path"));
    }
}
