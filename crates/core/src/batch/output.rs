//! Target selection and output path derivation.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::converter::{extension_of, normalize_extension, raw_extension_of};

const COMPRESSED_SUFFIX: &str = "_compressed";
const CONVERTED_SUFFIX: &str = "_converted";

/// What a batch produces for each input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFormat {
    /// Re-encode each file in its own format.
    Compress,
    /// Convert to this normalized extension.
    Extension(String),
}

impl TargetFormat {
    /// Parses a user-supplied target. An empty string means [`Compress`](Self::Compress).
    pub fn parse(target: &str) -> Self {
        let ext = normalize_extension(target);
        if ext.is_empty() {
            Self::Compress
        } else {
            Self::Extension(ext)
        }
    }

    pub fn is_compress(&self) -> bool {
        matches!(self, Self::Compress)
    }

    /// The extension a given input is converted to.
    pub fn effective_extension(&self, input: &Path) -> String {
        match self {
            Self::Compress => extension_of(input),
            Self::Extension(ext) => ext.clone(),
        }
    }
}

impl From<&str> for TargetFormat {
    fn from(target: &str) -> Self {
        Self::parse(target)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compress => write!(f, "compress"),
            Self::Extension(ext) => write!(f, "{ext}"),
        }
    }
}

fn with_stem_suffix(input: &Path, suffix: &str, ext: &str) -> PathBuf {
    let mut name: OsString = input.file_stem().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    name.push(ext);
    input.with_file_name(name)
}

fn same_path_ignoring_case(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

/// Derives where the output for `input` is written.
///
/// - Compress: `photo.jpg` becomes `photo_compressed.jpg`, keeping the
///   extension exactly as written.
/// - Convert: `report.docx` to `.pdf` becomes `report.pdf`. When that would be
///   the input itself (compared case-insensitively) it becomes
///   `report_converted.pdf` instead.
pub fn derive_output_path(input: &Path, target: &TargetFormat) -> PathBuf {
    match target {
        TargetFormat::Compress => {
            with_stem_suffix(input, COMPRESSED_SUFFIX, &raw_extension_of(input))
        }
        TargetFormat::Extension(ext) => {
            let candidate = with_stem_suffix(input, "", ext);
            if same_path_ignoring_case(&candidate, input) {
                with_stem_suffix(input, CONVERTED_SUFFIX, ext)
            } else {
                candidate
            }
        }
    }
}
