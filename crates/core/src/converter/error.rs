//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during a single conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// A required external tool is not installed or not on `PATH`.
    #[error("{tool} not found: {hint}")]
    ToolNotFound { tool: String, hint: String },

    /// Input file not found.
    #[error("source file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The converter cannot produce the target from the source.
    #[error("unsupported conversion: {source_ext} to {target_ext}")]
    UnsupportedConversion {
        source_ext: String,
        target_ext: String,
    },

    /// The conversion ran but failed.
    #[error("conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Image decoding or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Structured input could not be parsed or re-serialized.
    #[error("failed to parse input: {reason}")]
    Parse { reason: String },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a new conversion failed error with captured tool output.
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    /// Creates an unsupported conversion error.
    pub fn unsupported(source_ext: impl Into<String>, target_ext: impl Into<String>) -> Self {
        Self::UnsupportedConversion {
            source_ext: source_ext.into(),
            target_ext: target_ext.into(),
        }
    }

    /// Whether the failure is caused by the host missing a tool rather than by the input.
    pub fn is_missing_dependency(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. })
    }

    /// Captured tool output, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::ConversionFailed { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}
