//! Options passed through from the caller to a converter.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Option key for extra pandoc arguments.
pub const PANDOC_ARGS: &str = "pandoc_args";

/// Option key for extra Calibre `ebook-convert` arguments.
pub const EBOOK_ARGS: &str = "ebook_args";

/// Configuration bag for one batch.
///
/// The engine never looks inside; it clones the bag into every job and hands
/// it to the resolved converter unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Quality label such as "High", "Balanced" or "Compact".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,

    /// Converter-specific keys.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl ConversionOptions {
    /// Creates options with a quality label.
    pub fn with_quality(quality: impl Into<String>) -> Self {
        Self {
            quality: Some(quality.into()),
            ..Default::default()
        }
    }

    /// Adds a converter-specific key.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Returns the quality preset the label maps to, if any.
    pub fn quality_preset(&self) -> Option<QualityPreset> {
        self.quality.as_deref().and_then(QualityPreset::from_label)
    }

    /// Reads a list of command-line arguments from an extra key.
    ///
    /// Accepts either a whitespace-separated string or an array of strings.
    pub fn extra_args(&self, key: &str) -> Vec<String> {
        match self.extra.get(key) {
            Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Quality presets recognized by the bundled converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    /// Larger output, best fidelity.
    High,
    /// Default trade-off.
    Balanced,
    /// Smallest output.
    Compact,
}

impl QualityPreset {
    /// Maps a UI label to a preset.
    ///
    /// Matching is by substring so labels like "High (slow)" still resolve.
    pub fn from_label(label: &str) -> Option<Self> {
        let lower = label.to_lowercase();
        if lower.contains("high") {
            Some(Self::High)
        } else if lower.contains("balanced") || lower.contains("medium") {
            Some(Self::Balanced)
        } else if lower.contains("compact") || lower.contains("low") {
            Some(Self::Compact)
        } else {
            None
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Balanced => "Balanced",
            Self::Compact => "Compact",
        }
    }
}
