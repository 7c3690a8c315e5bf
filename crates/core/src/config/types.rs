use serde::{Deserialize, Serialize};

use crate::batch::BatchConfig;
use crate::converter::ConverterConfig;

/// Top-level configuration.
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// External tool locations.
    #[serde(default)]
    pub converter: ConverterConfig,

    /// Batch execution limits.
    #[serde(default)]
    pub batch: BatchConfig,
}
