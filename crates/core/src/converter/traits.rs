//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use super::error::ConverterError;
use super::options::ConversionOptions;

/// A format handler that can convert files between extensions.
///
/// Extensions passed to the predicate and listing methods may be upper or
/// lower case, with or without the leading dot. Returned extensions are
/// always lowercase and dot-prefixed.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the display name of this converter.
    fn name(&self) -> &str;

    /// Whether this converter can produce `target_ext` from `source_ext`.
    fn can_convert(&self, source_ext: &str, target_ext: &str) -> bool;

    /// Extensions this converter can read.
    fn supported_source_extensions(&self) -> BTreeSet<String>;

    /// Extensions this converter can write for the given source.
    ///
    /// Empty when the source extension is not recognized.
    fn supported_target_formats(&self, source_ext: &str) -> BTreeSet<String>;

    /// Converts `source` into `target`, creating or overwriting `target`.
    async fn convert(
        &self,
        source: &Path,
        target: &Path,
        options: &ConversionOptions,
    ) -> Result<(), ConverterError>;
}

impl fmt::Debug for dyn Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter").field("name", &self.name()).finish()
    }
}
