//! Converter registry: resolves extension pairs to a converter.

use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

use crate::converter::{normalize_extension, Converter};

/// Registry lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No registered converter accepts the pair. Extensions are normalized.
    #[error("no converter found for {source_ext} to {target_ext}")]
    NoConverter {
        source_ext: String,
        target_ext: String,
    },
}

/// Ordered list of converters.
///
/// Registration order is significant: [`resolve`](Self::resolve) returns the
/// first converter that accepts a pair. Populate it before sharing; the batch
/// engine reads it concurrently behind an `Arc` without locking.
#[derive(Default, Clone)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn Converter>>,
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("converters", &self.names())
            .finish()
    }
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a converter. No uniqueness check.
    pub fn register(&mut self, converter: impl Converter + 'static) {
        self.converters.push(Arc::new(converter));
    }

    /// Appends an already shared converter.
    pub fn register_arc(&mut self, converter: Arc<dyn Converter>) {
        self.converters.push(converter);
    }

    /// Returns the first registered converter that accepts the pair.
    ///
    /// Both extensions are normalized first, so `("JPG", "png")` and
    /// `(".jpg", ".png")` resolve identically.
    pub fn resolve(
        &self,
        source_ext: &str,
        target_ext: &str,
    ) -> Result<Arc<dyn Converter>, ResolveError> {
        let source_ext = normalize_extension(source_ext);
        let target_ext = normalize_extension(target_ext);

        self.converters
            .iter()
            .find(|c| c.can_convert(&source_ext, &target_ext))
            .cloned()
            .ok_or(ResolveError::NoConverter {
                source_ext,
                target_ext,
            })
    }

    /// Union of target formats for `source_ext` across all converters.
    pub fn supported_target_formats(&self, source_ext: &str) -> BTreeSet<String> {
        let source_ext = normalize_extension(source_ext);
        self.converters
            .iter()
            .flat_map(|c| c.supported_target_formats(&source_ext))
            .collect()
    }

    /// Union of readable extensions across all converters.
    pub fn supported_source_extensions(&self) -> BTreeSet<String> {
        self.converters
            .iter()
            .flat_map(|c| c.supported_source_extensions())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Converter names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.converters.iter().map(|c| c.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConverter;

    fn registry() -> ConverterRegistry {
        let mut r = ConverterRegistry::new();
        r.register(MockConverter::new("first").with_pair(".jpg", ".png"));
        r.register(
            MockConverter::new("second")
                .with_pair(".jpg", ".png")
                .with_pair(".jpg", ".webp")
                .with_pair(".gif", ".png"),
        );
        r
    }

    #[test]
    fn test_resolve_is_case_and_dot_insensitive() {
        let r = registry();
        for (src, tgt) in [("JPG", "PNG"), (".jpg", ".png"), ("jpg", "png"), (" .Jpg ", "png")] {
            assert_eq!(r.resolve(src, tgt).unwrap().name(), "first");
        }
    }

    #[test]
    fn test_first_registered_wins() {
        let r = registry();
        for _ in 0..10 {
            assert_eq!(r.resolve(".jpg", ".png").unwrap().name(), "first");
        }
        assert_eq!(r.resolve(".jpg", ".webp").unwrap().name(), "second");
    }

    #[test]
    fn test_resolve_failure_names_normalized_pair() {
        let err = registry().resolve("XYZ", "png").unwrap_err();
        assert_eq!(
            err,
            ResolveError::NoConverter {
                source_ext: ".xyz".to_string(),
                target_ext: ".png".to_string(),
            }
        );
        assert_eq!(err.to_string(), "no converter found for .xyz to .png");
    }

    #[test]
    fn test_unions_are_deduplicated() {
        let r = registry();
        let targets: Vec<_> = r.supported_target_formats("JPG").into_iter().collect();
        assert_eq!(targets, vec![".png", ".webp"]);

        let sources: Vec<_> = r.supported_source_extensions().into_iter().collect();
        assert_eq!(sources, vec![".gif", ".jpg"]);

        assert!(r.supported_target_formats(".bmp").is_empty());
    }

    #[test]
    fn test_empty_registry() {
        let r = ConverterRegistry::new();
        assert!(r.is_empty());
        assert!(r.resolve(".a", ".b").is_err());
        assert!(r.supported_source_extensions().is_empty());
    }

    #[test]
    fn test_register_arc_shares_instance() {
        let mock = MockConverter::new("shared").with_pair(".md", ".html");
        let mut r = ConverterRegistry::new();
        r.register_arc(Arc::new(mock.clone()));
        assert_eq!(r.len(), 1);
        assert_eq!(r.names(), vec!["shared"]);
    }
}
