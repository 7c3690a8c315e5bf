//! Testing utilities: an instrumented fake converter.
//!
//! Lets batch behavior be exercised without any external tools installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use golter_core::testing::{fixtures, MockConverter};
//!
//! let mock = MockConverter::new("fake").with_pair(".jpg", ".png");
//! let registry = fixtures::registry_with(mock.clone());
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedConversion};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use super::MockConverter;
    use crate::registry::ConverterRegistry;

    /// A shared registry holding only `mock`.
    pub fn registry_with(mock: MockConverter) -> Arc<ConverterRegistry> {
        let mut registry = ConverterRegistry::new();
        registry.register(mock);
        Arc::new(registry)
    }

    /// Create `count` empty files named `file_<n>.<ext>` under `dir`.
    pub fn touch_files(dir: &Path, ext: &str, count: usize) -> std::io::Result<Vec<PathBuf>> {
        let ext = ext.trim_start_matches('.');
        (0..count)
            .map(|i| {
                let path = dir.join(format!("file_{i}.{ext}"));
                std::fs::write(&path, b"input")?;
                Ok(path)
            })
            .collect()
    }
}
