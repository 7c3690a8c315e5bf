//! Converter module: the capability contract and the bundled converters.
//!
//! A [`Converter`] declares which (source, target) extension pairs it handles
//! and performs one file conversion. The engine never looks past this trait.
//!
//! # Bundled converters
//!
//! - [`ImageConverter`]: JPEG, PNG and WebP, re-encoded in-process
//! - [`VideoConverter`]: container/codec transcoding through ffmpeg
//! - [`DocumentConverter`]: documents, ebooks and spreadsheets through pandoc,
//!   Calibre, Ghostscript, poppler and LibreOffice
//! - [`AudioConverter`]: audio transcoding through ffmpeg
//! - [`DataConverter`]: JSON, YAML, TOML, XML, CSV and Excel, in-process
//!
//! # Example
//!
//! ```ignore
//! use golter_core::converter::{default_registry, ConverterConfig};
//!
//! let registry = default_registry(&ConverterConfig::default());
//! let converter = registry.resolve("JPG", "png")?;
//! converter
//!     .convert(Path::new("a.jpg"), Path::new("a.png"), &ConversionOptions::default())
//!     .await?;
//! ```

mod audio;
mod command;
mod config;
mod data;
mod document;
mod error;
mod extension;
mod image;
mod options;
mod traits;
mod video;

pub use audio::AudioConverter;
pub use config::ConverterConfig;
pub use data::DataConverter;
pub use document::DocumentConverter;
pub use error::ConverterError;
pub use extension::{extension_of, normalize_extension};
pub use self::image::ImageConverter;
pub use options::{ConversionOptions, QualityPreset, EBOOK_ARGS, PANDOC_ARGS};
pub use traits::Converter;
pub use video::VideoConverter;

pub(crate) use extension::raw_extension_of;

use crate::registry::ConverterRegistry;

/// Builds a registry holding every bundled converter.
///
/// Registration order decides ties: image, video, document, audio, data.
pub fn default_registry(config: &ConverterConfig) -> ConverterRegistry {
    let mut registry = ConverterRegistry::new();
    registry.register(ImageConverter::new());
    registry.register(VideoConverter::new(config));
    registry.register(DocumentConverter::new(config));
    registry.register(AudioConverter::new(config));
    registry.register(DataConverter::new());
    registry
}
