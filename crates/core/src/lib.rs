pub mod batch;
pub mod config;
pub mod converter;
pub mod registry;
pub mod testing;

pub use batch::{
    BatchConfig, BatchOutcome, BatchProcessor, BatchProgress, BatchResult, ConversionResult,
    JobError, TargetFormat,
};
pub use config::{load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError};
pub use converter::{default_registry, ConversionOptions, Converter, ConverterConfig, ConverterError};
pub use registry::{ConverterRegistry, ResolveError};
