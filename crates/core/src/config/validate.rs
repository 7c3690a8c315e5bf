use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Concurrency cap and progress buffer are at least 1
/// - Job timeout, when set, is at least one second
/// - No tool path is empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Batch validation
    if config.batch.max_parallel_conversions == 0 {
        return Err(ConfigError::ValidationError(
            "batch.max_parallel_conversions cannot be 0".to_string(),
        ));
    }
    if config.batch.progress_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "batch.progress_buffer cannot be 0".to_string(),
        ));
    }
    if config.batch.job_timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "batch.job_timeout_secs cannot be 0 (omit it to disable the timeout)".to_string(),
        ));
    }

    // Converter validation
    for (key, path) in config.converter.tool_paths() {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "converter.{} cannot be empty",
                key
            )));
        }
    }

    Ok(())
}
