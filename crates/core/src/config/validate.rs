use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Volume names are non-empty and unique, paths are non-empty
/// - `storage.default_volume` names a configured volume
/// - Worker pool sizes are at least 1
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for volume in &config.storage.volumes {
        if volume.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.volumes[].name cannot be empty".to_string(),
            ));
        }
        if volume.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "storage volume '{}' has an empty path",
                volume.name
            )));
        }
        if !names.insert(volume.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate storage volume name '{}'",
                volume.name
            )));
        }
    }

    if let Some(default) = &config.storage.default_volume {
        if !names.contains(default.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "storage.default_volume '{}' is not a configured volume",
                default
            )));
        }
    }

    let processor = &config.processor;
    if processor.max_parallel_batch == 0
        || processor.max_parallel_repair == 0
        || processor.max_parallel_scans == 0
    {
        return Err(ConfigError::ValidationError(
            "processor pool sizes must be at least 1".to_string(),
        ));
    }
    if processor.event_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "processor.event_buffer cannot be 0".to_string(),
        ));
    }

    Ok(())
}
