//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles YAML file discovery,
//! environment detection, override merging and environment-variable overrides.

use super::error::{ConfigResult, ConfigurationError};
use super::SweepConfig;
use crate::constants::files::CONFIG_FILE;
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const ENVIRONMENT_SECTIONS: [&str; 3] = ["development", "test", "production"];

/// Loaded configuration together with the environment it was resolved for
#[derive(Debug)]
pub struct ConfigManager {
    config: SweepConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let mut config = Self::load_and_merge_config(&config_directory, environment)?;
        Self::apply_env_overrides(&mut config, |key| env::var(key).ok())?;

        config.validate()?;

        info!(
            environment = %environment,
            worker_count = config.workers.worker_count,
            start_time = %config.catalog.start_time,
            end_time = %config.catalog.end_time,
            output_directory = %config.checkpoint.output_directory.display(),
            "⚙️ CONFIG: Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: SweepConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_directory: PathBuf::from("config"),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment from environment variables
    fn detect_environment() -> String {
        crate::logging::get_environment()
    }

    /// `SWEEP_CONFIG_DIR` if set, otherwise the first conventional directory that holds the file
    fn default_config_directory() -> PathBuf {
        if let Ok(dir) = env::var("SWEEP_CONFIG_DIR") {
            return PathBuf::from(dir);
        }

        for dir in [PathBuf::from("config"), PathBuf::from(".")] {
            if dir.join(CONFIG_FILE).exists() {
                debug!("Found config directory: {}", dir.display());
                return dir;
            }
        }

        PathBuf::from("config")
    }

    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let candidate = config_directory.join(CONFIG_FILE);
        if candidate.is_file() {
            Ok(candidate)
        } else {
            Err(ConfigurationError::config_file_not_found(vec![candidate]))
        }
    }

    /// Safely read a configuration file with resource management and size limits
    fn read_config_file_safely(path: &Path) -> ConfigResult<String> {
        const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024; // 1MB limit

        let metadata = std::fs::metadata(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))?;

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::invalid_value(
                "file_size",
                metadata.len().to_string(),
                format!(
                    "Configuration file too large ({} bytes > {} bytes limit)",
                    metadata.len(),
                    MAX_CONFIG_FILE_SIZE
                ),
            ));
        }

        std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
    }

    fn load_and_merge_config(config_directory: &Path, environment: &str) -> ConfigResult<SweepConfig> {
        let config_file = Self::find_config_file(config_directory)?;
        let yaml_content = Self::read_config_file_safely(&config_file)?;
        Self::parse_with_environment(&yaml_content, &config_file.display().to_string(), environment)
    }

    /// Parse YAML text, applying the section named after `environment` over the base
    pub(crate) fn parse_with_environment(
        yaml_content: &str,
        source: &str,
        environment: &str,
    ) -> ConfigResult<SweepConfig> {
        let mut yaml_data: YamlValue = serde_yaml::from_str(yaml_content)
            .map_err(|e| ConfigurationError::invalid_yaml(source, e))?;

        // An empty file parses as null
        if yaml_data.is_null() {
            yaml_data = YamlValue::Mapping(Default::default());
        }

        if let Some(env_overrides) = yaml_data
            .get(YamlValue::String(environment.to_string()))
            .cloned()
        {
            debug!(
                "Applying environment-specific overrides for: {}",
                environment
            );
            Self::merge_yaml_values(&mut yaml_data, env_overrides);
        }

        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for section in ENVIRONMENT_SECTIONS {
                map.remove(YamlValue::String(section.to_string()));
            }
        }

        serde_yaml::from_value(yaml_data).map_err(|e| {
            ConfigurationError::invalid_yaml(
                source,
                format!("Failed to deserialize configuration: {e}"),
            )
        })
    }

    /// Recursively merge `override_value` into `base`; non-mapping values replace
    fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) {
        match (&mut *base, override_value) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
                for (key, value) in override_map {
                    if let Some(existing_value) = base_map.get_mut(&key) {
                        Self::merge_yaml_values(existing_value, value);
                    } else {
                        base_map.insert(key, value);
                    }
                }
            }
            (base_ref, override_val) => {
                *base_ref = override_val;
            }
        }
    }

    /// Apply the small set of supported environment-variable overrides
    pub(crate) fn apply_env_overrides<F>(config: &mut SweepConfig, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("SWEEP_WORKER_COUNT") {
            let count = raw.trim().parse::<usize>().map_err(|e| {
                ConfigurationError::environment_override_error("SWEEP_WORKER_COUNT", e)
            })?;
            debug!(worker_count = count, "Overriding worker count from environment");
            config.workers.worker_count = count;
        }

        if let Some(dir) = lookup("SWEEP_OUTPUT_DIR") {
            debug!(output_directory = %dir, "Overriding output directory from environment");
            config.checkpoint.output_directory = PathBuf::from(dir);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
catalog:
  start_time: "09:30"
  end_time: "10:00"
  interval_minutes: 5
workers:
  worker_count: 6
  poll_timeout_ms: 2000
test:
  workers:
    worker_count: 2
  checkpoint:
    interval_ms: 1000
production:
  workers:
    worker_count: 12
"#;

    #[test]
    fn test_environment_section_overrides_base() {
        let config = ConfigManager::parse_with_environment(SAMPLE, "inline", "test").unwrap();
        assert_eq!(config.workers.worker_count, 2);
        // Sibling keys in the same section survive the merge
        assert_eq!(config.workers.poll_timeout_ms, 2000);
        assert_eq!(config.checkpoint.interval_ms, 1000);
        assert_eq!(config.catalog.interval_minutes, 5);

        let config = ConfigManager::parse_with_environment(SAMPLE, "inline", "production").unwrap();
        assert_eq!(config.workers.worker_count, 12);

        let config = ConfigManager::parse_with_environment(SAMPLE, "inline", "development").unwrap();
        assert_eq!(config.workers.worker_count, 6);
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = ConfigManager::parse_with_environment("", "inline", "test").unwrap();
        assert_eq!(config, SweepConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let err = ConfigManager::parse_with_environment("workers: [", "broken.yaml", "test")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidYaml { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("SWEEP_WORKER_COUNT", "9"), ("SWEEP_OUTPUT_DIR", "/tmp/sweeps")]);
        let mut config = SweepConfig::default();
        ConfigManager::apply_env_overrides(&mut config, |key| {
            vars.get(key).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(config.workers.worker_count, 9);
        assert_eq!(config.checkpoint.output_directory, PathBuf::from("/tmp/sweeps"));

        let mut config = SweepConfig::default();
        let err = ConfigManager::apply_env_overrides(&mut config, |key| {
            (key == "SWEEP_WORKER_COUNT").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::EnvironmentOverrideError { .. }));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), SAMPLE).unwrap();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();
        assert_eq!(manager.environment(), "test");
        assert_eq!(manager.config().catalog.start_time, "09:30");
        assert_eq!(manager.config_directory(), dir.path());
    }

    #[test]
    fn test_shipped_config_is_valid_in_every_environment() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("config")
            .join(CONFIG_FILE);
        let content = fs::read_to_string(path).unwrap();
        for environment in ENVIRONMENT_SECTIONS {
            let config =
                ConfigManager::parse_with_environment(&content, "shipped", environment).unwrap();
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap_err();
        assert!(matches!(err, ConfigurationError::ConfigFileNotFound { .. }));
    }
}
