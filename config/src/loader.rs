//! Configuration loading utilities
//!
//! Finds and loads the unit generation settings file.

use crate::{ConfigError, GenerateConfig, Result};
use std::path::{Path, PathBuf};

/// Configuration loader
pub struct ConfigLoader {
    /// Path of the settings file
    path: PathBuf,
    /// Whether to use default values when the file is missing
    use_defaults: bool,
    /// Whether to validate configuration after loading
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            use_defaults: true,
            validate: true,
        }
    }

    /// Create a loader for the system configuration
    pub fn system() -> Self {
        Self::new(paths::system_config())
    }

    /// Create a loader for the user configuration
    pub fn user() -> Result<Self> {
        let path = paths::user_config()
            .ok_or_else(|| ConfigError::Invalid("HOME not set".to_string()))?;
        Ok(Self::new(path))
    }

    /// Create a loader for the settings file in effect: the environment
    /// override, then the user file if it exists, then the system file.
    pub fn discover() -> Self {
        if let Some(path) = std::env::var_os(env_vars::CONFIG_PATH) {
            return Self::new(path);
        }

        match Self::user() {
            Ok(user) if user.path().exists() => user,
            _ => Self::system(),
        }
    }

    /// Set whether to use defaults for a missing file
    pub fn use_defaults(mut self, use_defaults: bool) -> Self {
        self.use_defaults = use_defaults;
        self
    }

    /// Set whether to validate configuration
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Load the configuration
    pub fn load(&self) -> Result<GenerateConfig> {
        if !self.path.exists() {
            if self.use_defaults {
                tracing::debug!(path = %self.path.display(), "no config file, using defaults");
                return Ok(GenerateConfig::default());
            } else {
                return Err(ConfigError::NotFound(self.path.clone()));
            }
        }

        let config = GenerateConfig::load(&self.path)?;
        tracing::debug!(path = %self.path.display(), "loaded config");

        if self.validate {
            config.validate()?;
        }

        Ok(config)
    }

    /// Get the settings file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Default configuration paths
pub mod paths {
    use std::path::PathBuf;

    /// System configuration file
    pub fn system_config() -> PathBuf {
        PathBuf::from("/etc/podunit/config.toml")
    }

    /// User configuration file
    pub fn user_config() -> Option<PathBuf> {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(".config/podunit/config.toml"))
    }
}

/// Environment variable names used by the configuration system
pub mod env_vars {
    /// Settings file override
    pub const CONFIG_PATH: &str = "PODUNIT_CONFIG";
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_loader_defaults() {
        let loader = ConfigLoader::new("/nonexistent/path/config.toml");
        let config = loader.load().unwrap();
        assert_eq!(config, GenerateConfig::default());
    }

    #[test]
    fn test_config_loader_no_defaults() {
        let loader = ConfigLoader::new("/nonexistent/path/config.toml").use_defaults(false);
        assert!(matches!(loader.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "separator = \"_\"\nnew = true\n").unwrap();

        let config = ConfigLoader::new(&path).load().unwrap();
        assert!(config.new);
        assert_eq!(config.pod_service_name("web"), "pod_web");
    }

    #[test]
    fn test_validation_toggle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "restart_policy = \"sometimes\"\n").unwrap();

        assert!(ConfigLoader::new(&path).load().is_err());
        let config = ConfigLoader::new(&path).validate(false).load().unwrap();
        assert_eq!(config.restart_policy.as_deref(), Some("sometimes"));
    }

    #[test]
    fn test_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "new = [").unwrap();

        assert!(matches!(
            ConfigLoader::new(&path).load(),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_discover_falls_back_to_a_default_path() {
        let loader = ConfigLoader::discover();
        let path = loader.path().to_path_buf();
        let known = std::env::var_os(env_vars::CONFIG_PATH).map(PathBuf::from);
        assert!(
            Some(&path) == known.as_ref()
                || Some(&path) == paths::user_config().as_ref()
                || path == paths::system_config()
        );
    }

    #[test]
    fn test_user_loader() {
        if let Ok(loader) = ConfigLoader::user() {
            assert!(loader.path().ends_with(".config/podunit/config.toml"));
        }
    }

    #[test]
    fn test_paths() {
        assert_eq!(
            paths::system_config(),
            PathBuf::from("/etc/podunit/config.toml")
        );
    }
}
