//! Defaults for generated pod units
//!
//! Every value here can be overridden per invocation on the command line.

use crate::{ConfigError, Result};
use generate::{service_name, validate_restart_policy, RestartPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default prefix of pod unit names
pub const DEFAULT_POD_PREFIX: &str = "pod";
/// Default prefix of container unit names
pub const DEFAULT_CONTAINER_PREFIX: &str = "container";
/// Default separator between prefix and name
pub const DEFAULT_SEPARATOR: &str = "-";
/// Default stop timeout in seconds
pub const DEFAULT_STOP_TIMEOUT: u32 = 10;

/// Unit generation settings (config.toml)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Prefix of pod unit names; empty for none
    pub pod_prefix: String,
    /// Prefix of container unit names; empty for none
    pub container_prefix: String,
    /// Separator between prefix and name
    pub separator: String,
    /// Seconds to wait for a pod to stop
    pub stop_timeout: u32,
    /// Seconds to wait for a pod to start
    pub start_timeout: Option<u32>,
    /// Restart policy of generated units
    pub restart_policy: Option<String>,
    /// Seconds between restarts
    pub restart_sec: Option<u32>,
    /// Generate units that create and remove their pod
    pub new: bool,
    /// Omit the "autogenerated by" header
    pub no_header: bool,
    /// Extra `Wants=` dependencies
    pub wants: Vec<String>,
    /// Extra `After=` dependencies
    pub after: Vec<String>,
    /// Extra `Requires=` dependencies
    pub requires: Vec<String>,
    /// Extra environment for generated services
    pub extra_envs: Vec<String>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            pod_prefix: DEFAULT_POD_PREFIX.to_string(),
            container_prefix: DEFAULT_CONTAINER_PREFIX.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            start_timeout: None,
            restart_policy: None,
            restart_sec: None,
            new: false,
            no_header: false,
            wants: Vec::new(),
            after: Vec::new(),
            requires: Vec::new(),
            extra_envs: Vec::new(),
        }
    }
}

impl GenerateConfig {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse settings from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize settings to TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Restart policy, validated
    pub fn restart_policy(&self) -> Result<Option<RestartPolicy>> {
        self.restart_policy
            .as_deref()
            .map(validate_restart_policy)
            .transpose()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Unit name of a pod
    pub fn pod_service_name(&self, name_or_id: &str) -> String {
        service_name(&self.pod_prefix, &self.separator, name_or_id)
    }

    /// Unit name of a container
    pub fn container_service_name(&self, name_or_id: &str) -> String {
        service_name(&self.container_prefix, &self.separator, name_or_id)
    }

    /// Check settings for values that would produce broken units
    pub fn validate(&self) -> Result<()> {
        self.restart_policy()?;

        for (key, value) in [
            ("pod_prefix", &self.pod_prefix),
            ("container_prefix", &self.container_prefix),
            ("separator", &self.separator),
        ] {
            if value.contains(|c: char| c.is_whitespace() || c == '/') {
                return Err(ConfigError::Invalid(format!(
                    "{} may not contain whitespace or '/': {:?}",
                    key, value
                )));
            }
        }

        if self.stop_timeout == 0 {
            tracing::warn!("stop_timeout is 0, pods will be killed without a grace period");
        }

        for env in &self.extra_envs {
            if !env.contains('=') {
                return Err(ConfigError::Invalid(format!(
                    "extra_envs entry is not KEY=value: {:?}",
                    env
                )));
            }
        }

        Ok(())
    }
}
