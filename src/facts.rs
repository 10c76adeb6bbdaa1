//! Pod description files
//!
//! A pod description records what the container engine knows about a pod:
//! its identity, storage roots, member containers and the command that
//! created it. It is written in TOML or JSON and turned into the facts a
//! unit is rendered from.

use anyhow::{bail, Context, Result};
use config::GenerateConfig;
use generate::PodFacts;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Managing binary used when a description does not name one
pub const DEFAULT_EXECUTABLE: &str = "/usr/bin/podman";

/// A pod as recorded by the container engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodDescription {
    /// Pod name
    pub name: String,
    /// Pod ID
    pub id: String,
    /// Name or ID of the infra container
    pub infra: String,
    /// conmon PID file of the infra container
    pub pid_file: String,
    /// Managing binary
    pub executable: Option<String>,
    /// Engine version
    pub version: String,
    /// Storage graph root
    pub graph_root: String,
    /// Storage run root
    pub run_root: String,
    /// Member containers, infra excluded
    pub containers: Vec<String>,
    /// Invocation that created the pod
    pub create_command: Vec<String>,
}

impl PodDescription {
    /// Load a description, picking the format from the file extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pod description: {}", path.display()))?;

        let description: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON: {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML: {}", path.display()))?,
        };

        description.check()?;
        Ok(description)
    }

    /// Reject descriptions no unit can be generated for
    fn check(&self) -> Result<()> {
        if self.name.is_empty() && self.id.is_empty() {
            bail!("Pod description has neither a name nor an ID");
        }
        if self.run_root.is_empty() {
            bail!("Pod description has no run_root");
        }
        Ok(())
    }

    /// Identifier used in unit names
    pub fn ident(&self, use_name: bool) -> &str {
        if (use_name && !self.name.is_empty()) || self.id.is_empty() {
            &self.name
        } else {
            &self.id
        }
    }

    /// Facts for rendering this pod's unit under the given settings
    pub fn to_facts(&self, config: &GenerateConfig, use_name: bool) -> PodFacts {
        PodFacts {
            executable: self
                .executable
                .clone()
                .unwrap_or_else(|| DEFAULT_EXECUTABLE.to_string()),
            service_name: config.pod_service_name(self.ident(use_name)),
            infra_name_or_id: self.infra.clone(),
            pid_file: self.pid_file.clone(),
            stop_timeout: config.stop_timeout,
            start_timeout: config.start_timeout,
            restart_policy: config.restart_policy.clone().unwrap_or_default(),
            restart_sec: config.restart_sec,
            podman_version: self.version.clone(),
            graph_root: self.graph_root.clone(),
            run_root: self.run_root.clone(),
            required_services: self
                .containers
                .iter()
                .map(|c| config.container_service_name(c))
                .collect(),
            wants: config.wants.clone(),
            after: config.after.clone(),
            requires: config.requires.clone(),
            extra_envs: config.extra_envs.clone(),
            create_command: self.create_command.clone(),
        }
    }
}
