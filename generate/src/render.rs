//! Pod unit rendering.
//!
//! Assembles the `[Unit]`, `[Service]` and `[Install]` sections of a pod's
//! service unit. The output is compared verbatim by downstream tooling, so
//! line order, blank lines and the trailing newline are fixed.

use crate::deps::compose_dependencies;
use crate::error::Result;
use crate::policy::{validate_restart_policy, RestartPolicy};
use crate::rewrite::{join_args, rewrite_create_command, IdFiles, Lifecycle};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Product named in the header comment and description.
pub const PRODUCT_NAME: &str = "Podman";
/// `Documentation=` value of every generated unit.
pub const DOCUMENTATION: &str = "man:podman-generate-systemd(1)";
/// Environment variable telling the pod which unit manages it.
pub const UNIT_ENV_VARIABLE: &str = "PODMAN_SYSTEMD_UNIT";
/// systemd specifier for the runtime directory.
pub const RUNTIME_DIR: &str = "%t";
/// Grace period added to the stop timeout for `TimeoutStopSec=`.
pub const MIN_TIMEOUT_STOP_SEC: u32 = 60;
/// Exit policy of pods created by a new-mode unit unless set explicitly.
pub const DEFAULT_EXIT_POLICY: &str = "--exit-policy=stop";

/// What is known about a pod when its unit is generated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodFacts {
    /// Managing binary, embedded verbatim in `Exec*=` lines
    pub executable: String,
    /// Unit base name
    pub service_name: String,
    /// Name or ID of the pod's infra container
    pub infra_name_or_id: String,
    /// PID file of an existing pod
    pub pid_file: String,
    /// Seconds to wait for the pod to stop
    pub stop_timeout: u32,
    /// Seconds to wait for the pod to start
    pub start_timeout: Option<u32>,
    /// Restart policy; empty means the default
    pub restart_policy: String,
    /// Seconds between restarts
    pub restart_sec: Option<u32>,
    /// Version named in the header comment
    pub podman_version: String,
    /// Storage graph root
    pub graph_root: String,
    /// Storage run root
    pub run_root: String,
    /// Member container units, without `.service` suffix
    pub required_services: Vec<String>,
    /// Additional `Wants=` dependencies
    pub wants: Vec<String>,
    /// Additional `After=` dependencies
    pub after: Vec<String>,
    /// Additional `Requires=` dependencies
    pub requires: Vec<String>,
    /// Additional `KEY=value` environment for the service
    pub extra_envs: Vec<String>,
    /// Captured invocation that created the pod
    pub create_command: Vec<String>,
}

/// Rendering switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Create and remove the pod from the unit
    pub new: bool,
    /// Omit the "autogenerated by" comment
    pub no_header: bool,
}

impl RenderOptions {
    /// Lifecycle the unit manages.
    pub fn lifecycle(&self) -> Lifecycle {
        if self.new {
            Lifecycle::New
        } else {
            Lifecycle::Existing
        }
    }
}

/// Unit file name of a service.
pub fn unit_name(service_name: &str) -> String {
    format!("{}.service", service_name)
}

/// Service name for a pod or container.
///
/// An empty prefix yields the bare name, without separator.
pub fn service_name(prefix: &str, separator: &str, name_or_id: &str) -> String {
    if prefix.is_empty() {
        name_or_id.to_string()
    } else {
        format!("{}{}{}", prefix, separator, name_or_id)
    }
}

/// Render the service unit of a pod.
///
/// Nothing is returned on error; a bad restart policy or an unrewritable
/// create command fails the whole render.
pub fn render_pod_unit(facts: &PodFacts, options: &RenderOptions) -> Result<String> {
    let restart = if facts.restart_policy.is_empty() {
        RestartPolicy::default()
    } else {
        validate_restart_policy(&facts.restart_policy)?
    };

    let unit = unit_name(&facts.service_name);
    debug!(unit = %unit, new = options.new, "rendering pod unit");

    let exec_lines = match options.lifecycle() {
        Lifecycle::Existing => existing_pod_exec(facts),
        Lifecycle::New => new_pod_exec(facts)?,
    };

    let deps = compose_dependencies(
        &facts.required_services,
        &facts.wants,
        &facts.after,
        &facts.requires,
    );

    let mut lines = vec![format!("# {}", unit)];
    if !options.no_header {
        lines.push(format!(
            "# autogenerated by {} {}",
            PRODUCT_NAME, facts.podman_version
        ));
    }

    lines.push(String::new());
    lines.push("[Unit]".to_string());
    lines.push(format!("Description={} {}", PRODUCT_NAME, unit));
    lines.push(format!("Documentation={}", DOCUMENTATION));
    lines.push("Wants=network-online.target".to_string());
    lines.push("After=network-online.target".to_string());
    lines.push(format!("RequiresMountsFor={}", facts.run_root));
    lines.extend(deps.required_lines());
    lines.extend(deps.user_defined_lines());

    lines.push(String::new());
    lines.push("[Service]".to_string());
    lines.push(format!("Environment={}=%n", UNIT_ENV_VARIABLE));
    if !facts.extra_envs.is_empty() {
        lines.push(format!("Environment={}", join_args(&facts.extra_envs)));
    }
    lines.push(format!("Restart={}", restart));
    if let Some(sec) = facts.restart_sec.filter(|s| *s > 0) {
        lines.push(format!("RestartSec={}", sec));
    }
    if let Some(sec) = facts.start_timeout.filter(|s| *s > 0) {
        lines.push(format!("TimeoutStartSec={}", sec));
    }
    lines.push(format!(
        "TimeoutStopSec={}",
        facts.stop_timeout.saturating_add(MIN_TIMEOUT_STOP_SEC)
    ));
    lines.extend(exec_lines);
    lines.push("Type=forking".to_string());

    lines.push(String::new());
    lines.push("[Install]".to_string());
    lines.push("WantedBy=default.target".to_string());

    let mut text = lines.join("\n");
    text.push('\n');
    Ok(text)
}

/// Start and stop the infra container of a pod that already exists.
fn existing_pod_exec(facts: &PodFacts) -> Vec<String> {
    let exe = &facts.executable;
    let infra = &facts.infra_name_or_id;
    let timeout = facts.stop_timeout;

    vec![
        format!("ExecStart={} start {}", exe, infra),
        format!("ExecStop={} stop -t {} {}", exe, timeout, infra),
        format!("ExecStopPost={} stop -t {} {}", exe, timeout, infra),
        format!("PIDFile={}", facts.pid_file),
    ]
}

/// Create the pod on start and remove it on stop.
fn new_pod_exec(facts: &PodFacts) -> Result<Vec<String>> {
    let exe = facts.executable.as_str();
    let files = IdFiles::new(RUNTIME_DIR, &facts.service_name);
    let command = rewrite_create_command(
        &facts.create_command,
        Lifecycle::New,
        RUNTIME_DIR,
        &facts.service_name,
    )?;

    let defaults: &[&str] = if command.has_exit_policy() {
        &[]
    } else {
        &[DEFAULT_EXIT_POLICY]
    };
    let pod_id_file = files.pod_id_file.as_str();
    let timeout = facts.stop_timeout.to_string();

    Ok(vec![
        format!(
            "ExecStartPre=/bin/rm -f {} {}",
            files.pid_file, files.pod_id_file
        ),
        format!("ExecStartPre={}", command.create_line(exe, defaults)),
        format!(
            "ExecStart={}",
            command.command_line(exe, &["pod", "start", "--pod-id-file", pod_id_file])
        ),
        format!(
            "ExecStop={}",
            command.command_line(
                exe,
                &["pod", "stop", "--ignore", "--pod-id-file", pod_id_file, "-t", timeout.as_str()]
            )
        ),
        format!(
            "ExecStopPost={}",
            command.command_line(
                exe,
                &["pod", "rm", "--ignore", "-f", "--pod-id-file", pod_id_file]
            )
        ),
        format!("PIDFile={}", files.pid_file),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn facts() -> PodFacts {
        PodFacts {
            executable: "/usr/bin/podman".to_string(),
            service_name: "pod-123abc".to_string(),
            infra_name_or_id: "jadda-jadda-infra".to_string(),
            pid_file: "/run/containers/storage/conmon.pid".to_string(),
            stop_timeout: 42,
            podman_version: "CI".to_string(),
            graph_root: "/var/lib/containers/storage".to_string(),
            run_root: "/var/run/containers/storage".to_string(),
            required_services: vec!["container-1".to_string(), "container-2".to_string()],
            create_command: ["podman", "pod", "create", "--name", "foo"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Default::default()
        }
    }

    fn new_mode() -> RenderOptions {
        RenderOptions {
            new: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_service_name() {
        assert_eq!(service_name("pod", "-", "123abc"), "pod-123abc");
        assert_eq!(service_name("pod", "_", "123abc"), "pod_123abc");
        assert_eq!(service_name("", "-", "123abc"), "123abc");
    }

    #[test]
    fn test_existing_mode_body() {
        let unit = render_pod_unit(&facts(), &RenderOptions::default()).unwrap();
        assert!(unit.contains("\nTimeoutStopSec=102\n"));
        assert!(unit.contains("\nExecStart=/usr/bin/podman start jadda-jadda-infra\n"));
        assert!(unit.contains("\nExecStop=/usr/bin/podman stop -t 42 jadda-jadda-infra\n"));
        assert!(unit.contains("\nPIDFile=/run/containers/storage/conmon.pid\nType=forking\n"));
        assert!(!unit.contains("ExecStartPre"));
    }

    #[test]
    fn test_new_mode_body() {
        let facts = PodFacts {
            stop_timeout: 10,
            ..facts()
        };
        let unit = render_pod_unit(&facts, &new_mode()).unwrap();
        assert!(unit.contains("\nTimeoutStopSec=70\n"));
        assert!(unit.contains("\nPIDFile=%t/pod-123abc.pid\n"));
        assert!(unit.contains(
            "\nExecStart=/usr/bin/podman pod start --pod-id-file %t/pod-123abc.pod-id\n"
        ));
        assert!(unit.contains("--exit-policy=stop --name foo --replace\n"));
    }

    #[test]
    fn test_header_switch() {
        let with = render_pod_unit(&facts(), &RenderOptions::default()).unwrap();
        assert!(with.starts_with("# pod-123abc.service\n# autogenerated by Podman CI\n\n[Unit]\n"));

        let options = RenderOptions {
            no_header: true,
            ..Default::default()
        };
        let without = render_pod_unit(&facts(), &options).unwrap();
        assert!(without.starts_with("# pod-123abc.service\n\n[Unit]\n"));
    }

    #[test]
    fn test_restart_policy() {
        let facts = PodFacts {
            restart_policy: "always".to_string(),
            ..facts()
        };
        let unit = render_pod_unit(&facts, &RenderOptions::default()).unwrap();
        assert!(unit.contains("\nRestart=always\n"));
    }

    #[test]
    fn test_invalid_restart_policy_aborts() {
        let facts = PodFacts {
            restart_policy: "sometimes".to_string(),
            ..facts()
        };
        let err = render_pod_unit(&facts, &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidRestartPolicy { .. }));
    }

    #[test]
    fn test_malformed_create_command_aborts() {
        let facts = PodFacts {
            create_command: vec!["podman".to_string(), "run".to_string(), "alpine".to_string()],
            ..facts()
        };
        let err = render_pod_unit(&facts, &new_mode()).unwrap_err();
        assert!(matches!(err, Error::MalformedInvocation { .. }));

        // Existing pods never replay the create command.
        assert!(render_pod_unit(&facts, &RenderOptions::default()).is_ok());
    }

    #[test]
    fn test_supplemental_service_lines() {
        let facts = PodFacts {
            start_timeout: Some(30),
            restart_sec: Some(0),
            extra_envs: vec!["FOO=1".to_string(), "BAR=2".to_string()],
            ..facts()
        };
        let unit = render_pod_unit(&facts, &RenderOptions::default()).unwrap();
        assert!(unit.contains(
            "Environment=PODMAN_SYSTEMD_UNIT=%n\nEnvironment=FOO=1 BAR=2\nRestart=on-failure\n\
             TimeoutStartSec=30\nTimeoutStopSec=102\n"
        ));
        assert!(!unit.contains("RestartSec="));
    }

    #[test]
    fn test_extra_env_with_space_is_quoted() {
        let facts = PodFacts {
            extra_envs: vec!["GREETING=hello world".to_string(), "A=1".to_string()],
            ..facts()
        };
        let unit = render_pod_unit(&facts, &RenderOptions::default()).unwrap();
        assert!(unit.contains("\nEnvironment=\"GREETING=hello world\" A=1\n"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let facts = PodFacts {
            create_command: ["podman", "--runroot", "/r", "pod", "create", "--name", "a b"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..facts()
        };
        let first = render_pod_unit(&facts, &new_mode()).unwrap();
        let second = render_pod_unit(&facts, &new_mode()).unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with("[Install]\nWantedBy=default.target\n"));
    }
}
