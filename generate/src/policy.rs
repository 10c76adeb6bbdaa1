//! Restart and exit policy handling for pod units.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Flag selecting what a pod does when its last container exits.
pub const EXIT_POLICY_FLAG: &str = "--exit-policy";

/// Service restart policy, as understood by systemd's `Restart=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// Never restart
    No,
    /// Restart on clean exit
    OnSuccess,
    /// Restart on non-zero exit, signal or timeout
    OnFailure,
    /// Restart on signal or timeout
    OnAbnormal,
    /// Restart on watchdog timeout
    OnWatchdog,
    /// Restart on uncaught signal
    OnAbort,
    /// Always restart
    Always,
}

impl RestartPolicy {
    /// Every policy, in the order systemd documents them.
    pub const ALL: [RestartPolicy; 7] = [
        RestartPolicy::No,
        RestartPolicy::OnSuccess,
        RestartPolicy::OnFailure,
        RestartPolicy::OnAbnormal,
        RestartPolicy::OnWatchdog,
        RestartPolicy::OnAbort,
        RestartPolicy::Always,
    ];

    /// The `Restart=` value for this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartPolicy::No => "no",
            RestartPolicy::OnSuccess => "on-success",
            RestartPolicy::OnFailure => "on-failure",
            RestartPolicy::OnAbnormal => "on-abnormal",
            RestartPolicy::OnWatchdog => "on-watchdog",
            RestartPolicy::OnAbort => "on-abort",
            RestartPolicy::Always => "always",
        }
    }

    fn valid_list() -> String {
        Self::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy::OnFailure
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestartPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::InvalidRestartPolicy {
                got: s.to_string(),
                valid: Self::valid_list(),
            })
    }
}

/// Validate a restart policy string.
///
/// Matching is exact and case-sensitive; the empty string is rejected.
pub fn validate_restart_policy(policy: &str) -> Result<RestartPolicy> {
    policy.parse()
}

/// Check whether a token list sets an exit policy.
///
/// Accepts both `--exit-policy=<v>` and `--exit-policy <v>`. The value
/// itself is not inspected.
pub fn has_exit_policy_flag<S: AsRef<str>>(tokens: &[S]) -> bool {
    tokens.iter().enumerate().any(|(i, token)| {
        let token = token.as_ref();
        match token.strip_prefix(EXIT_POLICY_FLAG) {
            Some(rest) if rest.starts_with('=') => true,
            Some("") => i + 1 < tokens.len(),
            _ => false,
        }
    })
}
