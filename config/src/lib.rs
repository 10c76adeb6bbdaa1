//! Podunit Configuration
//!
//! Settings applied to every generated pod unit unless overridden on the
//! command line: unit name prefixes, timeouts, restart behavior and extra
//! dependencies.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use podunit_config::ConfigLoader;
//!
//! let config = ConfigLoader::discover().load().unwrap();
//! println!("pod unit: {}", config.pod_service_name("web"));
//! ```
//!
//! # Configuration File
//!
//! ```text
//! # /etc/podunit/config.toml
//! pod_prefix = "pod"
//! container_prefix = "container"
//! separator = "-"
//! stop_timeout = 10
//! restart_policy = "on-failure"
//! wants = ["network-online.target"]
//! ```

pub mod error;
pub mod loader;
pub mod settings;

pub use error::{ConfigError, Result};
pub use loader::{env_vars, paths, ConfigLoader};
pub use settings::GenerateConfig;
