//! Podunit unit generation
//!
//! Renders the systemd service unit that supervises a pod. The crate is a
//! set of pure functions: callers describe the pod with [`PodFacts`], pick
//! a lifecycle with [`RenderOptions`] and get the unit text back.
//!
//! # Overview
//!
//! - [`policy`]: restart policy validation and exit policy detection
//! - [`rewrite`]: rewriting a captured `pod create` invocation for replay
//! - [`deps`]: `Requires=`/`Before=` and user-defined dependency lines
//! - [`render`]: assembly of the final unit text
//!
//! # Example
//!
//! ```rust
//! use podunit_generate::{render_pod_unit, PodFacts, RenderOptions};
//!
//! let facts = PodFacts {
//!     executable: "/usr/bin/podman".to_string(),
//!     service_name: "pod-web".to_string(),
//!     stop_timeout: 10,
//!     run_root: "/run/containers/storage".to_string(),
//!     create_command: vec![
//!         "podman".to_string(),
//!         "pod".to_string(),
//!         "create".to_string(),
//!         "--name".to_string(),
//!         "web".to_string(),
//!     ],
//!     ..Default::default()
//! };
//!
//! let unit = render_pod_unit(&facts, &RenderOptions { new: true, no_header: true }).unwrap();
//! assert!(unit.contains("ExecStart=/usr/bin/podman pod start --pod-id-file %t/pod-web.pod-id"));
//! ```

pub mod deps;
pub mod error;
pub mod policy;
pub mod render;
pub mod rewrite;

pub use deps::{compose_dependencies, DependencyBlock};
pub use error::{Error, Result};
pub use policy::{has_exit_policy_flag, validate_restart_policy, RestartPolicy};
pub use render::{render_pod_unit, service_name, unit_name, PodFacts, RenderOptions};
pub use rewrite::{join_args, quote_arg, rewrite_create_command, IdFiles, Lifecycle, RewrittenCommand};
