//! Create command rewriting.
//!
//! A pod unit in new mode recreates its pod on every start, so the command
//! that originally created the pod is captured and replayed from
//! `ExecStartPre=`. Before it can be replayed it is rewritten:
//!
//! - global flags given before `pod create` are split off and prefixed to
//!   every generated command line
//! - captured `--infra-conmon-pidfile` / `--pod-id-file` flags are dropped
//!   and replaced with paths under the runtime directory
//! - a named pod is created with `--replace` so a stale pod of the same name
//!   does not block the start
//!
//! Everything else is replayed byte for byte. Tokens containing a space are
//! double-quoted when joined into a command line; nothing else is escaped.

use crate::error::{Error, Result};
use crate::policy::{has_exit_policy_flag, EXIT_POLICY_FLAG};
use std::borrow::Cow;
use tracing::debug;

/// Flag naming the file conmon writes the infra container's PID to.
pub const INFRA_PIDFILE_FLAG: &str = "--infra-conmon-pidfile";
/// Flag naming the file the pod ID is written to.
pub const POD_ID_FILE_FLAG: &str = "--pod-id-file";

const NAME_FLAG: &str = "--name";
const REPLACE_FLAG: &str = "--replace";
const END_OF_FLAGS: &str = "--";

/// How the unit manages the pod's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// The pod exists already; the unit only starts and stops it.
    #[default]
    Existing,
    /// The unit creates the pod on start and removes it on stop.
    New,
}

/// Files a new-mode unit tracks its pod through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdFiles {
    /// PID file of the infra container's conmon
    pub pid_file: String,
    /// File holding the pod ID
    pub pod_id_file: String,
}

impl IdFiles {
    /// ID file paths for a service under a runtime directory.
    pub fn new(runtime_dir: &str, service_name: &str) -> Self {
        Self {
            pid_file: format!("{}/{}.pid", runtime_dir, service_name),
            pod_id_file: format!("{}/{}.pod-id", runtime_dir, service_name),
        }
    }
}

/// A captured create command split and rewritten for replay.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RewrittenCommand {
    /// Global flags that preceded `pod create`
    pub root_args: Vec<String>,
    /// Injected ID file flags (new mode only)
    pub id_file_args: Vec<String>,
    /// Remaining captured arguments after rewriting
    pub create_args: Vec<String>,
}

impl RewrittenCommand {
    /// Whether the captured arguments already choose an exit policy.
    pub fn has_exit_policy(&self) -> bool {
        has_exit_policy_flag(&self.create_args)
    }

    /// The `pod create` command line.
    ///
    /// `defaults` are placed right after the injected ID file flags and are
    /// emitted as given.
    pub fn create_line(&self, executable: &str, defaults: &[&str]) -> String {
        let mut line = self.command_line(executable, &["pod", "create"]);
        for arg in self
            .id_file_args
            .iter()
            .map(String::as_str)
            .chain(defaults.iter().copied())
        {
            line.push(' ');
            line.push_str(arg);
        }
        for arg in &self.create_args {
            line.push(' ');
            line.push_str(&quote_arg(arg));
        }
        line
    }

    /// `<executable> <root args> <tail>`; `tail` is emitted as given.
    pub fn command_line(&self, executable: &str, tail: &[&str]) -> String {
        let mut line = executable.to_string();
        for arg in &self.root_args {
            line.push(' ');
            line.push_str(&quote_arg(arg));
        }
        for arg in tail {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Wrap a token containing a space in double quotes.
pub fn quote_arg(arg: &str) -> Cow<'_, str> {
    if arg.contains(' ') {
        Cow::Owned(format!("\"{}\"", arg))
    } else {
        Cow::Borrowed(arg)
    }
}

/// Join tokens into a command line, quoting where needed.
pub fn join_args<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| quote_arg(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrite a captured `pod create` invocation for replay from a unit.
///
/// `tokens` is the full captured command including the program name. In
/// [`Lifecycle::Existing`] mode the command is only split; ID file and
/// replace rewriting happen in [`Lifecycle::New`] mode.
pub fn rewrite_create_command<S: AsRef<str>>(
    tokens: &[S],
    mode: Lifecycle,
    runtime_dir: &str,
    service_name: &str,
) -> Result<RewrittenCommand> {
    let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
    let create_index = find_pod_create(&tokens)?;
    let root_args: Vec<String> = tokens[1..create_index - 1]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let new = mode == Lifecycle::New;
    let scanned = scan_create_args(&tokens[create_index + 1..], new)?;

    let mut create_args = scanned.args;
    let mut id_file_args = Vec::new();

    if new {
        if scanned.has_name && !scanned.replace_enabled {
            for index in scanned.replace_indices.iter().rev() {
                create_args.remove(*index);
            }
            create_args.push(REPLACE_FLAG.to_string());
        }

        let files = IdFiles::new(runtime_dir, service_name);
        id_file_args = vec![
            INFRA_PIDFILE_FLAG.to_string(),
            files.pid_file,
            POD_ID_FILE_FLAG.to_string(),
            files.pod_id_file,
        ];
    }

    debug!(
        service = service_name,
        root_args = ?root_args,
        new,
        "rewrote pod create command"
    );

    Ok(RewrittenCommand {
        root_args,
        id_file_args,
        create_args,
    })
}

/// Index of `create` in the first adjacent `pod create` pair.
fn find_pod_create(tokens: &[&str]) -> Result<usize> {
    let not_pod_create = || {
        Error::malformed(
            "pod create",
            format!(
                "pod does not appear to be created via `pod create`: {:?}",
                tokens
            ),
        )
    };

    if tokens.len() < 3 {
        return Err(not_pod_create());
    }

    (2..tokens.len())
        .find(|&i| tokens[i - 1] == "pod" && tokens[i] == "create")
        .ok_or_else(not_pod_create)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Flags,
    Positional,
}

#[derive(Debug, Default)]
struct ScannedArgs {
    args: Vec<String>,
    has_name: bool,
    /// Positions of `--replace[=v]` tokens in `args`
    replace_indices: Vec<usize>,
    /// Effective value of the last replace flag
    replace_enabled: bool,
}

/// Walk the arguments after `pod create` once, copying them into a new list.
///
/// Flag parsing stops at the first bare token or `--`; everything from there
/// on is copied untouched, except ID file flags when they are being
/// stripped. Unknown flags without an inline value take the
/// next token as their value unless it looks like a flag.
fn scan_create_args(args: &[&str], strip_id_files: bool) -> Result<ScannedArgs> {
    let mut scanned = ScannedArgs {
        args: Vec::with_capacity(args.len() + 1),
        ..Default::default()
    };
    let mut state = ScanState::Flags;
    let mut iter = args.iter().copied().peekable();

    while let Some(token) = iter.next() {
        // ID file flags are dropped wherever they appear
        if strip_id_files {
            if let Some((flag, inline)) = id_file_flag(token) {
                if !inline && iter.next().is_none() {
                    return Err(Error::missing_value(flag));
                }
                debug!(flag, "dropping captured ID file flag");
                continue;
            }
        }

        if state == ScanState::Positional {
            scanned.args.push(token.to_string());
            continue;
        }

        if token == END_OF_FLAGS || token == "-" || !token.starts_with('-') {
            state = ScanState::Positional;
            scanned.args.push(token.to_string());
            continue;
        }

        let (flag, inline) = match token.split_once('=') {
            Some((flag, value)) => (flag, Some(value)),
            None => (token, None),
        };

        match flag {
            REPLACE_FLAG => {
                scanned.replace_enabled = match inline {
                    None => true,
                    Some(value) => parse_bool(value).ok_or_else(|| {
                        Error::malformed(
                            token,
                            format!("invalid boolean value {:?}", value),
                        )
                    })?,
                };
                scanned.replace_indices.push(scanned.args.len());
                scanned.args.push(token.to_string());
            }
            _ => {
                if flag == NAME_FLAG {
                    scanned.has_name = true;
                }
                scanned.args.push(token.to_string());
                if inline.is_some() {
                    continue;
                }
                if takes_value(flag) {
                    let value = iter.next().ok_or_else(|| Error::missing_value(flag))?;
                    scanned.args.push(value.to_string());
                } else if let Some(next) = iter.next_if(|next| !next.starts_with('-')) {
                    scanned.args.push(next.to_string());
                }
            }
        }
    }

    Ok(scanned)
}

/// Split an ID file flag token into its flag and whether it carries an
/// inline value.
fn id_file_flag(token: &str) -> Option<(&str, bool)> {
    let (flag, inline) = match token.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (token, false),
    };
    matches!(flag, INFRA_PIDFILE_FLAG | POD_ID_FILE_FLAG).then_some((flag, inline))
}

fn takes_value(flag: &str) -> bool {
    matches!(
        flag,
        NAME_FLAG | EXIT_POLICY_FLAG | INFRA_PIDFILE_FLAG | POD_ID_FILE_FLAG
    )
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
