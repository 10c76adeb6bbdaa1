mod facts;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use config::{ConfigLoader, GenerateConfig};
use facts::PodDescription;
use generate::render::{DEFAULT_EXIT_POLICY, RUNTIME_DIR};
use generate::{render_pod_unit, rewrite_create_command, unit_name, RenderOptions, RestartPolicy};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Podunit - systemd units for pods
#[derive(Parser, Debug)]
#[command(name = "podunit", version, author, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to $PODUNIT_CONFIG, then the user and system files)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the systemd unit of a pod
    Generate(GenerateArgs),
    /// Rewrite a captured `pod create` command for replay from a unit
    Rewrite(RewriteArgs),
    /// List valid restart policies
    Policies,
    /// Show the effective configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Pod description file (TOML, or JSON with a .json extension)
    pod: PathBuf,

    /// Create the pod on start and remove it on stop
    #[arg(long)]
    new: bool,

    /// Name units after pod and container names instead of IDs
    #[arg(short, long)]
    name: bool,

    /// Omit the "autogenerated by" header
    #[arg(long)]
    no_header: bool,

    /// Restart policy of the unit
    #[arg(long, value_name = "POLICY")]
    restart_policy: Option<String>,

    /// Seconds between restarts
    #[arg(long, value_name = "SECONDS")]
    restart_sec: Option<u32>,

    /// Seconds to wait for the pod to stop
    #[arg(short = 't', long, value_name = "SECONDS")]
    stop_timeout: Option<u32>,

    /// Seconds to wait for the pod to start
    #[arg(long, value_name = "SECONDS")]
    start_timeout: Option<u32>,

    /// Prefix of the pod unit name
    #[arg(long)]
    pod_prefix: Option<String>,

    /// Prefix of container unit names
    #[arg(long)]
    container_prefix: Option<String>,

    /// Separator between prefix and name
    #[arg(long)]
    separator: Option<String>,

    /// Add a Wants= dependency
    #[arg(long, value_name = "UNIT")]
    wants: Vec<String>,

    /// Add an After= dependency
    #[arg(long, value_name = "UNIT")]
    after: Vec<String>,

    /// Add a Requires= dependency
    #[arg(long, value_name = "UNIT")]
    requires: Vec<String>,

    /// Set an environment variable for the service
    #[arg(short, long, value_name = "KEY=VALUE")]
    env: Vec<String>,

    /// Write the unit to a file instead of stdout
    #[arg(short, long)]
    files: bool,

    /// Directory unit files are written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

impl GenerateArgs {
    /// Apply command line overrides on top of the settings file
    fn apply(&self, config: &mut GenerateConfig) {
        config.new |= self.new;
        config.no_header |= self.no_header;

        if let Some(policy) = &self.restart_policy {
            config.restart_policy = Some(policy.clone());
        }
        if let Some(sec) = self.restart_sec {
            config.restart_sec = Some(sec);
        }
        if let Some(timeout) = self.stop_timeout {
            config.stop_timeout = timeout;
        }
        if let Some(timeout) = self.start_timeout {
            config.start_timeout = Some(timeout);
        }
        if let Some(prefix) = &self.pod_prefix {
            config.pod_prefix = prefix.clone();
        }
        if let Some(prefix) = &self.container_prefix {
            config.container_prefix = prefix.clone();
        }
        if let Some(separator) = &self.separator {
            config.separator = separator.clone();
        }

        config.wants.extend(self.wants.iter().cloned());
        config.after.extend(self.after.iter().cloned());
        config.requires.extend(self.requires.iter().cloned());
        config.extra_envs.extend(self.env.iter().cloned());
    }
}

#[derive(Args, Debug)]
struct RewriteArgs {
    /// Rewrite for a unit that creates and removes the pod
    #[arg(long)]
    new: bool,

    /// Service name the ID files are named after
    #[arg(long, default_value = "pod")]
    service_name: String,

    /// Managing binary
    #[arg(long, default_value = facts::DEFAULT_EXECUTABLE)]
    executable: String,

    /// Captured command, given after `--`
    #[arg(last = true, required = true)]
    command: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Unit text goes to stdout, logs to stderr
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate(args) => {
            let mut config = load_config(cli.config)?;
            args.apply(&mut config);
            config.validate().context("Invalid unit settings")?;
            generate_unit(&args, &config)?;
        }
        Commands::Rewrite(args) => {
            let mode = if args.new {
                generate::Lifecycle::New
            } else {
                generate::Lifecycle::Existing
            };
            let rewritten =
                rewrite_create_command(&args.command, mode, RUNTIME_DIR, &args.service_name)?;
            let defaults: &[&str] = if args.new && !rewritten.has_exit_policy() {
                &[DEFAULT_EXIT_POLICY]
            } else {
                &[]
            };
            println!("{}", rewritten.create_line(&args.executable, defaults));
        }
        Commands::Policies => {
            for policy in RestartPolicy::ALL {
                println!("{}", policy);
            }
        }
        Commands::Config => {
            let config = load_config(cli.config)?;
            print!("{}", config.to_toml()?);
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "podunit", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Load the settings file named on the command line, or the default one
fn load_config(path: Option<PathBuf>) -> Result<GenerateConfig> {
    let loader = match path {
        // An explicitly named file has to exist
        Some(path) => ConfigLoader::new(path).use_defaults(false),
        None => ConfigLoader::discover(),
    };
    debug!(path = %loader.path().display(), "loading settings");

    loader
        .load()
        .with_context(|| format!("Failed to load settings from {}", loader.path().display()))
}

fn generate_unit(args: &GenerateArgs, config: &GenerateConfig) -> Result<()> {
    let description = PodDescription::load(&args.pod)?;
    let facts = description.to_facts(config, args.name);
    let options = RenderOptions {
        new: config.new,
        no_header: config.no_header,
    };

    let unit = render_pod_unit(&facts, &options).with_context(|| {
        format!(
            "Failed to generate unit for pod {}",
            description.ident(args.name)
        )
    })?;

    if args.files {
        let path = args.output_dir.join(unit_name(&facts.service_name));
        std::fs::write(&path, &unit)
            .with_context(|| format!("Failed to write unit file: {}", path.display()))?;
        info!(path = %path.display(), "wrote unit file");
        println!("{}", path.display());
    } else {
        print!("{}", unit);
    }

    Ok(())
}
