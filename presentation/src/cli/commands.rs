//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for admin console replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored
    Text,
    /// One JSON document per reply
    Json,
}

/// CLI arguments for blacknight
#[derive(Parser, Debug)]
#[command(name = "blacknight")]
#[command(author, version, about = "Leader-elected deployment reconciler")]
#[command(long_about = r#"
blacknight keeps a deployment converged on its specification.

Every node joins an election on the coordination store. The leader watches
service membership and the quorum ensemble, and after each burst of changes
settles it diffs observed state against the specification and starts or
stops members under a cluster-wide lock.

Configuration files are loaded from (in priority order):
1. BLACKNIGHT_* environment variables (e.g. BLACKNIGHT_NODE__ID)
2. --config <path>        Explicit config file
3. ./blacknight.toml      Project-level config
4. ~/.config/blacknight/config.toml   Global config

Example:
  blacknight --spec appliance.toml --arg hypervisor=kvm -v
  blacknight --config /etc/blacknight.toml --no-console
"#)]
pub struct Cli {
    /// Specification file to seed into the store before starting
    #[arg(short, long, value_name = "FILE")]
    pub spec: Option<PathBuf>,

    /// Cluster argument to seed under /args (repeatable)
    #[arg(short, long = "arg", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub args: Vec<(String, String)>,

    /// Override node.id from the configuration
    #[arg(long, value_name = "ADDRESS")]
    pub id: Option<String>,

    /// Output format for admin console replies
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Run without the interactive admin console
    #[arg(long)]
    pub no_console: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() || key.contains('/') {
        return Err(format!("invalid argument name '{}'", key));
    }
    Ok((key.to_string(), value.to_string()))
}
