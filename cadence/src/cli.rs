//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cadence - recurring, priority-ordered task scheduler
#[derive(Parser, Debug)]
#[command(
    name = "cadence",
    author,
    version,
    about = "Run recurring tasks in priority order",
    long_about = None
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the built-in demo tasks (High/2s, Normal/3s, Low/4s)
    Demo {
        /// Stop after this many seconds (Ctrl-C stops earlier)
        #[arg(short, long, default_value = "20")]
        duration: u64,
    },

    /// Run the shell-command tasks from the config file until stopped
    Run {
        /// Stop after this many seconds instead of waiting for a signal
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// List the tasks declared in the config file
    List {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for listing commands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}
