//! # netmerge CLI Module
//!
//! This module implements the CLI interface for netmerge.
//!
//! ## Available Commands
//!
//! - `merge` - Merge networks loaded from JSON files
//! - `inspect` - Show how the networks' attribute schemas align
//! - `init-config` - Write a default configuration file

mod commands;

use crate::config::NetmergeConfig;
use clap::{Args, Parser, Subcommand};
use netmerge_core::MergeError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// netmerge - merge attributed networks
///
/// Union, intersection and difference of networks stored as JSON, with
/// node identity taken from a matching attribute.
#[derive(Parser, Debug)]
#[command(name = "netmerge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Path to a TOML configuration file (default: ./netmerge.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge networks; the first file is the base network
    Merge(MergeArgs),

    /// Show the aligned attribute tables and their type conflicts
    Inspect {
        /// Network files (JSON)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Identity column for every network
        #[arg(short, long)]
        identity: Option<String>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Output file path
        #[arg(short, long, default_value = "netmerge.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments of the `merge` command. Unset flags fall back to the config.
#[derive(Args, Debug, Clone, Default)]
pub struct MergeArgs {
    /// Network files (JSON), in participant order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Merge operation (union, intersection, difference)
    #[arg(short = 't', long)]
    pub operation: Option<String>,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Id of the merged network
    #[arg(long, default_value = "merged")]
    pub id: String,

    /// Name of the merged network
    #[arg(short, long)]
    pub name: Option<String>,

    /// Identity column for every network, replacing the config's
    /// per-network columns
    #[arg(short, long)]
    pub identity: Option<String>,

    /// Identity column of one network, as NETWORK=COLUMN (repeatable)
    #[arg(long = "identity-for", value_name = "NETWORK=COLUMN")]
    pub identity_for: Vec<String>,

    /// Fold nodes and edges sharing an identity inside one network
    #[arg(long)]
    pub within_network: bool,

    /// Intersection: keep nodes only, drop every edge
    #[arg(long)]
    pub only_nodes: bool,

    /// Difference: remove every matched node regardless of its edges
    #[arg(long)]
    pub strict: bool,

    /// Edge attribute holding the interaction label
    #[arg(long)]
    pub interaction_column: Option<String>,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), MergeError> {
    let json_mode = cli.json_mode;
    let config = NetmergeConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Merge(args) => cmd_merge(&config, &args, json_mode).map(|_| ()),
        Commands::Inspect { files, identity } => {
            cmd_inspect(&config, &files, identity.as_deref(), json_mode)
        }
        Commands::InitConfig { output, force } => cmd_init_config(&output, force),
    }
}
