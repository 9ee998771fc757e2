//! # cmoflow CLI Module
//!
//! This module implements the CLI interface for cmoflow.
//!
//! ## Available Commands
//!
//! - `run` - Ingest files, start processing and drive the session to the reveal
//! - `classify` - Ingest files and show how each one is classified
//! - `stages` - Show the configured processing stages

mod commands;

use clap::{Parser, Subcommand};
use cmoflow_core::{FlowError, Millis};
use std::path::PathBuf;

pub use commands::*;

use crate::driver::ClockMode;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// cmoflow - intake, processing and reveal
///
/// Upload a profile photo (plus any supporting documents), run the simulated
/// processing stages and reach the results.
#[derive(Parser, Debug)]
#[command(name = "cmoflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file (stages, settle delay, accept list)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest files and run the session to the reveal
    Run {
        /// Files to ingest, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Wait out every stage in real time instead of jumping the clock
        #[arg(short, long)]
        realtime: bool,

        /// Reset the session after this many milliseconds of processing
        #[arg(long)]
        reset_after: Option<u64>,
    },

    /// Ingest files and show their classification
    Classify {
        /// Files to ingest, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show the configured processing stages
    Stages,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), FlowError> {
    let config_path = cli.config.as_deref();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Run {
            files,
            realtime,
            reset_after,
        }) => {
            let mode = if realtime {
                ClockMode::Realtime
            } else {
                ClockMode::Virtual
            };
            cmd_run(config_path, json_mode, &files, mode, reset_after.map(Millis)).await
        }
        Some(Commands::Classify { files }) => cmd_classify(config_path, json_mode, &files),
        Some(Commands::Stages) | None => cmd_stages(config_path, json_mode),
    }
}
