//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Workout recording replay harness.
///
/// Drives a recording session from recorded producer inputs and prints the
/// audited workouts it produces.
#[derive(Debug, Parser)]
#[command(name = "stride", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay a JSONL trace of session inputs.
    ///
    /// Each line is a JSON object with an `at` timestamp and one input, e.g.
    /// `{"at": "2025-06-01T08:00:00Z", "input": "status_suggestion", "status": "recording"}`.
    Replay {
        /// Path to the trace file.
        trace: PathBuf,

        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Write each finished workout to this directory as `<id>.json`.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Validate the pause markers of imported workouts.
    Validate {
        /// Path to a JSON array of workouts with `id`, `start`, `end` and `markers`.
        markers: PathBuf,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
