// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deployer")]
#[command(about = "Track a deployment process through its pipeline stages")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new deployer.yml plan file
    Init {
        /// Project of the target namespace
        #[arg(long, requires = "stage")]
        project: Option<String>,

        /// Stage of the target namespace
        #[arg(long, requires = "project")]
        stage: Option<String>,

        /// Artifact file name
        #[arg(long)]
        artifact: Option<String>,

        /// Overwrite an existing plan
        #[arg(long)]
        force: bool,
    },

    /// Check the plan without running it
    Validate {
        /// Plan file (defaults to discovery in the current directory)
        #[arg(short, long)]
        plan: Option<PathBuf>,
    },

    /// Replay the plan's steps through a deployment process
    Run {
        /// Plan file (defaults to discovery in the current directory)
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Only print events of these kinds (e.g. failed,configuration_finished)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Treat every submit step as forced
        #[arg(long)]
        force_submit: bool,

        /// Record rejected steps as warnings and continue
        #[arg(long)]
        keep_going: bool,

        /// Minimal output for CI
        #[arg(short, long, conflicts_with = "json")]
        quiet: bool,

        /// JSON lines output
        #[arg(long)]
        json: bool,
    },
}
