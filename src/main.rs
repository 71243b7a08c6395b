// ABOUTME: Entry point for the deployer CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use deployer::config::{self, Plan};
use deployer::error::Result;
use deployer::output::{Output, OutputMode};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init {
            project,
            stage,
            artifact,
            force,
        } => {
            let cwd = env::current_dir()?;
            let namespace = project.as_deref().zip(stage.as_deref());
            config::init_plan(&cwd, namespace, artifact.as_deref(), force)?;
            println!("Created {}", config::PLAN_FILENAME);
            Ok(())
        }
        Commands::Validate { plan } => {
            let plan = load_plan(plan)?;
            commands::validate(&plan);
            Ok(())
        }
        Commands::Run {
            plan,
            only,
            force_submit,
            keep_going,
            quiet,
            json,
        } => {
            let plan = load_plan(plan)?;
            let mode = if json {
                OutputMode::Json
            } else if quiet {
                OutputMode::Quiet
            } else {
                OutputMode::Normal
            };
            let options = commands::RunOptions {
                only,
                force_submit,
                keep_going,
            };
            commands::run(plan, options, Output::new(mode)).await
        }
    }
}

fn load_plan(path: Option<PathBuf>) -> Result<Plan> {
    match path {
        Some(path) => Plan::load(&path),
        None => Plan::discover(&env::current_dir()?),
    }
}
