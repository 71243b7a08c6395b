// ABOUTME: Command module aggregator for the deployer CLI.
// ABOUTME: Re-exports run and validate command handlers.

mod run;
mod validate;

pub use run::{RunOptions, run};
pub use validate::validate;
