// ABOUTME: Application-wide error types for deployer.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::process::CoordinatorError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("plan file not found in {0}")]
    PlanNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("unknown change kind: {0}")]
    UnknownChangeKind(String),

    #[error("deployment failed: {0}")]
    DeploymentFailed(String),

    #[error("step {index} ({step}) failed: {source}")]
    Step {
        index: usize,
        step: String,
        #[source]
        source: CoordinatorError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
