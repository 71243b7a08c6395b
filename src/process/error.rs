// ABOUTME: Error types for deployment process mutations and the coordinating actor.
// ABOUTME: Rejections never change state; callers decide whether to retry.

use snafu::Snafu;

use super::ChangeKind;

/// Reasons a mutation was rejected. A rejected mutation leaves the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    /// A configuration with the same kind and id is already present.
    #[error("configuration {kind}/{id} is already present")]
    DuplicateConfiguration { kind: String, id: String },

    /// No configuration with this kind and id.
    #[error("configuration {kind}/{id} not present")]
    ConfigurationNotFound { kind: String, id: String },

    /// The configuration does not declare this key.
    #[error("configuration {kind}/{id} has no key '{key}'")]
    UnknownKey {
        kind: String,
        id: String,
        key: String,
    },

    /// Forced submission while some configurations are incomplete.
    #[error("cannot submit configuration, incomplete: {}", .incomplete.join(", "))]
    IncompleteConfiguration { incomplete: Vec<String> },

    /// The process already reached a terminal state.
    #[error("deployment process {0} is already complete")]
    AlreadyCompleted(String),

    /// Terminal kinds are only reachable through `fail` or `finish`.
    #[error("cannot transition to terminal kind {0}")]
    TerminalTransition(ChangeKind),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessErrorKind {
    /// Entity already exists.
    Duplicate,
    /// Entity or key does not exist.
    NotFound,
    /// Operation not allowed in the current state.
    InvalidState,
}

impl ProcessError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ProcessErrorKind {
        match self {
            ProcessError::DuplicateConfiguration { .. } => ProcessErrorKind::Duplicate,
            ProcessError::ConfigurationNotFound { .. } | ProcessError::UnknownKey { .. } => {
                ProcessErrorKind::NotFound
            }
            ProcessError::IncompleteConfiguration { .. }
            | ProcessError::AlreadyCompleted(_)
            | ProcessError::TerminalTransition(_) => ProcessErrorKind::InvalidState,
        }
    }
}

/// Failures talking to the actor that owns a deployment process.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CoordinatorError {
    #[snafu(display("deployment process {process_id} is no longer running"))]
    Closed { process_id: String },

    #[snafu(display("deployment process {process_id} dropped the request"))]
    NoReply { process_id: String },

    #[snafu(display("mutation rejected: {source}"))]
    Rejected { source: ProcessError },
}

impl CoordinatorError {
    /// The rejection reason, if the actor answered with one.
    pub fn rejection(&self) -> Option<&ProcessError> {
        match self {
            CoordinatorError::Rejected { source } => Some(source),
            _ => None,
        }
    }
}

impl From<ProcessError> for CoordinatorError {
    fn from(source: ProcessError) -> Self {
        CoordinatorError::Rejected { source }
    }
}
