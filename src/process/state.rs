// ABOUTME: Versioned aggregate tracking a single deployment attempt.
// ABOUTME: Mutators validate, apply, bump the version and return what to broadcast.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use crate::types::{ArtifactName, Namespace, PodName, ProcessId};

use super::configuration::Configuration;
use super::error::ProcessError;
use super::{ChangeKind, Mutation};

/// Error recorded as the reason a deployment failed.
pub type FailureCause = Arc<dyn std::error::Error + Send + Sync>;

/// Transient state of a deployment process.
///
/// Every accepted mutation increments `version` by exactly one. Rejected
/// mutations leave every field, including the version, untouched. Once the
/// process is complete only [`remove_persistent_location`] is accepted.
///
/// Mutators take `&mut self`; share read access through [`snapshot`] instead
/// of handing out the live aggregate.
///
/// [`remove_persistent_location`]: DeploymentProcessState::remove_persistent_location
/// [`snapshot`]: DeploymentProcessState::snapshot
#[derive(Debug)]
pub struct DeploymentProcessState {
    id: ProcessId,
    namespace: Namespace,
    name: ArtifactName,
    start: DateTime<Utc>,
    version: u64,
    complete: bool,
    failed: bool,
    completion_message: Option<String>,
    failure_cause: Option<FailureCause>,
    completion: Option<DateTime<Utc>>,
    temp_location: Option<PathBuf>,
    configurations: Vec<Configuration>,
    persistent_location: Option<Url>,
    pod_name: Option<PodName>,
}

impl DeploymentProcessState {
    /// Start tracking a new deployment attempt with a freshly generated id.
    pub fn new(namespace: Namespace, name: ArtifactName, temp_location: Option<PathBuf>) -> Self {
        Self::with_id(ProcessId::generate(), namespace, name, temp_location)
    }

    /// Start tracking a deployment attempt under a caller-supplied id.
    pub fn with_id(
        id: ProcessId,
        namespace: Namespace,
        name: ArtifactName,
        temp_location: Option<PathBuf>,
    ) -> Self {
        Self {
            id,
            namespace,
            name,
            start: Utc::now(),
            version: 0,
            complete: false,
            failed: false,
            completion_message: None,
            failure_cause: None,
            completion: None,
            temp_location,
            configurations: Vec::new(),
            persistent_location: None,
            pod_name: None,
        }
    }

    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// Number of accepted mutations so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// File name of the uploaded artifact.
    pub fn name(&self) -> &ArtifactName {
        &self.name
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// True only for completed processes that did not succeed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn completion_message(&self) -> Option<&str> {
        self.completion_message.as_deref()
    }

    pub fn failure_cause(&self) -> Option<&FailureCause> {
        self.failure_cause.as_ref()
    }

    pub fn completion(&self) -> Option<DateTime<Utc>> {
        self.completion
    }

    /// Local staging location of the artifact.
    pub fn temp_location(&self) -> Option<&Path> {
        self.temp_location.as_deref()
    }

    /// Discovered configurations, in discovery order.
    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    pub fn configuration(&self, kind: &str, id: &str) -> Option<&Configuration> {
        self.configurations.iter().find(|c| c.matches(kind, id))
    }

    /// Remote endpoint of the activated artifact.
    pub fn persistent_location(&self) -> Option<&Url> {
        self.persistent_location.as_ref()
    }

    pub fn pod_name(&self) -> Option<&PodName> {
        self.pod_name.as_ref()
    }

    /// Immutable copy of the current state for concurrent readers.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            id: self.id.clone(),
            version: self.version,
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            start: self.start,
            complete: self.complete,
            failed: self.failed,
            completion_message: self.completion_message.clone(),
            failure_cause: self.failure_cause.clone(),
            completion: self.completion,
            temp_location: self.temp_location.clone(),
            configurations: self.configurations.clone().into(),
            persistent_location: self.persistent_location.clone(),
            pod_name: self.pod_name.clone(),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    fn ensure_open(&self) -> Result<(), ProcessError> {
        if self.complete {
            tracing::warn!(process = %self.id, "rejecting mutation of completed process");
            return Err(ProcessError::AlreadyCompleted(self.id.to_string()));
        }
        Ok(())
    }

    fn bump(&mut self, outcome: Mutation) -> Mutation {
        self.version += 1;
        tracing::debug!(
            process = %self.id,
            version = self.version,
            kind = ?outcome.change_kind(),
            "deployment process state changed"
        );
        outcome
    }

    /// Record a failure that happened elsewhere in the pipeline.
    ///
    /// Rejected with [`ProcessError::AlreadyCompleted`] if the process is already
    /// terminal, so the failure detail is recorded at most once.
    pub fn fail(
        &mut self,
        message: impl Into<String>,
        cause: Option<FailureCause>,
    ) -> Result<Mutation, ProcessError> {
        self.ensure_open()?;
        let message = message.into();
        tracing::info!(process = %self.id, %message, "deployment failed");
        self.completion_message = Some(message);
        self.failure_cause = cause;
        self.complete = true;
        self.failed = true;
        self.completion = Some(Utc::now());
        Ok(self.bump(Mutation::Broadcast(ChangeKind::Failed)))
    }

    /// Record successful completion of the deployment.
    pub fn finish(&mut self, message: impl Into<String>) -> Result<Mutation, ProcessError> {
        self.ensure_open()?;
        let message = message.into();
        tracing::info!(process = %self.id, %message, "deployment finished");
        self.completion_message = Some(message);
        self.complete = true;
        self.completion = Some(Utc::now());
        Ok(self.bump(Mutation::Broadcast(ChangeKind::ProvisionFinished)))
    }

    /// Add a newly discovered configuration.
    pub fn add_configuration(
        &mut self,
        configuration: Configuration,
    ) -> Result<Mutation, ProcessError> {
        self.ensure_open()?;
        if self.configurations.contains(&configuration) {
            tracing::warn!(
                process = %self.id,
                kind = configuration.kind(),
                id = configuration.id(),
                "duplicate configuration"
            );
            return Err(ProcessError::DuplicateConfiguration {
                kind: configuration.kind().to_string(),
                id: configuration.id().to_string(),
            });
        }
        self.configurations.push(configuration);
        Ok(self.bump(Mutation::Broadcast(ChangeKind::ConfigurationAdded)))
    }

    /// Apply values to one configuration, optionally submitting it.
    ///
    /// The configuration is only marked submitted when `submit` is set and it
    /// is complete after the values were applied. The version is bumped
    /// whenever the configuration was found, with one exception: a value for
    /// a key the configuration does not define fails with
    /// [`ProcessError::UnknownKey`] and leaves the state and version untouched.
    pub fn set_configuration<I, K, V>(
        &mut self,
        kind: &str,
        id: &str,
        submit: bool,
        values: I,
    ) -> Result<Mutation, ProcessError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.ensure_open()?;
        let process = self.id.clone();
        let config = self
            .configurations
            .iter_mut()
            .find(|c| c.matches(kind, id))
            .ok_or_else(|| {
                tracing::warn!(%process, kind, id, "configuration not present");
                ProcessError::ConfigurationNotFound {
                    kind: kind.to_string(),
                    id: id.to_string(),
                }
            })?;

        config.update_configuration(values)?;
        if submit && !config.set_submitted(true) {
            tracing::debug!(%process, kind, id, "configuration still incomplete, not submitted");
        }
        Ok(self.bump(Mutation::Broadcast(ChangeKind::ConfigurationSet)))
    }

    /// Submit the whole configuration set.
    ///
    /// All configurations must be complete. When some are not, `force`
    /// decides between an error and a quiet [`Mutation::Unchanged`].
    pub fn submit_configurations(&mut self, force: bool) -> Result<Mutation, ProcessError> {
        self.ensure_open()?;
        let incomplete: Vec<String> = self
            .configurations
            .iter()
            .filter(|c| !c.is_complete())
            .map(|c| format!("{}/{}", c.kind(), c.id()))
            .collect();

        if incomplete.is_empty() {
            let all_marked = self
                .configurations
                .iter_mut()
                .fold(true, |marked, c| c.set_submitted(true) && marked);
            debug_assert!(all_marked, "complete configurations accept submission");
            Ok(self.bump(Mutation::Broadcast(ChangeKind::ConfigurationFinished)))
        } else if force {
            tracing::warn!(process = %self.id, ?incomplete, "forced submission of incomplete configuration");
            Err(ProcessError::IncompleteConfiguration { incomplete })
        } else {
            Ok(Mutation::Unchanged)
        }
    }

    /// Record where the artifact was stored.
    pub fn set_persistent_location(&mut self, location: Url) -> Result<Mutation, ProcessError> {
        self.ensure_open()?;
        self.persistent_location = Some(location);
        Ok(self.bump(Mutation::Broadcast(ChangeKind::ArtifactStored)))
    }

    /// Forget the persistent location. Versioned, but never broadcast.
    ///
    /// Also accepted after completion.
    pub fn remove_persistent_location(&mut self) -> Mutation {
        self.persistent_location = None;
        self.bump(Mutation::Silent)
    }

    /// Record the runtime instance that runs the artifact.
    pub fn set_pod_name(&mut self, pod_name: PodName) -> Result<Mutation, ProcessError> {
        self.ensure_open()?;
        self.pod_name = Some(pod_name);
        Ok(self.bump(Mutation::Broadcast(ChangeKind::PodCreated)))
    }

    /// Advance the version for a pipeline milestone and echo back its kind.
    ///
    /// Terminal kinds are refused; use [`fail`](Self::fail) or [`finish`](Self::finish).
    pub fn transition(&mut self, target: ChangeKind) -> Result<Mutation, ProcessError> {
        self.ensure_open()?;
        if target.is_terminal() {
            return Err(ProcessError::TerminalTransition(target));
        }
        Ok(self.bump(Mutation::Broadcast(target)))
    }
}

/// Frozen view of a [`DeploymentProcessState`] at one version.
///
/// Serializes the public state only; start, temp location, configurations and
/// persistent location are left out of the JSON.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub id: ProcessId,
    pub version: u64,
    pub namespace: Namespace,
    pub name: ArtifactName,
    #[serde(skip)]
    pub start: DateTime<Utc>,
    pub complete: bool,
    pub failed: bool,
    pub completion_message: Option<String>,
    #[serde(serialize_with = "serialize_cause")]
    pub failure_cause: Option<FailureCause>,
    pub completion: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub temp_location: Option<PathBuf>,
    #[serde(skip)]
    pub configurations: Arc<[Configuration]>,
    #[serde(skip)]
    pub persistent_location: Option<Url>,
    pub pod_name: Option<PodName>,
}

impl StateSnapshot {
    pub fn configuration(&self, kind: &str, id: &str) -> Option<&Configuration> {
        self.configurations.iter().find(|c| c.matches(kind, id))
    }

    /// Whether every configuration is complete.
    pub fn configurations_complete(&self) -> bool {
        self.configurations.iter().all(Configuration::is_complete)
    }
}

fn serialize_cause<S: Serializer>(
    cause: &Option<FailureCause>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match cause {
        Some(cause) => serializer.serialize_some(&cause.to_string()),
        None => serializer.serialize_none(),
    }
}
