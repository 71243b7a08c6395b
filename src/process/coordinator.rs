// ABOUTME: Single-writer actor owning a deployment process state.
// ABOUTME: Serializes mutations, publishes snapshots, then forwards change events in order.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use url::Url;

use crate::types::{PodName, ProcessId};

use super::configuration::Configuration;
use super::error::{CoordinatorError, ProcessError};
use super::event::{EventSink, StateChanged};
use super::state::{DeploymentProcessState, FailureCause, StateSnapshot};
use super::{ChangeKind, Mutation};

/// Pending mutations queued per process before callers wait for capacity.
const COMMAND_BUFFER: usize = 64;

type Apply = Box<dyn FnOnce(&mut DeploymentProcessState) -> Result<Mutation, ProcessError> + Send>;

struct Command {
    operation: &'static str,
    apply: Apply,
    reply: oneshot::Sender<Result<Mutation, ProcessError>>,
}

/// Task that owns a [`DeploymentProcessState`] and applies mutations one at a time.
pub struct DeploymentProcess<S> {
    state: DeploymentProcessState,
    sink: S,
    commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<Arc<StateSnapshot>>,
}

impl<S: EventSink> DeploymentProcess<S> {
    /// Move `state` into a new task and return a handle to drive it.
    ///
    /// The task stops once every handle has been dropped.
    pub fn spawn(state: DeploymentProcessState, sink: S) -> ProcessHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots, snapshot_rx) = watch::channel(Arc::new(state.snapshot()));
        let id = state.id().clone();

        let process = DeploymentProcess {
            state,
            sink,
            commands: rx,
            snapshots,
        };
        tokio::spawn(process.run());

        ProcessHandle {
            id,
            commands: tx,
            snapshots: snapshot_rx,
        }
    }

    async fn run(mut self) {
        tracing::debug!(process = %self.state.id(), "deployment process started");

        while let Some(command) = self.commands.recv().await {
            let result = (command.apply)(&mut self.state);

            match &result {
                Ok(mutation) if mutation.is_versioned() => {
                    // Readers see the new snapshot before any subscriber hears about it.
                    let snapshot = Arc::new(self.state.snapshot());
                    self.snapshots.send_replace(snapshot.clone());
                    if let Some(kind) = mutation.change_kind() {
                        self.sink.publish(StateChanged::new(snapshot, kind));
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(
                        process = %self.state.id(),
                        operation = command.operation,
                        "mutation rejected: {}",
                        e
                    );
                }
            }

            if command.reply.send(result).is_err() {
                tracing::debug!(
                    process = %self.state.id(),
                    operation = command.operation,
                    "caller went away before reply"
                );
            }
        }

        tracing::debug!(
            process = %self.state.id(),
            version = self.state.version(),
            "deployment process stopped"
        );
    }
}

/// Cloneable handle to a running [`DeploymentProcess`].
///
/// Mutations resolve once the owning task applied or rejected them. Reads
/// come from the latest published snapshot and never wait on the writer.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    id: ProcessId,
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<StateSnapshot>>,
}

impl ProcessHandle {
    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<StateSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Live version of the process.
    pub fn version(&self) -> u64 {
        self.snapshots.borrow().version
    }

    /// Whether the process moved on since `event` was created.
    pub fn is_stale(&self, event: &StateChanged) -> bool {
        event.version() < self.version()
    }

    /// Receiver notified on every versioned mutation.
    pub fn watch(&self) -> watch::Receiver<Arc<StateSnapshot>> {
        self.snapshots.clone()
    }

    /// Wait until the process reaches a terminal state.
    pub async fn completed(&self) -> Result<Arc<StateSnapshot>, CoordinatorError> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|s| s.complete)
            .await
            .map_err(|_| CoordinatorError::Closed {
                process_id: self.id.to_string(),
            })?;
        Ok(snapshot.clone())
    }

    async fn apply<F>(&self, operation: &'static str, apply: F) -> Result<Mutation, CoordinatorError>
    where
        F: FnOnce(&mut DeploymentProcessState) -> Result<Mutation, ProcessError> + Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let command = Command {
            operation,
            apply: Box::new(apply),
            reply,
        };

        self.commands
            .send(command)
            .await
            .map_err(|_| CoordinatorError::Closed {
                process_id: self.id.to_string(),
            })?;

        let result = response.await.map_err(|_| CoordinatorError::NoReply {
            process_id: self.id.to_string(),
        })?;
        Ok(result?)
    }

    pub async fn fail(
        &self,
        message: impl Into<String>,
        cause: Option<FailureCause>,
    ) -> Result<Mutation, CoordinatorError> {
        let message = message.into();
        self.apply("fail", move |s| s.fail(message, cause)).await
    }

    pub async fn finish(&self, message: impl Into<String>) -> Result<Mutation, CoordinatorError> {
        let message = message.into();
        self.apply("finish", move |s| s.finish(message)).await
    }

    pub async fn add_configuration(
        &self,
        configuration: Configuration,
    ) -> Result<Mutation, CoordinatorError> {
        self.apply("add_configuration", move |s| {
            s.add_configuration(configuration)
        })
        .await
    }

    pub async fn set_configuration<I, K, V>(
        &self,
        kind: impl Into<String>,
        id: impl Into<String>,
        submit: bool,
        values: I,
    ) -> Result<Mutation, CoordinatorError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let kind = kind.into();
        let id = id.into();
        let values: Vec<(String, String)> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.apply("set_configuration", move |s| {
            s.set_configuration(&kind, &id, submit, values)
        })
        .await
    }

    pub async fn submit_configurations(&self, force: bool) -> Result<Mutation, CoordinatorError> {
        self.apply("submit_configurations", move |s| {
            s.submit_configurations(force)
        })
        .await
    }

    pub async fn set_persistent_location(
        &self,
        location: Url,
    ) -> Result<Mutation, CoordinatorError> {
        self.apply("set_persistent_location", move |s| {
            s.set_persistent_location(location)
        })
        .await
    }

    pub async fn remove_persistent_location(&self) -> Result<Mutation, CoordinatorError> {
        self.apply("remove_persistent_location", |s| {
            Ok(s.remove_persistent_location())
        })
        .await
    }

    pub async fn set_pod_name(&self, pod_name: PodName) -> Result<Mutation, CoordinatorError> {
        self.apply("set_pod_name", move |s| s.set_pod_name(pod_name))
            .await
    }

    pub async fn transition(&self, target: ChangeKind) -> Result<Mutation, CoordinatorError> {
        self.apply("transition", move |s| s.transition(target)).await
    }
}
