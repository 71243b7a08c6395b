// ABOUTME: Deployment process tracking: versioned state, configurations and change events.
// ABOUTME: The state is pure; the coordinator owns it and forwards change events.

mod change_kind;
mod configuration;
mod coordinator;
mod error;
mod event;
mod mutation;
mod state;

pub use change_kind::{ChangeKind, KindFilter};
pub use configuration::{Configuration, KeySpec};
pub use coordinator::{DeploymentProcess, ProcessHandle};
pub use error::{CoordinatorError, ProcessError, ProcessErrorKind};
pub use event::{EventBus, EventSink, StateChanged, Subscription};
pub use mutation::Mutation;
pub use state::{DeploymentProcessState, FailureCause, StateSnapshot};
