// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod artifact_name;
mod id;
mod label;
mod namespace;

pub use artifact_name::{ArtifactName, ArtifactNameError};
pub use id::{Id, IdError, IdKind, PodMarker, PodName, ProcessId, ProcessMarker};
pub use label::{Label, LabelError};
pub use namespace::Namespace;
