// ABOUTME: Outcome of a mutation call on a deployment process state.
// ABOUTME: Separates broadcast, silent-but-versioned, and no-op results in the type.

use super::ChangeKind;

/// What a mutation did, and whether anyone must be told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "broadcast mutations must be forwarded to subscribers"]
pub enum Mutation {
    /// State changed and version was bumped; publish this kind.
    Broadcast(ChangeKind),
    /// State changed and version was bumped; publish nothing.
    Silent,
    /// Nothing changed.
    Unchanged,
}

impl Mutation {
    /// The kind to publish, if any.
    pub fn change_kind(&self) -> Option<ChangeKind> {
        match self {
            Mutation::Broadcast(kind) => Some(*kind),
            Mutation::Silent | Mutation::Unchanged => None,
        }
    }

    /// Whether the version was bumped.
    pub fn is_versioned(&self) -> bool {
        !matches!(self, Mutation::Unchanged)
    }
}
