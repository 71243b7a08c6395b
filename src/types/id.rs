// ABOUTME: Identifiers of deployment processes and the pods that run them.
// ABOUTME: One generic Id type, with validation rules chosen per identifier kind.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use thiserror::Error;

use super::label::{Label, LabelError};
use super::namespace::Namespace;

#[derive(Debug, Error)]
pub enum IdError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("{0} cannot contain whitespace")]
    Whitespace(&'static str),

    #[error("invalid {kind}: {source}")]
    InvalidLabel {
        kind: &'static str,
        #[source]
        source: LabelError,
    },
}

/// Validation rules for one kind of identifier.
pub trait IdKind {
    /// Human-readable name used in errors and debug output.
    const NAME: &'static str;

    fn validate(value: &str) -> Result<(), IdError>;
}

/// Marker for deployment process ids. Opaque, but never blank.
pub enum ProcessMarker {}

/// Marker for pod names. Pods are addressed by DNS label.
pub enum PodMarker {}

impl IdKind for ProcessMarker {
    const NAME: &'static str = "process id";

    fn validate(value: &str) -> Result<(), IdError> {
        if value.is_empty() {
            return Err(IdError::Empty(Self::NAME));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(IdError::Whitespace(Self::NAME));
        }
        Ok(())
    }
}

impl IdKind for PodMarker {
    const NAME: &'static str = "pod name";

    fn validate(value: &str) -> Result<(), IdError> {
        Label::new(value)
            .map(|_| ())
            .map_err(|source| IdError::InvalidLabel {
                kind: Self::NAME,
                source,
            })
    }
}

/// String identifier tagged with its kind, so a `PodName` can never be
/// passed where a `ProcessId` is expected.
#[must_use = "IDs reference resources and should not be ignored"]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<T>,
}

pub type ProcessId = Id<ProcessMarker>;
pub type PodName = Id<PodMarker>;

impl<T: IdKind> Id<T> {
    /// Validate `value` against the rules of this identifier kind.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        T::validate(&value)?;
        Ok(Self::new(value))
    }
}

impl<T> Id<T> {
    /// Wrap a trusted value without validation.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

impl ProcessId {
    /// Fresh process-wide unique id (random UUID v4).
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    /// First eight characters, enough to tell processes apart in names and logs.
    pub fn short(&self) -> &str {
        let end = self
            .value
            .char_indices()
            .nth(8)
            .map_or(self.value.len(), |(i, _)| i);
        &self.value[..end]
    }
}

impl PodName {
    /// Default pod name for a process: `<project>-<stage>-<short id>`.
    ///
    /// Characters a DNS label cannot hold are dropped and the result is cut
    /// to 63 characters.
    pub fn for_process(namespace: &Namespace, process: &ProcessId) -> Self {
        let raw = format!("{}-{}", namespace, process.short()).to_ascii_lowercase();
        let mut name: String = raw
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
            .take(63)
            .collect();
        while name.ends_with('-') {
            name.pop();
        }
        Self::new(name)
    }
}

impl<T: IdKind> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", T::NAME, self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// Derives would put bounds on T; the marker types implement nothing.

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, T: IdKind> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(value).map_err(serde::de::Error::custom)
    }
}
