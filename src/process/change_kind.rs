// ABOUTME: Symbolic tags describing which kind of mutation a deployment process went through.
// ABOUTME: Subscribers filter notification delivery by these kinds.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// What just happened to a deployment process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Process was created and the artifact accepted.
    ProcessStarted,
    /// Artifact was stored at its persistent location.
    ArtifactStored,
    /// Artifact inspection began.
    InspectionStarted,
    /// Inspection discovered a configuration.
    ConfigurationAdded,
    /// Inspection is over; no more configurations will be added.
    InspectionFinished,
    /// Values were applied to a configuration.
    ConfigurationSet,
    /// All configurations are complete and submitted.
    ConfigurationFinished,
    /// Provisioning in the target namespace began.
    ProvisionStarted,
    /// Runtime instance was created.
    PodCreated,
    /// Runtime instance reports readiness.
    PodReady,
    /// Runtime instance failed to start.
    PodFailed,
    /// Deployment completed successfully.
    ProvisionFinished,
    /// Artifact was removed from its persistent location.
    ArtifactDeleted,
    /// Deployment failed.
    Failed,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 14] = [
        ChangeKind::ProcessStarted,
        ChangeKind::ArtifactStored,
        ChangeKind::InspectionStarted,
        ChangeKind::ConfigurationAdded,
        ChangeKind::InspectionFinished,
        ChangeKind::ConfigurationSet,
        ChangeKind::ConfigurationFinished,
        ChangeKind::ProvisionStarted,
        ChangeKind::PodCreated,
        ChangeKind::PodReady,
        ChangeKind::PodFailed,
        ChangeKind::ProvisionFinished,
        ChangeKind::ArtifactDeleted,
        ChangeKind::Failed,
    ];

    /// Stable name used in logs and on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ChangeKind::ProcessStarted => "process_started",
            ChangeKind::ArtifactStored => "artifact_stored",
            ChangeKind::InspectionStarted => "inspection_started",
            ChangeKind::ConfigurationAdded => "configuration_added",
            ChangeKind::InspectionFinished => "inspection_finished",
            ChangeKind::ConfigurationSet => "configuration_set",
            ChangeKind::ConfigurationFinished => "configuration_finished",
            ChangeKind::ProvisionStarted => "provision_started",
            ChangeKind::PodCreated => "pod_created",
            ChangeKind::PodReady => "pod_ready",
            ChangeKind::PodFailed => "pod_failed",
            ChangeKind::ProvisionFinished => "provision_finished",
            ChangeKind::ArtifactDeleted => "artifact_deleted",
            ChangeKind::Failed => "failed",
        }
    }

    /// Parse a stable name back into a kind.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Whether this kind ends the deployment process.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChangeKind::Failed | ChangeKind::ProvisionFinished)
    }

    /// A filter that accepts only this kind.
    pub fn as_filter(self) -> KindFilter {
        KindFilter::only([self])
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Selects which change kinds a subscriber wants delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KindFilter {
    #[default]
    All,
    Only(HashSet<ChangeKind>),
}

impl KindFilter {
    pub fn only(kinds: impl IntoIterator<Item = ChangeKind>) -> Self {
        KindFilter::Only(kinds.into_iter().collect())
    }

    pub fn accepts(&self, kind: ChangeKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Only(kinds) => kinds.contains(&kind),
        }
    }
}
