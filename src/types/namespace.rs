// ABOUTME: Deployment target namespace made of a project and a stage.
// ABOUTME: Immutable handle compared by value; renders as "project-stage".

use serde::{Deserialize, Serialize};
use std::fmt;

use super::label::{Label, LabelError};

/// Target environment of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    project: Label,
    stage: Label,
}

impl Namespace {
    pub fn new(project: &str, stage: &str) -> Result<Self, LabelError> {
        Ok(Self {
            project: Label::new(project)?,
            stage: Label::new(stage)?,
        })
    }

    pub fn project(&self) -> &str {
        self.project.as_str()
    }

    pub fn stage(&self) -> &str {
        self.stage.as_str()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.project, self.stage)
    }
}
