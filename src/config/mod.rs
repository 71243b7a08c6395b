// ABOUTME: Deployment plan types and parsing for deployer.yml.
// ABOUTME: Describes one deployment attempt: target, artifact, configurations and steps.

mod env_value;
mod init;
mod step;

pub use env_value::{EnvValue, resolve_values, unknown_keys};
pub use init::init_plan;
pub use step::Step;

use crate::error::{Error, Result};
use crate::process::{Configuration, DeploymentProcessState, KeySpec};
use crate::types::{ArtifactName, Namespace};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const PLAN_FILENAME: &str = "deployer.yml";
pub const PLAN_FILENAME_ALT: &str = "deployer.yaml";
pub const PLAN_FILENAME_DIR: &str = ".deployer/plan.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    pub namespace: Namespace,

    pub artifact: ArtifactName,

    #[serde(default)]
    pub temp_location: Option<PathBuf>,

    /// How long to wait for subscribers to drain after the last step.
    #[serde(default = "default_settle", with = "humantime_serde")]
    pub settle: Duration,

    #[serde(default)]
    pub configurations: Vec<ConfigurationDef>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A configuration the inspection stage will discover.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigurationDef {
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub keys: Vec<KeySpec>,
}

impl ConfigurationDef {
    pub fn to_configuration(&self) -> Configuration {
        Configuration::new(&self.kind, &self.id).with_keys(self.keys.iter().cloned())
    }
}

fn default_settle() -> Duration {
    Duration::from_secs(5)
}

impl Plan {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let plan: Plan = serde_yaml::from_str(yaml)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(PLAN_FILENAME),
            dir.join(PLAN_FILENAME_ALT),
            dir.join(PLAN_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::PlanNotFound(dir.to_path_buf()))
    }

    /// Check the plan is self-consistent.
    ///
    /// Declared configurations must be unique, every `add` and `set` step must
    /// name one of them, and `set` may only use keys the declaration defines.
    /// Ordering rules (adding twice, setting before adding) are left to the
    /// process so they surface as rejections.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for def in &self.configurations {
            if !seen.insert((def.kind.as_str(), def.id.as_str())) {
                return Err(Error::InvalidPlan(format!(
                    "configuration {}/{} declared twice",
                    def.kind, def.id
                )));
            }
        }

        for (index, step) in self.steps.iter().enumerate() {
            let (kind, id) = match step {
                Step::Add { kind, id } | Step::Set { kind, id, .. } => (kind, id),
                _ => continue,
            };
            let def = self.configuration(kind, id).ok_or_else(|| {
                Error::InvalidPlan(format!(
                    "step {} ({}) targets undeclared configuration {}/{}",
                    index + 1,
                    step.name(),
                    kind,
                    id
                ))
            })?;
            if let Step::Set { values, .. } = step {
                let unknown = unknown_keys(&def.keys, values);
                if !unknown.is_empty() {
                    return Err(Error::InvalidPlan(format!(
                        "step {} sets unknown key(s) {} on {}/{}",
                        index + 1,
                        unknown.join(", "),
                        kind,
                        id
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn configuration(&self, kind: &str, id: &str) -> Option<&ConfigurationDef> {
        self.configurations
            .iter()
            .find(|c| c.kind == kind && c.id == id)
    }

    /// Fresh process state for this plan.
    pub fn new_state(&self) -> DeploymentProcessState {
        DeploymentProcessState::new(
            self.namespace.clone(),
            self.artifact.clone(),
            self.temp_location.clone(),
        )
    }

    pub fn template() -> Self {
        Plan {
            namespace: Namespace::new("my-project", "dev")
                .expect("template namespace is valid"),
            artifact: ArtifactName::new("my-app.war")
                .expect("template artifact name is valid"),
            temp_location: None,
            settle: default_settle(),
            configurations: vec![ConfigurationDef {
                kind: "datasource".to_string(),
                id: "main".to_string(),
                keys: vec![
                    KeySpec::required("url"),
                    KeySpec::required("user").with_default("app"),
                ],
            }],
            steps: Vec::new(),
        }
    }
}
