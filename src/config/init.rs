// ABOUTME: Plan scaffolding for new projects.
// ABOUTME: Creates deployer.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{ArtifactName, Namespace};

use super::{PLAN_FILENAME, Plan};

pub fn init_plan(
    dir: &Path,
    namespace: Option<(&str, &str)>,
    artifact: Option<&str>,
    force: bool,
) -> Result<()> {
    let plan_path = dir.join(PLAN_FILENAME);

    if plan_path.exists() && !force {
        return Err(Error::AlreadyExists(plan_path));
    }

    let mut plan = Plan::template();

    if let Some((project, stage)) = namespace {
        plan.namespace =
            Namespace::new(project, stage).map_err(|e| Error::InvalidPlan(e.to_string()))?;
    }

    if let Some(a) = artifact {
        plan.artifact = ArtifactName::new(a).map_err(|e| Error::InvalidPlan(e.to_string()))?;
    }

    let yaml = generate_template_yaml(&plan);
    std::fs::write(&plan_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(plan: &Plan) -> String {
    format!(
        r#"namespace:
  project: {}
  stage: {}
artifact: {}
# How long `deployer run` waits for events to be delivered
settle: 5s

configurations:
  - kind: datasource
    id: main
    keys:
      - name: url
        required: true
      - name: user
        required: true
        default: app

steps:
  - transition: inspection_started
  - add:
      kind: datasource
      id: main
  - transition: inspection_finished
  - set:
      kind: datasource
      id: main
      submit: true
      values:
        url:
          env: DATASOURCE_URL
          default: jdbc:h2:mem:{}
  - submit:
      force: true
  - store: https://artifacts.example.com/{}
  - finish: deployed
"#,
        plan.namespace.project(),
        plan.namespace.stage(),
        plan.artifact,
        plan.namespace.project(),
        plan.artifact,
    )
}
