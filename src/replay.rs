// ABOUTME: Replays a deployment plan's steps against a running deployment process.
// ABOUTME: Each step is one mutation; rejections either stop the replay or become warnings.

use crate::config::{Plan, Step, resolve_values};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use crate::process::{CoordinatorError, Mutation, ProcessHandle};
use crate::types::PodName;

/// How a replay treats its steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Record rejected steps as warnings instead of stopping.
    pub keep_going: bool,
    /// Force every `submit` step, turning incomplete sets into rejections.
    pub force_submit: bool,
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Applied(Mutation),
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct StepReport {
    /// 1-based position in the plan.
    pub index: usize,
    pub step: String,
    pub outcome: StepOutcome,
}

/// Run every step of `plan` through `handle`, in order.
pub async fn replay(
    plan: &Plan,
    handle: &ProcessHandle,
    options: ReplayOptions,
    diag: &mut Diagnostics,
) -> Result<Vec<StepReport>> {
    let mut reports = Vec::with_capacity(plan.steps.len());

    for (i, step) in plan.steps.iter().enumerate() {
        let index = i + 1;
        tracing::debug!(index, step = %step, "applying step");

        let outcome = match apply_step(plan, handle, step, options).await? {
            Ok(mutation) => StepOutcome::Applied(mutation),
            Err(CoordinatorError::Rejected { source }) if options.keep_going => {
                diag.warn(Warning::rejected_step(format!(
                    "step {index} ({step}) rejected: {source}"
                )));
                StepOutcome::Rejected(source.to_string())
            }
            Err(source) => {
                return Err(Error::Step {
                    index,
                    step: step.to_string(),
                    source,
                });
            }
        };

        reports.push(StepReport {
            index,
            step: step.to_string(),
            outcome,
        });
    }

    Ok(reports)
}

/// Outer error: the plan itself is unusable. Inner error: the process said no.
async fn apply_step(
    plan: &Plan,
    handle: &ProcessHandle,
    step: &Step,
    options: ReplayOptions,
) -> Result<std::result::Result<Mutation, CoordinatorError>> {
    let result = match step {
        Step::Add { kind, id } => {
            let def = plan.configuration(kind, id).ok_or_else(|| {
                Error::InvalidPlan(format!("configuration {kind}/{id} is not declared"))
            })?;
            handle.add_configuration(def.to_configuration()).await
        }
        Step::Set {
            kind,
            id,
            submit,
            values,
        } => {
            let def = plan.configuration(kind, id).ok_or_else(|| {
                Error::InvalidPlan(format!("configuration {kind}/{id} is not declared"))
            })?;
            let values = resolve_values(&def.keys, values)?;
            handle
                .set_configuration(kind.as_str(), id.as_str(), *submit, values)
                .await
        }
        Step::Submit { force } => {
            handle
                .submit_configurations(*force || options.force_submit)
                .await
        }
        Step::Store(url) => handle.set_persistent_location(url.clone()).await,
        Step::Unstore => handle.remove_persistent_location().await,
        Step::Pod(name) => {
            let name = name
                .clone()
                .unwrap_or_else(|| PodName::for_process(&plan.namespace, handle.id()));
            handle.set_pod_name(name).await
        }
        Step::Transition(kind) => handle.transition(*kind).await,
        Step::Finish(message) => handle.finish(message.as_str()).await,
        Step::Fail(message) => handle.fail(message.as_str(), None).await,
    };
    Ok(result)
}
