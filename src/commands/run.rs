// ABOUTME: Run command implementation.
// ABOUTME: Replays a plan through a deployment process and prints delivered events.

use deployer::config::Plan;
use deployer::diagnostics::{Diagnostics, Warning};
use deployer::error::{Error, Result};
use deployer::output::Output;
use deployer::process::{ChangeKind, DeploymentProcess, EventBus, KindFilter};
use deployer::replay::{ReplayOptions, StepOutcome, replay};

/// Flags of the run command.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub only: Vec<String>,
    pub force_submit: bool,
    pub keep_going: bool,
}

pub async fn run(plan: Plan, options: RunOptions, mut output: Output) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();
    let filter = parse_filter(&options.only)?;

    let bus = EventBus::new();
    let mut subscription = bus.subscribe(filter);

    let state = plan.new_state();
    output.progress(&format!(
        "Deploying {} to {} (process {})",
        plan.artifact,
        plan.namespace,
        state.id()
    ));
    // The process owns the only bus clone from here on; the subscription
    // ends once the process stops.
    let handle = DeploymentProcess::spawn(state, bus);

    let listener_output = output.clone();
    let listener = tokio::spawn(async move {
        let mut delivered = 0usize;
        while let Some(event) = subscription.recv().await {
            listener_output.event(&event);
            delivered += 1;
        }
        delivered
    });

    let replay_options = ReplayOptions {
        keep_going: options.keep_going,
        force_submit: options.force_submit,
    };
    let result = replay(&plan, &handle, replay_options, &mut diag).await;
    let final_state = handle.snapshot();
    drop(handle);

    match tokio::time::timeout(plan.settle, listener).await {
        Ok(Ok(delivered)) => tracing::debug!(delivered, "all events delivered"),
        Ok(Err(e)) => diag.warn(Warning::unsettled(format!("event listener failed: {e}"))),
        Err(_) => diag.warn(Warning::unsettled(format!(
            "events still in flight after {}",
            format_secs(plan.settle)
        ))),
    }

    output.state(&final_state);

    // Emit collected warnings
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    let reports = result?;
    let rejected = reports
        .iter()
        .filter(|r| matches!(r.outcome, StepOutcome::Rejected(_)))
        .count();

    if final_state.failed {
        return Err(Error::DeploymentFailed(
            final_state
                .completion_message
                .clone()
                .unwrap_or_else(|| "no message".to_string()),
        ));
    }

    if final_state.complete {
        output.success("Deployment complete!");
    } else {
        output.success(&format!(
            "Replayed {} step(s) ({} rejected), process open at version {}",
            reports.len(),
            rejected,
            final_state.version
        ));
    }
    Ok(())
}

fn parse_filter(names: &[String]) -> Result<KindFilter> {
    if names.is_empty() {
        return Ok(KindFilter::All);
    }
    names
        .iter()
        .map(|name| {
            ChangeKind::from_name(name.trim()).ok_or_else(|| Error::UnknownChangeKind(name.clone()))
        })
        .collect::<Result<Vec<_>>>()
        .map(KindFilter::only)
}

fn format_secs(duration: std::time::Duration) -> String {
    format!("{:.1}s", duration.as_secs_f64())
}
