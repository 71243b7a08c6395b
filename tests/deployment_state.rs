// ABOUTME: Tests for the deployment process state aggregate.
// ABOUTME: Verifies versioning, configuration gating, silent mutations and terminal state.

use deployer::process::{
    ChangeKind, Configuration, DeploymentProcessState, FailureCause, KeySpec, Mutation,
    ProcessError, ProcessErrorKind,
};
use deployer::types::{ArtifactName, Namespace, PodName, ProcessId};
use proptest::prelude::*;
use std::sync::Arc;
use url::Url;

fn new_state() -> DeploymentProcessState {
    DeploymentProcessState::with_id(
        ProcessId::new("proc-1"),
        Namespace::new("shop", "dev").unwrap(),
        ArtifactName::new("shop.war").unwrap(),
        None,
    )
}

fn two_key_config() -> Configuration {
    Configuration::new("env", "app").with_keys([KeySpec::required("a"), KeySpec::required("b")])
}

fn store_url() -> Url {
    Url::parse("https://artifacts.example.com/shop.war").unwrap()
}

// =============================================================================
// Configuration Management
// =============================================================================

/// Test: A second configuration with the same kind and id is rejected without side effects.
#[test]
fn duplicate_configuration_is_rejected() {
    let mut state = new_state();
    assert_eq!(
        state.add_configuration(two_key_config()),
        Ok(Mutation::Broadcast(ChangeKind::ConfigurationAdded))
    );

    // Same identity, different keys: still a duplicate.
    let err = state
        .add_configuration(Configuration::new("env", "app").with_key(KeySpec::optional("z")))
        .unwrap_err();

    assert_eq!(err.kind(), ProcessErrorKind::Duplicate);
    assert_eq!(state.configurations().len(), 1);
    assert_eq!(state.version(), 1);
}

/// Test: Setting values on a missing configuration leaves the state unchanged.
#[test]
fn set_configuration_on_missing_entry_is_not_found() {
    let mut state = new_state();
    state.add_configuration(two_key_config()).unwrap();

    let err = state
        .set_configuration("env", "other", true, [("a", "1")])
        .unwrap_err();

    assert_eq!(
        err,
        ProcessError::ConfigurationNotFound {
            kind: "env".to_string(),
            id: "other".to_string(),
        }
    );
    assert_eq!(state.version(), 1);
    assert_eq!(state.configuration("env", "app").unwrap().value("a"), None);
}

/// Test: Completeness gates forced submission of the configuration set.
#[test]
fn forced_submission_waits_for_completeness() {
    let mut state = new_state();
    state.add_configuration(two_key_config()).unwrap();

    state
        .set_configuration("env", "app", false, [("a", "1")])
        .unwrap();
    assert!(!state.configuration("env", "app").unwrap().is_complete());
    assert_eq!(state.version(), 2);

    let err = state.submit_configurations(true).unwrap_err();
    assert!(matches!(err, ProcessError::IncompleteConfiguration { .. }));
    assert_eq!(state.version(), 2);
    assert!(!state.configuration("env", "app").unwrap().is_submitted());

    state
        .set_configuration("env", "app", false, [("b", "2")])
        .unwrap();
    assert!(state.configuration("env", "app").unwrap().is_complete());

    assert_eq!(
        state.submit_configurations(true),
        Ok(Mutation::Broadcast(ChangeKind::ConfigurationFinished))
    );
    assert!(state.configuration("env", "app").unwrap().is_submitted());
    assert_eq!(state.version(), 4);
}

/// Test: Non-forced submission of an incomplete set is a quiet no-op.
#[test]
fn unforced_submission_of_incomplete_set_is_unchanged() {
    let mut state = new_state();
    state.add_configuration(two_key_config()).unwrap();

    assert_eq!(state.submit_configurations(false), Ok(Mutation::Unchanged));
    assert_eq!(state.version(), 1);
}

/// Test: Submission is all or nothing across the configuration set.
#[test]
fn submission_never_marks_a_subset() {
    let mut state = new_state();
    state
        .add_configuration(Configuration::new("env", "done").with_key(KeySpec::optional("x")))
        .unwrap();
    state.add_configuration(two_key_config()).unwrap();

    assert_eq!(state.submit_configurations(false), Ok(Mutation::Unchanged));
    assert!(state.configurations().iter().all(|c| !c.is_submitted()));
}

/// Test: An empty configuration set is trivially complete.
#[test]
fn empty_configuration_set_submits() {
    let mut state = new_state();
    assert_eq!(
        state.submit_configurations(false),
        Ok(Mutation::Broadcast(ChangeKind::ConfigurationFinished))
    );
    assert_eq!(state.version(), 1);
}

/// Test: Defaults count towards completeness.
#[test]
fn defaults_complete_required_keys() {
    let mut state = new_state();
    state
        .add_configuration(
            Configuration::new("env", "db").with_key(KeySpec::required("user").with_default("app")),
        )
        .unwrap();
    assert_eq!(
        state.submit_configurations(true),
        Ok(Mutation::Broadcast(ChangeKind::ConfigurationFinished))
    );
}

/// Test: set_configuration with submit only submits once the entry is complete.
#[test]
fn per_entry_submit_requires_completion() {
    let mut state = new_state();
    state.add_configuration(two_key_config()).unwrap();

    let outcome = state
        .set_configuration("env", "app", true, [("a", "1")])
        .unwrap();
    assert_eq!(outcome, Mutation::Broadcast(ChangeKind::ConfigurationSet));
    assert!(!state.configuration("env", "app").unwrap().is_submitted());

    state
        .set_configuration("env", "app", true, [("b", "2")])
        .unwrap();
    assert!(state.configuration("env", "app").unwrap().is_submitted());
}

/// Test: Clearing a required value regresses a submitted entry to incomplete.
///
/// Not guarded: the entry stays submitted while no longer complete.
#[test]
fn clearing_a_value_regresses_completeness_but_keeps_submission() {
    let mut state = new_state();
    state.add_configuration(two_key_config()).unwrap();
    state
        .set_configuration("env", "app", true, [("a", "1"), ("b", "2")])
        .unwrap();
    assert!(state.configuration("env", "app").unwrap().is_submitted());

    state
        .set_configuration("env", "app", false, [("b", "")])
        .unwrap();

    let config = state.configuration("env", "app").unwrap();
    assert!(!config.is_complete());
    assert!(config.is_submitted());
    assert_eq!(config.missing_keys(), vec!["b"]);
}

// =============================================================================
// Persistent Location
// =============================================================================

/// Test: Removing the persistent location is versioned but silent.
#[test]
fn remove_persistent_location_is_silent_but_versioned() {
    let mut state = new_state();
    state.set_persistent_location(store_url()).unwrap();
    assert_eq!(state.persistent_location(), Some(&store_url()));

    let outcome = state.remove_persistent_location();
    assert_eq!(outcome, Mutation::Silent);
    assert_eq!(outcome.change_kind(), None);
    assert!(outcome.is_versioned());
    assert_eq!(state.version(), 2);
    assert!(state.persistent_location().is_none());
}

// =============================================================================
// Terminal State
// =============================================================================

#[derive(Debug)]
struct ProbeTimeout;

impl std::fmt::Display for ProbeTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "readiness check timed out")
    }
}

impl std::error::Error for ProbeTimeout {}

/// Test: fail records the outcome and always broadcasts the failure kind.
#[test]
fn fail_marks_complete_and_failed() {
    let mut state = new_state();
    let cause: FailureCause = Arc::new(ProbeTimeout);

    let outcome = state.fail("pod never became ready", Some(cause)).unwrap();

    assert_eq!(outcome, Mutation::Broadcast(ChangeKind::Failed));
    assert!(state.is_complete());
    assert!(state.is_failed());
    assert!(state.completion().is_some());
    assert_eq!(state.completion_message(), Some("pod never became ready"));
    assert_eq!(
        state.failure_cause().unwrap().to_string(),
        "readiness check timed out"
    );
    assert_eq!(state.version(), 1);
}

/// Test: A completed process rejects further mutations, including a second fail.
#[test]
fn terminal_state_is_immutable() {
    let mut state = new_state();
    state.fail("first", None).unwrap();
    let completion = state.completion();

    let err = state.fail("second", None).unwrap_err();
    assert_eq!(err, ProcessError::AlreadyCompleted("proc-1".to_string()));
    assert_eq!(state.completion_message(), Some("first"));
    assert_eq!(state.completion(), completion);

    assert!(state.add_configuration(two_key_config()).is_err());
    assert!(state.submit_configurations(false).is_err());
    assert!(state.set_persistent_location(store_url()).is_err());
    assert!(state.set_pod_name(PodName::new("shop-dev-1")).is_err());
    assert!(state.transition(ChangeKind::PodReady).is_err());
    assert!(state.finish("late").is_err());
    assert_eq!(state.version(), 1);
}

/// Test: The persistent location can still be cleared after completion.
#[test]
fn persistent_location_can_be_removed_after_completion() {
    let mut state = new_state();
    state.set_persistent_location(store_url()).unwrap();
    state.finish("deployed").unwrap();

    assert_eq!(state.remove_persistent_location(), Mutation::Silent);
    assert!(state.persistent_location().is_none());
    assert_eq!(state.version(), 3);
}

/// Test: finish is the successful terminal path.
#[test]
fn finish_marks_complete_without_failure() {
    let mut state = new_state();
    state.set_pod_name(PodName::new("shop-dev-1")).unwrap();
    assert_eq!(
        state.finish("deployed"),
        Ok(Mutation::Broadcast(ChangeKind::ProvisionFinished))
    );
    assert!(state.is_complete());
    assert!(!state.is_failed());
    assert!(state.failure_cause().is_none());
    assert_eq!(state.pod_name().map(PodName::as_str), Some("shop-dev-1"));
}

// =============================================================================
// End-to-End
// =============================================================================

/// Test: Discovery, configuration, submission and storage in one pass.
#[test]
fn end_to_end_configuration_flow() {
    let mut state = new_state();
    assert_eq!(state.version(), 0);

    let k = Configuration::new("env", "k").with_key(KeySpec::required("x"));
    assert_eq!(
        state.add_configuration(k),
        Ok(Mutation::Broadcast(ChangeKind::ConfigurationAdded))
    );
    assert_eq!(state.version(), 1);

    assert_eq!(
        state.set_configuration("env", "k", true, [("x", "v")]),
        Ok(Mutation::Broadcast(ChangeKind::ConfigurationSet))
    );
    assert_eq!(state.version(), 2);
    assert!(state.configuration("env", "k").unwrap().is_submitted());

    assert_eq!(
        state.submit_configurations(true),
        Ok(Mutation::Broadcast(ChangeKind::ConfigurationFinished))
    );
    assert_eq!(state.version(), 3);

    assert_eq!(
        state.set_persistent_location(store_url()),
        Ok(Mutation::Broadcast(ChangeKind::ArtifactStored))
    );
    assert_eq!(state.version(), 4);
}

// =============================================================================
// Version Property
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Set(usize, &'static str, &'static str, bool),
    Submit(bool),
    Store,
    Unstore,
    Pod,
    Transition(ChangeKind),
    Fail,
    Finish,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..3usize).prop_map(Op::Add),
        6 => (
            0..4usize,
            prop::sample::select(vec!["a", "b", "c"]),
            prop::sample::select(vec!["", "1", "2"]),
            any::<bool>()
        )
            .prop_map(|(i, k, v, s)| Op::Set(i, k, v, s)),
        3 => any::<bool>().prop_map(Op::Submit),
        1 => Just(Op::Store),
        1 => Just(Op::Unstore),
        1 => Just(Op::Pod),
        2 => prop::sample::select(ChangeKind::ALL.to_vec()).prop_map(Op::Transition),
        1 => Just(Op::Fail),
        1 => Just(Op::Finish),
    ]
}

fn config(i: usize) -> Configuration {
    Configuration::new("env", format!("c{i}"))
        .with_keys([KeySpec::required("a"), KeySpec::optional("b")])
}

fn apply(state: &mut DeploymentProcessState, op: &Op) -> Result<Mutation, ProcessError> {
    match op {
        Op::Add(i) => state.add_configuration(config(*i)),
        Op::Set(i, k, v, submit) => {
            state.set_configuration("env", &format!("c{i}"), *submit, [(*k, *v)])
        }
        Op::Submit(force) => state.submit_configurations(*force),
        Op::Store => state.set_persistent_location(store_url()),
        Op::Unstore => Ok(state.remove_persistent_location()),
        Op::Pod => state.set_pod_name(PodName::new("pod")),
        Op::Transition(kind) => state.transition(*kind),
        Op::Fail => state.fail("boom", None),
        Op::Finish => state.finish("done"),
    }
}

proptest! {
    /// Version equals the number of accepted, versioned mutations; rejections never bump it.
    #[test]
    fn version_counts_accepted_mutations(ops in prop::collection::vec(op(), 0..60)) {
        let mut state = new_state();
        let mut accepted = 0u64;

        for op in &ops {
            let before = state.version();
            match apply(&mut state, op) {
                Ok(mutation) if mutation.is_versioned() => {
                    accepted += 1;
                    prop_assert_eq!(state.version(), before + 1);
                }
                Ok(_) | Err(_) => {
                    prop_assert_eq!(state.version(), before);
                }
            }
            prop_assert!(!state.is_failed() || state.is_complete());
        }

        prop_assert_eq!(state.version(), accepted);
    }

    /// No two configurations ever share kind and id.
    #[test]
    fn configuration_identities_stay_unique(ops in prop::collection::vec(op(), 0..60)) {
        let mut state = new_state();
        for op in &ops {
            let _ = apply(&mut state, op);
        }
        let configs = state.configurations();
        for (i, a) in configs.iter().enumerate() {
            for b in &configs[i + 1..] {
                prop_assert!(a != b);
            }
        }
    }
}
