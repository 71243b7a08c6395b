// ABOUTME: Pipeline steps replayed against a deployment process.
// ABOUTME: Each step maps onto exactly one mutation of the process state.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

use super::env_value::EnvValue;
use crate::process::ChangeKind;
use crate::types::PodName;

/// One pipeline stage action.
///
/// Written in YAML as a single-key map (`- store: https://...`). Steps whose
/// arguments are all optional may also be written as a bare word:
/// `- submit`, `- unstore` and `- pod` (which names the pod after the process).
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Add a configuration declared in the plan's `configurations`.
    Add { kind: String, id: String },
    /// Apply values to a configuration.
    Set {
        kind: String,
        id: String,
        submit: bool,
        values: BTreeMap<String, EnvValue>,
    },
    /// Submit all configurations.
    Submit { force: bool },
    /// Record the persistent location of the artifact.
    Store(Url),
    /// Forget the persistent location.
    Unstore,
    /// Record the pod running the artifact; `None` derives the name from the process.
    Pod(Option<PodName>),
    /// Advance through a pipeline milestone.
    Transition(ChangeKind),
    /// Complete successfully.
    Finish(String),
    /// Complete with a failure.
    Fail(String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AddArgs {
    kind: String,
    id: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SetArgs {
    kind: String,
    id: String,
    #[serde(default)]
    submit: bool,
    #[serde(default)]
    values: BTreeMap<String, EnvValue>,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubmitArgs {
    #[serde(default)]
    force: bool,
}

impl Step {
    /// Short name for logging/display.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Add { .. } => "add",
            Step::Set { .. } => "set",
            Step::Submit { .. } => "submit",
            Step::Store(_) => "store",
            Step::Unstore => "unstore",
            Step::Pod(_) => "pod",
            Step::Transition(_) => "transition",
            Step::Finish(_) => "finish",
            Step::Fail(_) => "fail",
        }
    }

    fn from_word(word: &str) -> Result<Self, String> {
        match word {
            "submit" => Ok(Step::Submit { force: false }),
            "unstore" => Ok(Step::Unstore),
            "pod" => Ok(Step::Pod(None)),
            "add" | "set" | "store" | "transition" | "finish" | "fail" => {
                Err(format!("step '{word}' needs arguments"))
            }
            other => Err(format!("unknown step '{other}'")),
        }
    }

    fn from_entry(name: &str, args: Value) -> Result<Self, String> {
        match name {
            "add" => {
                let AddArgs { kind, id } = args_of(name, args)?;
                Ok(Step::Add { kind, id })
            }
            "set" => {
                let SetArgs {
                    kind,
                    id,
                    submit,
                    values,
                } = args_of(name, args)?;
                Ok(Step::Set {
                    kind,
                    id,
                    submit,
                    values,
                })
            }
            "submit" => {
                let SubmitArgs { force } = if args.is_null() {
                    SubmitArgs::default()
                } else {
                    args_of(name, args)?
                };
                Ok(Step::Submit { force })
            }
            "store" => args_of(name, args).map(Step::Store),
            "unstore" if args.is_null() => Ok(Step::Unstore),
            "pod" if args.is_null() => Ok(Step::Pod(None)),
            "pod" => args_of(name, args).map(|pod| Step::Pod(Some(pod))),
            "transition" => args_of(name, args).map(Step::Transition),
            "finish" => args_of(name, args).map(Step::Finish),
            "fail" => args_of(name, args).map(Step::Fail),
            "unstore" => Err("step 'unstore' takes no arguments".to_string()),
            other => Err(format!("unknown step '{other}'")),
        }
    }
}

fn args_of<T: DeserializeOwned>(step: &str, args: Value) -> Result<T, String> {
    serde_yaml::from_value(args).map_err(|e| format!("step '{step}': {e}"))
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parsed = match Value::deserialize(deserializer)? {
            Value::String(word) => Step::from_word(&word),
            Value::Mapping(map) if map.len() == 1 => match map.into_iter().next() {
                Some((Value::String(name), args)) => Step::from_entry(&name, args),
                _ => Err("step name must be a string".to_string()),
            },
            _ => Err("a step is a step name or a map with exactly one step name".to_string()),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Add { kind, id } => write!(f, "add {kind}/{id}"),
            Step::Set {
                kind, id, submit, ..
            } => {
                write!(f, "set {kind}/{id}")?;
                if *submit {
                    write!(f, " (submit)")?;
                }
                Ok(())
            }
            Step::Submit { force } => {
                if *force {
                    write!(f, "submit (forced)")
                } else {
                    write!(f, "submit")
                }
            }
            Step::Store(url) => write!(f, "store {url}"),
            Step::Unstore => write!(f, "unstore"),
            Step::Pod(Some(name)) => write!(f, "pod {name}"),
            Step::Pod(None) => write!(f, "pod"),
            Step::Transition(kind) => write!(f, "transition {kind}"),
            Step::Finish(_) => write!(f, "finish"),
            Step::Fail(_) => write!(f, "fail"),
        }
    }
}
