// ABOUTME: Values a plan assigns to configuration keys.
// ABOUTME: Scalars or environment references, resolved against the target key definitions.

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::process::KeySpec;

/// A value for one configuration key.
///
/// Written in YAML either as a scalar (`pool: 10`, `debug: true`) or as an
/// environment reference (`url: {env: DATASOURCE_URL, default: ...}`).
/// An empty value (`pool: ""` or `pool: ~`) clears the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    Literal(String),
    FromEnv { var: String, default: Option<String> },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EnvReference {
    env: String,
    #[serde(default)]
    default: Option<Value>,
}

impl<'de> Deserialize<'de> for EnvValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(EnvValue::Literal(String::new()));
        }
        if let Some(literal) = scalar_text(&value) {
            return Ok(EnvValue::Literal(literal));
        }
        if value.is_mapping() {
            let reference: EnvReference =
                serde_yaml::from_value(value).map_err(serde::de::Error::custom)?;
            let default = match reference.default {
                None => None,
                Some(v) => Some(scalar_text(&v).ok_or_else(|| {
                    serde::de::Error::custom("env default must be a string, number or boolean")
                })?),
            };
            return Ok(EnvValue::FromEnv {
                var: reference.env,
                default,
            });
        }
        Err(serde::de::Error::custom(
            "configuration value must be a string, number, boolean or {env, default} map",
        ))
    }
}

/// Text of a YAML scalar, as it would be written in a properties file.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => std::env::var(var)
                .ok()
                .or_else(|| default.clone())
                .ok_or_else(|| Error::MissingEnvVar(var.clone())),
        }
    }
}

/// Names in `values` that no key in `keys` defines.
pub fn unknown_keys<'a>(keys: &[KeySpec], values: &'a BTreeMap<String, EnvValue>) -> Vec<&'a str> {
    values
        .keys()
        .filter(|name| !keys.iter().any(|k| &k.name == *name))
        .map(String::as_str)
        .collect()
}

/// Resolve plan values for a configuration with the given key definitions.
///
/// An unset variable only matters for a required key without a default;
/// other keys are left out so their current value or default stays in effect.
pub fn resolve_values(
    keys: &[KeySpec],
    values: &BTreeMap<String, EnvValue>,
) -> Result<BTreeMap<String, String>> {
    if let Some(name) = unknown_keys(keys, values).first() {
        return Err(Error::InvalidPlan(format!("no key named '{name}'")));
    }

    let mut resolved = BTreeMap::new();
    for (name, value) in values {
        match value.resolve() {
            Ok(v) => {
                resolved.insert(name.clone(), v);
            }
            Err(e) => {
                let spec = keys.iter().find(|k| &k.name == name);
                if spec.is_some_and(|k| k.required && k.default.is_none()) {
                    return Err(e);
                }
                tracing::debug!(key = %name, "environment value unset, key left alone");
            }
        }
    }
    Ok(resolved)
}
