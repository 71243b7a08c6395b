// ABOUTME: Configuration requirements discovered for an artifact.
// ABOUTME: Tracks key definitions, set values, completeness and submission.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use super::error::ProcessError;

/// Definition of a single configuration key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl KeySpec {
    /// A key that must have a value (or default) before submission.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            default: None,
        }
    }

    /// A key that may stay empty.
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// A named group of key/value requirements.
///
/// Identity is the `(kind, id)` pair: two configurations with the same kind
/// and id are equal regardless of their keys or values.
#[derive(Debug, Clone)]
pub struct Configuration {
    kind: String,
    id: String,
    keys: Vec<KeySpec>,
    values: BTreeMap<String, String>,
    submitted: bool,
}

impl Configuration {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            keys: Vec::new(),
            values: BTreeMap::new(),
            submitted: false,
        }
    }

    /// Add a key definition. A later definition with the same name replaces the earlier one.
    pub fn with_key(mut self, spec: KeySpec) -> Self {
        match self.keys.iter_mut().find(|k| k.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.keys.push(spec),
        }
        self
    }

    pub fn with_keys(self, specs: impl IntoIterator<Item = KeySpec>) -> Self {
        specs.into_iter().fold(self, Configuration::with_key)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether this configuration is identified by `kind` and `id`.
    pub fn matches(&self, kind: &str, id: &str) -> bool {
        self.kind == kind && self.id == id
    }

    /// Key names in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.name.as_str())
    }

    pub fn key_specs(&self) -> &[KeySpec] {
        &self.keys
    }

    fn spec(&self, key: &str) -> Option<&KeySpec> {
        self.keys.iter().find(|k| k.name == key)
    }

    pub fn is_required(&self, key: &str) -> bool {
        self.spec(key).is_some_and(|k| k.required)
    }

    pub fn default_value(&self, key: &str) -> Option<&str> {
        self.spec(key).and_then(|k| k.default.as_deref())
    }

    /// Value explicitly set for `key`, ignoring defaults.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value set for `key`, falling back to its default.
    pub fn effective_value(&self, key: &str) -> Option<&str> {
        self.value(key).or_else(|| self.default_value(key))
    }

    /// Explicitly set values, keyed by name.
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Required keys that have neither a value nor a default.
    pub fn missing_keys(&self) -> Vec<&str> {
        self.keys
            .iter()
            .filter(|k| k.required && self.effective_value(&k.name).is_none())
            .map(|k| k.name.as_str())
            .collect()
    }

    /// True when every required key has a value or a default.
    pub fn is_complete(&self) -> bool {
        self.keys
            .iter()
            .all(|k| !k.required || self.effective_value(&k.name).is_some())
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Mark as submitted (or not). Submitting an incomplete configuration
    /// is refused and returns `false`.
    #[must_use = "submission is refused for incomplete configurations"]
    pub(crate) fn set_submitted(&mut self, submitted: bool) -> bool {
        if submitted && !self.is_complete() {
            return false;
        }
        self.submitted = submitted;
        true
    }

    /// Apply values onto the key/value map.
    ///
    /// Keys not mentioned are left alone. An empty value clears the key.
    /// Every key is checked before anything is written, so an unknown key
    /// leaves the configuration untouched.
    pub fn update_configuration<I, K, V>(&mut self, values: I) -> Result<(), ProcessError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values: Vec<(String, String)> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        if let Some((key, _)) = values.iter().find(|(key, _)| self.spec(key).is_none()) {
            return Err(ProcessError::UnknownKey {
                kind: self.kind.clone(),
                id: self.id.clone(),
                key: key.clone(),
            });
        }

        for (key, value) in values {
            if value.is_empty() {
                self.values.remove(&key);
            } else {
                self.values.insert(key, value);
            }
        }
        Ok(())
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl Eq for Configuration {}

impl std::hash::Hash for Configuration {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.id.hash(state);
    }
}

#[derive(Serialize)]
struct ConfigurationBody<'a> {
    keys: &'a [KeySpec],
    values: &'a BTreeMap<String, String>,
}

/// Serializes as `{"<id>": {"keys": [{name, required, default?}], "values": {..}}}`.
/// Defaults are not echoed into `values`.
impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(
            &self.id,
            &ConfigurationBody {
                keys: &self.keys,
                values: &self.values,
            },
        )?;
        map.end()
    }
}
