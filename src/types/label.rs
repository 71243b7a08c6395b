// ABOUTME: DNS-compatible label validation.
// ABOUTME: Project and stage names of a namespace follow RFC 1123 label rules.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("label cannot be empty")]
    Empty,

    #[error("label exceeds maximum length of 63 characters")]
    TooLong,

    #[error("label cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("label cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("label must be lowercase")]
    NotLowercase,

    #[error("invalid character in label: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(String);

impl Label {
    pub fn new(value: &str) -> Result<Self, LabelError> {
        if value.is_empty() {
            return Err(LabelError::Empty);
        }

        if value.len() > 63 {
            return Err(LabelError::TooLong);
        }

        if value.starts_with('-') {
            return Err(LabelError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(LabelError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(LabelError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(LabelError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Label::new(&s).map_err(serde::de::Error::custom)
    }
}
