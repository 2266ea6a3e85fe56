use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single stored preference.
///
/// The store is user-editable YAML, so values arrive as whatever YAML scalar the
/// user typed. Getters are lenient: a number is readable as text, and the text
/// `true`/`false` is readable as a flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    Flag(bool),
    Number(serde_yaml_ng::Number),
    Text(String),
}

impl fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferenceValue::Flag(b) => write!(f, "{}", b),
            PreferenceValue::Number(n) => write!(f, "{}", n),
            PreferenceValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PreferenceValue {
    fn from(value: &str) -> Self {
        PreferenceValue::Text(value.to_string())
    }
}

impl From<String> for PreferenceValue {
    fn from(value: String) -> Self {
        PreferenceValue::Text(value)
    }
}

impl From<bool> for PreferenceValue {
    fn from(value: bool) -> Self {
        PreferenceValue::Flag(value)
    }
}

/// Flat key → value preference store.
///
/// Owned by the caller and read-only to the launch pipeline, except for
/// [`Preferences::reset`] which clears a value that failed to parse. Resets mark
/// the store dirty so the caller knows to persist it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences {
    values: IndexMap<String, PreferenceValue>,

    #[serde(skip)]
    dirty: bool,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for tests and defaults
    pub fn with(mut self, key: &str, value: impl Into<PreferenceValue>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<PreferenceValue>) {
        self.values.insert(key.to_string(), value.into());
        self.dirty = true;
    }

    pub fn get(&self, key: &str) -> Option<&PreferenceValue> {
        self.values.get(key)
    }

    /// Stored value rendered as text, or `default` when absent
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .map(|v| v.to_string())
            .unwrap_or_else(|| default.to_string())
    }

    /// Stored flag, or `default` when absent or not a flag
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(PreferenceValue::Flag(b)) => *b,
            Some(PreferenceValue::Text(s)) => match s.trim() {
                "true" => true,
                "false" => false,
                _ => default,
            },
            _ => default,
        }
    }

    /// Reset a key to the empty string (error recovery for unparsable values)
    pub fn reset(&mut self, key: &str) {
        tracing::warn!("Resetting invalid preference '{}'", key);
        self.values
            .insert(key.to_string(), PreferenceValue::Text(String::new()));
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
