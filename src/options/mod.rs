//! Compiler option mapping.
//!
//! Options map a case-insensitive name to a boolean flag, a single value, or a
//! repeatable list of values. Names are lower-cased on insertion; when two
//! names collide the later value wins and keeps the earlier position.
//!
//! A handful of keys are not forwarded verbatim:
//!
//! - `js` and `js_output_file` are dropped; sources come from the file list
//!   and output is captured from stdout.
//! - `externs` is expanded into one `--externs` argument per file.
//! - `xms`, `xmx` and `xss` become JVM flags placed before `-jar`.

pub(crate) mod externs;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::args::ArgumentError;

/// Keys populated from the explicit file list and therefore ignored.
pub const RESERVED_KEYS: &[&str] = &["js", "js_output_file"];

/// Key whose entries are expanded into extern files.
pub const EXTERNS_KEY: &str = "externs";

/// JVM sizing pseudo-options and the flag prefix each one maps to.
pub const JVM_OPTIONS: &[(&str, &str)] = &[("xms", "-Xms"), ("xmx", "-Xmx"), ("xss", "-Xss")];

/// A single option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// `true` emits `--name` once; `false` suppresses the option.
    Flag(bool),
    /// Emits `--name value` once.
    Value(String),
    /// Emits `--name value` once per entry, in order.
    List(Vec<String>),
}

impl OptionValue {
    /// Values that would be emitted after the option name, in order.
    ///
    /// Flags have no values.
    #[must_use]
    pub fn values(&self) -> &[String] {
        match self {
            Self::Flag(_) => &[],
            Self::Value(value) => std::slice::from_ref(value),
            Self::List(values) => values,
        }
    }

    fn from_json(option: &str, value: Value) -> Result<Self, ArgumentError> {
        match value {
            Value::Bool(flag) => Ok(Self::Flag(flag)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| scalar_text(option, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            other => scalar_text(option, other).map(Self::Value),
        }
    }
}

fn scalar_text(option: &str, value: Value) -> Result<String, ArgumentError> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(ArgumentError::IllegalValue {
            option: option.to_owned(),
            value: other.to_string(),
        }),
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Value(value.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl From<&[&str]> for OptionValue {
    fn from(values: &[&str]) -> Self {
        Self::List(values.iter().map(|value| (*value).to_owned()).collect())
    }
}

/// Ordered, case-insensitive option mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Options {
    entries: IndexMap<String, OptionValue>,
}

impl Options {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under the lower-cased `key`, replacing any previous
    /// value.
    pub fn set(&mut self, key: &str, value: impl Into<OptionValue>) -> &mut Self {
        self.entries.insert(key.to_lowercase(), value.into());
        self
    }

    /// Builder-style variant of [`Options::set`].
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<OptionValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Append `value` under `key`, promoting an existing single value to a
    /// list. Flags are replaced.
    pub fn push(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        let item = value.into();
        let slot = self
            .entries
            .entry(key.to_lowercase())
            .or_insert(OptionValue::Flag(false));
        *slot = match std::mem::replace(slot, OptionValue::Flag(false)) {
            OptionValue::List(mut values) => {
                values.push(item);
                OptionValue::List(values)
            }
            OptionValue::Value(first) => OptionValue::List(vec![first, item]),
            OptionValue::Flag(_) => OptionValue::Value(item),
        };
        self
    }

    /// Look up a value by name, ignoring case.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.get(&key.to_lowercase())
    }

    /// Remove a value by name, ignoring case, preserving the order of the
    /// remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.entries.shift_remove(&key.to_lowercase())
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Layer `self` over `defaults`: keys present in both take the value from
    /// `self`.
    #[must_use]
    pub fn merged_over(&self, defaults: &Self) -> Self {
        let mut merged = defaults.clone();
        for (key, value) in &self.entries {
            merged.entries.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Split the mapping into the parts the argument builder handles
    /// separately.
    pub(crate) fn partition(&self) -> Result<PartitionedOptions, ArgumentError> {
        let mut remaining = self.entries.clone();
        for reserved in RESERVED_KEYS {
            remaining.shift_remove(*reserved);
        }
        let externs = match remaining.shift_remove(EXTERNS_KEY) {
            None | Some(OptionValue::Flag(false)) => Vec::new(),
            Some(OptionValue::Flag(true)) => {
                return Err(ArgumentError::ExternsNotPath {
                    entry: String::from("true"),
                });
            }
            Some(OptionValue::Value(entry)) => vec![entry],
            Some(OptionValue::List(entries)) => entries,
        };
        let mut jvm_flags = Vec::new();
        for (key, prefix) in JVM_OPTIONS {
            if let Some(value) = remaining.shift_remove(*key) {
                if let Some(flag) = jvm_flag(key, prefix, value)? {
                    jvm_flags.push(flag);
                }
            }
        }
        Ok(PartitionedOptions {
            jvm_flags,
            externs,
            passthrough: remaining.into_iter().collect(),
        })
    }
}

fn jvm_flag(key: &str, prefix: &str, value: OptionValue) -> Result<Option<String>, ArgumentError> {
    match value {
        OptionValue::Flag(false) => Ok(None),
        OptionValue::Value(size) if is_jvm_size(&size) => Ok(Some(format!("{prefix}{size}"))),
        OptionValue::Value(size) => Err(ArgumentError::IllegalValue {
            option: key.to_owned(),
            value: size,
        }),
        OptionValue::Flag(true) => Err(ArgumentError::IllegalValue {
            option: key.to_owned(),
            value: String::from("true"),
        }),
        OptionValue::List(values) => Err(ArgumentError::IllegalValue {
            option: key.to_owned(),
            value: values.join(","),
        }),
    }
}

/// Accepts `512`, `512k`, `2G` and similar JVM size strings.
fn is_jvm_size(value: &str) -> bool {
    let digits = value
        .strip_suffix(['k', 'K', 'm', 'M', 'g', 'G'])
        .unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}

impl TryFrom<Map<String, Value>> for Options {
    type Error = ArgumentError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut options = Self::new();
        for (key, value) in map {
            let parsed = OptionValue::from_json(&key.to_lowercase(), value)?;
            options.set(&key, parsed);
        }
        Ok(options)
    }
}

impl<K: AsRef<str>, V: Into<OptionValue>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Self::new();
        for (key, value) in iter {
            options.set(key.as_ref(), value);
        }
        options
    }
}

/// Options split by how the argument builder treats them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PartitionedOptions {
    /// Ready-made `-X` flags, in [`JVM_OPTIONS`] order.
    pub(crate) jvm_flags: Vec<String>,
    /// Raw `externs` entries, before expansion.
    pub(crate) externs: Vec<String>,
    /// Everything else, in insertion order.
    pub(crate) passthrough: Vec<(String, OptionValue)>,
}
