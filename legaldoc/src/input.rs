//! Client input records
//!
//! An input record is a flat JSON object of upper-snake-case fields. Strings
//! and numbers become text fields, booleans become feature flags, and the
//! `children` entry holds the ordered child list (either a JSON array or a
//! string containing one, as browser form posts send it).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key holding the children list
pub const CHILDREN_KEY: &str = "children";

/// A single input value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Free text
    Text(String),
    /// Boolean feature flag
    Flag(bool),
}

/// One child as supplied by the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRecord {
    /// Child's full name
    pub name: String,

    /// Date of birth as `YYYY-MM-DD`; may be empty or malformed
    #[serde(default, alias = "dateOfBirth", alias = "date_of_birth")]
    pub dob: String,
}

impl ChildRecord {
    /// Create a child record
    pub fn new(name: impl Into<String>, dob: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dob: dob.into(),
        }
    }
}

/// Errors reading input records
#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error reading {path}: {source}", path = .0.display(), source = .1)]
    IoError(PathBuf, #[source] std::io::Error),

    #[error("Invalid JSON input: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Input record must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("Invalid children list: {0}")]
    InvalidChildren(String),
}

/// A flat key-value input record plus its ordered child list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRecord {
    fields: BTreeMap<String, FieldValue>,

    /// Children in the order supplied
    pub children: Vec<ChildRecord>,
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn parse_children(value: Value) -> Result<Vec<ChildRecord>, InputError> {
    let value = match value {
        Value::String(s) if s.trim().is_empty() => return Ok(Vec::new()),
        Value::String(s) => serde_json::from_str(&s)
            .map_err(|e| InputError::InvalidChildren(format!("{}", e)))?,
        Value::Null => return Ok(Vec::new()),
        other => other,
    };

    let children: Vec<ChildRecord> = serde_json::from_value(value)
        .map_err(|e| InputError::InvalidChildren(format!("{}", e)))?;

    Ok(children
        .into_iter()
        .filter(|c| !c.name.trim().is_empty())
        .collect())
}

impl InputRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a parsed JSON value
    ///
    /// # Returns
    /// * `Ok(InputRecord)` - The record
    /// * `Err(InputError)` - The value is not an object or `children` is malformed
    pub fn from_value(value: Value) -> Result<Self, InputError> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(InputError::NotAnObject(kind_of(&other))),
        };

        let mut record = Self::new();
        for (key, value) in map {
            if key == CHILDREN_KEY {
                record.children = parse_children(value)?;
                continue;
            }
            match value {
                Value::String(s) => record.set_text(key, s),
                Value::Bool(b) => record.set_flag(key, b),
                Value::Number(n) => record.set_text(key, n.to_string()),
                Value::Null => {}
                other => {
                    log::warn!(
                        "Ignoring input field '{}': expected text or flag, found {}",
                        key,
                        kind_of(&other)
                    );
                }
            }
        }
        Ok(record)
    }

    /// Parse a record from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, InputError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Load every record from a JSON file holding one object or an array of objects
    ///
    /// # Parameters
    /// * `path` - Path to the JSON file
    ///
    /// # Returns
    /// * `Ok(Vec<InputRecord>)` - Records in file order
    /// * `Err(InputError)` - Error reading or parsing the file
    pub fn load_all<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, InputError> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| InputError::IoError(path.as_ref().to_path_buf(), e))?;
        match serde_json::from_str(&content)? {
            Value::Array(items) => items.into_iter().map(Self::from_value).collect(),
            other => Ok(vec![Self::from_value(other)?]),
        }
    }

    /// Set a text field
    pub fn set_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), FieldValue::Text(value.into()));
    }

    /// Set a flag field
    pub fn set_flag(&mut self, key: impl Into<String>, value: bool) {
        self.fields.insert(key.into(), FieldValue::Flag(value));
    }

    /// Builder form of [`InputRecord::set_text`]
    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_text(key, value);
        self
    }

    /// Builder form of [`InputRecord::set_flag`]
    pub fn with_flag(mut self, key: impl Into<String>, value: bool) -> Self {
        self.set_flag(key, value);
        self
    }

    /// Builder that appends a child
    pub fn with_child(mut self, name: impl Into<String>, dob: impl Into<String>) -> Self {
        self.children.push(ChildRecord::new(name, dob));
        self
    }

    /// Raw field value
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Text of a field, trimmed; `None` when absent, blank, or a flag
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::Text(s)) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    /// Explicit boolean value of a field, if it carries one
    ///
    /// Text fields holding `true`/`false`, `yes`/`no`, `on`/`off` or `1`/`0`
    /// count as flags, since form posts send checkboxes as strings.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.fields.get(key)? {
            FieldValue::Flag(b) => Some(*b),
            FieldValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(true),
                "false" | "no" | "off" | "0" => Some(false),
                _ => None,
            },
        }
    }

    /// Iterate all fields in key order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}
