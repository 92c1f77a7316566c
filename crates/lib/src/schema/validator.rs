//! Field-level validation
//!
//! Validation is pluggable: a schema may carry any [`Validator`]. The commit
//! path calls it with the payload about to be written and the list of fields
//! to check, and writes nothing if it reports issues.
//!
//! [`FieldRules`] is a small declarative validator covering type checks and
//! required fields.

use std::collections::BTreeMap;
use std::fmt::Debug;

use thiserror::Error;

use crate::value::{Fields, Value};

/// A single problem found by a [`Validator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path of the offending field
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Decodes document data against a schema.
pub trait Validator: Send + Sync + Debug {
    /// Checks the fields named in `subset` and returns their decoded values.
    ///
    /// Fields outside `subset` must be ignored. The returned map may coerce
    /// values (for example widening an integer to a float); the caller writes
    /// the decoded values in place of the originals.
    fn decode(&self, data: &Fields, subset: &[String]) -> Result<Fields, Vec<ValidationIssue>>;
}

/// Validation failed; no write was issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed: {}", render_messages(.messages))]
pub struct ValidationError {
    /// Field path to message. Multiple issues on one path are joined with `; `.
    pub messages: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn from_issues(issues: impl IntoIterator<Item = ValidationIssue>) -> Self {
        let mut messages: BTreeMap<String, String> = BTreeMap::new();
        for issue in issues {
            messages
                .entry(issue.path)
                .and_modify(|m| {
                    m.push_str("; ");
                    m.push_str(&issue.message);
                })
                .or_insert(issue.message);
        }
        Self { messages }
    }

    pub fn message(&self, field: &str) -> Option<&str> {
        self.messages.get(field).map(String::as_str)
    }
}

fn render_messages(messages: &BTreeMap<String, String>) -> String {
    messages
        .iter()
        .map(|(path, message)| format!("{path}: {message}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<ValidationError> for crate::Error {
    fn from(err: ValidationError) -> Self {
        crate::Error::Validation(err)
    }
}

/// Expected shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Any,
    Text,
    Int,
    /// Floats; integers are widened
    Float,
    /// Integers or floats, kept as given
    Number,
    Bool,
    Timestamp,
    Reference,
    List,
    Map,
}

impl FieldKind {
    fn name(&self) -> &'static str {
        match self {
            FieldKind::Any => "any",
            FieldKind::Text => "text",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Number => "number",
            FieldKind::Bool => "bool",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Reference => "document",
            FieldKind::List => "list",
            FieldKind::Map => "map",
        }
    }

    /// Decodes `value`, or returns `None` if it has the wrong shape.
    fn decode(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (FieldKind::Any, v) => Some(v.clone()),
            (FieldKind::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
            (FieldKind::Float | FieldKind::Number, Value::Float(_))
            | (FieldKind::Number | FieldKind::Int, Value::Int(_))
            | (FieldKind::Text, Value::Text(_))
            | (FieldKind::Bool, Value::Bool(_))
            | (FieldKind::Timestamp, Value::Timestamp(_) | Value::ServerTimestamp)
            | (FieldKind::Reference, Value::Reference(_))
            | (FieldKind::List, Value::List(_))
            | (FieldKind::Map, Value::Map(_)) => Some(value.clone()),
            _ => None,
        }
    }
}

/// Rule for one field of a [`FieldRules`] validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
}

impl FieldRule {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            nullable: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Declarative validator: one [`FieldRule`] per field name.
///
/// ```
/// use stagedoc::{FieldKind, FieldRule, FieldRules, Validator, fields};
///
/// let rules = FieldRules::new()
///     .field("name", FieldRule::new(FieldKind::Text).required())
///     .field("age", FieldRule::new(FieldKind::Int));
///
/// let ok = fields([("name", "Ada".into()), ("age", 36.into())]);
/// assert!(rules.decode(&ok, &["name".into(), "age".into()]).is_ok());
///
/// let bad = fields([("name", 1.into())]);
/// let issues = rules.decode(&bad, &["name".into()]).unwrap_err();
/// assert_eq!(issues[0].path, "name");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    rules: BTreeMap<String, FieldRule>,
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.rules.insert(name.into(), rule);
        self
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.rules.get(name)
    }
}

impl Validator for FieldRules {
    fn decode(&self, data: &Fields, subset: &[String]) -> Result<Fields, Vec<ValidationIssue>> {
        let mut decoded = Fields::new();
        let mut issues = Vec::new();

        for name in subset {
            let Some(rule) = self.rules.get(name) else {
                // Unruled fields pass through untouched
                if let Some(value) = data.get(name) {
                    decoded.insert(name.clone(), value.clone());
                }
                continue;
            };

            match data.get(name) {
                None | Some(Value::Deleted) => {
                    if rule.required {
                        issues.push(ValidationIssue::new(name, "is required"));
                    }
                }
                Some(Value::Null) => {
                    if rule.nullable {
                        decoded.insert(name.clone(), Value::Null);
                    } else {
                        issues.push(ValidationIssue::new(name, "must not be null"));
                    }
                }
                Some(value) => match rule.kind.decode(value) {
                    Some(v) => {
                        decoded.insert(name.clone(), v);
                    }
                    None => issues.push(ValidationIssue::new(
                        name,
                        format!("expected {}, found {}", rule.kind.name(), value.type_name()),
                    )),
                },
            }
        }

        if issues.is_empty() {
            Ok(decoded)
        } else {
            Err(issues)
        }
    }
}
