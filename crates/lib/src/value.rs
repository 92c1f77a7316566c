//! Field values stored in documents.
//!
//! [`Value`] covers the plain JSON-like shapes plus the store-native types
//! (timestamps, document and collection references) and the two write
//! sentinels the store understands: [`Value::ServerTimestamp`] and
//! [`Value::Deleted`].
//!
//! # JSON envelope
//!
//! [`Value::to_json`] renders store-native types as a tagged
//! `{"type": ..., "data": ...}` object so they survive a trip through plain
//! JSON; every other value passes through unchanged.
//!
//! ```
//! use stagedoc::{Timestamp, Value};
//!
//! let ts = Value::Timestamp(Timestamp::new(1_700_000_000, 0));
//! let json = ts.to_json();
//! assert_eq!(json["type"], "timestamp");
//! assert_eq!(Value::from_json(&json), ts);
//!
//! assert_eq!(Value::from("plain").to_json(), "plain");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Number, Value as Json, json};

use crate::path::{CollectionPath, DocumentPath};

/// Field name to value mapping for a document or a nested map.
pub type Fields = BTreeMap<String, Value>;

/// Builds a [`Fields`] map from `(name, value)` pairs.
///
/// ```
/// use stagedoc::{Value, fields};
///
/// let data = fields([("name", "Ada".into()), ("age", 36.into())]);
/// assert_eq!(data["age"], Value::Int(36));
/// ```
pub fn fields<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Fields {
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// A point in time with nanosecond precision, as stored by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    seconds: i64,
    nanos: u32,
}

impl Timestamp {
    /// Creates a timestamp, carrying whole seconds out of `nanos`.
    ///
    /// Saturates at the ends of the `i64` seconds range.
    pub fn new(seconds: i64, nanos: u32) -> Self {
        Self {
            seconds: seconds.saturating_add((nanos / 1_000_000_000) as i64),
            nanos: nanos % 1_000_000_000,
        }
    }

    pub fn from_millis(millis: i64) -> Self {
        Self {
            seconds: millis.div_euclid(1000),
            nanos: (millis.rem_euclid(1000) * 1_000_000) as u32,
        }
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Milliseconds since the Unix epoch, saturating on overflow.
    pub fn to_millis(&self) -> i64 {
        self.seconds
            .saturating_mul(1000)
            .saturating_add((self.nanos / 1_000_000) as i64)
    }

    /// Converts to a chrono UTC datetime, if representable.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanos).single()
    }

    pub fn to_rfc3339(&self) -> String {
        self.to_datetime()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "1970-01-01T00:00:00+00:00".to_string())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::new(value.timestamp(), value.timestamp_subsec_nanos())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

/// Values that can be stored in a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    /// Nested map
    Map(Fields),

    // Store-native types
    Timestamp(Timestamp),
    /// Reference to another document
    Reference(DocumentPath),
    /// Reference to a collection
    Collection(CollectionPath),

    // Write sentinels
    /// Replaced by the commit time when the store applies the write
    ServerTimestamp,
    /// Locally: a field that was deleted but keeps its slot in the key set.
    /// In a write payload: remove this field from the stored document.
    Deleted,
}

impl Value {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Value::Deleted)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True when the value carries nothing usable as an identifier or payload:
    /// null, a tombstone, or an empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null | Value::Deleted => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Returns the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Timestamp(_) => "timestamp",
            Value::Reference(_) => "document",
            Value::Collection(_) => "collection",
            Value::ServerTimestamp => "serverTimestamp",
            Value::Deleted => "deleted",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Renders a scalar as a document id, if it can serve as one.
    pub fn as_id(&self) -> Option<String> {
        match self {
            Value::Text(s) if !s.is_empty() => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Reference(path) => Some(path.id().to_string()),
            _ => None,
        }
    }

    /// Applies `other` on top of `self` with merge-write semantics.
    ///
    /// Maps merge key by key (recursively); a `Deleted` entry removes the key.
    /// Anything else replaces the current value.
    pub fn deep_merge(&mut self, other: &Value) {
        match (self, other) {
            (Value::Map(current), Value::Map(incoming)) => merge_fields(current, incoming),
            (slot, incoming) => *slot = incoming.clone(),
        }
    }

    /// Replaces every `ServerTimestamp` sentinel (at any depth) with `now`.
    pub fn resolve_server_timestamps(&mut self, now: Timestamp) {
        match self {
            Value::ServerTimestamp => *self = Value::Timestamp(now),
            Value::Map(map) => map
                .values_mut()
                .for_each(|v| v.resolve_server_timestamps(now)),
            Value::List(items) => items
                .iter_mut()
                .for_each(|v| v.resolve_server_timestamps(now)),
            _ => {}
        }
    }

    /// Serializes to plain JSON, wrapping store-native types in a
    /// `{"type", "data"}` envelope.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null | Value::Deleted => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
            Value::Text(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => fields_to_json(map),
            Value::Timestamp(ts) => json!({
                "type": "timestamp",
                "data": { "seconds": ts.seconds, "nanoseconds": ts.nanos },
            }),
            Value::Reference(path) => json!({ "type": "document", "data": path.to_string() }),
            Value::Collection(path) => json!({ "type": "collection", "data": path.to_string() }),
            Value::ServerTimestamp => json!({ "type": "serverTimestamp", "data": null }),
        }
    }

    /// Revives a value produced by [`Value::to_json`].
    ///
    /// Objects that look like an envelope but do not parse (unknown type,
    /// malformed data) are kept as ordinary maps.
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => {
                revive_envelope(map).unwrap_or_else(|| Value::Map(fields_from_json_map(map)))
            }
        }
    }
}

fn revive_envelope(map: &JsonMap<String, Json>) -> Option<Value> {
    if map.len() != 2 {
        return None;
    }
    let data = map.get("data")?;
    match map.get("type")?.as_str()? {
        "timestamp" => {
            let seconds = data.get("seconds")?.as_i64()?;
            let nanos = data.get("nanoseconds")?.as_u64()?;
            if nanos >= 1_000_000_000 {
                return None;
            }
            Some(Value::Timestamp(Timestamp::new(seconds, nanos as u32)))
        }
        "document" => data.as_str()?.parse().ok().map(Value::Reference),
        "collection" => data.as_str()?.parse().ok().map(Value::Collection),
        "serverTimestamp" if data.is_null() => Some(Value::ServerTimestamp),
        _ => None,
    }
}

/// Merge-writes `incoming` into `current`; see [`Value::deep_merge`].
pub fn merge_fields(current: &mut Fields, incoming: &Fields) {
    for (key, value) in incoming {
        match value {
            Value::Deleted => {
                current.remove(key);
            }
            Value::Map(_) => {
                let slot = current
                    .entry(key.clone())
                    .or_insert_with(|| Value::Map(Fields::new()));
                if !matches!(slot, Value::Map(_)) {
                    *slot = Value::Map(Fields::new());
                }
                slot.deep_merge(value);
            }
            other => {
                current.insert(key.clone(), other.clone());
            }
        }
    }
}

/// Renders a field map as a JSON object; see [`Value::to_json`].
pub fn fields_to_json(fields: &Fields) -> Json {
    Json::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// Parses a JSON object into a field map; non-objects yield an empty map.
pub fn fields_from_json(json: &Json) -> Fields {
    match json {
        Json::Object(map) => fields_from_json_map(map),
        _ => Fields::new(),
    }
}

fn fields_from_json_map(map: &JsonMap<String, Json>) -> Fields {
    map.iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v)))
        .collect()
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Self {
        Value::Timestamp(value)
    }
}

impl From<DocumentPath> for Value {
    fn from(value: DocumentPath) -> Self {
        Value::Reference(value)
    }
}

impl From<Fields> for Value {
    fn from(value: Fields) -> Self {
        Value::Map(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        self.as_int() == Some(*other)
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool() == Some(*other)
    }
}
