//! Tagged field values and component records.
//!
//! Component data is carried as [`Record`]s: ordered mappings from field name
//! to [`Value`]. Records are owned exclusively by the store holding them;
//! cloning a `Value` is always a deep copy, so no aliasing survives across
//! entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::types::EntityId;

/// A single field value inside a component record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent/null value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Owned string.
    Str(String),
    /// Reference to an entity, possibly in another world. Holds
    /// [`NULL_ENTITY`](crate::engine::types::NULL_ENTITY) when unset, and is
    /// only meaningful after an alive-check against the target world.
    EntityRef(EntityId),
    /// Nested list.
    List(Vec<Value>),
    /// Nested mapping.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the float content, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns the integer content.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean content.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string content.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the referenced entity id.
    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Value::EntityRef(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// An ordered field→value mapping, the unit of component data.
///
/// Field order is deterministic (sorted by name), which keeps iteration,
/// snapshots, and diagnostics reproducible across runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_owned(), value.into());
        self
    }

    /// Returns the value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets `field` to `value`, returning the previous value if any.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.to_owned(), value.into())
    }

    /// Removes `field`, returning its value if it was present.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Returns `true` if `field` is present.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlays every field of `patch` onto this record.
    ///
    /// Fields present in `patch` replace the existing value wholesale; fields
    /// absent from `patch` are untouched. Patch values are deep-copied.
    pub fn merge(&mut self, patch: &Record) {
        for (field, value) in &patch.fields {
            self.fields.insert(field.clone(), value.clone());
        }
    }

    /// Shorthand for [`Value::as_f64`] on a field, defaulting to `0.0`.
    pub fn f64(&self, field: &str) -> f64 {
        self.get(field).and_then(Value::as_f64).unwrap_or(0.0)
    }

    /// Shorthand for [`Value::as_i64`] on a field, defaulting to `0`.
    pub fn i64(&self, field: &str) -> i64 {
        self.get(field).and_then(Value::as_i64).unwrap_or(0)
    }
}

impl<const N: usize> From<[(&str, Value); N]> for Record {
    fn from(pairs: [(&str, Value); N]) -> Self {
        let mut record = Record::new();
        for (field, value) in pairs {
            record.set(field, value);
        }
        record
    }
}
