//! Argument trees that may carry callbacks.
//!
//! [`Value`] mirrors `serde_json::Value` with one extra variant,
//! [`Value::Function`], so that callbacks can sit anywhere inside the
//! arguments of a call. Objects use a `BTreeMap`, which fixes the order in
//! which callback positions are discovered.

use crate::config::ProtocolConfig;
use crate::error::{DnodeError, Result};
use crate::function::Callback;
use serde::de::DeserializeOwned;
use serde_json::Number;
use std::collections::BTreeMap;

/// A node in an argument tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Function(Callback),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_function(&self) -> Option<&Callback> {
        match self {
            Value::Function(cb) => Some(cb),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up an object field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Convert to plain JSON. Functions become the wire placeholder.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Function(_) => {
                serde_json::Value::String(ProtocolConfig::FUNCTION_PLACEHOLDER.to_string())
            }
        }
    }

    /// Decode into a typed structure via its JSON form.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_json())
            .map_err(|e| DnodeError::invalid_arguments(e.to_string()))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Callback> for Value {
    fn from(cb: Callback) -> Self {
        Value::Function(cb)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

/// Positional arguments of a single invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Vec<Value>);

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Spread a decoded argument tree into a positional list.
    ///
    /// An array becomes its elements, `null` becomes no arguments, and any
    /// other value becomes a single argument.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => Self(items),
            Value::Null => Self::default(),
            other => Self(vec![other]),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.0.push(value.into());
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// The argument at `index`, which must be a function.
    pub fn callback(&self, index: usize) -> Result<Callback> {
        self.require(index)?.as_function().cloned().ok_or_else(|| {
            DnodeError::invalid_arguments(format!("argument {} is not a function", index))
        })
    }

    /// The argument at `index`, which must be a string.
    pub fn str(&self, index: usize) -> Result<&str> {
        self.require(index)?.as_str().ok_or_else(|| {
            DnodeError::invalid_arguments(format!("argument {} is not a string", index))
        })
    }

    /// The argument at `index`, which must be a non-negative integer.
    pub fn u64(&self, index: usize) -> Result<u64> {
        self.require(index)?.as_u64().ok_or_else(|| {
            DnodeError::invalid_arguments(format!("argument {} is not an unsigned integer", index))
        })
    }

    /// The argument at `index`, which must be a number.
    pub fn f64(&self, index: usize) -> Result<f64> {
        self.require(index)?.as_f64().ok_or_else(|| {
            DnodeError::invalid_arguments(format!("argument {} is not a number", index))
        })
    }

    /// The argument at `index`, which must be a boolean.
    pub fn bool(&self, index: usize) -> Result<bool> {
        self.require(index)?.as_bool().ok_or_else(|| {
            DnodeError::invalid_arguments(format!("argument {} is not a boolean", index))
        })
    }

    /// The last argument if it is a function. Handlers commonly take their
    /// reply callback in this position.
    pub fn last_callback(&self) -> Option<Callback> {
        self.0.last().and_then(Value::as_function).cloned()
    }

    /// Decode the whole list as a JSON array into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_json())
            .map_err(|e| DnodeError::invalid_arguments(e.to_string()))
    }

    /// Decode one argument into `T`.
    pub fn decode_at<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        self.require(index)?.decode()
    }

    /// JSON array form; functions become the wire placeholder.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.0.iter().map(Value::to_json).collect())
    }

    fn require(&self, index: usize) -> Result<&Value> {
        self.0.get(index).ok_or_else(|| {
            DnodeError::invalid_arguments(format!(
                "missing argument {} (got {})",
                index,
                self.0.len()
            ))
        })
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Arguments {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Arguments {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
