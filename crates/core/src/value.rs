//! Dynamic values walked alongside their descriptors.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};

static NULL: Value = Value::Null;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    TimeSpan(Duration),
    /// Enumeration ordinal; the symbolic name comes from the descriptor.
    Ordinal(i64),
    List(Vec<Value>),
    /// Map entries in iteration order.
    Map(Vec<(Value, Value)>),
    Record(BTreeMap<String, Value>),
}

impl Value {
    pub fn record<I, K>(fields: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    /// Field accessor for record values. Missing fields and non-record values read as null.
    pub fn field(&self, name: &str) -> &Value {
        match self {
            Value::Record(fields) => fields.get(name).unwrap_or(&NULL),
            _ => &NULL,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::DateTime(_) => "date_time",
            Value::TimeSpan(_) => "timespan",
            Value::Ordinal(_) => "ordinal",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    /// Natural reading of a JSON value, without any descriptor guidance.
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Boolean(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Record(map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Text(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::TimeSpan(d) => write!(f, "{}", d),
            Value::Ordinal(o) => write!(f, "#{}", o),
            Value::List(items) => write!(f, "[{} items]", items.len()),
            Value::Map(entries) => write!(f, "{{{} entries}}", entries.len()),
            Value::Record(fields) => write!(f, "{{{} fields}}", fields.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::Text(v.to_string()) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::Text(v) }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self { Value::Integer(v as i64) }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Integer(v) }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Float(v) }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Boolean(v) }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self { Value::DateTime(v) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}
