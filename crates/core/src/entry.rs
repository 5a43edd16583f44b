//! Flattened host variables.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Primitive kinds the host understands, plus `Unknown` for "clear every representation".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKind {
    Text,
    Integer,
    /// The host's single non-integer numeric kind.
    Number,
    Boolean,
    DateTime,
    Unknown,
}

impl HostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostKind::Text => "text",
            HostKind::Integer => "integer",
            HostKind::Number => "number",
            HostKind::Boolean => "boolean",
            HostKind::DateTime => "date_time",
            HostKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HostValue {
    Text(String),
    Integer(i32),
    Number(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
}

impl HostValue {
    pub fn kind(&self) -> HostKind {
        match self {
            HostValue::Text(_) => HostKind::Text,
            HostValue::Integer(_) => HostKind::Integer,
            HostValue::Number(_) => HostKind::Number,
            HostValue::Boolean(_) => HostKind::Boolean,
            HostValue::DateTime(_) => HostKind::DateTime,
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Text(s) => write!(f, "{:?}", s),
            HostValue::Integer(i) => write!(f, "{}", i),
            HostValue::Number(x) => write!(f, "{}", x),
            HostValue::Boolean(b) => write!(f, "{}", b),
            HostValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

/// One flattened variable. Keys are unique within a single flattening.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatVar {
    pub key: String,
    pub kind: HostKind,
    pub value: Option<HostValue>,
    /// Derived directly from an immediate member of the root record.
    pub top_level: bool,
}

impl FlatVar {
    pub fn new(key: impl Into<String>, kind: HostKind, value: Option<HostValue>, top_level: bool) -> Self {
        Self { key: key.into(), kind, value, top_level }
    }
}

impl fmt::Display for FlatVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{} ({}) = {}", self.key, self.kind, v),
            None => write!(f, "{} ({}) = null", self.key, self.kind),
        }
    }
}
