//! Flatvar host sink: the per-kind setter surface of the receiving host and the
//! ordered application of flattened variables to it.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use flatvar_core::{FlatVar, HostKind, HostValue};
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{debug, error};

/// Setter surface of the host. `None` means "explicitly no value" for that kind.
pub trait HostSink {
    fn set_text(&mut self, key: &str, value: Option<&str>) -> Result<()>;
    fn set_integer(&mut self, key: &str, value: Option<i32>) -> Result<()>;
    fn set_number(&mut self, key: &str, value: Option<f64>) -> Result<()>;
    fn set_boolean(&mut self, key: &str, value: Option<bool>) -> Result<()>;
    fn set_date_time(&mut self, key: &str, value: Option<DateTime<Utc>>) -> Result<()>;

    /// Clear `key` under every representation.
    fn clear_all(&mut self, key: &str) -> Result<()> {
        self.set_text(key, None)?;
        self.set_integer(key, None)?;
        self.set_number(key, None)?;
        self.set_boolean(key, None)?;
        self.set_date_time(key, None)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: usize,
    pub failed: usize,
}

/// Apply `vars` in order. A failing entry is logged and counted; the rest still apply.
pub fn apply_vars(sink: &mut dyn HostSink, vars: &[FlatVar]) -> ApplyReport {
    let started = Instant::now();
    let mut report = ApplyReport::default();
    for var in vars {
        match apply_one(sink, var) {
            Ok(()) => report.applied += 1,
            Err(e) => {
                error!(key = %var.key, kind = %var.kind, value = ?var.value, error = ?e, "failed to set host variable");
                counter!("flatvar_host_write_failures_total", 1);
                report.failed += 1;
            }
        }
    }
    histogram!("flatvar_apply_ms", started.elapsed().as_secs_f64() * 1000.0);
    debug!(applied = report.applied, failed = report.failed, "applied host variables");
    report
}

fn apply_one(sink: &mut dyn HostSink, var: &FlatVar) -> Result<()> {
    let key = var.key.as_str();
    let result = match (var.kind, &var.value) {
        (HostKind::Unknown, _) => sink.clear_all(key),
        (HostKind::Text, None) => sink.set_text(key, None),
        (HostKind::Text, Some(HostValue::Text(s))) => sink.set_text(key, Some(s.as_str())),
        (HostKind::Integer, None) => sink.set_integer(key, None),
        (HostKind::Integer, Some(HostValue::Integer(i))) => sink.set_integer(key, Some(*i)),
        (HostKind::Number, None) => sink.set_number(key, None),
        (HostKind::Number, Some(HostValue::Number(x))) => sink.set_number(key, Some(*x)),
        (HostKind::Boolean, None) => sink.set_boolean(key, None),
        (HostKind::Boolean, Some(HostValue::Boolean(b))) => sink.set_boolean(key, Some(*b)),
        (HostKind::DateTime, None) => sink.set_date_time(key, None),
        (HostKind::DateTime, Some(HostValue::DateTime(dt))) => sink.set_date_time(key, Some(*dt)),
        (kind, Some(v)) => bail!("{} value {} does not match host kind {}", v.kind(), v, kind),
    };
    result.with_context(|| format!("setting {}", key))
}

/// In-memory host with one namespace per kind. Setting `None` removes the key from that namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryHost {
    pub text: BTreeMap<String, String>,
    pub integer: BTreeMap<String, i32>,
    pub number: BTreeMap<String, f64>,
    pub boolean: BTreeMap<String, bool>,
    pub date_time: BTreeMap<String, DateTime<Utc>>,
}

fn put<T>(map: &mut BTreeMap<String, T>, key: &str, value: Option<T>) -> Result<()> {
    if key.trim().is_empty() { bail!("empty host variable name"); }
    match value {
        Some(v) => { map.insert(key.to_string(), v); }
        None => { map.remove(key); }
    }
    Ok(())
}

impl MemoryHost {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize {
        self.text.len() + self.integer.len() + self.number.len() + self.boolean.len() + self.date_time.len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Current value of `key` under `kind`, if set.
    pub fn get(&self, key: &str, kind: HostKind) -> Option<HostValue> {
        match kind {
            HostKind::Text => self.text.get(key).cloned().map(HostValue::Text),
            HostKind::Integer => self.integer.get(key).copied().map(HostValue::Integer),
            HostKind::Number => self.number.get(key).copied().map(HostValue::Number),
            HostKind::Boolean => self.boolean.get(key).copied().map(HostValue::Boolean),
            HostKind::DateTime => self.date_time.get(key).copied().map(HostValue::DateTime),
            HostKind::Unknown => None,
        }
    }
}

impl HostSink for MemoryHost {
    fn set_text(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        put(&mut self.text, key, value.map(str::to_string))
    }
    fn set_integer(&mut self, key: &str, value: Option<i32>) -> Result<()> { put(&mut self.integer, key, value) }
    fn set_number(&mut self, key: &str, value: Option<f64>) -> Result<()> { put(&mut self.number, key, value) }
    fn set_boolean(&mut self, key: &str, value: Option<bool>) -> Result<()> { put(&mut self.boolean, key, value) }
    fn set_date_time(&mut self, key: &str, value: Option<DateTime<Utc>>) -> Result<()> {
        put(&mut self.date_time, key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_removes_only_that_kind() {
        let mut h = MemoryHost::new();
        h.set_text("a", Some("x")).unwrap();
        h.set_integer("a", Some(1)).unwrap();
        h.set_text("a", None).unwrap();
        assert_eq!(h.get("a", HostKind::Text), None);
        assert_eq!(h.get("a", HostKind::Integer), Some(HostValue::Integer(1)));
    }

    #[test]
    fn clear_all_wipes_every_kind() {
        let mut h = MemoryHost::new();
        h.set_text("a", Some("x")).unwrap();
        h.set_number("a", Some(2.5)).unwrap();
        h.set_boolean("b", Some(true)).unwrap();
        h.clear_all("a").unwrap();
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn empty_keys_are_rejected() {
        let mut h = MemoryHost::new();
        assert!(h.set_boolean(" ", Some(true)).is_err());
        assert!(h.is_empty());
    }
}
