//! Walk configuration.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Internal bookkeeping fields that are never written to the host.
pub const DEFAULT_IGNORED_KEYS: &[&str] = &["type", "raw", "fromLoad", "edName", "baseName"];

pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenOptions {
    /// Raw field names skipped at every depth (case-insensitive).
    pub ignored_keys: Vec<String>,
    /// Nesting ceiling; the subtree past it is dropped as a fault.
    pub max_depth: usize,
    /// Describe the element shape of empty sequences under index `n`.
    pub document_empty: bool,
    /// Only walk record fields marked public.
    pub public_only: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            ignored_keys: DEFAULT_IGNORED_KEYS.iter().map(|s| s.to_string()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
            document_empty: true,
            public_only: false,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl FlattenOptions {
    /// Defaults overridden by `FLATVAR_MAX_DEPTH`, `FLATVAR_IGNORED_KEYS` (comma separated,
    /// added to the defaults), `FLATVAR_DOCUMENT_EMPTY` and `FLATVAR_PUBLIC_ONLY`.
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if let Some(depth) = std::env::var("FLATVAR_MAX_DEPTH").ok().and_then(|s| s.parse::<usize>().ok()) {
            opts.max_depth = depth;
        }
        if let Ok(keys) = std::env::var("FLATVAR_IGNORED_KEYS") {
            opts.ignore(keys.split(',').map(str::trim).filter(|k| !k.is_empty()));
        }
        if let Some(b) = env_flag("FLATVAR_DOCUMENT_EMPTY") { opts.document_empty = b; }
        if let Some(b) = env_flag("FLATVAR_PUBLIC_ONLY") { opts.public_only = b; }
        opts
    }

    pub fn ignore<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for k in keys {
            let k = k.into();
            if !self.ignored_keys.iter().any(|e| e.eq_ignore_ascii_case(&k)) { self.ignored_keys.push(k); }
        }
    }

    pub(crate) fn ignored_set(&self) -> FxHashSet<String> {
        self.ignored_keys.iter().map(|k| k.to_lowercase()).collect()
    }
}
