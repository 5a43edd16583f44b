//! Variable documentation: the full key set a shape can produce, with field descriptions.

use std::fmt::Write as _;

use flatvar_core::{HostKind, Resolver, TypeDescriptor, Value};
use serde::Serialize;

use crate::naming;
use crate::options::FlattenOptions;
use crate::walker::flatten;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarDoc {
    pub key: String,
    pub kind: HostKind,
    pub top_level: bool,
    pub description: Option<String>,
}

/// Walk `root` with an absent value so every reachable key is produced once.
/// Empty sequences are always documented under index `n` here, whatever the options say.
pub fn document(root: &TypeDescriptor, prefix: &str, options: &FlattenOptions, resolver: &dyn Resolver) -> Vec<VarDoc> {
    let mut opts = options.clone();
    opts.document_empty = true;

    let resolved = match root.unwrap_nullable() {
        TypeDescriptor::Ref(name) => resolver.resolve(name),
        other => Some(other.clone()),
    };
    let described: Vec<(String, String)> = match resolved {
        Some(TypeDescriptor::Record(rec)) => rec
            .fields
            .iter()
            .filter_map(|f| f.description.as_ref().map(|d| (naming::resolve(prefix, &f.name), d.clone())))
            .collect(),
        _ => Vec::new(),
    };

    flatten(root, &Value::Null, prefix, &opts, resolver)
        .into_iter()
        .map(|v| {
            let description = if v.top_level {
                described
                    .iter()
                    .find(|(k, _)| *k == v.key || naming::child_key(k, "entries") == v.key)
                    .map(|(_, d)| d.clone())
            } else {
                None
            };
            VarDoc { key: v.key, kind: v.kind, top_level: v.top_level, description }
        })
        .collect()
}

/// Markdown table of documented variables, in walk order.
pub fn render_markdown(title: &str, docs: &[VarDoc]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "### {}\n", title);
    out.push_str("| Variable | Type | Description |\n|---|---|---|\n");
    for d in docs {
        let desc = d.description.as_deref().unwrap_or("").replace('|', "\\|");
        let _ = writeln!(out, "| `{}` | {} | {} |", d.key, d.kind, desc);
    }
    out
}
