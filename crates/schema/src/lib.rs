//! Flatvar schema registry: named record and enum descriptors loaded from JSON or YAML,
//! plus descriptor-guided decoding of JSON payloads.

#![forbid(unsafe_code)]

use std::path::Path;

use flatvar_core::{EnumDescriptor, RecordDescriptor, Resolver, TypeDescriptor};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

mod decode;

pub use decode::decode;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("reading schema {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("invalid schema: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("type '{0}' is declared more than once")]
    Duplicate(String),
    #[error("unsupported schema format '{0}' (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;

/// On-disk layout of a schema document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub records: Vec<RecordDescriptor>,
    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,
}

/// Immutable set of named descriptors. Safe to share between concurrent walks.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    types: FxHashMap<String, TypeDescriptor>,
    order: Vec<String>,
}

impl SchemaRegistry {
    pub fn from_file(file: SchemaFile) -> Result<Self> {
        let mut reg = Self::default();
        for e in file.enums {
            reg.insert(e.name.clone(), TypeDescriptor::enumeration(e))?;
        }
        for r in file.records {
            reg.insert(r.name.clone(), TypeDescriptor::record(r))?;
        }
        for name in reg.dangling_refs() {
            warn!(reference = %name, "schema references an undeclared type");
        }
        debug!(types = reg.order.len(), "schema loaded");
        Ok(reg)
    }

    pub fn from_json_str(s: &str) -> Result<Self> { Self::from_file(serde_json::from_str(s)?) }

    /// YAML is read as a generic document first so descriptors use the same single-key map form as JSON.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let doc: serde_json::Value = serde_yaml::from_str(s)?;
        Self::from_file(serde_json::from_value(doc)?)
    }

    /// Load by extension: `.json`, `.yaml` or `.yml`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| SchemaError::Io { path: path.display().to_string(), source })?;
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Self::from_json_str(&text),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            other => Err(SchemaError::UnsupportedFormat(other.unwrap_or("").to_string())),
        }
    }

    fn insert(&mut self, name: String, ty: TypeDescriptor) -> Result<()> {
        if self.types.contains_key(&name) { return Err(SchemaError::Duplicate(name)); }
        self.order.push(name.clone());
        self.types.insert(name, ty);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> { self.types.get(name) }

    /// Declared names, enums first, each group in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> { self.order.iter().map(String::as_str) }

    pub fn len(&self) -> usize { self.order.len() }

    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    /// Reference names used by record fields that no declaration satisfies.
    pub fn dangling_refs(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for ty in self.order.iter().filter_map(|n| self.types.get(n)) {
            if let TypeDescriptor::Record(rec) = ty {
                for f in &rec.fields {
                    collect_refs(&f.ty, &mut |name: &str| {
                        if !self.types.contains_key(name) && !out.iter().any(|o| o == name) {
                            out.push(name.to_string());
                        }
                    });
                }
            }
        }
        out
    }
}

fn collect_refs(ty: &TypeDescriptor, visit: &mut dyn FnMut(&str)) {
    match ty {
        TypeDescriptor::Ref(name) => visit(name),
        TypeDescriptor::Nullable(inner) | TypeDescriptor::Sequence(inner) => collect_refs(inner, visit),
        TypeDescriptor::Mapping { key, value } => {
            collect_refs(key, visit);
            collect_refs(value, visit);
        }
        TypeDescriptor::Record(rec) => rec.fields.iter().for_each(|f| collect_refs(&f.ty, visit)),
        TypeDescriptor::Unknown | TypeDescriptor::Scalar(_) | TypeDescriptor::Enumeration(_) => {}
    }
}

impl Resolver for SchemaRegistry {
    fn resolve(&self, name: &str) -> Option<TypeDescriptor> { self.types.get(name).cloned() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatvar_core::ScalarKind;

    const YAML: &str = r#"
enums:
  - name: Crime
    variants: [None, Claim, Fine, Bounty]
records:
  - name: Bounty
    fields:
      - name: Crime
        type: { ref: Crime }
      - name: Reward
        type: { scalar: long }
        description: Total reward
      - name: Target
        type: { nullable: { ref: Pilot } }
"#;

    #[test]
    fn yaml_schema_registers_enums_then_records() {
        let reg = SchemaRegistry::from_yaml_str(YAML).unwrap();
        assert_eq!(reg.names().collect::<Vec<_>>(), ["Crime", "Bounty"]);
        match reg.get("Bounty") {
            Some(TypeDescriptor::Record(r)) => {
                assert_eq!(r.fields[1].ty, TypeDescriptor::scalar(ScalarKind::Long));
                assert_eq!(r.fields[1].description.as_deref(), Some("Total reward"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(reg.resolve("Crime"), Some(TypeDescriptor::Enumeration(_))));
        assert_eq!(reg.dangling_refs(), vec!["Pilot".to_string()]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let json = serde_json::json!({
            "enums": [{ "name": "Body", "variants": ["Star"] }],
            "records": [{ "name": "Body" }],
        });
        let err = SchemaRegistry::from_json_str(&json.to_string()).unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate(name) if name == "Body"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let path = std::env::temp_dir().join(format!("flatvar-schema-{}.toml", std::process::id()));
        std::fs::write(&path, "records = []").unwrap();
        let err = SchemaRegistry::load(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, SchemaError::UnsupportedFormat(ext) if ext == "toml"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SchemaRegistry::load("/nonexistent/flatvar.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/flatvar.json"));
    }
}
