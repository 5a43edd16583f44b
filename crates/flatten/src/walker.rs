//! Depth-first shape walker.
//!
//! One walk owns its emitted-key set and output; nothing is shared between walks.
//! Every member is prepared behind a fault boundary: a failure is logged, recorded in
//! the report and the walk moves on to the next member.

use std::borrow::Cow;
use std::time::Instant;

use flatvar_core::{
    FieldDescriptor, FlatVar, FlattenError, HostKind, HostValue, RecordDescriptor, Resolver, ScalarKind,
    TypeDescriptor, Value,
};
use metrics::{counter, histogram};
use rustc_hash::FxHashSet;
use tracing::{debug, error};

use crate::naming;
use crate::normalize::normalize;
use crate::options::FlattenOptions;

/// A member that was dropped from the output.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFault {
    pub prefix: String,
    /// Raw field name, or the rendered map key; empty for positional members.
    pub key: String,
    pub declared: String,
    pub value: String,
    pub error: FlattenError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenReport {
    pub vars: Vec<FlatVar>,
    pub faults: Vec<FieldFault>,
}

/// Flatten `value` (shaped by `root`) into host variables under `prefix`.
pub fn flatten(
    root: &TypeDescriptor,
    value: &Value,
    prefix: &str,
    options: &FlattenOptions,
    resolver: &dyn Resolver,
) -> Vec<FlatVar> {
    flatten_with_report(root, value, prefix, options, resolver).vars
}

/// As `flatten`, also returning every isolated fault.
pub fn flatten_with_report(
    root: &TypeDescriptor,
    value: &Value,
    prefix: &str,
    options: &FlattenOptions,
    resolver: &dyn Resolver,
) -> FlattenReport {
    let started = Instant::now();
    let mut walk = Walk::new(options, resolver);
    walk.shape(prefix, root, value, true, 0);
    histogram!("flatvar_walk_ms", started.elapsed().as_secs_f64() * 1000.0);
    counter!("flatvar_vars_total", walk.vars.len() as u64);
    FlattenReport { vars: walk.vars, faults: walk.faults }
}

struct Walk<'a> {
    options: &'a FlattenOptions,
    resolver: &'a dyn Resolver,
    ignored: FxHashSet<String>,
    emitted: FxHashSet<String>,
    /// Named types whose fields are being walked right now, outermost first.
    expanding: Vec<String>,
    vars: Vec<FlatVar>,
    faults: Vec<FieldFault>,
}

impl<'a> Walk<'a> {
    fn new(options: &'a FlattenOptions, resolver: &'a dyn Resolver) -> Self {
        Self {
            options,
            resolver,
            ignored: options.ignored_set(),
            emitted: FxHashSet::default(),
            expanding: Vec::new(),
            vars: Vec::new(),
            faults: Vec::new(),
        }
    }

    /// Walk a whole shape: records fan out into their fields, anything else is one positional member.
    fn shape(&mut self, prefix: &str, desc: &TypeDescriptor, value: &Value, top_level: bool, depth: usize) {
        let resolved = match self.resolve(desc) {
            Ok(d) => d,
            Err(e) => return self.fault(prefix, "", desc, value, e),
        };
        match resolved.as_ref() {
            TypeDescriptor::Record(rec) => {
                if let Err(e) = self.expand(prefix, desc, rec, value, top_level, depth) {
                    self.fault(prefix, "", desc, value, e);
                }
            }
            _ => self.member(prefix, None, desc, value, top_level, depth),
        }
    }

    /// Walk a record reached through `desc`. A named type may only re-enter itself while
    /// there is a value to walk; with nothing left to expand, the member faults once.
    fn expand(
        &mut self,
        prefix: &str,
        desc: &TypeDescriptor,
        rec: &RecordDescriptor,
        value: &Value,
        top_level: bool,
        depth: usize,
    ) -> Result<(), FlattenError> {
        let entered = match desc.unwrap_nullable() {
            TypeDescriptor::Ref(name) => {
                if value.is_null() && self.expanding.iter().any(|e| e == name) {
                    return Err(FlattenError::RecursiveShape(name.clone()));
                }
                self.expanding.push(name.clone());
                true
            }
            _ => false,
        };
        let result = self.record(prefix, rec, value, top_level, depth);
        if entered {
            self.expanding.pop();
        }
        result
    }

    fn record(
        &mut self,
        prefix: &str,
        rec: &RecordDescriptor,
        value: &Value,
        top_level: bool,
        depth: usize,
    ) -> Result<(), FlattenError> {
        if !matches!(value, Value::Record(_) | Value::Null) {
            return Err(FlattenError::mismatch(format!("record {}", rec.name), value));
        }
        for field in &rec.fields {
            self.member(prefix, Some(field), &field.ty, value.field(&field.name), top_level, depth);
        }
        Ok(())
    }

    fn member(
        &mut self,
        prefix: &str,
        field: Option<&FieldDescriptor>,
        desc: &TypeDescriptor,
        value: &Value,
        top_level: bool,
        depth: usize,
    ) {
        if let Err(e) = self.prepare(prefix, field, desc, value, top_level, depth) {
            let key = field.map(|f| f.name.as_str()).unwrap_or("");
            self.fault(prefix, key, desc, value, e);
        }
    }

    fn prepare(
        &mut self,
        prefix: &str,
        field: Option<&FieldDescriptor>,
        desc: &TypeDescriptor,
        value: &Value,
        top_level: bool,
        depth: usize,
    ) -> Result<(), FlattenError> {
        if let Some(f) = field {
            if self.ignored.contains(&f.name.to_lowercase()) {
                debug!(key = %f.name, "ignoring key");
                return Ok(());
            }
            if self.options.public_only && !f.public {
                debug!(key = %f.name, "ignoring non-public key");
                return Ok(());
            }
        }

        let name = match field {
            Some(f) => naming::resolve(prefix, &f.name),
            None => prefix.to_string(),
        };
        if self.emitted.contains(&name) {
            debug!(key = %name, "skipping already-set key");
            return Ok(());
        }
        if depth >= self.options.max_depth {
            return Err(FlattenError::DepthExceeded(self.options.max_depth));
        }

        let resolved = self.resolve(desc)?;
        match resolved.as_ref() {
            TypeDescriptor::Scalar(ScalarKind::TimeSpan) => {
                debug!(key = %name, "timespan has no host representation");
                Ok(())
            }
            TypeDescriptor::Unknown | TypeDescriptor::Scalar(_) | TypeDescriptor::Enumeration(_) => {
                let (kind, coerced) = normalize(&resolved, value)?;
                self.emit(name, kind, coerced, top_level);
                Ok(())
            }
            TypeDescriptor::Sequence(element) => self.sequence(&name, element, value, top_level, depth),
            TypeDescriptor::Mapping { key, value: item } => self.mapping(&name, key, item, value, depth),
            TypeDescriptor::Record(rec) => {
                debug!(key = %name, record = %rec.name, "found record");
                self.expand(&name, desc, rec, value, false, depth + 1)
            }
            other => Err(FlattenError::UnexpectedType(other.to_string())),
        }
    }

    fn sequence(
        &mut self,
        name: &str,
        element: &TypeDescriptor,
        value: &Value,
        top_level: bool,
        depth: usize,
    ) -> Result<(), FlattenError> {
        let items: &[Value] = match value {
            Value::List(items) => items,
            Value::Null => &[],
            other => return Err(FlattenError::mismatch("list", other)),
        };
        for (i, item) in items.iter().enumerate() {
            debug!(key = %name, index = i, "handling element");
            self.shape(&naming::child_key(name, i), element, item, false, depth + 1);
        }

        let count = if items.is_empty() && self.options.document_empty {
            // Shape of one element with null leaves, and no count.
            self.shape(&naming::child_key(name, "n"), element, &Value::Null, false, depth + 1);
            None
        } else if items.is_empty() && value.is_null() {
            None
        } else {
            let len = i32::try_from(items.len()).map_err(|_| FlattenError::IntegerOverflow(items.len() as i64))?;
            Some(HostValue::Integer(len))
        };
        self.emit(naming::child_key(name, "entries"), HostKind::Integer, count, top_level);
        Ok(())
    }

    fn mapping(
        &mut self,
        name: &str,
        key_desc: &TypeDescriptor,
        item_desc: &TypeDescriptor,
        value: &Value,
        depth: usize,
    ) -> Result<(), FlattenError> {
        match value {
            Value::Map(entries) => {
                for (k, item) in entries {
                    self.map_entry(name, key_desc, item_desc, k, item, depth);
                }
            }
            // String-keyed maps read without descriptor guidance arrive as records.
            Value::Record(fields) => {
                for (k, item) in fields {
                    self.map_entry(name, key_desc, item_desc, &Value::Text(k.clone()), item, depth);
                }
            }
            Value::Null => {}
            other => return Err(FlattenError::mismatch("map", other)),
        }
        Ok(())
    }

    fn map_entry(
        &mut self,
        name: &str,
        key_desc: &TypeDescriptor,
        item_desc: &TypeDescriptor,
        key: &Value,
        item: &Value,
        depth: usize,
    ) {
        if item.is_null() { return; }
        match self.map_key(key_desc, key) {
            Ok(text) => self.shape(&naming::child_key(name, text), item_desc, item, false, depth + 1),
            Err(e) => self.fault(name, &key.to_string(), key_desc, key, e),
        }
    }

    fn map_key(&self, key_desc: &TypeDescriptor, key: &Value) -> Result<String, FlattenError> {
        let resolved = self.resolve(key_desc)?;
        match (resolved.as_ref(), key) {
            (TypeDescriptor::Enumeration(e), Value::Ordinal(o)) => e
                .name_of(*o)
                .map(str::to_string)
                .ok_or_else(|| FlattenError::UnknownOrdinal { name: e.name.clone(), ordinal: *o }),
            (_, Value::Text(s)) => Ok(s.clone()),
            (_, Value::Null | Value::List(_) | Value::Map(_) | Value::Record(_)) => {
                Err(FlattenError::mismatch("map key", key))
            }
            (_, other) => Ok(other.to_string()),
        }
    }

    /// Strip nullable wrappers and follow references.
    fn resolve<'d>(&self, desc: &'d TypeDescriptor) -> Result<Cow<'d, TypeDescriptor>, FlattenError> {
        let mut cur = Cow::Borrowed(desc.unwrap_nullable());
        for _ in 0..=self.options.max_depth {
            let next = match cur.as_ref() {
                TypeDescriptor::Ref(name) => {
                    self.resolver.resolve(name).ok_or_else(|| FlattenError::UnresolvedRef(name.clone()))?
                }
                _ => return Ok(cur),
            };
            cur = Cow::Owned(next.unwrap_nullable().clone());
        }
        Err(FlattenError::DepthExceeded(self.options.max_depth))
    }

    fn emit(&mut self, key: String, kind: HostKind, value: Option<HostValue>, top_level: bool) {
        if !self.emitted.insert(key.clone()) {
            debug!(key = %key, "skipping already-set key");
            return;
        }
        debug!(key = %key, kind = %kind, "setting value");
        self.vars.push(FlatVar { key, kind, value, top_level });
    }

    fn fault(&mut self, prefix: &str, key: &str, declared: &TypeDescriptor, value: &Value, error: FlattenError) {
        error!(
            prefix = %prefix,
            key = %key,
            declared = %declared,
            value = %value,
            error = %error,
            "failed to prepare host variable"
        );
        counter!("flatvar_faults_total", 1);
        self.faults.push(FieldFault {
            prefix: prefix.to_string(),
            key: key.to_string(),
            declared: declared.to_string(),
            value: value.to_string(),
            error,
        });
    }
}
