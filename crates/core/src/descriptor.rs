//! Shape descriptors: a closed, explicit description of every member a walk can meet.
//!
//! Descriptors are immutable once built. Records and enumerations sit behind `Arc`
//! so one derived descriptor can be shared read-only by any number of walks.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Terminal kinds as declared by the producer (before host normalization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Text,
    /// 32-bit integer; maps 1:1 onto the host integer.
    Integer,
    /// 64-bit integer; widened to the host number.
    Long,
    Float,
    Decimal,
    Boolean,
    DateTime,
    /// Terminal, but the host has no representation for it.
    TimeSpan,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Text => "text",
            ScalarKind::Integer => "integer",
            ScalarKind::Long => "long",
            ScalarKind::Float => "float",
            ScalarKind::Decimal => "decimal",
            ScalarKind::Boolean => "boolean",
            ScalarKind::DateTime => "date_time",
            ScalarKind::TimeSpan => "timespan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDescriptor {
    /// Declared type unknown; the host clears every representation of the key.
    Unknown,
    Scalar(ScalarKind),
    Nullable(Box<TypeDescriptor>),
    Enumeration(Arc<EnumDescriptor>),
    Sequence(Box<TypeDescriptor>),
    Mapping { key: Box<TypeDescriptor>, value: Box<TypeDescriptor> },
    Record(Arc<RecordDescriptor>),
    /// Named descriptor, looked up through a `Resolver` when walked.
    Ref(String),
}

impl TypeDescriptor {
    pub fn scalar(kind: ScalarKind) -> Self { TypeDescriptor::Scalar(kind) }
    pub fn text() -> Self { TypeDescriptor::Scalar(ScalarKind::Text) }
    pub fn integer() -> Self { TypeDescriptor::Scalar(ScalarKind::Integer) }
    pub fn long() -> Self { TypeDescriptor::Scalar(ScalarKind::Long) }
    pub fn float() -> Self { TypeDescriptor::Scalar(ScalarKind::Float) }
    pub fn boolean() -> Self { TypeDescriptor::Scalar(ScalarKind::Boolean) }
    pub fn date_time() -> Self { TypeDescriptor::Scalar(ScalarKind::DateTime) }

    pub fn nullable(inner: TypeDescriptor) -> Self { TypeDescriptor::Nullable(Box::new(inner)) }
    pub fn sequence(element: TypeDescriptor) -> Self { TypeDescriptor::Sequence(Box::new(element)) }
    pub fn mapping(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Mapping { key: Box::new(key), value: Box::new(value) }
    }
    pub fn record(record: RecordDescriptor) -> Self { TypeDescriptor::Record(Arc::new(record)) }
    pub fn enumeration(e: EnumDescriptor) -> Self { TypeDescriptor::Enumeration(Arc::new(e)) }
    pub fn reference(name: impl Into<String>) -> Self { TypeDescriptor::Ref(name.into()) }

    /// Strip any number of nullable wrappers.
    pub fn unwrap_nullable(&self) -> &TypeDescriptor {
        let mut cur = self;
        while let TypeDescriptor::Nullable(inner) = cur { cur = inner; }
        cur
    }

    /// True for shapes that end in a single host variable (or in nothing, for timespans).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.unwrap_nullable(),
            TypeDescriptor::Unknown | TypeDescriptor::Scalar(_) | TypeDescriptor::Enumeration(_)
        )
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Unknown => write!(f, "unknown"),
            TypeDescriptor::Scalar(kind) => write!(f, "{}", kind.as_str()),
            TypeDescriptor::Nullable(inner) => write!(f, "nullable<{}>", inner),
            TypeDescriptor::Enumeration(e) => write!(f, "enum {}", e.name),
            TypeDescriptor::Sequence(element) => write!(f, "list<{}>", element),
            TypeDescriptor::Mapping { key, value } => write!(f, "map<{}, {}>", key, value),
            TypeDescriptor::Record(r) => write!(f, "record {}", r.name),
            TypeDescriptor::Ref(name) => write!(f, "ref {}", name),
        }
    }
}

/// Enumeration with a positional ordinal-to-name table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDescriptor {
    pub name: String,
    pub variants: Vec<String>,
}

impl EnumDescriptor {
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { name: name.into(), variants: variants.into_iter().map(Into::into).collect() }
    }

    pub fn name_of(&self, ordinal: i64) -> Option<&str> {
        usize::try_from(ordinal).ok().and_then(|i| self.variants.get(i)).map(|s| s.as_str())
    }

    pub fn ordinal_of(&self, name: &str) -> Option<i64> {
        self.variants.iter().position(|v| v == name).map(|i| i as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDescriptor {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), fields: Vec::new() } }

    /// Append a field; declaration order is walk order.
    pub fn field(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.fields.push(FieldDescriptor::new(name, ty));
        self
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> { self.fields.iter().find(|f| f.name == name) }
}

fn default_public() -> bool { true }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Marker for the public variable surface; only consulted when walking with `public_only`.
    #[serde(default = "default_public")]
    pub public: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self { name: name.into(), ty, description: None, public: true }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn internal(mut self) -> Self {
        self.public = false;
        self
    }
}
