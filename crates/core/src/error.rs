use thiserror::Error;

/// Faults raised while preparing one member. They never escape the member they occur in.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlattenError {
    #[error("unexpected type '{0}' cannot be set as a host variable")]
    UnexpectedType(String),
    #[error("enum {name} has no variant for ordinal {ordinal}")]
    UnknownOrdinal { name: String, ordinal: i64 },
    #[error("expected {expected} value, found {found}")]
    ValueMismatch { expected: String, found: &'static str },
    #[error("integer {0} does not fit the host integer")]
    IntegerOverflow(i64),
    #[error("number {0} cannot be represented by the host")]
    NotRepresentable(f64),
    #[error("unresolved type reference '{0}'")]
    UnresolvedRef(String),
    #[error("recursion depth limit {0} exceeded")]
    DepthExceeded(usize),
    #[error("recursive type '{0}' has no value to expand")]
    RecursiveShape(String),
}

impl FlattenError {
    pub fn mismatch(expected: impl ToString, found: &crate::Value) -> Self {
        FlattenError::ValueMismatch { expected: expected.to_string(), found: found.kind_name() }
    }
}
