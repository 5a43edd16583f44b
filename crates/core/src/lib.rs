//! Flatvar core types: shape descriptors, dynamic values and flattened host variables.

#![forbid(unsafe_code)]

use std::sync::Arc;

pub mod describe;
pub mod descriptor;
pub mod entry;
pub mod error;
pub mod value;

pub use describe::Describe;
pub use descriptor::{EnumDescriptor, FieldDescriptor, RecordDescriptor, ScalarKind, TypeDescriptor};
pub use entry::{FlatVar, HostKind, HostValue};
pub use error::FlattenError;
pub use value::Value;

pub mod prelude {
    pub use super::{
        Describe, EnumDescriptor, FieldDescriptor, FlatVar, FlattenError, HostKind, HostValue, NoRefs,
        RecordDescriptor, Resolver, ScalarKind, TypeDescriptor, Value,
    };
}

/// Looks up named descriptors referenced through `TypeDescriptor::Ref`.
pub trait Resolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<TypeDescriptor>;
}

/// Resolver for self-contained descriptors; every reference is unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRefs;

impl Resolver for NoRefs {
    fn resolve(&self, _name: &str) -> Option<TypeDescriptor> { None }
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn resolve(&self, name: &str) -> Option<TypeDescriptor> { (**self).resolve(name) }
}
