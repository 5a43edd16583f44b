//! Flatvar flattening engine: walks a value against its descriptor and produces
//! uniquely named, host-typed variables.

#![forbid(unsafe_code)]

pub mod docs;
pub mod naming;
pub mod normalize;
pub mod options;
pub mod walker;

pub use docs::{document, render_markdown, VarDoc};
pub use normalize::normalize;
pub use options::{FlattenOptions, DEFAULT_IGNORED_KEYS, DEFAULT_MAX_DEPTH};
pub use walker::{flatten, flatten_with_report, FieldFault, FlattenReport};
