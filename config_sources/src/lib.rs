//! Dynamic value resolution for declarative agent configuration.
//!
//! A configuration document may mark any value as dynamic by replacing it
//! with a mapping carrying the reserved `#from` key:
//!
//! ```yaml
//! database:
//!   host: db01
//!   password: {"#from": "vault:secret/db/password"}
//!   _pool: {"#from": "consul:db/pool", flatten: true}
//! ```
//!
//! Rendering walks the document, asks a [`Resolver`] for the candidate values
//! of every dynamic value, merges or splices them into place and returns a
//! document free of directives. Resolved content may itself contain dynamic
//! values; chains that loop back on themselves fail with
//! [`SourceError::CircularDependency`] instead of recursing forever.
//!
//! [`SourceRegistry`] is the stock resolver, dispatching `<source>:<path>`
//! references to named [`ConfigSource`]s. [`DynamicDocument`] plugs the whole
//! render into a `figment` load.

mod directive;
mod document;
mod error;
mod node;
mod provider;
mod resolver;
mod result_ext;
mod sources;
mod walker;

use std::sync::Arc;

pub use directive::{
    DIRECTIVE_KEY, DynamicValueSpec, FLATTEN_PREFIX, SourceRef, contains_dynamic_value,
    is_dynamic_value,
};
pub use document::{DocumentFormat, render_document, render_dynamic_values};
pub use error::{BoxError, FlattenViolation, SourceError};
pub use node::{Mapping, Node, NodeKind, Scalar};
pub use provider::DynamicDocument;
pub use resolver::{CanonicalPath, Resolution, Resolver};
pub use sources::{ConfigSource, MemorySource, SourceRegistry};
pub use walker::{inject_dynamic_values, merge_values};

/// Result alias used throughout the crate; errors are shared so wrappers can
/// hold their cause cheaply.
pub type SourceResult<T> = Result<T, Arc<SourceError>>;
