//! Boundary between the tree walker and dynamic-value sources.

use std::fmt;

use crate::SourceResult;
use crate::directive::DynamicValueSpec;
use crate::node::Node;

/// Opaque identifier for one dynamic source reference.
///
/// The walker uses canonical paths only to detect cycles: resolving a path
/// from within its own resolution chain is always an error, while resolving
/// the same path in unrelated branches is fine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// Wrap `path` as a canonical path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Borrow the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CanonicalPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Outcome of resolving one dynamic value specification.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Candidate values in source order. May be empty.
    pub values: Vec<Node>,
    /// Identifier of the source reference, used for cycle detection.
    pub path: CanonicalPath,
    /// Parsed directive fields.
    pub spec: DynamicValueSpec,
}

/// Produces candidate values for dynamic value specifications.
///
/// Implementations may block (network, disk, secret stores); the walker treats
/// each call as atomic. Any `Fn(&Node) -> SourceResult<Resolution>` closure is
/// a resolver, which keeps tests and one-off integrations lightweight.
///
/// # Examples
///
/// ```
/// use config_sources::{CanonicalPath, DynamicValueSpec, Node, Resolution, SourceResult, render_dynamic_values};
///
/// let resolver = |spec: &Node| -> SourceResult<Resolution> {
///     Ok(Resolution {
///         values: vec![Node::from("s3cr3t")],
///         path: CanonicalPath::from("vault:db"),
///         spec: DynamicValueSpec::parse(spec)?,
///     })
/// };
/// let out = render_dynamic_values(b"password: {'#from': 'vault:db'}\n", &resolver)?;
/// assert!(String::from_utf8_lossy(&out).contains("s3cr3t"));
/// # Ok::<_, std::sync::Arc<config_sources::SourceError>>(())
/// ```
pub trait Resolver {
    /// Resolve `spec`, a mapping carrying the `#from` directive.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::SourceError`], typically
    /// [`crate::SourceError::Resolution`], when no values can be produced.
    fn resolve(&self, spec: &Node) -> SourceResult<Resolution>;
}

impl<F> Resolver for F
where
    F: Fn(&Node) -> SourceResult<Resolution>,
{
    fn resolve(&self, spec: &Node) -> SourceResult<Resolution> {
        self(spec)
    }
}
