//! Named dynamic-value sources and the registry that resolves against them.
//!
//! A [`SourceRegistry`] turns `#from: "<source>:<path>"` directives into
//! candidate values by asking the named [`ConfigSource`] for the raw text at
//! `<path>`. Concrete backends (environment, secret stores, discovery) live
//! outside this crate and plug in through [`ConfigSource`].

mod memory;

use std::collections::BTreeMap;
use std::fmt;

use tracing::{trace, warn};

use crate::directive::DynamicValueSpec;
use crate::document::parse_value;
use crate::error::BoxError;
use crate::node::Node;
use crate::resolver::{Resolution, Resolver};
use crate::{SourceError, SourceResult};

pub use memory::MemorySource;

/// A named provider of raw configuration values.
///
/// Implementations must tolerate concurrent calls: one registry may serve
/// several renders at once.
pub trait ConfigSource: Send + Sync {
    /// Name used in `#from` references.
    fn name(&self) -> &str;

    /// Fetch the raw values stored at `path`, in a stable order.
    ///
    /// An empty vector means nothing was found. Multiple values model
    /// multi-target lookups such as globs.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be queried.
    fn get(&self, path: &str) -> Result<Vec<String>, BoxError>;
}

/// Resolver backed by a set of named [`ConfigSource`]s.
///
/// # Examples
///
/// ```
/// use config_sources::{MemorySource, SourceRegistry, render_dynamic_values};
///
/// let registry = SourceRegistry::new()
///     .with_source(MemorySource::new("vault").with("db/password", "hunter2"));
/// let out = render_dynamic_values(
///     b"password: {'#from': 'vault:db/password'}\n",
///     &registry,
/// )?;
/// assert!(String::from_utf8_lossy(&out).contains("hunter2"));
/// # Ok::<_, std::sync::Arc<config_sources::SourceError>>(())
/// ```
#[derive(Default)]
pub struct SourceRegistry {
    sources: BTreeMap<String, Box<dyn ConfigSource>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under its name, returning any source it replaced.
    pub fn register<S>(&mut self, source: S) -> Option<Box<dyn ConfigSource>>
    where
        S: ConfigSource + 'static,
    {
        self.sources
            .insert(source.name().to_owned(), Box::new(source))
    }

    /// Builder-style [`Self::register`].
    #[must_use]
    pub fn with_source<S>(mut self, source: S) -> Self
    where
        S: ConfigSource + 'static,
    {
        self.register(source);
        self
    }

    /// Returns `true` when a source called `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Registered source names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Turn raw source text into candidate nodes, honouring `raw`.
    fn parse_candidates(spec: &DynamicValueSpec, texts: Vec<String>) -> SourceResult<Vec<Node>> {
        if spec.raw {
            return Ok(texts.into_iter().map(Node::from).collect());
        }
        texts.iter().map(String::as_str).map(parse_value).collect()
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Resolver for SourceRegistry {
    fn resolve(&self, raw: &Node) -> SourceResult<Resolution> {
        let spec = DynamicValueSpec::parse(raw)?;
        let reference = spec.source_ref().ok_or_else(|| {
            SourceError::resolution(
                raw,
                format!("'#from' value '{}' must have the form '<source>:<path>'", spec.from),
            )
        })?;
        let source = self.sources.get(reference.source).ok_or_else(|| {
            SourceError::resolution(raw, format!("unknown source '{}'", reference.source))
        })?;

        trace!(source = reference.source, path = reference.path, "looking up dynamic value");
        let texts = source
            .get(reference.path)
            .map_err(|err| SourceError::resolution(raw, err))?;
        let mut values = Self::parse_candidates(&spec, texts)?;

        if values.is_empty() {
            if let Some(default) = &spec.default {
                values.push(default.clone());
            } else if spec.optional {
                warn!(from = %spec.from, "optional dynamic value not found; leaving it empty");
            } else {
                return Err(SourceError::resolution(
                    raw,
                    format!("no value found at '{}'", spec.from),
                ));
            }
        }

        let path = reference.canonical_path();
        Ok(Resolution { values, path, spec })
    }
}

#[cfg(test)]
mod tests;
