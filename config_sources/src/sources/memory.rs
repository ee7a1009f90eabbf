//! In-memory [`ConfigSource`] for pre-populated values and tests.

use std::collections::BTreeMap;

use crate::error::BoxError;

use super::ConfigSource;

/// A [`ConfigSource`] answering from an in-memory table.
///
/// Paths match exactly, except that a path ending in `*` matches every stored
/// path sharing the preceding prefix; matches are returned in path order.
///
/// # Examples
///
/// ```
/// use config_sources::{ConfigSource, MemorySource};
///
/// let source = MemorySource::new("zk")
///     .with("/hosts/a", "10.0.0.1")
///     .with("/hosts/b", "10.0.0.2");
/// assert_eq!(source.get("/hosts/*").expect("lookup"), ["10.0.0.1", "10.0.0.2"]);
/// assert!(source.get("/missing").expect("lookup").is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    values: BTreeMap<String, Vec<String>>,
}

impl MemorySource {
    /// Create an empty source called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    /// Append `value` to the values stored at `path`.
    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.values.entry(path.into()).or_default().push(value.into());
    }

    /// Builder-style [`Self::insert`].
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(path, value);
        self
    }
}

impl ConfigSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, path: &str) -> Result<Vec<String>, BoxError> {
        let Some(prefix) = path.strip_suffix('*') else {
            return Ok(self.values.get(path).cloned().unwrap_or_default());
        };
        Ok(self
            .values
            .range(prefix.to_owned()..)
            .take_while(|(candidate, _)| candidate.starts_with(prefix))
            .flat_map(|(_, values)| values.iter().cloned())
            .collect())
    }
}
