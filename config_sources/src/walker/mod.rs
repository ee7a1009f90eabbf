//! Recursive rewrite pass that replaces dynamic values with resolved content.
//!
//! The walker consumes a [`Node`] tree and rebuilds it, asking a [`Resolver`]
//! for every dynamic value it meets. Resolved values are walked in turn, so a
//! source may hand back content that itself contains dynamic values. A walk
//! state tracks which canonical paths are being resolved on the
//! current recursion stack and rejects self-referential chains.

mod merge;

use std::collections::HashSet;

use tracing::debug;

use crate::directive::{has_flatten_marker, is_dynamic_value};
use crate::error::FlattenViolation;
use crate::node::{Mapping, Node, Scalar};
use crate::resolver::{CanonicalPath, Resolution, Resolver};
use crate::result_ext::SourceResultExt;
use crate::{DynamicValueSpec, SourceError, SourceResult};

pub use merge::merge_values;

/// Canonical paths whose resolution is an ancestor of the current recursion
/// point.
///
/// One state belongs to exactly one top-level walk and is dropped with it.
#[derive(Debug, Default)]
pub(crate) struct WalkState {
    active: HashSet<CanonicalPath>,
}

impl WalkState {
    fn new() -> Self {
        Self::default()
    }

    fn is_active(&self, path: &CanonicalPath) -> bool {
        self.active.contains(path)
    }

    /// Active paths in sorted order, for diagnostics.
    fn active_paths(&self) -> Vec<CanonicalPath> {
        let mut paths: Vec<_> = self.active.iter().cloned().collect();
        paths.sort();
        paths
    }
}

/// Tree walker bound to one resolver and one [`WalkState`].
struct Walker<'r, R: ?Sized> {
    resolver: &'r R,
    state: WalkState,
}

impl<'r, R: Resolver + ?Sized> Walker<'r, R> {
    fn new(resolver: &'r R) -> Self {
        Self {
            resolver,
            state: WalkState::new(),
        }
    }

    fn inject(&mut self, node: Node) -> SourceResult<Node> {
        match node {
            Node::Scalar(_) => Ok(node),
            Node::Mapping(mapping) => self.inject_mapping(mapping).map(Node::Mapping),
            Node::Sequence(items) => self.inject_sequence(items).map(Node::Sequence),
        }
    }

    fn inject_mapping(&mut self, mapping: Mapping) -> SourceResult<Mapping> {
        let mut out = Mapping::with_capacity(mapping.len());
        for (key, value) in mapping {
            if !is_dynamic_value(&value) {
                let injected = self.inject(value).at_key(&key)?;
                out.insert(key, injected);
                continue;
            }
            let (values, spec) = self.resolve(&value).at_key(&key)?;
            if spec.flatten {
                flatten_into_mapping(&mut out, &key, values).at_key(&key)?;
            } else {
                let merged = merge_values(values).at_key(&key)?;
                let injected = self.inject(merged).at_key(&key)?;
                out.insert(key, injected);
            }
        }
        Ok(out)
    }

    fn inject_sequence(&mut self, items: Vec<Node>) -> SourceResult<Vec<Node>> {
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            if !is_dynamic_value(&item) {
                out.push(self.inject(item).at_index(index)?);
                continue;
            }
            let (values, spec) = self.resolve(&item).at_index(index)?;
            if spec.flatten {
                // Splice at the running output cursor so candidates keep
                // their order relative to each other and to their siblings.
                for value in values {
                    match value {
                        Node::Sequence(elements) => out.extend(elements),
                        other => out.push(other),
                    }
                }
            } else {
                out.extend(values);
            }
        }
        Ok(out)
    }

    /// Resolve `raw` and walk each candidate with its canonical path marked
    /// active.
    fn resolve(&mut self, raw: &Node) -> SourceResult<(Vec<Node>, DynamicValueSpec)> {
        debug!(spec = %raw, "resolving dynamic value");
        let Resolution { values, path, spec } = self.resolver.resolve(raw)?;
        if self.state.is_active(&path) {
            return Err(SourceError::circular_dependency(
                self.state.active_paths(),
                raw,
            ));
        }
        debug!(path = %path, candidates = values.len(), "resolved dynamic value");

        self.state.active.insert(path.clone());
        let result = self.expand_candidates(values);
        self.state.active.remove(&path);

        let resolved = result?;
        debug!(path = %path, spec = %raw, "final resolution has {} value(s)", resolved.len());
        Ok((resolved, spec))
    }

    /// Walk resolved candidates in order.
    ///
    /// A candidate that is itself a dynamic value is an alias: its own
    /// candidates take its place, and the enclosing specification decides how
    /// they are placed.
    fn expand_candidates(&mut self, values: Vec<Node>) -> SourceResult<Vec<Node>> {
        let mut resolved = Vec::with_capacity(values.len());
        for value in values {
            if is_dynamic_value(&value) {
                let (aliased, _) = self.resolve(&value)?;
                resolved.extend(aliased);
            } else {
                resolved.push(self.inject(value)?);
            }
        }
        Ok(resolved)
    }

    /// Walk a value that has no parent to splice into.
    ///
    /// A dynamic value here is resolved and its candidates merged, as for a
    /// non-flattened mapping entry.
    fn inject_detached(&mut self, node: Node) -> SourceResult<Node> {
        if !is_dynamic_value(&node) {
            return self.inject(node);
        }
        let (values, _) = self.resolve(&node)?;
        let merged = merge_values(values)?;
        self.inject(merged)
    }
}

fn flatten_into_mapping(out: &mut Mapping, key: &Scalar, values: Vec<Node>) -> SourceResult<()> {
    if !has_flatten_marker(key) {
        return Err(SourceError::flatten_contract(
            key,
            FlattenViolation::MissingPrefix,
        ));
    }
    for value in values {
        match value {
            Node::Mapping(entries) => out.extend(entries),
            other => {
                return Err(SourceError::flatten_contract(
                    key,
                    FlattenViolation::NotAMapping {
                        found: other.kind(),
                    },
                ));
            }
        }
    }
    Ok(())
}

/// Replace every dynamic value in `node` with its resolved content.
///
/// Each call owns a fresh cycle-detection state, so independent trees may be
/// processed concurrently provided `resolver` tolerates concurrent use.
///
/// # Errors
///
/// Returns the first failure met during the walk, wrapped with the keys and
/// indices leading to it. No partially resolved tree is returned.
///
/// # Examples
///
/// ```
/// use config_sources::{MemorySource, Node, SourceRegistry, inject_dynamic_values};
///
/// let registry = SourceRegistry::new().with_source(MemorySource::new("env").with("HOST", "db01"));
/// let tree = Node::from_entries([(
///     "host",
///     Node::from_entries([("#from", Node::from("env:HOST"))]),
/// )]);
/// let resolved = inject_dynamic_values(tree, &registry)?;
/// assert_eq!(resolved.get("host").and_then(Node::as_str), Some("db01"));
/// # Ok::<_, std::sync::Arc<config_sources::SourceError>>(())
/// ```
pub fn inject_dynamic_values<R>(node: Node, resolver: &R) -> SourceResult<Node>
where
    R: Resolver + ?Sized,
{
    Walker::new(resolver).inject_detached(node)
}
