//! Detection and parsing of dynamic value specifications.
//!
//! A dynamic value is a mapping carrying the reserved `#from` key:
//!
//! ```yaml
//! password: {"#from": "vault:secret/db/password"}
//! _connection: {"#from": "zk:/services/db", flatten: true}
//! hosts: {"#from": "etcd:/hosts", optional: true, default: []}
//! ```

use serde::Deserialize;

use crate::SourceResult;
use crate::error::SourceError;
use crate::node::{Node, Scalar};
use crate::resolver::CanonicalPath;

/// Reserved key marking a mapping as a dynamic value specification.
pub const DIRECTIVE_KEY: &str = "#from";

/// Prefix a mapping key must carry when its dynamic value is flattened into
/// the parent mapping.
pub const FLATTEN_PREFIX: char = '_';

/// Returns `true` when `node` is a mapping with a non-null `#from` entry.
///
/// # Examples
///
/// ```
/// use config_sources::{Node, is_dynamic_value};
///
/// assert!(is_dynamic_value(&Node::from_entries([("#from", Node::from("env:HOME"))])));
/// assert!(!is_dynamic_value(&Node::from_entries([("#from", Node::null())])));
/// assert!(!is_dynamic_value(&Node::from("env:HOME")));
/// ```
#[must_use]
pub fn is_dynamic_value(node: &Node) -> bool {
    node.get(DIRECTIVE_KEY).is_some_and(|value| !value.is_null())
}

/// Returns `true` when any node in the tree rooted at `node` is dynamic.
#[must_use]
pub fn contains_dynamic_value(node: &Node) -> bool {
    if is_dynamic_value(node) {
        return true;
    }
    match node {
        Node::Scalar(_) => false,
        Node::Sequence(items) => items.iter().any(contains_dynamic_value),
        Node::Mapping(mapping) => mapping.iter().any(|(_, value)| contains_dynamic_value(value)),
    }
}

/// Whether `key` declares the intent to flatten into its parent mapping.
pub(crate) fn has_flatten_marker(key: &Scalar) -> bool {
    key.as_str()
        .is_some_and(|text| text.starts_with(FLATTEN_PREFIX))
}

/// Parsed fields of a dynamic value specification.
///
/// The walker itself only looks at [`DynamicValueSpec::flatten`]; the other
/// fields drive [`crate::SourceRegistry`] lookups.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DynamicValueSpec {
    /// Source reference in `<source>:<path>` form.
    #[serde(rename = "#from")]
    pub from: String,
    /// Splice the resolved values into the parent instead of nesting them.
    #[serde(default)]
    pub flatten: bool,
    /// Treat "no value found" as resolving to nothing rather than an error.
    #[serde(default)]
    pub optional: bool,
    /// Value used when the source finds nothing.
    #[serde(default)]
    pub default: Option<Node>,
    /// Keep source values as plain strings instead of parsing them as YAML.
    #[serde(default)]
    pub raw: bool,
}

impl DynamicValueSpec {
    /// Parse the directive fields of `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Resolution`] when `#from` is missing or not a
    /// string, a flag has the wrong type, or an unknown field is present.
    ///
    /// # Examples
    ///
    /// ```
    /// use config_sources::{DynamicValueSpec, Node};
    ///
    /// let node = Node::from_entries([
    ///     ("#from", Node::from("consul:redis/host")),
    ///     ("flatten", Node::from(true)),
    /// ]);
    /// let spec = DynamicValueSpec::parse(&node)?;
    /// assert!(spec.flatten);
    /// assert_eq!(spec.source_ref().map(|r| r.source), Some("consul"));
    /// # Ok::<_, std::sync::Arc<config_sources::SourceError>>(())
    /// ```
    pub fn parse(spec: &Node) -> SourceResult<Self> {
        // JSON keys are strings, so `default` bypasses the detour and is
        // taken verbatim; a null default means no default.
        let fields = match spec {
            Node::Mapping(mapping) => Node::Mapping(
                mapping
                    .iter()
                    .filter(|(key, _)| key.as_str() != Some("default"))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
            other => other.clone(),
        };
        let value =
            serde_json::to_value(&fields).map_err(|err| SourceError::resolution(spec, err))?;
        let mut parsed: Self =
            serde_json::from_value(value).map_err(|err| SourceError::resolution(spec, err))?;
        parsed.default = spec.get("default").filter(|node| !node.is_null()).cloned();
        Ok(parsed)
    }

    /// Split [`Self::from`] into its source name and path.
    ///
    /// Returns `None` unless both parts are non-empty.
    #[must_use]
    pub fn source_ref(&self) -> Option<SourceRef<'_>> {
        let (source, path) = self.from.split_once(':')?;
        (!source.is_empty() && !path.is_empty()).then_some(SourceRef { source, path })
    }
}

/// A `#from` reference split into source name and path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRef<'a> {
    /// Name of the registered source.
    pub source: &'a str,
    /// Path within that source.
    pub path: &'a str,
}

impl SourceRef<'_> {
    /// Canonical path used for cycle detection: `<source>:<path>`.
    #[must_use]
    pub fn canonical_path(&self) -> CanonicalPath {
        CanonicalPath::new(format!("{}:{}", self.source, self.path))
    }
}
