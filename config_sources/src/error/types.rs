//! Primary error enum for dynamic-value rendering.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::document::DocumentFormat;
use crate::node::NodeKind;
use crate::resolver::CanonicalPath;

/// Boxed foreign error carried as the source of parse and resolution failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while rendering a document's dynamic values.
///
/// Every failure aborts the whole render: a partially resolved configuration
/// is never returned. Failures raised below a mapping key or sequence element
/// are wrapped in [`SourceError::AtKey`] / [`SourceError::AtIndex`]; use
/// [`SourceError::root_cause`] to reach the underlying kind.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// The input document, or a value fetched from a source, is malformed.
    #[error("failed to parse {format} document: {source}")]
    Parse {
        /// Format the text was parsed as.
        format: DocumentFormat,
        /// Underlying parser error.
        #[source]
        source: BoxError,
    },

    /// A resolver failed to produce values for a dynamic value specification.
    #[error("could not resolve dynamic value {spec}: {source}")]
    Resolution {
        /// Flow-style rendering of the offending specification.
        spec: String,
        /// Underlying resolver error.
        #[source]
        source: BoxError,
    },

    /// A canonical path recurred within its own resolution chain.
    #[error(
        "dynamic value paths {} have a circular dependency (while resolving {spec})",
        join_paths(.paths)
    )]
    CircularDependency {
        /// Every path active when the cycle was detected, sorted.
        paths: Vec<CanonicalPath>,
        /// Flow-style rendering of the specification that closed the cycle.
        spec: String,
    },

    /// A flattened dynamic value broke the flatten contract.
    #[error("cannot flatten dynamic value at key '{key}': {reason}")]
    FlattenContract {
        /// Mapping key holding the dynamic value.
        key: String,
        /// Which part of the contract was violated.
        reason: FlattenViolation,
    },

    /// Candidate values for one key have shapes that cannot be merged.
    #[error("cannot merge a {expected} with a {found}")]
    MergeType {
        /// Shape of the first candidate, which every other must share.
        expected: NodeKind,
        /// Shape of the first incompatible candidate.
        found: NodeKind,
    },

    /// The resolved tree could not be encoded in the requested format.
    #[error("failed to serialise {format} document: {source}")]
    Serialization {
        /// Format the tree was serialised as.
        format: DocumentFormat,
        /// Underlying encoder error.
        #[source]
        source: BoxError,
    },

    /// A failure while processing a mapping key.
    #[error("could not process key '{key}': {source}")]
    AtKey {
        /// Key being processed.
        key: String,
        /// Failure raised while processing it.
        #[source]
        source: Arc<SourceError>,
    },

    /// A failure while processing a sequence element.
    #[error("could not process index {index}: {source}")]
    AtIndex {
        /// Position of the element in the source sequence.
        index: usize,
        /// Failure raised while processing it.
        #[source]
        source: Arc<SourceError>,
    },
}

/// Ways a flattened dynamic value can break the flatten contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlattenViolation {
    /// Flattening into a mapping requires the key to start with `_`.
    MissingPrefix,
    /// A resolved candidate was not a mapping.
    NotAMapping {
        /// Shape of the offending candidate.
        found: NodeKind,
    },
}

impl fmt::Display for FlattenViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPrefix => f.write_str(
                "when flattening a map into another map the key must start with '_' to make the intention clear",
            ),
            Self::NotAMapping { found } => {
                write!(f, "cannot flatten a {found} into a mapping context")
            }
        }
    }
}

fn join_paths(paths: &[CanonicalPath]) -> String {
    paths
        .iter()
        .map(CanonicalPath::as_str)
        .collect::<Vec<_>>()
        .join("; ")
}
