//! Type-directed merging of candidate values for one mapping key.

use crate::node::{Mapping, Node, NodeKind};
use crate::{SourceError, SourceResult};

/// Combine the candidates resolved for a non-flattened mapping value.
///
/// Behaviour, keyed on the first candidate:
/// - no candidates: null;
/// - sequence: every candidate must be a sequence; elements are concatenated
///   in order;
/// - mapping: every candidate must be a mapping; entries are unioned in order
///   with later candidates overwriting earlier ones;
/// - scalar: the first candidate wins and the rest are discarded.
///
/// # Errors
///
/// Returns [`SourceError::MergeType`] when a sequence or mapping is mixed with
/// another shape.
///
/// # Examples
///
/// ```
/// use config_sources::{Node, merge_values};
///
/// let merged = merge_values(vec![
///     Node::from(vec![Node::from(1), Node::from(2)]),
///     Node::from(vec![Node::from(3)]),
/// ])?;
/// assert_eq!(merged, Node::from(vec![Node::from(1), Node::from(2), Node::from(3)]));
///
/// assert_eq!(merge_values(vec![Node::from(1), Node::from(2)])?, Node::from(1));
/// # Ok::<_, std::sync::Arc<config_sources::SourceError>>(())
/// ```
pub fn merge_values(values: Vec<Node>) -> SourceResult<Node> {
    let mut candidates = values.into_iter();
    let Some(first) = candidates.next() else {
        return Ok(Node::null());
    };
    match first {
        Node::Sequence(items) => merge_sequences(items, candidates).map(Node::Sequence),
        Node::Mapping(mapping) => merge_mappings(mapping, candidates).map(Node::Mapping),
        scalar @ Node::Scalar(_) => Ok(scalar),
    }
}

fn merge_sequences(
    mut merged: Vec<Node>,
    rest: impl Iterator<Item = Node>,
) -> SourceResult<Vec<Node>> {
    for candidate in rest {
        match candidate {
            Node::Sequence(items) => merged.extend(items),
            other => return Err(SourceError::merge_type(NodeKind::Sequence, other.kind())),
        }
    }
    Ok(merged)
}

fn merge_mappings(
    mut merged: Mapping,
    rest: impl Iterator<Item = Node>,
) -> SourceResult<Mapping> {
    for candidate in rest {
        match candidate {
            Node::Mapping(entries) => merged.extend(entries),
            other => return Err(SourceError::merge_type(NodeKind::Mapping, other.kind())),
        }
    }
    Ok(merged)
}
