//! Extensions for attaching document locations to failures concisely.
//!
//! These helpers replace repetitive
//! `.map_err(|e| SourceError::at_key(key, e))` chains in the tree walker.

use crate::node::Scalar;
use crate::{SourceError, SourceResult};

/// Attach the key or element being processed to a failed result.
pub(crate) trait SourceResultExt<T> {
    /// Wrap a failure in [`SourceError::AtKey`].
    fn at_key(self, key: &Scalar) -> SourceResult<T>;

    /// Wrap a failure in [`SourceError::AtIndex`].
    fn at_index(self, index: usize) -> SourceResult<T>;
}

impl<T> SourceResultExt<T> for SourceResult<T> {
    fn at_key(self, key: &Scalar) -> SourceResult<T> {
        self.map_err(|err| SourceError::at_key(key, err))
    }

    fn at_index(self, index: usize) -> SourceResult<T> {
        self.map_err(|err| SourceError::at_index(index, err))
    }
}
