//! Constructors and inspection helpers for `SourceError`.

use std::sync::Arc;

use crate::document::DocumentFormat;
use crate::node::{Node, NodeKind, Scalar};
use crate::resolver::CanonicalPath;

use super::{BoxError, FlattenViolation, SourceError};

impl SourceError {
    /// Construct a shared [`SourceError::Resolution`] for `spec`.
    ///
    /// Resolver implementations use this to report any failure that should
    /// abort resolution of the enclosing key or element.
    ///
    /// # Examples
    ///
    /// ```
    /// use config_sources::{Node, SourceError};
    ///
    /// let spec = Node::from_entries([("#from", Node::from("env:HOME"))]);
    /// let err = SourceError::resolution(&spec, "source unavailable");
    /// assert!(matches!(&*err, SourceError::Resolution { .. }));
    /// ```
    #[must_use]
    pub fn resolution(spec: &Node, source: impl Into<BoxError>) -> Arc<Self> {
        Arc::new(Self::Resolution {
            spec: spec.to_string(),
            source: source.into(),
        })
    }

    /// Construct a shared [`SourceError::Parse`].
    #[must_use]
    pub fn parse(format: DocumentFormat, source: impl Into<BoxError>) -> Arc<Self> {
        Arc::new(Self::Parse {
            format,
            source: source.into(),
        })
    }

    /// Construct a shared [`SourceError::Serialization`].
    #[must_use]
    pub fn serialization(format: DocumentFormat, source: impl Into<BoxError>) -> Arc<Self> {
        Arc::new(Self::Serialization {
            format,
            source: source.into(),
        })
    }

    pub(crate) fn circular_dependency(paths: Vec<CanonicalPath>, spec: &Node) -> Arc<Self> {
        Arc::new(Self::CircularDependency {
            paths,
            spec: spec.to_string(),
        })
    }

    pub(crate) fn flatten_contract(key: &Scalar, reason: FlattenViolation) -> Arc<Self> {
        Arc::new(Self::FlattenContract {
            key: key.to_string(),
            reason,
        })
    }

    pub(crate) fn merge_type(expected: NodeKind, found: NodeKind) -> Arc<Self> {
        Arc::new(Self::MergeType { expected, found })
    }

    pub(crate) fn at_key(key: &Scalar, source: Arc<Self>) -> Arc<Self> {
        Arc::new(Self::AtKey {
            key: key.to_string(),
            source,
        })
    }

    pub(crate) fn at_index(index: usize, source: Arc<Self>) -> Arc<Self> {
        Arc::new(Self::AtIndex { index, source })
    }

    /// Strip location wrappers and return the underlying failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use config_sources::{Node, Resolution, SourceError, SourceResult, render_dynamic_values};
    ///
    /// let resolver =
    ///     |spec: &Node| -> SourceResult<Resolution> { Err(SourceError::resolution(spec, "offline")) };
    /// let err = render_dynamic_values(b"db:\n  password: {'#from': 'vault:db'}\n", &resolver)
    ///     .expect_err("resolution fails");
    /// assert!(matches!(err.root_cause(), SourceError::Resolution { .. }));
    /// ```
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        let mut current = self;
        while let Self::AtKey { source, .. } | Self::AtIndex { source, .. } = current {
            current = source.as_ref();
        }
        current
    }

    /// Render the document location of the failure, such as
    /// `monitors[1].password`.
    ///
    /// Returns an empty string when the failure was not raised beneath a key
    /// or element.
    #[must_use]
    pub fn location(&self) -> String {
        let mut out = String::new();
        let mut current = self;
        loop {
            match current {
                Self::AtKey { key, source } => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(key);
                    current = source.as_ref();
                }
                Self::AtIndex { index, source } => {
                    out.push('[');
                    out.push_str(&index.to_string());
                    out.push(']');
                    current = source.as_ref();
                }
                _ => return out,
            }
        }
    }
}
