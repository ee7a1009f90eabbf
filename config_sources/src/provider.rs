//! Figment provider that resolves dynamic values before contributing data.

use camino::Utf8PathBuf;
use figment::{
    Metadata, Profile, Provider,
    error::Kind,
    value::{Dict, Value as FigmentValue},
};

use crate::document::DocumentFormat;
use crate::resolver::Resolver;
use crate::walker::inject_dynamic_values;

#[derive(Debug, Clone)]
enum DocumentInput {
    File,
    Inline(String),
}

/// Figment provider reading a document whose dynamic values are resolved
/// through `R`.
///
/// The format follows the path's extension unless set with
/// [`DynamicDocument::format`].
///
/// # Examples
///
/// ```
/// use config_sources::{DynamicDocument, MemorySource, SourceRegistry};
/// use figment::Figment;
///
/// let registry = SourceRegistry::new().with_source(MemorySource::new("env").with("HOST", "db01"));
/// let provider = DynamicDocument::string("agent.yaml", "host: {'#from': 'env:HOST'}", registry);
/// let host: String = Figment::from(provider).extract_inner("host")?;
/// assert_eq!(host, "db01");
/// # Ok::<_, figment::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DynamicDocument<R> {
    path: Utf8PathBuf,
    input: DocumentInput,
    format: Option<DocumentFormat>,
    profile: Option<Profile>,
    resolver: R,
}

impl<R: Resolver> DynamicDocument<R> {
    /// Construct a provider that reads `path` when queried.
    #[must_use]
    pub fn file<P: Into<Utf8PathBuf>>(path: P, resolver: R) -> Self {
        Self {
            path: path.into(),
            input: DocumentInput::File,
            format: None,
            profile: None,
            resolver,
        }
    }

    /// Construct a provider from an in-memory document; `path` names it in
    /// errors and selects its format.
    #[must_use]
    pub fn string<P, S>(path: P, contents: S, resolver: R) -> Self
    where
        P: Into<Utf8PathBuf>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            input: DocumentInput::Inline(contents.into()),
            format: None,
            profile: None,
            resolver,
        }
    }

    /// Parse the document as `format` regardless of its extension.
    #[must_use]
    pub const fn format(mut self, format: DocumentFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Override the profile this provider emits values into.
    #[must_use]
    pub fn profile<P: Into<Profile>>(mut self, profile: P) -> Self {
        self.profile = Some(profile.into());
        self
    }

    fn read_contents(&self) -> std::io::Result<String> {
        match &self.input {
            DocumentInput::File => std::fs::read_to_string(&self.path),
            DocumentInput::Inline(contents) => Ok(contents.clone()),
        }
    }

    fn resolve_dict(&self, contents: &str) -> Result<Dict, figment::Error> {
        let format = self
            .format
            .unwrap_or_else(|| DocumentFormat::from_path(&self.path));
        let resolved = format
            .parse_root(contents)
            .and_then(|root| inject_dynamic_values(root, &self.resolver))
            .map_err(|err| {
                figment::Error::from(Kind::Message(format!(
                    "failed to render {}: {err}",
                    self.path
                )))
            })?;
        let value = FigmentValue::serialize(&resolved)?;
        let actual = value.to_actual();
        value
            .into_dict()
            .ok_or_else(|| figment::Error::from(Kind::InvalidType(actual, "map".into())))
    }
}

impl<R: Resolver> Provider for DynamicDocument<R> {
    fn metadata(&self) -> Metadata {
        Metadata::from("Dynamic document", self.path.as_std_path())
    }

    fn data(&self) -> Result<std::collections::BTreeMap<Profile, Dict>, figment::Error> {
        let contents = self
            .read_contents()
            .map_err(|err| figment::Error::from(format!("failed to read {}: {err}", self.path)))?;
        let dict = self.resolve_dict(&contents)?;
        let profile = self.profile.clone().unwrap_or(Profile::Default);
        Ok(profile.collect(dict))
    }
}
