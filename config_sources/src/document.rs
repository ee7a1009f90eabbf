//! Document formats and the top-level render entry points.

use std::fmt;

use camino::Utf8Path;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_saphyr::Options;
use tracing::debug;

use crate::SourceResult;
use crate::error::SourceError;
use crate::node::{Mapping, Node, Scalar};
use crate::resolver::Resolver;
use crate::walker::inject_dynamic_values;

/// Serialisation format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum DocumentFormat {
    /// YAML 1.2 with strict booleans; the native agent format.
    #[default]
    Yaml,
    /// JSON, behind the `json` feature.
    Json,
    /// TOML, behind the `toml` feature.
    Toml,
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
            Self::Toml => "TOML",
        })
    }
}

impl DocumentFormat {
    /// Pick a format from the extension of `path`.
    ///
    /// Unknown or missing extensions fall back to YAML.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use config_sources::DocumentFormat;
    ///
    /// assert_eq!(DocumentFormat::from_path(Utf8Path::new("agent.TOML")), DocumentFormat::Toml);
    /// assert_eq!(DocumentFormat::from_path(Utf8Path::new("agent.conf")), DocumentFormat::Yaml);
    /// ```
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Self {
        let ext = path.extension().map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Self::Json,
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }

    /// Parse `text` into a tree.
    ///
    /// Empty or whitespace-only text is a null document.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Parse`] when the text is malformed or the
    /// format's feature is disabled.
    pub fn parse(self, text: &str) -> SourceResult<Node> {
        if text.trim().is_empty() {
            return Ok(Node::null());
        }
        match self {
            Self::Yaml => serde_saphyr::from_str_with_options(
                text,
                Options {
                    strict_booleans: true,
                    ..Options::default()
                },
            )
            .map_err(|err| SourceError::parse(self, err)),
            Self::Json => {
                #[cfg(feature = "json")]
                {
                    serde_json::from_str(text).map_err(|err| SourceError::parse(self, err))
                }
                #[cfg(not(feature = "json"))]
                {
                    Err(SourceError::parse(self, feature_disabled("json")))
                }
            }
            Self::Toml => {
                #[cfg(feature = "toml")]
                {
                    toml::from_str(text).map_err(|err| SourceError::parse(self, err))
                }
                #[cfg(not(feature = "toml"))]
                {
                    Err(SourceError::parse(self, feature_disabled("toml")))
                }
            }
        }
    }

    /// Encode `node` as text.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Serialization`] when the tree cannot be
    /// represented (TOML has no null, for instance) or the format's feature
    /// is disabled.
    pub fn serialize(self, node: &Node) -> SourceResult<String> {
        match self {
            Self::Yaml => serde_saphyr::to_string(&YamlTree(node))
                .map_err(|err| SourceError::serialization(self, err)),
            Self::Json => {
                #[cfg(feature = "json")]
                {
                    serde_json::to_string_pretty(node)
                        .map_err(|err| SourceError::serialization(self, err))
                }
                #[cfg(not(feature = "json"))]
                {
                    Err(SourceError::serialization(self, feature_disabled("json")))
                }
            }
            Self::Toml => {
                #[cfg(feature = "toml")]
                {
                    toml::to_string(node).map_err(|err| SourceError::serialization(self, err))
                }
                #[cfg(not(feature = "toml"))]
                {
                    Err(SourceError::serialization(self, feature_disabled("toml")))
                }
            }
        }
    }

    /// Parse `text` as a document root, which must be a mapping.
    pub(crate) fn parse_root(self, text: &str) -> SourceResult<Node> {
        match self.parse(text)? {
            Node::Scalar(scalar) if scalar.is_null() => Ok(Node::Mapping(Mapping::new())),
            root @ Node::Mapping(_) => Ok(root),
            other => Err(SourceError::parse(
                self,
                format!("document root must be a mapping, found a {}", other.kind()),
            )),
        }
    }
}

#[cfg(any(not(feature = "json"), not(feature = "toml")))]
fn feature_disabled(feature: &str) -> String {
    format!("{feature} feature disabled: enable the '{feature}' feature to support this format")
}

/// YAML view of a tree.
///
/// String values that read as another scalar are quoted by the emitter, but
/// keys only get quoted for structural characters. A string key that would
/// come back as a number, boolean or null is written as an explicit `? "key"`
/// entry instead.
struct YamlTree<'a>(&'a Node);

impl Serialize for YamlTree<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Node::Scalar(scalar) => scalar.serialize(serializer),
            Node::Sequence(items) => serializer.collect_seq(items.iter().map(YamlTree)),
            Node::Mapping(mapping) => {
                let mut map = serializer.serialize_map(Some(mapping.len()))?;
                for (key, value) in mapping.iter() {
                    match key {
                        Scalar::String(text) if !reads_back_as_string(text) => {
                            map.serialize_entry(&ExplicitKey(text), &YamlTree(value))?;
                        }
                        _ => map.serialize_entry(key, &YamlTree(value))?,
                    }
                }
                map.end()
            }
        }
    }
}

// Not a plain scalar, so the emitter falls back to `? ` key syntax and
// writes the text with value quoting rules.
struct ExplicitKey<'a>(&'a str);

impl Serialize for ExplicitKey<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct("ExplicitKey", self.0)
    }
}

fn reads_back_as_string(text: &str) -> bool {
    parse_value(text).is_ok_and(|node| node.as_str() == Some(text))
}

/// Parse one value fetched from a source as YAML.
pub(crate) fn parse_value(text: &str) -> SourceResult<Node> {
    DocumentFormat::Yaml.parse(text)
}

/// Resolve every dynamic value in a document of the given format.
///
/// The output uses the same format as the input. An empty document renders
/// as an empty mapping.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] for malformed input or a non-mapping root,
/// any error raised while resolving, and [`SourceError::Serialization`] when
/// the result cannot be encoded.
///
/// # Examples
///
/// ```
/// use config_sources::{DocumentFormat, MemorySource, SourceRegistry, render_document};
///
/// let registry = SourceRegistry::new().with_source(MemorySource::new("env").with("PORT", "8080"));
/// let out = render_document(r##"{"port": {"#from": "env:PORT"}}"##, DocumentFormat::Json, &registry)?;
/// assert!(out.contains("8080"));
/// # Ok::<_, std::sync::Arc<config_sources::SourceError>>(())
/// ```
pub fn render_document<R>(text: &str, format: DocumentFormat, resolver: &R) -> SourceResult<String>
where
    R: Resolver + ?Sized,
{
    let root = format.parse_root(text)?;
    debug!(%format, "rendering dynamic values");
    let resolved = inject_dynamic_values(root, resolver)?;
    format.serialize(&resolved)
}

/// Resolve every dynamic value in a YAML document held as bytes.
///
/// # Errors
///
/// As for [`render_document`]; input that is not UTF-8 is a
/// [`SourceError::Parse`].
pub fn render_dynamic_values<R>(document: &[u8], resolver: &R) -> SourceResult<Vec<u8>>
where
    R: Resolver + ?Sized,
{
    let text =
        std::str::from_utf8(document).map_err(|err| SourceError::parse(DocumentFormat::Yaml, err))?;
    render_document(text, DocumentFormat::Yaml, resolver).map(String::into_bytes)
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, anyhow, ensure};
    use camino::Utf8Path;
    use rstest::{fixture, rstest};

    use super::{DocumentFormat, parse_value, render_document, render_dynamic_values};
    use crate::SourceError;
    use crate::node::{Mapping, Node, Scalar};
    use crate::sources::{MemorySource, SourceRegistry};

    #[fixture]
    fn registry() -> SourceRegistry {
        SourceRegistry::new().with_source(
            MemorySource::new("kv")
                .with("host", "db01")
                .with("port", "5432")
                .with("ports", "[5432, 5433]"),
        )
    }

    fn reparse(format: DocumentFormat, text: &str) -> Result<Node> {
        format.parse(text).map_err(|err| anyhow!(err.to_string()))
    }

    #[rstest]
    #[case("agent.yaml", DocumentFormat::Yaml)]
    #[case("agent.YML", DocumentFormat::Yaml)]
    #[case("agent.json", DocumentFormat::Json)]
    #[case("agent.toml", DocumentFormat::Toml)]
    #[case("agent", DocumentFormat::Yaml)]
    fn detects_format_from_extension(#[case] path: &str, #[case] expected: DocumentFormat) {
        assert_eq!(DocumentFormat::from_path(Utf8Path::new(path)), expected);
    }

    #[rstest]
    #[case("8080", Node::from(8080))]
    #[case("yes", Node::from("yes"))]
    #[case("true", Node::from(true))]
    #[case("  \n", Node::null())]
    #[case("[a, 1]", Node::from(vec![Node::from("a"), Node::from(1)]))]
    fn source_values_parse_as_strict_yaml(#[case] text: &str, #[case] expected: Node) -> Result<()> {
        let parsed = parse_value(text).map_err(|err| anyhow!(err.to_string()))?;
        ensure!(parsed == expected, "expected {expected}, got {parsed}");
        Ok(())
    }

    #[rstest]
    fn renders_yaml_documents(registry: SourceRegistry) -> Result<()> {
        let doc = "db:\n  host: {'#from': 'kv:host'}\n  ports: {'#from': 'kv:ports'}\n";
        let out = render_document(doc, DocumentFormat::Yaml, &registry)
            .map_err(|err| anyhow!(err.to_string()))?;
        let expected = Node::from_entries([(
            "db",
            Node::from_entries([
                ("host", Node::from("db01")),
                ("ports", Node::from(vec![Node::from(5432), Node::from(5433)])),
            ]),
        )]);
        let tree = reparse(DocumentFormat::Yaml, &out)?;
        ensure!(tree == expected, "got {tree}");
        Ok(())
    }

    #[rstest]
    fn raw_values_stay_strings_in_yaml_output(registry: SourceRegistry) -> Result<()> {
        let doc = "port: {'#from': 'kv:port', raw: true}\n";
        let out = render_document(doc, DocumentFormat::Yaml, &registry)
            .map_err(|err| anyhow!(err.to_string()))?;
        let tree = reparse(DocumentFormat::Yaml, &out)?;
        ensure!(tree.get("port") == Some(&Node::from("5432")), "got {out}");
        Ok(())
    }

    #[rstest]
    #[case::integer("8080")]
    #[case::float("1.10")]
    #[case::octal_looking("0755")]
    #[case::hex("0x10")]
    #[case::boolean("true")]
    #[case::null("~")]
    #[case::empty("")]
    #[case::sequence_like("[a]")]
    fn ambiguous_strings_keep_their_type(#[case] text: &str) -> Result<()> {
        let tree = Node::from_entries([
            (text, Node::from(text)),
            ("nested", Node::from_entries([(text, Node::from(1))])),
        ]);
        let out = DocumentFormat::Yaml
            .serialize(&tree)
            .map_err(|err| anyhow!(err.to_string()))?;
        let back = reparse(DocumentFormat::Yaml, &out)?;
        ensure!(back == tree, "{text:?} did not survive:\n{out}");
        Ok(())
    }

    #[cfg(feature = "json")]
    #[rstest]
    fn renders_json_documents(registry: SourceRegistry) -> Result<()> {
        let doc = r##"{"hosts": [{"#from": "kv:host"}, "db02"]}"##;
        let out = render_document(doc, DocumentFormat::Json, &registry)
            .map_err(|err| anyhow!(err.to_string()))?;
        let tree = reparse(DocumentFormat::Json, &out)?;
        let expected = Node::from_entries([(
            "hosts",
            Node::from(vec![Node::from("db01"), Node::from("db02")]),
        )]);
        ensure!(tree == expected, "got {tree}");
        Ok(())
    }

    #[cfg(feature = "toml")]
    #[rstest]
    fn toml_cannot_carry_unresolved_nulls(registry: SourceRegistry) {
        let doc = "[db]\nhost = { \"#from\" = \"kv:absent\", optional = true }\n";
        let err = render_document(doc, DocumentFormat::Toml, &registry)
            .expect_err("TOML has no null");
        assert!(matches!(
            &*err,
            SourceError::Serialization {
                format: DocumentFormat::Toml,
                ..
            }
        ));
    }

    #[rstest]
    fn empty_documents_render_as_empty_mappings(registry: SourceRegistry) -> Result<()> {
        let out = render_document("", DocumentFormat::Yaml, &registry)
            .map_err(|err| anyhow!(err.to_string()))?;
        let tree = reparse(DocumentFormat::Yaml, &out)?;
        ensure!(tree == Node::Mapping(Mapping::new()), "got {tree}");
        Ok(())
    }

    #[rstest]
    #[case::sequence_root("- a\n- b\n")]
    #[case::scalar_root("just text\n")]
    #[case::malformed("key: [unclosed\n")]
    fn rejects_unusable_documents(registry: SourceRegistry, #[case] doc: &str) {
        let err = render_document(doc, DocumentFormat::Yaml, &registry)
            .expect_err("document must be rejected");
        assert!(matches!(&*err, SourceError::Parse { .. }));
    }

    #[rstest]
    fn rejects_non_utf8_input(registry: SourceRegistry) {
        let err = render_dynamic_values(&[0x66, 0xff, 0x3a], &registry)
            .expect_err("invalid UTF-8 must be rejected");
        assert!(matches!(
            &*err,
            SourceError::Parse {
                format: DocumentFormat::Yaml,
                ..
            }
        ));
    }
}
