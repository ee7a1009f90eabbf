//! Registry lookups, directive handling and failure reporting.

use anyhow::{Result, anyhow, ensure};
use rstest::{fixture, rstest};

use super::{ConfigSource, MemorySource, SourceRegistry};
use crate::SourceError;
use crate::error::BoxError;
use crate::node::Node;
use crate::resolver::{CanonicalPath, Resolver};

struct FailingSource;

impl ConfigSource for FailingSource {
    fn name(&self) -> &str {
        "broken"
    }

    fn get(&self, _path: &str) -> Result<Vec<String>, BoxError> {
        Err("backend unreachable".into())
    }
}

/// Source echoing the requested path back as its only value.
struct EchoSource;

impl ConfigSource for EchoSource {
    fn name(&self) -> &str {
        "echo"
    }

    fn get(&self, path: &str) -> Result<Vec<String>, BoxError> {
        Ok(vec![path.to_owned()])
    }
}

fn directive(entries: Vec<(&str, Node)>) -> Node {
    Node::from_entries(entries)
}

fn from(reference: &str) -> Node {
    directive(vec![("#from", Node::from(reference))])
}

#[fixture]
fn registry() -> SourceRegistry {
    SourceRegistry::new()
        .with_source(
            MemorySource::new("kv")
                .with("port", "8080")
                .with("hosts", "[a, b]")
                .with("conn", "{host: db, port: 5432}")
                .with("raw", "[not, parsed]")
                .with("broken-yaml", "key: [unclosed")
                .with("nodes/1", "n1")
                .with("nodes/2", "n2"),
        )
        .with_source(FailingSource)
}

#[rstest]
fn parses_values_as_yaml(registry: SourceRegistry) -> Result<()> {
    let resolution = registry
        .resolve(&from("kv:conn"))
        .map_err(|err| anyhow!(err.to_string()))?;
    let expected = Node::from_entries([("host", Node::from("db")), ("port", Node::from(5432))]);
    ensure!(resolution.values == vec![expected], "got {:?}", resolution.values);
    ensure!(resolution.path == CanonicalPath::from("kv:conn"));
    ensure!(!resolution.spec.flatten);
    Ok(())
}

#[rstest]
fn raw_values_stay_strings(registry: SourceRegistry) -> Result<()> {
    let spec = directive(vec![("#from", Node::from("kv:raw")), ("raw", Node::from(true))]);
    let resolution = registry
        .resolve(&spec)
        .map_err(|err| anyhow!(err.to_string()))?;
    ensure!(resolution.values == vec![Node::from("[not, parsed]")]);
    Ok(())
}

#[rstest]
fn glob_paths_yield_every_match(registry: SourceRegistry) -> Result<()> {
    let resolution = registry
        .resolve(&from("kv:nodes/*"))
        .map_err(|err| anyhow!(err.to_string()))?;
    ensure!(resolution.values == vec![Node::from("n1"), Node::from("n2")]);
    ensure!(resolution.path == CanonicalPath::from("kv:nodes/*"));
    Ok(())
}

#[rstest]
fn default_replaces_missing_values(registry: SourceRegistry) -> Result<()> {
    let spec = directive(vec![
        ("#from", Node::from("kv:absent")),
        ("default", Node::from(9090)),
    ]);
    let resolution = registry
        .resolve(&spec)
        .map_err(|err| anyhow!(err.to_string()))?;
    ensure!(resolution.values == vec![Node::from(9090)]);
    Ok(())
}

#[rstest]
fn optional_missing_values_resolve_to_nothing(registry: SourceRegistry) -> Result<()> {
    let spec = directive(vec![
        ("#from", Node::from("kv:absent")),
        ("optional", Node::from(true)),
    ]);
    let resolution = registry
        .resolve(&spec)
        .map_err(|err| anyhow!(err.to_string()))?;
    ensure!(resolution.values.is_empty());
    Ok(())
}

#[rstest]
#[case::missing_value("kv:absent", "no value found at 'kv:absent'")]
#[case::unknown_source("nope:x", "unknown source 'nope'")]
#[case::malformed_reference("no-colon", "must have the form")]
#[case::backend_failure("broken:x", "backend unreachable")]
fn lookup_failures_are_resolution_errors(
    registry: SourceRegistry,
    #[case] reference: &str,
    #[case] expected: &str,
) {
    let err = registry
        .resolve(&from(reference))
        .expect_err("lookup must fail");
    assert!(matches!(&*err, SourceError::Resolution { .. }));
    assert!(
        err.to_string().contains(expected),
        "expected '{expected}' in: {err}"
    );
}

#[rstest]
fn malformed_source_values_are_parse_errors(registry: SourceRegistry) {
    let err = registry
        .resolve(&from("kv:broken-yaml"))
        .expect_err("invalid YAML must fail");
    assert!(matches!(&*err, SourceError::Parse { .. }));
}

#[rstest]
fn dispatches_by_source_name() -> Result<()> {
    let mut registry = SourceRegistry::new();
    ensure!(registry.register(EchoSource).is_none());
    ensure!(registry.contains("echo"));
    let resolution = registry
        .resolve(&from("echo:a/b"))
        .map_err(|err| anyhow!(err.to_string()))?;
    ensure!(resolution.values == vec![Node::from("a/b")]);

    let replaced = registry.register(EchoSource);
    ensure!(replaced.is_some(), "registering the same name replaces the source");
    ensure!(registry.names().collect::<Vec<_>>() == ["echo"]);
    Ok(())
}
