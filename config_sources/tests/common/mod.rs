//! Shared fixtures for the integration tests.
//!
//! The registry models a small agent deployment: environment variables, a
//! secret store and a service catalogue with glob lookups.

use anyhow::{Result, anyhow};
use config_sources::{DocumentFormat, MemorySource, Node, SourceRegistry, SourceResult};

/// Registry shared by the integration tests.
pub fn agent_registry() -> SourceRegistry {
    SourceRegistry::new()
        .with_source(
            MemorySource::new("env")
                .with("DB_HOST", "db01.internal")
                .with("DB_PORT", "5432")
                .with("LOG_LEVEL", "debug"),
        )
        .with_source(
            MemorySource::new("vault")
                .with("db/password", "hunter2")
                .with("db/credentials", "{user: agent, password: hunter2}"),
        )
        .with_source(
            MemorySource::new("catalog")
                .with("monitors/cpu", "{type: cpu, interval: 10}")
                .with("monitors/disk", "{type: disk, interval: 60}")
                .with("pool", "{min: 1, max: {'#from': 'env:DB_PORT'}}")
                .with("loop/a", "{'#from': 'catalog:loop/b'}")
                .with("loop/b", "{'#from': 'catalog:loop/a'}"),
        )
}

/// Parse YAML test input into a tree.
pub fn yaml(text: &str) -> Result<Node> {
    to_anyhow(DocumentFormat::Yaml.parse(text))
}

/// Convert crate results into `anyhow` results for `?` in tests.
pub fn to_anyhow<T>(result: SourceResult<T>) -> Result<T> {
    result.map_err(|err| anyhow!(err.to_string()))
}
