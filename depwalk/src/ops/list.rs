use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::registry::client::http::HttpRegistryClient;
use crate::core::{Config, PackageName};
use crate::internal::asyncx::block_on;
use crate::walker::{ResolvedGraph, Walker};

/// Construct a [`Walker`] reading from the registry configured in `config`.
pub fn walker(config: &Config) -> Result<Walker> {
    let client = HttpRegistryClient::new(config).context("failed to create registry client")?;
    Ok(Walker::new(Arc::new(client), config.walk_options()))
}

/// Resolve the full dependency graph of `package` at version `range`.
///
/// Blocks the current thread until the walk finishes. Use [`list_async`] from asynchronous code.
#[tracing::instrument(level = "debug", skip(config))]
pub fn list(config: &Config, package: PackageName, range: &str) -> Result<ResolvedGraph> {
    block_on(config, list_async(config, package, range))
}

pub async fn list_async(
    config: &Config,
    package: PackageName,
    range: &str,
) -> Result<ResolvedGraph> {
    let walker = walker(config)?;
    let graph = walker.list(package, range).await?;
    Ok(graph)
}
