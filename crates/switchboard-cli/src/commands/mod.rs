//! CLI command implementations for `swb`.
//!
//! - [`providers`] -- Provider table.
//! - [`models`] -- Model listing.
//! - [`test`] -- Connectivity checks.
//! - [`ask`] -- Prompt through the fallback chain.

pub mod ask;
pub mod models;
pub mod providers;

use std::path::Path;

use anyhow::Context;
use switchboard_llm::{ProviderRegistry, load_config};

/// Load configuration from the given path override or via auto-discovery,
/// and build a registry from it.
///
/// Discovery order without an override:
/// 1. `SWITCHBOARD_CONFIG` env var
/// 2. `~/.switchboard/config.json`
///
/// A missing discovered file yields an empty registry.
pub fn load_registry(config_override: Option<&str>) -> anyhow::Result<ProviderRegistry> {
    let config = load_config(config_override.map(Path::new))
        .with_context(|| match config_override {
            Some(path) => format!("failed to load config from {path}"),
            None => "failed to load config".to_string(),
        })?;
    Ok(ProviderRegistry::from_config(config))
}
