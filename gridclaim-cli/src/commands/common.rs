//! Common types and utilities shared across CLI commands.

use std::fs;
use std::path::Path;

use clap::ValueEnum;
use gridclaim::config::ResolverProvider;
use gridclaim::map::{feature_collection, RecordingSurface};

use crate::error::CliError;

/// Resolver selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ProviderType {
    /// Offline synthetic addresses (no API key required)
    Local,
    /// what3words API (requires api_key in config.ini)
    What3words,
}

impl From<ProviderType> for ResolverProvider {
    fn from(provider: ProviderType) -> Self {
        match provider {
            ProviderType::Local => ResolverProvider::Local,
            ProviderType::What3words => ResolverProvider::What3Words,
        }
    }
}

/// Write the surface's layers as GeoJSON to `path`, or stdout for `-`.
pub fn write_geojson(surface: &RecordingSurface, path: &Path) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(&feature_collection(&surface.layers()))
        .map_err(|e| CliError::Output(e.to_string()))?;
    if path.as_os_str() == "-" {
        println!("{}", json);
        return Ok(());
    }
    fs::write(path, json).map_err(|e| CliError::Output(format!("{}: {}", path.display(), e)))?;
    println!("GeoJSON written to {}", path.display());
    Ok(())
}
