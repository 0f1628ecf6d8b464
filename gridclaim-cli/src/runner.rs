//! Shared command setup: configuration, logging and resolver construction.

use std::sync::Arc;

use gridclaim::config::{ConfigFile, ResolverProvider, ResolverSettings};
use gridclaim::grid::CellGrid;
use gridclaim::logging::{init_logging, WorkerGuard, DEFAULT_LOG_FILE};
use gridclaim::resolver::{
    CachedResolver, CellAddressResolver, LocalResolver, ReqwestClient, What3WordsConfig,
    What3WordsResolver,
};
use tracing::info;

use crate::error::CliError;

/// Loaded configuration plus the logging guard for one command run.
pub struct CliRunner {
    config: ConfigFile,
    _log_guard: Option<WorkerGuard>,
}

impl CliRunner {
    /// Load the config file and start file logging.
    ///
    /// Logging failures are reported but do not stop the command.
    pub fn new(debug: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let guard = match init_logging(
            &config.logging.directory,
            DEFAULT_LOG_FILE,
            debug || config.logging.debug,
        ) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Warning: file logging disabled: {}", e);
                None
            }
        };
        Ok(Self {
            config,
            _log_guard: guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log the command being run.
    pub fn log_startup(&self, command: &str) {
        info!(
            version = gridclaim::VERSION,
            command,
            provider = %self.config.resolver.provider,
            "gridclaim starting"
        );
    }

    /// Grid described by the `[grid]` section.
    pub fn grid(&self) -> Result<CellGrid, CliError> {
        Ok(CellGrid::new(self.config.grid.cell_size_m)?)
    }

    /// Resolver described by the `[resolver]` section, with centroid caching.
    pub fn resolver(&self, provider: Option<ResolverProvider>) -> Result<Arc<dyn CellAddressResolver>, CliError> {
        build_resolver(&self.config.resolver, provider, self.grid()?)
    }
}

/// Build a resolver; `provider` overrides the configured one.
pub fn build_resolver(
    settings: &ResolverSettings,
    provider: Option<ResolverProvider>,
    grid: CellGrid,
) -> Result<Arc<dyn CellAddressResolver>, CliError> {
    let inner: Arc<dyn CellAddressResolver> = match provider.unwrap_or(settings.provider) {
        ResolverProvider::Local => Arc::new(LocalResolver::new(grid)),
        ResolverProvider::What3Words => {
            let key = settings.require_api_key()?;
            let client = ReqwestClient::new()?;
            let config = What3WordsConfig::new(key).with_language(settings.language.clone());
            Arc::new(What3WordsResolver::new(client, config))
        }
    };
    Ok(Arc::new(CachedResolver::new(inner, settings.cache_capacity)))
}
