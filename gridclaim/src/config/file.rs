//! INI configuration file.
//!
//! ```ini
//! [grid]
//! cell_size_m = 3
//! max_cells = 2500
//! settle_delay_ms = 120
//!
//! [position]
//! high_accuracy = true
//! movement_threshold_m = 0
//!
//! [resolver]
//! provider = local
//! api_key =
//! language = en
//! cache_capacity = 4096
//!
//! [logging]
//! directory = ~/.gridclaim/logs
//! debug = false
//! ```
//!
//! Missing keys fall back to defaults; present keys must parse.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use crate::grid::{
    GridRendererConfig, DEFAULT_CELL_SIZE_M, DEFAULT_MAX_CELLS, DEFAULT_SETTLE_DELAY,
    MAX_CELL_SIZE_M, MIN_CELL_SIZE_M,
};
use crate::position::{ReconcilerConfig, WatchOptions};
use crate::resolver::DEFAULT_CACHE_CAPACITY;
use crate::session::SessionConfig;

/// Name of the per-user configuration directory.
const CONFIG_DIR_NAME: &str = ".gridclaim";

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.ini";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("[{section}] {key} is required")]
    MissingValue {
        section: &'static str,
        key: &'static str,
    },
}

/// `~/.gridclaim`, or `./.gridclaim` if the home directory is unknown.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// `~/.gridclaim/config.ini`.
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// `~/.gridclaim/logs`.
pub fn default_log_directory() -> PathBuf {
    config_directory().join("logs")
}

/// Which address resolver to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolverProvider {
    #[default]
    Local,
    What3Words,
}

impl FromStr for ResolverProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(ResolverProvider::Local),
            "what3words" | "w3w" => Ok(ResolverProvider::What3Words),
            other => Err(format!("unknown provider '{}' (expected local or what3words)", other)),
        }
    }
}

impl fmt::Display for ResolverProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverProvider::Local => f.write_str("local"),
            ResolverProvider::What3Words => f.write_str("what3words"),
        }
    }
}

/// `[grid]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSettings {
    pub cell_size_m: f64,
    pub max_cells: u64,
    pub settle_delay_ms: u64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            cell_size_m: DEFAULT_CELL_SIZE_M,
            max_cells: DEFAULT_MAX_CELLS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
        }
    }
}

/// `[position]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSettings {
    pub high_accuracy: bool,
    pub movement_threshold_m: f64,
}

impl Default for PositionSettings {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            movement_threshold_m: 0.0,
        }
    }
}

/// `[resolver]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSettings {
    pub provider: ResolverProvider,
    pub api_key: Option<String>,
    pub language: String,
    pub cache_capacity: u64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            provider: ResolverProvider::Local,
            api_key: None,
            language: "en".to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ResolverSettings {
    /// API key, required for the what3words provider.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingValue {
                section: "resolver",
                key: "api_key",
            })
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub debug: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            debug: false,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub grid: GridSettings,
    pub position: PositionSettings,
    pub resolver: ResolverSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default path; defaults if the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`; defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(grid) = ini.section(Some("grid")) {
            if let Some(v) = grid.get("cell_size_m") {
                let size: f64 = parse_value("grid", "cell_size_m", v)?;
                if !(MIN_CELL_SIZE_M..=MAX_CELL_SIZE_M).contains(&size) {
                    return Err(invalid(
                        "grid",
                        "cell_size_m",
                        v,
                        format!("must be between {} and {}", MIN_CELL_SIZE_M, MAX_CELL_SIZE_M),
                    ));
                }
                config.grid.cell_size_m = size;
            }
            if let Some(v) = grid.get("max_cells") {
                config.grid.max_cells = parse_value("grid", "max_cells", v)?;
            }
            if let Some(v) = grid.get("settle_delay_ms") {
                config.grid.settle_delay_ms = parse_value("grid", "settle_delay_ms", v)?;
            }
        }

        if let Some(position) = ini.section(Some("position")) {
            if let Some(v) = position.get("high_accuracy") {
                config.position.high_accuracy = parse_bool("position", "high_accuracy", v)?;
            }
            if let Some(v) = position.get("movement_threshold_m") {
                let threshold: f64 = parse_value("position", "movement_threshold_m", v)?;
                if !threshold.is_finite() || threshold < 0.0 {
                    return Err(invalid(
                        "position",
                        "movement_threshold_m",
                        v,
                        "must be zero or positive".to_string(),
                    ));
                }
                config.position.movement_threshold_m = threshold;
            }
        }

        if let Some(resolver) = ini.section(Some("resolver")) {
            if let Some(v) = resolver.get("provider") {
                config.resolver.provider = v
                    .parse()
                    .map_err(|reason| invalid("resolver", "provider", v, reason))?;
            }
            if let Some(v) = resolver.get("api_key") {
                let key = v.trim();
                config.resolver.api_key = (!key.is_empty()).then(|| key.to_string());
            }
            if let Some(v) = resolver.get("language") {
                config.resolver.language = v.trim().to_string();
            }
            if let Some(v) = resolver.get("cache_capacity") {
                config.resolver.cache_capacity = parse_value("resolver", "cache_capacity", v)?;
            }
        }

        if let Some(logging) = ini.section(Some("logging")) {
            if let Some(v) = logging.get("directory") {
                config.logging.directory = expand_tilde(v.trim());
            }
            if let Some(v) = logging.get("debug") {
                config.logging.debug = parse_bool("logging", "debug", v)?;
            }
        }

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("grid"))
            .set("cell_size_m", self.grid.cell_size_m.to_string())
            .set("max_cells", self.grid.max_cells.to_string())
            .set("settle_delay_ms", self.grid.settle_delay_ms.to_string());
        ini.with_section(Some("position"))
            .set("high_accuracy", self.position.high_accuracy.to_string())
            .set("movement_threshold_m", self.position.movement_threshold_m.to_string());
        ini.with_section(Some("resolver"))
            .set("provider", self.resolver.provider.to_string())
            .set("api_key", self.resolver.api_key.clone().unwrap_or_default())
            .set("language", self.resolver.language.clone())
            .set("cache_capacity", self.resolver.cache_capacity.to_string());
        ini.with_section(Some("logging"))
            .set("directory", self.logging.directory.display().to_string())
            .set("debug", self.logging.debug.to_string());
        ini
    }

    /// Save to the default path, creating the directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }

    /// Session settings derived from this file.
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            cell_size_m: self.grid.cell_size_m,
            renderer: GridRendererConfig {
                settle_delay: Duration::from_millis(self.grid.settle_delay_ms),
                max_cells: self.grid.max_cells,
            },
            reconciler: ReconcilerConfig::with_movement_threshold(
                self.position.movement_threshold_m,
            ),
            watch: WatchOptions {
                high_accuracy: self.position.high_accuracy,
            },
        }
    }
}

fn invalid(section: &'static str, key: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        section,
        key,
        value: value.to_string(),
        reason,
    }
}

fn parse_value<T>(section: &'static str, key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(section, key, value, e.to_string()))
}

fn parse_bool(section: &'static str, key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "expected true or false".to_string())),
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
