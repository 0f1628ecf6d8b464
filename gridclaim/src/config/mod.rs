//! User configuration (`~/.gridclaim/config.ini`).

mod file;

pub use file::{
    config_directory, config_file_path, default_log_directory, ConfigError, ConfigFile,
    GridSettings, LoggingSettings, PositionSettings, ResolverProvider, ResolverSettings,
};
