//! CLI error type.

use std::fmt;

use gridclaim::config::ConfigError;
use gridclaim::coord::CoordError;
use gridclaim::grid::GridError;
use gridclaim::resolver::ResolutionError;
use gridclaim::session::SessionError;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded, saved or applied.
    Config(String),
    /// Invalid coordinate or viewport argument.
    Argument(String),
    /// Address resolution failed.
    Resolution(String),
    /// Session failed to start or stopped early.
    Session(String),
    /// Replay track could not be read or parsed.
    Track(String),
    /// Output could not be written.
    Output(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Argument(_) => 2,
            CliError::Config(_) => 3,
            CliError::Resolution(_) => 4,
            CliError::Session(_) => 5,
            CliError::Track(_) => 6,
            CliError::Output(_) => 7,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Argument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Resolution(msg) => write!(f, "Resolution failed: {}", msg),
            CliError::Session(msg) => write!(f, "Session error: {}", msg),
            CliError::Track(msg) => write!(f, "Track error: {}", msg),
            CliError::Output(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::Argument(e.to_string())
    }
}

impl From<GridError> for CliError {
    fn from(e: GridError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ResolutionError> for CliError {
    fn from(e: ResolutionError) -> Self {
        CliError::Resolution(e.to_string())
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            CliError::Argument(String::new()),
            CliError::Config(String::new()),
            CliError::Resolution(String::new()),
            CliError::Session(String::new()),
            CliError::Track(String::new()),
            CliError::Output(String::new()),
        ];
        let mut codes: Vec<i32> = errors.iter().map(CliError::exit_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_conversion_keeps_message() {
        let err: CliError = ResolutionError::UnknownCell("a.b.c".to_string()).into();
        assert!(err.to_string().contains("a.b.c"));
        assert_eq!(err.exit_code(), 4);
    }
}
