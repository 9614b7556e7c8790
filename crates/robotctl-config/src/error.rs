//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File system operation failed.
    #[error("failed to {operation} {}", path.display())]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// File the operation targeted.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// A line of the configuration file could not be parsed.
    #[error("{origin}:{line}: {reason}")]
    Parse {
        /// File path or other description of the parsed input.
        origin: String,
        /// One-based line number.
        line: usize,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Section name was empty or contained reserved characters.
    #[error("invalid section name '{section}': {reason}")]
    InvalidSection {
        /// Offending section name.
        section: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Key name was empty, malformed, or contained reserved characters.
    #[error("invalid key '{key}': {reason}")]
    InvalidKey {
        /// Offending key.
        key: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Value contained a line break.
    #[error("invalid value for '{key}': values must fit on one line")]
    InvalidValue {
        /// Key the value was destined for.
        key: String,
    },
    /// One or both login credentials are absent.
    #[error("missing Robot credentials: {}", missing.join(", "))]
    MissingCredentials {
        /// Dotted names of the absent keys.
        missing: Vec<&'static str>,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
