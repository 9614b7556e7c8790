//! Error types for Robot API calls.
//!
//! Variants split into two classes: transport failures (the request never
//! produced a usable answer) and domain failures (the API answered and refused).

use thiserror::Error;

/// Primary error type for Robot API operations.
#[derive(Debug, Error)]
pub enum RobotError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    Build {
        /// Underlying client builder error.
        source: reqwest::Error,
    },
    /// A request path could not be joined onto the base URL.
    #[error("invalid request URL for {path}")]
    InvalidUrl {
        /// Request path that failed to resolve.
        path: String,
        /// URL parse error.
        source: url::ParseError,
    },
    /// The request did not complete (connect, TLS, timeout, body read).
    #[error("request to {path} failed")]
    Transport {
        /// Request path.
        path: String,
        /// Underlying transport error.
        source: reqwest::Error,
    },
    /// Credentials were rejected.
    #[error("Robot API rejected the configured credentials")]
    Unauthorized,
    /// The API answered with a server-side failure or throttled the caller.
    #[error("Robot API unavailable (status {status}): {message}")]
    Unavailable {
        /// HTTP status code.
        status: u16,
        /// Message reported by the API.
        message: String,
    },
    /// The response body did not match the expected schema.
    #[error("unexpected response from {path}")]
    Decode {
        /// Request path.
        path: String,
        /// JSON decoding error.
        source: serde_json::Error,
    },
    /// The addressed resource does not exist.
    #[error("{message}")]
    NotFound {
        /// Machine-readable error code (for example `SERVER_NOT_FOUND`).
        code: String,
        /// Message reported by the API.
        message: String,
    },
    /// The request carried invalid or missing parameters.
    #[error("{message}")]
    InvalidInput {
        /// Machine-readable error code.
        code: String,
        /// Message reported by the API.
        message: String,
        /// Names of the parameters the API rejected.
        invalid: Vec<String>,
    },
    /// The requested transition conflicts with the resource's current state.
    #[error("{message}")]
    Conflict {
        /// Machine-readable error code.
        code: String,
        /// Message reported by the API.
        message: String,
    },
    /// Any other refusal.
    #[error("{message} (status {status})")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Machine-readable error code.
        code: String,
        /// Message reported by the API.
        message: String,
    },
}

/// Convenience alias for Robot API results.
pub type RobotResult<T> = Result<T, RobotError>;

impl RobotError {
    /// Build a not-found error with the given code.
    #[must_use]
    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    /// `true` when the failure happened before the API could answer the request.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Build { .. }
                | Self::InvalidUrl { .. }
                | Self::Transport { .. }
                | Self::Unauthorized
                | Self::Unavailable { .. }
                | Self::Decode { .. }
        )
    }

    /// `true` when the addressed server, IP or account does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// `true` when the API refused one of the supplied SSH key fingerprints.
    #[must_use]
    pub fn is_unknown_key(&self) -> bool {
        match self {
            Self::InvalidInput { invalid, .. } => invalid
                .iter()
                .any(|field| field.starts_with("authorized_key")),
            Self::NotFound { code, .. } => code == "KEY_NOT_FOUND",
            _ => false,
        }
    }
}
