//! Error types for the connector abstraction.

use thiserror::Error;

/// Errors a [`crate::Connector`] call can fail with.
#[derive(Debug, Error, Clone)]
pub enum ConnectorError {
    /// The call was rejected locally by the rate limiter before it reached
    /// the remote service.
    #[error("rate limited")]
    RateLimited,

    /// The call was rejected locally because the circuit breaker for this
    /// connector is open.
    #[error("circuit open")]
    CircuitOpen,

    /// The remote service returned an error.
    #[error("remote error ({status}): {message}")]
    Remote {
        /// Transport-level status code, if applicable (e.g. HTTP status).
        status: u16,
        /// Human-readable error detail.
        message: String,
    },

    /// The call timed out.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// The connector has no handler for the requested action type.
    #[error("unsupported action: {0}")]
    Unsupported(String),

    /// The request or response payload failed validation.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl ConnectorError {
    /// Whether a retry policy should consider this error retryable.
    ///
    /// Rate limiting and circuit-open are deliberately excluded: retrying
    /// immediately would defeat the point of both guards.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConnectorError::Remote { status, .. } if *status >= 500
        ) || matches!(self, ConnectorError::Timeout(_))
    }
}
