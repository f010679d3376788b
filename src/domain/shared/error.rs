//! Domain errors

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// Call status polling query failed (network or remote error).
    /// Never fatal: the poller logs and swallows these.
    #[error("Status query failed: {0}")]
    StatusQuery(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("Request rejected by server: {0}")]
    Rejected(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("State store error: {0}")]
    StateStore(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}
