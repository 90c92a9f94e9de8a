//! Error types for warden

use thiserror::Error;

/// Coarse error type shared across warden crates.
///
/// Component crates define their own precise errors; this one is what they
/// collapse into when crossing into the daemon or the wire protocol.
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    #[error("Policy corrupt: {0}")]
    PolicyCorrupt(String),

    #[error("Invalid distraction: {0}")]
    InvalidDistraction(String),

    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Host error: {0}")]
    HostError(String),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    pub fn invalid_distraction(msg: impl Into<String>) -> Self {
        Self::InvalidDistraction(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::HostError(msg.into())
    }

    pub fn ipc(msg: impl Into<String>) -> Self {
        Self::IpcError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<crate::TimeSpecError> for WardenError {
    fn from(e: crate::TimeSpecError) -> Self {
        Self::InvalidTimeFormat(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WardenError>;
