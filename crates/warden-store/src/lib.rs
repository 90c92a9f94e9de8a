//! Persistence layer for wardend
//!
//! Provides:
//! - Storage backends for the policy document (JSON file, in-memory)
//! - Load/create of the document
//! - Set-semantics merge of policy patches

mod backend;
mod store;

pub use backend::*;
pub use store::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Policy document not found: {0}")]
    NotFound(String),

    #[error("Policy document is corrupt: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

impl From<StoreError> for warden_util::WardenError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(location) => warden_util::WardenError::PolicyNotFound(location),
            StoreError::Corrupt(msg) => warden_util::WardenError::PolicyCorrupt(msg),
            StoreError::Io(e) => warden_util::WardenError::store(e.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
