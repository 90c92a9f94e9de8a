//! IPC layer for wardend
//!
//! Requests and responses travel as newline-delimited JSON over a Unix
//! domain socket. Only the daemon's own user and root may connect.

mod client;
mod server;

pub use client::*;
pub use server::*;

use thiserror::Error;
use warden_api::ErrorCode;

/// IPC errors
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Response to request {got}, expected {expected}")]
    UnexpectedResponse { expected: u64, got: u64 },

    /// The daemon answered with an error
    #[error("{code:?}: {message}")]
    Remote { code: ErrorCode, message: String },
}

pub type IpcResult<T> = Result<T, IpcError>;
