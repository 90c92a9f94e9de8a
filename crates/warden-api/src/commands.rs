//! Command types for the wardend protocol

use serde::{Deserialize, Serialize};
use warden_util::ClientId;

use crate::{DistractionEntry, PolicyView, RejectedField, API_VERSION};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidDistraction,
    PolicyNotFound,
    PolicyCorrupt,
    RateLimited,
    StoreError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Add an app or domain to the blocklist
    Block {
        name: String,
        /// Duration (`30m`) or daily interval (`9h-17h`)
        #[serde(default)]
        time: Option<String>,
    },

    /// Remove an app or domain from the blocklist
    Unblock {
        name: String,
        #[serde(default)]
        password: Option<String>,
    },

    /// Add an exception to the whitelist
    Allow {
        name: String,
        #[serde(default)]
        password: Option<String>,
    },

    /// Remove an exception from the whitelist
    Disallow { name: String },

    /// Evaluate a name against the current policy
    IsBlocked { name: String },

    /// Get the current policy (without the password hash)
    GetPolicy,

    /// Turn shield mode on, setting the password if none is set yet
    EnableShield { password: String },

    /// Turn shield mode off
    DisableShield { password: String },

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    /// A mutation went through; `rejected` lists what the shield refused
    PolicyUpdated {
        policy: PolicyView,
        #[serde(default)]
        rejected: Vec<RejectedField>,
    },
    Blocked {
        entry: DistractionEntry,
    },
    Decision {
        name: String,
        blocked: bool,
    },
    Policy(PolicyView),
    Subscribed {
        client_id: ClientId,
    },
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    /// Unix UID if available
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}
