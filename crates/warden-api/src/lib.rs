//! Protocol types for warden
//!
//! This crate defines the data shared between every warden component:
//! - The persisted policy document (blocklist, whitelist, shield)
//! - Commands (requests from clients)
//! - Responses
//! - Events (daemon -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
