//! Shared utilities for warden
//!
//! This crate provides:
//! - The time resolver (`TimeSpec`: durations and daily intervals)
//! - Wall-clock helpers with mock time support
//! - ID types (ClientId)
//! - Error types
//! - Rate limiting helpers
//! - Default paths for socket, config, and policy files

mod error;
mod ids;
mod paths;
mod rate_limit;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
