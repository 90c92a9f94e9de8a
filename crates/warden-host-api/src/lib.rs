//! Host collaborator interfaces for warden
//!
//! This crate defines the seams between the policy core and the platform:
//! - `AppCatalog`: which application identifiers exist on this machine
//! - `Enforcer`: the sink for block/unblock decisions
//!
//! It contains no platform code itself; see `warden-host-linux`.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
