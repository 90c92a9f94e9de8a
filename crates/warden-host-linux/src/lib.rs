//! Linux host collaborators for warden
//!
//! Provides:
//! - `LinuxCatalog`: running processes from `/proc` and installed apps from
//!   XDG `applications` directories
//! - `TracingEnforcer`: logs block decisions for external enforcers to act on

mod catalog;
mod enforcer;

pub use catalog::*;
pub use enforcer::*;
