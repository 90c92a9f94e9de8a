//! Core policy logic for wardend
//!
//! This crate is the heart of wardend, containing:
//! - Shield guard (which patch fields a caller may apply)
//! - Match evaluator (is a name blocked right now)
//! - Policy engine tying validator, guard and store together
//! - Decision tracking for enforcement

mod engine;
mod evaluator;
mod shield;
mod tracker;

pub use engine::*;
pub use evaluator::*;
pub use shield::*;
pub use tracker::*;
