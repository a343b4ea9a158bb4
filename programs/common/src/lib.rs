//! Shared types for the prize vault workspace
//!
//! Fixed-point amounts, identifiers and the error taxonomy used by the engine
//! and the keeper.

pub mod error;
pub mod math;
pub mod types;

pub use error::*;
pub use math::*;
pub use types::*;
