//! Prize-linked savings vault engine
//!
//! A [`Pool`] holds depositor shares in a yield venue, splits realized yield
//! into rewards, prize and protocol fee, and runs a resumable draw state
//! machine that pays the prize to balance-weighted random winners.

pub mod events;
pub mod instructions;
pub mod interfaces;
pub mod invariants;
pub mod mocks;
pub mod registry;
pub mod state;
pub mod strategy;

pub use events::*;
pub use interfaces::*;
pub use mocks::*;
pub use registry::*;
pub use state::*;
pub use strategy::*;
pub use instructions::SyncOutcome;

pub use prizevault_common::*;
