//! Pool operations, one file per concern
//!
//! Each file adds an `impl Pool` block. Every operation validates before it
//! mutates, consults the emergency controller, and syncs with the yield
//! venue where funds or prizes are about to move.

pub mod admin;
pub mod deposit;
pub mod draw;
pub mod withdraw;
pub mod yield_sync;

pub use yield_sync::SyncOutcome;
