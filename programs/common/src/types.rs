//! Identifier and time aliases

/// Unix timestamp in seconds
pub type Timestamp = u64;

/// Registry-assigned pool identifier
pub type PoolId = u64;

/// Stable per-position identifier, independent of the wallet that owns it
pub type ReceiverId = u64;

/// Sequential round number within a pool (first round is 1)
pub type RoundId = u64;

/// Time-weighted balance: raw [`crate::UFix64`] units multiplied by seconds held.
///
/// Kept in integer units so per-receiver weights sum exactly to the pool weight.
pub type Weight = u128;
