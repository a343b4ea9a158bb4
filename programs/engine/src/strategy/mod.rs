//! Pure yield and prize policies

pub mod distribution;
pub mod prize;
pub mod selection;

pub use distribution::*;
pub use prize::*;
pub use selection::*;
