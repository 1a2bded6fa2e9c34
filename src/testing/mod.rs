//! Testing infrastructure
//!
//! Deterministic fixture worlds and scripted adapters for driving the
//! engine without a real language back-end.

pub mod fixtures;

// Re-export commonly used items
pub use fixtures::*;
