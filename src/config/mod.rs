//! Configuration and shared types
//!
//! Error taxonomy, crate-wide `Result`, and the execution budget.

pub mod types;
