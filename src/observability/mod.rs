//! Observability
//!
//! Structured attempt events for operational visibility.

pub mod events;
