//! Verdict classification
//!
//! Grading outcomes as pure functions over finished world state: world
//! comparison, common-error recognition, and the attempt result record.

pub mod classifier;
pub mod explain;
pub mod progress;

pub use classifier::OutcomeClassifier;
pub use explain::{ErrorTextStore, MissingText, NoExplanations, StaticExplanations};
pub use progress::{ExecutionProgress, Outcome};
