//! Execution control
//!
//! Orchestrates one grading attempt: compile, mutate, bounded run, check.

pub mod pipeline;
pub mod runner;

pub use pipeline::{DemoReport, ExecutionPipeline};
pub use runner::{run_worlds, RunReport};
