//! gradebox: an exercise grading engine over snapshot worlds
//! Compiles learner code against pluggable language back-ends, runs it in
//! bounded execution units, and classifies the outcome against expected
//! world states.
//!
//! # Architecture
//!
//! This crate is organized by grading pipeline stage:
//!
//! ## Worlds ([`world`])
//! - [`world`]: the `World` and `Entity` contracts and cancel token
//! - [`world::snapshot`]: Initial/Current/Answer/Error collections
//! - [`world::registry`]: world-type registry for wire deserialization
//!
//! ## Languages ([`lang`])
//! - [`lang::adapter`]: compile contract and source variants
//! - [`lang::source`]: editable source buffers with templates
//!
//! ## Execution Control ([`exec`])
//! - [`exec::pipeline`]: compile-mutate-run-check attempt driver
//! - [`exec::runner`]: bounded per-world execution units
//!
//! ## Verdict ([`verdict`])
//! - [`verdict::classifier`]: world comparison and common-error matching
//! - [`verdict::progress`]: the attempt result record
//! - [`verdict::explain`]: explanation stores for known wrong solutions
//!
//! ## Exercise ([`exercise`])
//! - [`exercise`]: the aggregate tying worlds, sources, and results
//! - [`exercise::wire`]: persisted wire form
//!
//! ## Observability ([`observability`])
//! - [`observability::events`]: structured attempt events
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: error taxonomy and execution budget
//!
//! ## Testing Infrastructure ([`testing`])
//! - [`testing::fixtures`]: deterministic worlds and scripted adapters
//!
//! # Design Principles
//!
//! 1. **Opaque domain state** - the engine sees worlds only through their contract
//! 2. **Expected failures are values** - compile errors and faults grade, they don't raise
//! 3. **Pristine snapshots** - Initial/Answer/Error are copied, never mutated by grading
//! 4. **Cooperative containment** - units are cancelled and abandoned, never killed
//! 5. **Deterministic verdicts** - index order and first-match-wins, every attempt

// Worlds and entities
pub mod world;

// Language adapters
pub mod lang;

// Execution control
pub mod exec;

// Verdict classification
pub mod verdict;

// Exercise aggregate
pub mod exercise;

// Observability
pub mod observability;

// Configuration and shared types
pub mod config;

// Testing infrastructure
pub mod testing;

// Re-export commonly used types for convenience
pub use config::types::{EngineError, Result, RunLimits};
pub use exec::pipeline::{DemoReport, ExecutionPipeline};
pub use exercise::Exercise;
pub use lang::{
    adapter_for, register_adapter, CompileError, EntityFactory, Language, LanguageAdapter,
    SourceFile, SourceVariant,
};
pub use verdict::explain::{ErrorTextStore, MissingText, NoExplanations, StaticExplanations};
pub use verdict::progress::{ExecutionProgress, Outcome};
pub use world::{
    construct_world, register_world_type, CancelToken, Entity, World, WorldKind, WorldSnapshots,
};
