//! Core types shared across the grading engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Fatal engine faults.
///
/// Everything here is an authoring or embedding bug, never a learner
/// mistake. Learner-visible failures (compile rejections, runtime faults,
/// timeouts) are carried as values in `ExecutionProgress` instead.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("broken exercise {exercise_id}: {reason}")]
    BrokenExercise { exercise_id: String, reason: String },

    #[error("unknown world type {0:?}: no constructor registered")]
    UnknownWorldType(String),

    #[error("broken world file: {0}")]
    BrokenWorldFile(String),

    #[error("tab name {tab_name:?} contains {forbidden:?}, forbidden for {language}")]
    IllegalTabName {
        tab_name: String,
        language: String,
        forbidden: char,
    },

    #[error("unsupported language: {0}")]
    UnknownLanguage(String),

    #[error("serialization error: {0}")]
    Serial(#[from] serde_json::Error),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Wall-clock budget for the run step of one attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunLimits {
    /// Total wall time the attempt may spend executing entities.
    pub wall_time: Duration,
    /// After cancellation, how long to keep collecting reports from units
    /// that finished right at the deadline before abandoning them.
    pub grace: Duration,
}

impl Default for RunLimits {
    /// Grading default profile:
    /// - 10s wall budget across all worlds of the attempt
    /// - 200ms grace for units racing the deadline
    fn default() -> Self {
        Self {
            wall_time: Duration::from_secs(10),
            grace: Duration::from_millis(200),
        }
    }
}

impl RunLimits {
    /// Budget with a custom wall limit, keeping the default grace.
    pub fn with_wall_time(wall_time: Duration) -> Self {
        Self {
            wall_time,
            ..Self::default()
        }
    }
}
