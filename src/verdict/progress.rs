//! Attempt result record.

use crate::lang::Language;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Grading outcome taxonomy. Closed set: every attempt finalizes into
/// exactly one of the non-Pending states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Attempt still executing, no verdict yet.
    #[serde(rename = "pending")]
    Pending,
    /// Every Current world reached its Answer state.
    #[serde(rename = "pass")]
    Pass,
    /// At least one Current world deviates from its Answer state.
    #[serde(rename = "fail")]
    Fail,
    /// The learner's source was rejected by the language back-end.
    #[serde(rename = "compile_error")]
    CompileError,
    /// An entity faulted or panicked during the run.
    #[serde(rename = "runtime_error")]
    RuntimeError,
    /// The run outlived its wall budget and was abandoned.
    #[serde(rename = "timeout")]
    Timeout,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Outcome::Pending => "pending",
            Outcome::Pass => "pass",
            Outcome::Fail => "fail",
            Outcome::CompileError => "compile_error",
            Outcome::RuntimeError => "runtime_error",
            Outcome::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// Result of one grading attempt.
///
/// Built fresh per attempt (never mutated across attempts) and replaced
/// wholesale on the exercise when the attempt finalizes. `passed_tests`
/// over `total_tests` is the partial-credit ratio: one test per world
/// comparison.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionProgress {
    pub attempt_id: Uuid,
    pub language: Language,
    pub outcome: Outcome,
    pub total_tests: u32,
    pub passed_tests: u32,
    /// Accumulated learner-visible diagnostics: compile output, runtime
    /// faults, timeout notes, or world diffs.
    pub execution_error: String,
    /// Index of the matched known wrong implementation, if any.
    pub common_error_id: Option<usize>,
    /// Tailored explanation for the matched wrong implementation.
    pub common_error_text: Option<String>,
    pub wall_time_ms: u64,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl ExecutionProgress {
    /// Fresh record for an attempt that is about to run.
    pub fn pending(language: Language) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            language,
            outcome: Outcome::Pending,
            total_tests: 0,
            passed_tests: 0,
            execution_error: String::new(),
            common_error_id: None,
            common_error_text: None,
            wall_time_ms: 0,
            finalized_at: None,
        }
    }

    pub(crate) fn record_compile_error(&mut self, diagnostics: impl Into<String>) {
        self.outcome = Outcome::CompileError;
        self.execution_error = diagnostics.into();
    }

    pub(crate) fn record_runtime_fault(&mut self, diagnostics: &str) {
        self.outcome = Outcome::RuntimeError;
        self.append_error(diagnostics);
    }

    pub(crate) fn record_timeout(&mut self, diagnostics: &str) {
        self.outcome = Outcome::Timeout;
        self.append_error(diagnostics);
    }

    pub(crate) fn append_error(&mut self, text: &str) {
        if !self.execution_error.is_empty() && !self.execution_error.ends_with('\n') {
            self.execution_error.push('\n');
        }
        self.execution_error.push_str(text);
    }

    pub(crate) fn mark_finalized(&mut self, wall_time_ms: u64) {
        self.wall_time_ms = wall_time_ms;
        self.finalized_at = Some(Utc::now());
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized_at.is_some()
    }

    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_record_starts_clean() {
        let progress = ExecutionProgress::pending(Language::new("java"));
        assert_eq!(progress.outcome, Outcome::Pending);
        assert_eq!(progress.total_tests, 0);
        assert_eq!(progress.passed_tests, 0);
        assert!(progress.execution_error.is_empty());
        assert!(progress.common_error_id.is_none());
        assert!(!progress.is_finalized());
    }

    #[test]
    fn attempt_ids_are_unique() {
        let a = ExecutionProgress::pending(Language::new("java"));
        let b = ExecutionProgress::pending(Language::new("java"));
        assert_ne!(a.attempt_id, b.attempt_id);
    }

    #[test]
    fn compile_error_replaces_diagnostics() {
        let mut progress = ExecutionProgress::pending(Language::new("java"));
        progress.record_compile_error("missing ; at line 3");
        assert_eq!(progress.outcome, Outcome::CompileError);
        assert_eq!(progress.execution_error, "missing ; at line 3");
    }

    #[test]
    fn append_error_inserts_line_breaks() {
        let mut progress = ExecutionProgress::pending(Language::new("java"));
        progress.append_error("first");
        progress.append_error("second");
        assert_eq!(progress.execution_error, "first\nsecond");
    }

    #[test]
    fn finalize_stamps_the_record() {
        let mut progress = ExecutionProgress::pending(Language::new("java"));
        progress.outcome = Outcome::Pass;
        progress.mark_finalized(120);
        assert!(progress.is_finalized());
        assert!(progress.passed());
        assert_eq!(progress.wall_time_ms, 120);
    }

    #[test]
    fn outcome_wire_names_are_stable() {
        let json = serde_json::to_string(&Outcome::CompileError).unwrap();
        assert_eq!(json, "\"compile_error\"");
        let back: Outcome = serde_json::from_str("\"timeout\"").unwrap();
        assert_eq!(back, Outcome::Timeout);
    }
}
