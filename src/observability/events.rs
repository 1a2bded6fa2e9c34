//! Structured grading-attempt events.
//!
//! One JSON line per event, routed through `log` under the
//! `gradebox::attempt` target so embedders pick the sink. Correlation is
//! by attempt id; every event of one attempt carries the same one.

use crate::lang::Language;
use crate::verdict::progress::Outcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Lifecycle phase of a grading attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    Started,
    CompileRejected,
    UnitsLaunched,
    UnitTimeout,
    Finalized,
}

/// One structured attempt event.
#[derive(Clone, Debug, Serialize)]
pub struct AttemptEvent<'a> {
    pub attempt_id: &'a Uuid,
    pub exercise_id: &'a str,
    pub language: &'a str,
    pub phase: AttemptPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl<'a> AttemptEvent<'a> {
    fn new(
        attempt_id: &'a Uuid,
        exercise_id: &'a str,
        language: &'a Language,
        phase: AttemptPhase,
    ) -> Self {
        Self {
            attempt_id,
            exercise_id,
            language: language.as_str(),
            phase,
            outcome: None,
            detail: None,
            at: Utc::now(),
        }
    }

    fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Serialize and emit one event.
pub fn emit(event: &AttemptEvent<'_>) {
    match serde_json::to_string(event) {
        Ok(line) => log::info!(target: "gradebox::attempt", "{line}"),
        Err(e) => log::warn!("failed to serialize attempt event: {e}"),
    }
}

pub fn attempt_started(attempt_id: &Uuid, exercise_id: &str, language: &Language) {
    emit(&AttemptEvent::new(
        attempt_id,
        exercise_id,
        language,
        AttemptPhase::Started,
    ));
}

pub fn compile_rejected(attempt_id: &Uuid, exercise_id: &str, language: &Language) {
    emit(&AttemptEvent::new(
        attempt_id,
        exercise_id,
        language,
        AttemptPhase::CompileRejected,
    ));
}

pub fn units_launched(attempt_id: &Uuid, exercise_id: &str, language: &Language, units: usize) {
    emit(
        &AttemptEvent::new(attempt_id, exercise_id, language, AttemptPhase::UnitsLaunched)
            .with_detail(format!("{units} world(s)")),
    );
}

pub fn unit_timeout(attempt_id: &Uuid, exercise_id: &str, language: &Language) {
    emit(&AttemptEvent::new(
        attempt_id,
        exercise_id,
        language,
        AttemptPhase::UnitTimeout,
    ));
}

pub fn attempt_finalized(
    attempt_id: &Uuid,
    exercise_id: &str,
    language: &Language,
    outcome: Outcome,
) {
    emit(
        &AttemptEvent::new(attempt_id, exercise_id, language, AttemptPhase::Finalized)
            .with_outcome(outcome),
    );
}
