//! Grading pipeline: compile, mutate, run, check.

use crate::config::types::{EngineError, Result, RunLimits};
use crate::exec::runner::{self, RunReport};
use crate::exercise::Exercise;
use crate::lang::{CompileError, LanguageAdapter, SourceVariant};
use crate::observability::events;
use crate::verdict::classifier::OutcomeClassifier;
use crate::verdict::explain::ErrorTextStore;
use crate::verdict::progress::{ExecutionProgress, Outcome};
use crate::world::WorldKind;
use std::time::Instant;

/// Faults and flags from running one collection, after the worlds are
/// seated back.
struct CollectionRun {
    faults: Vec<(usize, String)>,
    timed_out: bool,
}

/// Result of a non-grading execution (demo and authoring flows).
///
/// Unlike a graded attempt, nothing here touches counters or the
/// exercise's last result.
#[derive(Debug, Default)]
pub struct DemoReport {
    pub compile_error: Option<CompileError>,
    pub faults: Vec<(usize, String)>,
    pub timed_out: bool,
}

impl DemoReport {
    pub fn succeeded(&self) -> bool {
        self.compile_error.is_none() && self.faults.is_empty() && !self.timed_out
    }
}

/// One attempt driver, bound to a language back-end and an explanation
/// store. Cheap to build per attempt; adapters outlive it.
pub struct ExecutionPipeline<'a> {
    adapter: &'a dyn LanguageAdapter,
    explanations: &'a dyn ErrorTextStore,
    locale: String,
    limits: RunLimits,
}

impl<'a> ExecutionPipeline<'a> {
    pub fn new(adapter: &'a dyn LanguageAdapter, explanations: &'a dyn ErrorTextStore) -> Self {
        Self {
            adapter,
            explanations,
            locale: "en".to_string(),
            limits: RunLimits::default(),
        }
    }

    /// Human-language locale for explanation lookup.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Grade the learner's buffer: reset Current, compile the Student
    /// variant, mutate, run bounded, classify. The finalized record is
    /// stored on the exercise and returned.
    pub fn run(&self, exercise: &mut Exercise) -> Result<ExecutionProgress> {
        let started = Instant::now();
        let mut progress = ExecutionProgress::pending(self.adapter.language());
        events::attempt_started(&progress.attempt_id, exercise.id(), &progress.language);

        exercise.worlds_mut().reset();

        match self.compile_and_mutate(exercise, WorldKind::Current, SourceVariant::Student)? {
            Some(rejection) => {
                events::compile_rejected(&progress.attempt_id, exercise.id(), &progress.language);
                progress.record_compile_error(rejection.diagnostics);
            }
            None => {
                events::units_launched(
                    &progress.attempt_id,
                    exercise.id(),
                    &progress.language,
                    exercise.world_count(),
                );
                let run = self.run_collection(exercise, WorldKind::Current)?;
                self.settle_run(&mut progress, exercise, WorldKind::Current, &run)?;
                if progress.outcome == Outcome::Pending {
                    OutcomeClassifier::classify(
                        &mut progress,
                        exercise.worlds(),
                        self.explanations,
                        exercise.id(),
                        &self.locale,
                    )?;
                }
            }
        }

        progress.mark_finalized(started.elapsed().as_millis() as u64);
        events::attempt_finalized(
            &progress.attempt_id,
            exercise.id(),
            &progress.language,
            progress.outcome,
        );
        exercise.set_last_result(progress.clone());
        Ok(progress)
    }

    /// Execute the reference solution against the Answer collection.
    /// Used to compute expected final states after setup, and to show
    /// the solution running. Grading state is left alone.
    pub fn run_demo(&self, exercise: &mut Exercise) -> Result<DemoReport> {
        self.run_variant(exercise, WorldKind::Answer, SourceVariant::Correction)
    }

    /// Execute the j-th known wrong implementation against its Error
    /// collection, producing the states common-error matching compares
    /// against.
    pub fn run_known_bug(&self, exercise: &mut Exercise, bug: usize) -> Result<DemoReport> {
        self.run_variant(exercise, WorldKind::Error(bug), SourceVariant::KnownBug(bug))
    }

    fn run_variant(
        &self,
        exercise: &mut Exercise,
        kind: WorldKind,
        variant: SourceVariant,
    ) -> Result<DemoReport> {
        log::debug!(
            "running {variant} sources against {kind} worlds of {:?}",
            exercise.id()
        );
        if let Some(rejection) = self.compile_and_mutate(exercise, kind, variant)? {
            log::warn!(
                "{variant} sources of {:?} failed to compile: {rejection}",
                exercise.id()
            );
            return Ok(DemoReport {
                compile_error: Some(rejection),
                ..DemoReport::default()
            });
        }
        let run = self.run_collection(exercise, kind)?;
        if run.timed_out {
            log::warn!("{variant} run of {:?} hit the wall budget", exercise.id());
        }
        Ok(DemoReport {
            compile_error: None,
            faults: run.faults,
            timed_out: run.timed_out,
        })
    }

    /// Compile one source variant and replace every target world's
    /// entities with freshly built ones. Compile rejections come back as
    /// a value; a broken exercise or an illegal tab name is fatal.
    fn compile_and_mutate(
        &self,
        exercise: &mut Exercise,
        kind: WorldKind,
        variant: SourceVariant,
    ) -> Result<Option<CompileError>> {
        let factory = match self.adapter.compile(exercise, variant) {
            Ok(factory) => factory,
            Err(rejection) => return Ok(Some(rejection)),
        };

        for forbidden in self.adapter.forbidden_tab_chars() {
            if exercise.tab_name().contains(*forbidden) {
                return Err(EngineError::IllegalTabName {
                    tab_name: exercise.tab_name().to_string(),
                    language: self.adapter.language().as_str().to_string(),
                    forbidden: *forbidden,
                });
            }
        }

        let exercise_id = exercise.id().to_string();
        for (index, world) in exercise.worlds_mut().worlds_mut(kind)?.iter_mut().enumerate() {
            if world.entity_count() == 0 {
                return Err(EngineError::BrokenExercise {
                    exercise_id: exercise_id.clone(),
                    reason: format!("{kind} world {index} has no entities to replace"),
                });
            }
            match factory.entities_for(world.as_ref()) {
                Ok(entities) => world.set_entities(entities),
                Err(rejection) => return Ok(Some(rejection)),
            }
        }
        Ok(None)
    }

    /// Run one collection under the wall budget and seat the worlds
    /// back, refilling abandoned seats from Initial.
    fn run_collection(&self, exercise: &mut Exercise, kind: WorldKind) -> Result<CollectionRun> {
        let worlds = exercise.worlds_mut().take(kind)?;
        let RunReport {
            seats,
            faults,
            timed_out,
            wall_time_ms,
        } = runner::run_worlds(worlds, &self.limits);
        exercise.worlds_mut().seat(kind, seats)?;
        log::debug!(
            "{kind} run of {:?} finished in {wall_time_ms}ms ({} fault(s), timed_out={timed_out})",
            exercise.id(),
            faults.len()
        );
        Ok(CollectionRun { faults, timed_out })
    }

    /// Fold run faults and timeout into the attempt record. Timeout
    /// outranks runtime faults; fault texts are kept either way.
    fn settle_run(
        &self,
        progress: &mut ExecutionProgress,
        exercise: &Exercise,
        kind: WorldKind,
        run: &CollectionRun,
    ) -> Result<()> {
        for (index, message) in &run.faults {
            let name = exercise.worlds().world(kind, *index)?.name().to_string();
            progress.record_runtime_fault(&format!(
                "Execution failed in world '{name}':\n{message}"
            ));
        }
        if run.timed_out {
            events::unit_timeout(&progress.attempt_id, exercise.id(), &progress.language);
            progress.record_timeout(&format!(
                "Execution did not finish within {}ms; the run was abandoned",
                self.limits.wall_time.as_millis()
            ));
        }
        Ok(())
    }
}
