//! Snapshot collections: Initial, Current, Answer, and known-bug worlds.

use crate::config::types::{EngineError, Result};
use crate::world::World;

/// Selects which snapshot collection an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldKind {
    /// Pristine templates; the reset source.
    Initial,
    /// Mutable copies the learner's code runs against.
    Current,
    /// Expected final states.
    Answer,
    /// Final states of the j-th known wrong implementation.
    Error(usize),
}

impl std::fmt::Display for WorldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorldKind::Initial => write!(f, "initial"),
            WorldKind::Current => write!(f, "current"),
            WorldKind::Answer => write!(f, "answer"),
            WorldKind::Error(j) => write!(f, "error[{j}]"),
        }
    }
}

/// The parallel world collections of one exercise.
///
/// All collections hold the same number of worlds, index-aligned: world i
/// of Current descends from world i of Initial and is graded against
/// world i of Answer. Initial, Answer, and Error worlds are never mutated
/// by a grading attempt; Current is rebuilt from Initial before each one.
#[derive(Clone)]
pub struct WorldSnapshots {
    exercise_id: String,
    initial: Vec<Box<dyn World>>,
    current: Vec<Box<dyn World>>,
    answer: Vec<Box<dyn World>>,
    errors: Vec<Vec<Box<dyn World>>>,
}

impl WorldSnapshots {
    pub fn new(exercise_id: impl Into<String>) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            initial: Vec::new(),
            current: Vec::new(),
            answer: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Drop all worlds and reserve room for `count` per collection.
    pub fn init_worlds(&mut self, count: usize) {
        self.initial = Vec::with_capacity(count);
        self.current = Vec::with_capacity(count);
        self.answer = Vec::with_capacity(count);
        self.errors.clear();
    }

    /// Populate every collection from template worlds.
    ///
    /// Each template is deep-copied once per collection, so no two
    /// collections ever share a world. Rejects an empty template list
    /// and templates without entities: an exercise that cannot host
    /// compiled code is an authoring bug caught here rather than
    /// mid-attempt.
    pub fn setup(
        &mut self,
        templates: &[Box<dyn World>],
        known_bug_count: usize,
    ) -> Result<()> {
        if templates.is_empty() {
            return Err(self.broken("no template worlds".to_string()));
        }
        for (index, template) in templates.iter().enumerate() {
            if template.entity_count() == 0 {
                return Err(self.broken(format!(
                    "template world {index} ({:?}) has no entities",
                    template.name()
                )));
            }
        }
        self.init_worlds(templates.len());
        for template in templates {
            self.initial.push(template.boxed_copy());
            self.current.push(template.boxed_copy());
            self.answer.push(template.boxed_copy());
        }
        for _ in 0..known_bug_count {
            self.errors
                .push(templates.iter().map(|t| t.boxed_copy()).collect());
        }
        Ok(())
    }

    /// Reassemble from already constructed collections (wire path).
    /// Current is derived as fresh copies of Initial.
    pub(crate) fn assemble(
        exercise_id: impl Into<String>,
        initial: Vec<Box<dyn World>>,
        answer: Vec<Box<dyn World>>,
    ) -> Result<Self> {
        let exercise_id = exercise_id.into();
        if initial.is_empty() {
            return Err(EngineError::BrokenWorldFile(format!(
                "exercise {exercise_id} has no worlds"
            )));
        }
        if initial.len() != answer.len() {
            return Err(EngineError::BrokenWorldFile(format!(
                "exercise {exercise_id} has {} initial worlds but {} answer worlds",
                initial.len(),
                answer.len()
            )));
        }
        let current = initial.iter().map(|w| w.boxed_copy()).collect();
        Ok(Self {
            exercise_id,
            initial,
            current,
            answer,
            errors: Vec::new(),
        })
    }

    /// Reset every Current world from its Initial counterpart, in place.
    pub fn reset(&mut self) {
        for (current, initial) in self.current.iter_mut().zip(self.initial.iter()) {
            current.reset_from(initial.as_ref());
        }
    }

    /// Number of worlds per collection.
    pub fn count(&self) -> usize {
        self.initial.len()
    }

    /// Number of known-bug collections.
    pub fn known_bug_count(&self) -> usize {
        self.errors.len()
    }

    pub fn worlds(&self, kind: WorldKind) -> Result<&[Box<dyn World>]> {
        Ok(match kind {
            WorldKind::Initial => &self.initial,
            WorldKind::Current => &self.current,
            WorldKind::Answer => &self.answer,
            WorldKind::Error(j) => self
                .errors
                .get(j)
                .ok_or_else(|| self.missing_bug_collection(j))?,
        })
    }

    pub fn worlds_mut(&mut self, kind: WorldKind) -> Result<&mut [Box<dyn World>]> {
        Ok(self.collection_mut(kind)?.as_mut_slice())
    }

    pub fn world(&self, kind: WorldKind, index: usize) -> Result<&dyn World> {
        let worlds = self.worlds(kind)?;
        worlds
            .get(index)
            .map(|w| w.as_ref())
            .ok_or_else(|| {
                self.broken(format!(
                    "no world {index} in {kind} (collection holds {})",
                    worlds.len()
                ))
            })
    }

    /// Index of the Current world with this name.
    pub fn index_of_current(&self, name: &str) -> Option<usize> {
        self.current.iter().position(|w| w.name() == name)
    }

    /// Take a whole collection out for execution, leaving it empty.
    /// `seat` must follow before the attempt observes the snapshots again.
    pub(crate) fn take(&mut self, kind: WorldKind) -> Result<Vec<Box<dyn World>>> {
        Ok(std::mem::take(self.collection_mut(kind)?))
    }

    /// Put a collection back after execution. Seats abandoned by a timed
    /// out unit (`None`) are refilled with fresh copies of the Initial
    /// world at the same index, so collection sizes stay aligned.
    pub(crate) fn seat(
        &mut self,
        kind: WorldKind,
        seats: Vec<Option<Box<dyn World>>>,
    ) -> Result<()> {
        let rebuilt: Vec<Box<dyn World>> = seats
            .into_iter()
            .enumerate()
            .map(|(index, seat)| seat.unwrap_or_else(|| self.initial[index].boxed_copy()))
            .collect();
        *self.collection_mut(kind)? = rebuilt;
        Ok(())
    }

    fn collection_mut(&mut self, kind: WorldKind) -> Result<&mut Vec<Box<dyn World>>> {
        match kind {
            WorldKind::Initial => Ok(&mut self.initial),
            WorldKind::Current => Ok(&mut self.current),
            WorldKind::Answer => Ok(&mut self.answer),
            WorldKind::Error(j) => {
                if j >= self.errors.len() {
                    return Err(self.missing_bug_collection(j));
                }
                Ok(&mut self.errors[j])
            }
        }
    }

    fn missing_bug_collection(&self, j: usize) -> EngineError {
        self.broken(format!(
            "no known-bug collection {j} (exercise declares {})",
            self.errors.len()
        ))
    }

    fn broken(&self, reason: String) -> EngineError {
        EngineError::BrokenExercise {
            exercise_id: self.exercise_id.clone(),
            reason,
        }
    }
}
