//! Compile contract between the engine and a language back-end.

use crate::exercise::Exercise;
use crate::lang::Language;
use crate::world::{Entity, World};
use std::fmt;

/// Which source text an attempt compiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceVariant {
    /// The learner's current buffer.
    Student,
    /// The shipped reference solution.
    Correction,
    /// The j-th shipped wrong implementation.
    KnownBug(usize),
}

impl fmt::Display for SourceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceVariant::Student => write!(f, "student"),
            SourceVariant::Correction => write!(f, "correction"),
            SourceVariant::KnownBug(j) => write!(f, "known-bug[{j}]"),
        }
    }
}

/// Compile rejection, with the diagnostics the learner should read.
///
/// This is an expected grading outcome carried by value, not an engine
/// fault: it short-circuits the attempt into a CompileError verdict.
#[derive(Clone, Debug)]
pub struct CompileError {
    pub diagnostics: String,
}

impl CompileError {
    pub fn new(diagnostics: impl Into<String>) -> Self {
        Self {
            diagnostics: diagnostics.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostics)
    }
}

/// Product of a successful compile: builds fresh entities for each world
/// the compiled code will run in.
///
/// `entities_for` sees the target world before mutation, so a back-end
/// can carry positions or parameters over from the entities being
/// replaced. Late rejections are still compile errors.
pub trait EntityFactory: Send + Sync {
    fn entities_for(
        &self,
        world: &dyn World,
    ) -> std::result::Result<Vec<Box<dyn Entity>>, CompileError>;
}

/// One language back-end.
///
/// Adapters are shared across attempts and sessions; implementations
/// must be safe to call concurrently.
pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// Compile one source variant of the exercise into an entity factory.
    fn compile(
        &self,
        exercise: &Exercise,
        variant: SourceVariant,
    ) -> std::result::Result<Box<dyn EntityFactory>, CompileError>;

    /// Characters the exercise tab name must not contain for this
    /// language. Empty disables the check.
    fn forbidden_tab_chars(&self) -> &[char] {
        &[]
    }

    /// Name of the companion source buffer this language needs alongside
    /// `base`, if any. Block-based languages keep a second representation
    /// of each buffer; text-only languages return `None`.
    fn companion_source_name(&self, base: &str) -> Option<String> {
        let _ = base;
        None
    }
}
