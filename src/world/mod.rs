//! Worlds and entities
//!
//! A world is one opaque snapshot of exercise state; entities are the
//! executable units living inside it. The engine never looks at domain
//! state directly: it copies, resets, compares, and serializes worlds
//! through the `World` contract, and concrete world types plug in through
//! the registry.

pub mod registry;
pub mod snapshot;

pub use registry::{construct_world, register_world_type, WorldFactory};
pub use snapshot::{WorldKind, WorldSnapshots};

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared with in-flight execution units.
///
/// Units are never killed; they are asked to stop and abandoned if they
/// refuse. Entity code must poll the token inside long-running loops.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Executable unit of state within a world.
///
/// After a successful compile, the language adapter replaces a world's
/// entities with freshly built ones; the runner then executes each entity
/// against its world. A runtime fault is reported as `Err` with the
/// learner-visible diagnostic text.
pub trait Entity: Send {
    fn name(&self) -> &str;

    /// Deep copy, used when the owning world is copied.
    fn boxed_clone(&self) -> Box<dyn Entity>;

    /// Wire form of this entity. Must be a JSON object carrying a `type`
    /// tag so persisted worlds can be reconstructed.
    fn to_wire(&self) -> serde_json::Value;

    /// Execute this entity against its world until done or cancelled.
    fn run(
        &mut self,
        world: &mut dyn World,
        cancel: &CancelToken,
    ) -> std::result::Result<(), String>;
}

impl Clone for Box<dyn Entity> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Opaque snapshot of exercise state.
///
/// Concrete world types live outside the engine; this contract is the
/// whole surface the engine relies on. `winning` is the domain's
/// equivalence judgement (it normally ignores the world name), `diff_to`
/// the learner-visible explanation when two worlds differ.
pub trait World: Send {
    fn name(&self) -> &str;

    /// Stable tag identifying the concrete world type on the wire.
    fn type_tag(&self) -> &'static str;

    /// Deep copy, entities included.
    fn boxed_copy(&self) -> Box<dyn World>;

    /// Overwrite this world's state in place from `source`. The engine
    /// resets Current worlds from Initial this way before every attempt,
    /// keeping allocations and external references to the world stable.
    fn reset_from(&mut self, source: &dyn World);

    /// Whether this world's state is equivalent to `other` for grading.
    fn winning(&self, other: &dyn World) -> bool;

    /// Learner-readable description of how `other` deviates from this
    /// world, or `None` when the difference cannot be described.
    fn diff_to(&self, other: &dyn World) -> Option<String>;

    fn entities(&self) -> &[Box<dyn Entity>];

    fn entity_count(&self) -> usize {
        self.entities().len()
    }

    /// Remove and return all entities, leaving the world empty. The
    /// runner takes entities out before executing them so an entity can
    /// hold `&mut` on its world while running.
    fn take_entities(&mut self) -> Vec<Box<dyn Entity>>;

    fn set_entities(&mut self, entities: Vec<Box<dyn Entity>>);

    /// Wire form of this world. Must be a JSON object carrying a `type`
    /// tag matching `type_tag`, plus an `entities` array of entity wire
    /// objects.
    fn to_wire(&self) -> serde_json::Value;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn World> {
    fn clone(&self) -> Self {
        self.boxed_copy()
    }
}
