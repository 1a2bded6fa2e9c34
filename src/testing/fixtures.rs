//! Fixture worlds, entities, and adapters.
//!
//! `CounterWorld` is the minimal world: its whole state is one integer,
//! two worlds are equivalent when the integers match. `ScriptedAdapter`
//! stands in for a language back-end, producing whatever entities the
//! script says per source variant. Integration tests and embedder smoke
//! tests drive the full engine with these.

use crate::config::types::{EngineError, Result};
use crate::exercise::Exercise;
use crate::lang::{CompileError, EntityFactory, Language, LanguageAdapter, SourceVariant};
use crate::world::{registry, CancelToken, Entity, World};
use serde_json::{json, Value};
use std::any::Any;
use std::thread;
use std::time::Duration;

/// World whose entire state is one counter.
pub struct CounterWorld {
    name: String,
    pub counter: i64,
    entities: Vec<Box<dyn Entity>>,
}

impl CounterWorld {
    pub const TYPE_TAG: &'static str = "CounterWorld";
    pub const ENTITY_TAG: &'static str = StepEntity::TYPE_TAG;

    /// New world carrying one idle default entity, as template worlds
    /// must hold at least one entity for mutation to replace.
    pub fn new(name: impl Into<String>, counter: i64) -> Self {
        Self {
            name: name.into(),
            counter,
            entities: vec![Box::new(StepEntity::adding(0))],
        }
    }

    /// Register this world type with the wire registry. Safe to call
    /// repeatedly.
    pub fn register() {
        registry::register_world_type(Self::TYPE_TAG, Self::from_wire);
    }

    fn from_wire(doc: &Value) -> Result<Box<dyn World>> {
        let name = doc
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("world")
            .to_string();
        let counter = doc.get("counter").and_then(Value::as_i64).unwrap_or(0);
        let mut entities: Vec<Box<dyn Entity>> = Vec::new();
        if let Some(docs) = doc.get("entities").and_then(Value::as_array) {
            for entity_doc in docs {
                let tag = entity_doc.get("type").and_then(Value::as_str);
                if tag != Some(StepEntity::TYPE_TAG) {
                    return Err(EngineError::BrokenWorldFile(format!(
                        "counter world {name:?} holds an entity of unknown type {tag:?}"
                    )));
                }
                entities.push(Box::new(StepEntity {
                    name: entity_doc
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("step")
                        .to_string(),
                    steps: entity_doc.get("steps").and_then(Value::as_i64).unwrap_or(0),
                }));
            }
        }
        Ok(Box::new(Self {
            name,
            counter,
            entities,
        }))
    }

    /// Counter value of a world known to be a `CounterWorld`.
    pub fn value_of(world: &dyn World) -> i64 {
        world
            .as_any()
            .downcast_ref::<CounterWorld>()
            .expect("not a CounterWorld")
            .counter
    }

    pub fn set_value(world: &mut dyn World, value: i64) {
        world
            .as_any_mut()
            .downcast_mut::<CounterWorld>()
            .expect("not a CounterWorld")
            .counter = value;
    }
}

impl World for CounterWorld {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> &'static str {
        Self::TYPE_TAG
    }

    fn boxed_copy(&self) -> Box<dyn World> {
        Box::new(Self {
            name: self.name.clone(),
            counter: self.counter,
            entities: self.entities.clone(),
        })
    }

    fn reset_from(&mut self, source: &dyn World) {
        if let Some(source) = source.as_any().downcast_ref::<CounterWorld>() {
            self.name = source.name.clone();
            self.counter = source.counter;
            self.entities = source.entities.clone();
        } else {
            log::warn!("reset_from with a non-counter world, keeping state");
        }
    }

    fn winning(&self, other: &dyn World) -> bool {
        other
            .as_any()
            .downcast_ref::<CounterWorld>()
            .is_some_and(|other| other.counter == self.counter)
    }

    fn diff_to(&self, other: &dyn World) -> Option<String> {
        match other.as_any().downcast_ref::<CounterWorld>() {
            Some(other) => Some(format!(
                "expected counter {}, found {}",
                self.counter, other.counter
            )),
            None => Some("worlds are of different types".to_string()),
        }
    }

    fn entities(&self) -> &[Box<dyn Entity>] {
        &self.entities
    }

    fn take_entities(&mut self) -> Vec<Box<dyn Entity>> {
        std::mem::take(&mut self.entities)
    }

    fn set_entities(&mut self, entities: Vec<Box<dyn Entity>>) {
        self.entities = entities;
    }

    fn to_wire(&self) -> Value {
        json!({
            "type": Self::TYPE_TAG,
            "name": self.name,
            "counter": self.counter,
            "entities": self.entities.iter().map(|e| e.to_wire()).collect::<Vec<_>>(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Entity adding a fixed amount to the counter.
pub struct StepEntity {
    pub name: String,
    pub steps: i64,
}

impl StepEntity {
    pub const TYPE_TAG: &'static str = "StepEntity";

    pub fn adding(steps: i64) -> Self {
        Self {
            name: "step".to_string(),
            steps,
        }
    }
}

impl Entity for StepEntity {
    fn name(&self) -> &str {
        &self.name
    }

    fn boxed_clone(&self) -> Box<dyn Entity> {
        Box::new(Self {
            name: self.name.clone(),
            steps: self.steps,
        })
    }

    fn to_wire(&self) -> Value {
        json!({"type": Self::TYPE_TAG, "name": self.name, "steps": self.steps})
    }

    fn run(
        &mut self,
        world: &mut dyn World,
        _cancel: &CancelToken,
    ) -> std::result::Result<(), String> {
        let world = world
            .as_any_mut()
            .downcast_mut::<CounterWorld>()
            .ok_or_else(|| "step entity bound to a non-counter world".to_string())?;
        world.counter += self.steps;
        Ok(())
    }
}

/// Entity that spins until cancelled, then returns cleanly. Drives
/// timeout paths without leaking a thread.
pub struct SpinEntity;

impl Entity for SpinEntity {
    fn name(&self) -> &str {
        "spin"
    }

    fn boxed_clone(&self) -> Box<dyn Entity> {
        Box::new(SpinEntity)
    }

    fn to_wire(&self) -> Value {
        json!({"type": "SpinEntity", "name": "spin"})
    }

    fn run(
        &mut self,
        _world: &mut dyn World,
        cancel: &CancelToken,
    ) -> std::result::Result<(), String> {
        while !cancel.is_cancelled() {
            thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }
}

/// Entity that ignores cancellation and never returns. Its unit gets
/// abandoned; the thread lives until the process exits.
pub struct StuckEntity;

impl Entity for StuckEntity {
    fn name(&self) -> &str {
        "stuck"
    }

    fn boxed_clone(&self) -> Box<dyn Entity> {
        Box::new(StuckEntity)
    }

    fn to_wire(&self) -> Value {
        json!({"type": "StuckEntity", "name": "stuck"})
    }

    fn run(
        &mut self,
        _world: &mut dyn World,
        _cancel: &CancelToken,
    ) -> std::result::Result<(), String> {
        loop {
            thread::sleep(Duration::from_millis(5));
        }
    }
}

/// Entity that panics when run.
pub struct PanicEntity;

impl Entity for PanicEntity {
    fn name(&self) -> &str {
        "panic"
    }

    fn boxed_clone(&self) -> Box<dyn Entity> {
        Box::new(PanicEntity)
    }

    fn to_wire(&self) -> Value {
        json!({"type": "PanicEntity", "name": "panic"})
    }

    fn run(
        &mut self,
        _world: &mut dyn World,
        _cancel: &CancelToken,
    ) -> std::result::Result<(), String> {
        panic!("entity exploded");
    }
}

/// Entity that fails with a fixed runtime diagnostic.
pub struct FaultEntity {
    message: String,
    delay: Duration,
}

impl FaultEntity {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            delay: Duration::ZERO,
        }
    }

    /// Fault only after sleeping `delay`, to stagger units against each
    /// other.
    pub fn after(message: impl Into<String>, delay: Duration) -> Self {
        Self {
            message: message.into(),
            delay,
        }
    }
}

impl Entity for FaultEntity {
    fn name(&self) -> &str {
        "fault"
    }

    fn boxed_clone(&self) -> Box<dyn Entity> {
        Box::new(Self {
            message: self.message.clone(),
            delay: self.delay,
        })
    }

    fn to_wire(&self) -> Value {
        json!({"type": "FaultEntity", "name": "fault"})
    }

    fn run(
        &mut self,
        _world: &mut dyn World,
        _cancel: &CancelToken,
    ) -> std::result::Result<(), String> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Err(self.message.clone())
    }
}

/// Inert entity with a foreign wire tag, for exercising entity-type
/// rewriting on the answer collection.
pub struct OpaqueEntity {
    name: String,
}

impl OpaqueEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Entity for OpaqueEntity {
    fn name(&self) -> &str {
        &self.name
    }

    fn boxed_clone(&self) -> Box<dyn Entity> {
        Box::new(Self {
            name: self.name.clone(),
        })
    }

    fn to_wire(&self) -> Value {
        json!({"type": "OpaqueEntity", "name": self.name})
    }

    fn run(
        &mut self,
        _world: &mut dyn World,
        _cancel: &CancelToken,
    ) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// What the scripted back-end produces for one source variant.
#[derive(Clone, Debug)]
pub enum Script {
    /// One entity adding this amount to the counter.
    Steps(i64),
    /// One entity spinning until cancelled.
    Spin,
    /// One entity that ignores cancellation entirely.
    Stuck,
    /// One entity that panics.
    Panic,
    /// One entity failing with this runtime diagnostic.
    Fault(String),
    /// Compile rejection with these diagnostics.
    Reject(String),
    /// Compile succeeds, but building entities for any world fails.
    RejectLate(String),
}

/// Language back-end stand-in with scripted behavior per variant.
pub struct ScriptedAdapter {
    language: Language,
    student: Script,
    correction: Script,
    known_bugs: Vec<Script>,
    forbidden: Vec<char>,
    companion_suffix: Option<String>,
}

impl ScriptedAdapter {
    pub fn new(language: &str) -> Self {
        Self {
            language: Language::new(language),
            student: Script::Steps(0),
            correction: Script::Steps(0),
            known_bugs: Vec::new(),
            forbidden: Vec::new(),
            companion_suffix: None,
        }
    }

    pub fn with_student(mut self, script: Script) -> Self {
        self.student = script;
        self
    }

    pub fn with_correction(mut self, script: Script) -> Self {
        self.correction = script;
        self
    }

    pub fn with_known_bug(mut self, script: Script) -> Self {
        self.known_bugs.push(script);
        self
    }

    pub fn with_forbidden_tab_chars(mut self, chars: &[char]) -> Self {
        self.forbidden = chars.to_vec();
        self
    }

    pub fn with_companion_suffix(mut self, suffix: &str) -> Self {
        self.companion_suffix = Some(suffix.to_string());
        self
    }
}

impl LanguageAdapter for ScriptedAdapter {
    fn language(&self) -> Language {
        self.language.clone()
    }

    fn compile(
        &self,
        exercise: &Exercise,
        variant: SourceVariant,
    ) -> std::result::Result<Box<dyn EntityFactory>, CompileError> {
        log::trace!("scripted compile of {variant} for {:?}", exercise.id());
        let script = match variant {
            SourceVariant::Student => self.student.clone(),
            SourceVariant::Correction => self.correction.clone(),
            SourceVariant::KnownBug(j) => self
                .known_bugs
                .get(j)
                .cloned()
                .ok_or_else(|| CompileError::new(format!("no known-bug variant {j} scripted")))?,
        };
        if let Script::Reject(diagnostics) = script {
            return Err(CompileError::new(diagnostics));
        }
        Ok(Box::new(ScriptedFactory { script }))
    }

    fn forbidden_tab_chars(&self) -> &[char] {
        &self.forbidden
    }

    fn companion_source_name(&self, base: &str) -> Option<String> {
        self.companion_suffix
            .as_ref()
            .map(|suffix| format!("{base}{suffix}"))
    }
}

struct ScriptedFactory {
    script: Script,
}

impl EntityFactory for ScriptedFactory {
    fn entities_for(
        &self,
        world: &dyn World,
    ) -> std::result::Result<Vec<Box<dyn Entity>>, CompileError> {
        let entity: Box<dyn Entity> = match &self.script {
            Script::Steps(steps) => Box::new(StepEntity {
                name: format!("{}-runner", world.name()),
                steps: *steps,
            }),
            Script::Spin => Box::new(SpinEntity),
            Script::Stuck => Box::new(StuckEntity),
            Script::Panic => Box::new(PanicEntity),
            Script::Fault(message) => Box::new(FaultEntity::new(message.clone())),
            Script::Reject(diagnostics) | Script::RejectLate(diagnostics) => {
                return Err(CompileError::new(diagnostics.clone()))
            }
        };
        Ok(vec![entity])
    }
}

/// Exercise with one `CounterWorld` per initial value, named
/// "world-{i}", plus `known_bugs` empty bug collections.
pub fn counter_exercise(id: &str, initial: &[i64], known_bugs: usize) -> Exercise {
    let templates: Vec<Box<dyn World>> = initial
        .iter()
        .enumerate()
        .map(|(i, value)| Box::new(CounterWorld::new(format!("world-{i}"), *value)) as Box<dyn World>)
        .collect();
    let mut exercise = Exercise::new(id, id);
    exercise
        .setup_worlds(&templates, known_bugs)
        .expect("fixture templates are valid");
    exercise
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_world_copy_is_deep() {
        let world = CounterWorld::new("w", 5);
        let mut copy = world.boxed_copy();
        CounterWorld::set_value(copy.as_mut(), 9);
        assert_eq!(world.counter, 5);
        assert_eq!(copy.entity_count(), world.entity_count());
    }

    #[test]
    fn winning_compares_counters_not_names() {
        let a = CounterWorld::new("a", 5);
        let b = CounterWorld::new("b", 5);
        let c = CounterWorld::new("a", 6);
        assert!(a.winning(&b));
        assert!(!a.winning(&c));
    }

    #[test]
    fn diff_names_both_values() {
        let answer = CounterWorld::new("w", 9);
        let current = CounterWorld::new("w", 5);
        let diff = answer.diff_to(&current).unwrap();
        assert!(diff.contains('9'));
        assert!(diff.contains('5'));
    }

    #[test]
    fn wire_parse_rejects_foreign_entities() {
        let err = CounterWorld::from_wire(&json!({
            "type": CounterWorld::TYPE_TAG,
            "name": "w",
            "counter": 1,
            "entities": [{"type": "OpaqueEntity", "name": "x"}],
        }))
        .err()
        .unwrap();
        assert!(matches!(err, EngineError::BrokenWorldFile(_)));
    }

    #[test]
    fn scripted_adapter_selects_the_variant() {
        let adapter = ScriptedAdapter::new("fixture")
            .with_student(Script::Steps(1))
            .with_correction(Script::Steps(2))
            .with_known_bug(Script::Steps(3));
        let exercise = counter_exercise("ex.fixture", &[0], 0);

        let factory = adapter.compile(&exercise, SourceVariant::KnownBug(0)).unwrap();
        let world = CounterWorld::new("w", 0);
        let mut entities = factory.entities_for(&world).unwrap();
        let mut target = CounterWorld::new("t", 0);
        entities[0].run(&mut target, &CancelToken::new()).unwrap();
        assert_eq!(target.counter, 3);

        assert!(adapter.compile(&exercise, SourceVariant::KnownBug(5)).is_err());
    }
}
