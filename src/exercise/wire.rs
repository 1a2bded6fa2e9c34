//! Persisted exercise wire form.
//!
//! Carries identity, the Initial and Answer worlds, and the per-language
//! default source buffers. Mission texts and authored source lists live
//! in the content layer, not here. World objects dispatch on their
//! `type` tag through the world registry.

use super::Exercise;
use crate::config::types::{EngineError, Result};
use crate::lang::{Language, SourceFile};
use crate::world::{registry, WorldKind, WorldSnapshots};
use serde_json::{json, Map, Value};

impl Exercise {
    /// Serialize to the persisted wire object.
    ///
    /// Answer worlds are written with every entity's declared type
    /// rewritten to the type of the first Initial entity: answer states
    /// are produced by running the solution, but must reload as the same
    /// entity type the learner's worlds use.
    pub fn to_wire(&self) -> Result<Value> {
        let mut initial_worlds = Vec::new();
        let mut entity_type: Option<String> = None;
        for world in self.worlds.worlds(WorldKind::Initial)? {
            let doc = world.to_wire();
            if entity_type.is_none() {
                entity_type = first_entity_type(&doc);
            }
            initial_worlds.push(doc);
        }

        let mut answer_worlds = Vec::new();
        for world in self.worlds.worlds(WorldKind::Answer)? {
            let mut doc = world.to_wire();
            if let Some(tag) = &entity_type {
                override_entity_types(&mut doc, tag);
            }
            answer_worlds.push(doc);
        }

        let mut default_sources = Map::new();
        for (language, file) in &self.default_sources {
            default_sources.insert(language.as_str().to_string(), serde_json::to_value(file)?);
        }

        Ok(json!({
            "id": self.id,
            "name": self.name,
            "initialWorlds": initial_worlds,
            "answerWorlds": answer_worlds,
            "defaultSourceFiles": Value::Object(default_sources),
        }))
    }

    /// Reconstruct an exercise from its wire object. Worlds are built
    /// through the registry; the same entity-type override applied when
    /// writing is applied again, so files written by older tools load
    /// too. Current worlds are derived as fresh copies of Initial.
    pub fn from_wire(doc: &Value) -> Result<Exercise> {
        let id = required_str(doc, "id")?;
        let name = required_str(doc, "name")?;
        let initial_docs = required_array(doc, "initialWorlds")?;
        let answer_docs = required_array(doc, "answerWorlds")?;

        let mut initial = Vec::with_capacity(initial_docs.len());
        for world_doc in initial_docs {
            initial.push(registry::construct_world(world_doc)?);
        }

        let entity_type = initial_docs.first().and_then(first_entity_type);
        let mut answer = Vec::with_capacity(answer_docs.len());
        for world_doc in answer_docs {
            let mut world_doc = world_doc.clone();
            if let Some(tag) = &entity_type {
                override_entity_types(&mut world_doc, tag);
            }
            answer.push(registry::construct_world(&world_doc)?);
        }

        let mut exercise = Exercise::new(id, name);
        exercise.worlds = WorldSnapshots::assemble(exercise.id.clone(), initial, answer)?;

        let sources_doc = doc
            .get("defaultSourceFiles")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                EngineError::BrokenWorldFile(format!(
                    "exercise {} has no defaultSourceFiles object",
                    exercise.id
                ))
            })?;
        for (language_name, file_doc) in sources_doc {
            let mut file: SourceFile = serde_json::from_value(file_doc.clone())?;
            // The map key is authoritative for the buffer's language.
            file.language = Language::new(language_name.as_str());
            exercise.add_default_source(file);
        }

        Ok(exercise)
    }
}

fn required_str(doc: &Value, field: &str) -> Result<String> {
    doc.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            EngineError::BrokenWorldFile(format!("exercise object has no string {field:?} field"))
        })
}

fn required_array<'a>(doc: &'a Value, field: &str) -> Result<&'a Vec<Value>> {
    doc.get(field).and_then(Value::as_array).ok_or_else(|| {
        EngineError::BrokenWorldFile(format!("exercise object has no array {field:?} field"))
    })
}

/// Declared type of the first entity in a world wire object.
fn first_entity_type(doc: &Value) -> Option<String> {
    doc.get("entities")?
        .as_array()?
        .first()?
        .get("type")?
        .as_str()
        .map(str::to_string)
}

/// Rewrite the declared type of every entity in a world wire object.
fn override_entity_types(doc: &mut Value, tag: &str) {
    if let Some(entities) = doc.get_mut("entities").and_then(Value::as_array_mut) {
        for entity in entities {
            if let Some(object) = entity.as_object_mut() {
                object.insert("type".to_string(), json!(tag));
            }
        }
    }
}
