//! World-type registry for wire deserialization.
//!
//! Persisted worlds carry a string `type` tag. Embedders register a
//! constructor per tag at startup; deserialization refuses tags nobody
//! registered instead of probing for types reflectively.

use crate::config::types::{EngineError, Result};
use crate::world::World;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::RwLock;

/// Constructor for one registered world type. Receives the world's whole
/// wire object and rebuilds the concrete world from it.
pub type WorldFactory = fn(&serde_json::Value) -> Result<Box<dyn World>>;

static REGISTRY: Lazy<RwLock<HashMap<String, WorldFactory>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register a constructor under a type tag. Registering the same tag
/// again replaces the previous constructor.
pub fn register_world_type(tag: &str, factory: WorldFactory) {
    let mut registry = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    if registry.insert(tag.to_string(), factory).is_some() {
        log::warn!("world type {tag:?} re-registered, replacing previous constructor");
    }
}

/// Build a world from its wire object, dispatching on the `type` tag.
pub fn construct_world(doc: &serde_json::Value) -> Result<Box<dyn World>> {
    let tag = doc
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            EngineError::BrokenWorldFile("world object has no string \"type\" tag".to_string())
        })?;
    let factory = {
        let registry = REGISTRY.read().unwrap_or_else(|e| e.into_inner());
        registry.get(tag).copied()
    };
    match factory {
        Some(factory) => factory(doc),
        None => Err(EngineError::UnknownWorldType(tag.to_string())),
    }
}
