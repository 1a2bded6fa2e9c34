//! Language adapters
//!
//! The engine core is language-agnostic. Everything that knows how to
//! turn source text into executable entities lives behind the
//! `LanguageAdapter` contract; adapters are registered at startup and
//! looked up by language identifier.

pub mod adapter;
pub mod source;

pub use adapter::{CompileError, EntityFactory, LanguageAdapter, SourceVariant};
pub use source::SourceFile;

use crate::config::types::{EngineError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Stable identifier of a programming language, as used in wire forms
/// and adapter lookup ("java", "python", ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Language {
    fn default() -> Self {
        Self(String::new())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Language {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

static ADAPTERS: Lazy<RwLock<HashMap<Language, Arc<dyn LanguageAdapter>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register an adapter under its own language id. Registering the same
/// language again replaces the previous adapter.
pub fn register_adapter(adapter: Arc<dyn LanguageAdapter>) {
    let language = adapter.language();
    let mut adapters = ADAPTERS.write().unwrap_or_else(|e| e.into_inner());
    if adapters.insert(language.clone(), adapter).is_some() {
        log::warn!("language adapter for {language} re-registered, replacing previous one");
    }
}

/// Look up the adapter for a language.
pub fn adapter_for(language: &Language) -> Result<Arc<dyn LanguageAdapter>> {
    let adapters = ADAPTERS.read().unwrap_or_else(|e| e.into_inner());
    adapters
        .get(language)
        .cloned()
        .ok_or_else(|| EngineError::UnknownLanguage(language.as_str().to_string()))
}
