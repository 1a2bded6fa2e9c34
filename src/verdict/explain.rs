//! Tailored explanations for known wrong implementations.

use std::collections::HashMap;
use std::fmt;

/// Recoverable lookup miss: the classifier falls back to a plain world
/// diff when no explanation text exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingText {
    pub exercise_id: String,
    pub error_index: usize,
    pub locale: String,
}

impl fmt::Display for MissingText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exercise {} error {} locale {:?}",
            self.exercise_id, self.error_index, self.locale
        )
    }
}

/// Source of pre-authored explanation texts, keyed by exercise, error
/// index, and human-language locale.
pub trait ErrorTextStore: Send + Sync {
    fn lookup(
        &self,
        exercise_id: &str,
        error_index: usize,
        locale: &str,
    ) -> std::result::Result<String, MissingText>;
}

/// Store with no texts at all; every lookup misses.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoExplanations;

impl ErrorTextStore for NoExplanations {
    fn lookup(
        &self,
        exercise_id: &str,
        error_index: usize,
        locale: &str,
    ) -> std::result::Result<String, MissingText> {
        Err(MissingText {
            exercise_id: exercise_id.to_string(),
            error_index,
            locale: locale.to_string(),
        })
    }
}

/// In-memory store. Missing locales fall back to "en" before giving up.
#[derive(Clone, Debug, Default)]
pub struct StaticExplanations {
    texts: HashMap<(String, usize, String), String>,
}

impl StaticExplanations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        exercise_id: impl Into<String>,
        error_index: usize,
        locale: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.texts
            .insert((exercise_id.into(), error_index, locale.into()), text.into());
    }

    fn get(&self, exercise_id: &str, error_index: usize, locale: &str) -> Option<&String> {
        self.texts
            .get(&(exercise_id.to_string(), error_index, locale.to_string()))
    }
}

impl ErrorTextStore for StaticExplanations {
    fn lookup(
        &self,
        exercise_id: &str,
        error_index: usize,
        locale: &str,
    ) -> std::result::Result<String, MissingText> {
        if let Some(text) = self.get(exercise_id, error_index, locale) {
            return Ok(text.clone());
        }
        if locale != "en" {
            if let Some(text) = self.get(exercise_id, error_index, "en") {
                return Ok(text.clone());
            }
        }
        Err(MissingText {
            exercise_id: exercise_id.to_string(),
            error_index,
            locale: locale.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_explanations_always_misses() {
        let store = NoExplanations;
        let miss = store.lookup("ex.a", 0, "en").unwrap_err();
        assert_eq!(miss.exercise_id, "ex.a");
        assert_eq!(miss.error_index, 0);
    }

    #[test]
    fn static_store_finds_exact_locale() {
        let mut store = StaticExplanations::new();
        store.insert("ex.a", 1, "fr", "Vous avez inversé la boucle.");
        assert_eq!(
            store.lookup("ex.a", 1, "fr").unwrap(),
            "Vous avez inversé la boucle."
        );
    }

    #[test]
    fn static_store_falls_back_to_english() {
        let mut store = StaticExplanations::new();
        store.insert("ex.a", 1, "en", "Your loop runs backwards.");
        assert_eq!(
            store.lookup("ex.a", 1, "pt").unwrap(),
            "Your loop runs backwards."
        );
    }

    #[test]
    fn static_store_misses_other_indices() {
        let mut store = StaticExplanations::new();
        store.insert("ex.a", 1, "en", "text");
        assert!(store.lookup("ex.a", 0, "en").is_err());
        assert!(store.lookup("ex.b", 1, "en").is_err());
    }
}
