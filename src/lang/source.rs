//! Editable source buffers of an exercise.

use crate::lang::adapter::SourceVariant;
use crate::lang::Language;
use serde::{Deserialize, Serialize};

/// One editable source buffer.
///
/// `body` is what the learner edits; `template` is the revert target.
/// The shipped reference solution and known wrong implementations ride
/// along so grading can compile them without touching the learner's
/// buffer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceFile {
    #[serde(default)]
    pub language: Language,
    pub name: String,
    pub body: String,
    pub template: String,
    #[serde(default)]
    pub correction: String,
    #[serde(default)]
    pub known_bugs: Vec<String>,
    /// Line offset between the editor buffer and the compiled unit, for
    /// mapping compiler diagnostics back onto what the learner sees.
    #[serde(default)]
    pub offset: usize,
}

impl SourceFile {
    pub fn new(
        language: Language,
        name: impl Into<String>,
        body: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            language,
            name: name.into(),
            body: body.into(),
            template: template.into(),
            correction: String::new(),
            known_bugs: Vec::new(),
            offset: 0,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_correction(mut self, correction: impl Into<String>) -> Self {
        self.correction = correction.into();
        self
    }

    pub fn with_known_bug(mut self, body: impl Into<String>) -> Self {
        self.known_bugs.push(body.into());
        self
    }

    /// Renamed deep copy, for companion buffers.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.name = name.into();
        copy
    }

    /// Throw away the learner's edits and restore the template.
    pub fn revert(&mut self) {
        self.body = self.template.clone();
    }

    /// Source text for one compile variant. `None` when the exercise
    /// does not ship that variant.
    pub fn variant_body(&self, variant: SourceVariant) -> Option<&str> {
        match variant {
            SourceVariant::Student => Some(&self.body),
            SourceVariant::Correction => {
                if self.correction.is_empty() {
                    None
                } else {
                    Some(&self.correction)
                }
            }
            SourceVariant::KnownBug(j) => self.known_bugs.get(j).map(String::as_str),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> SourceFile {
        SourceFile::new(Language::new("java"), "Main", "edited", "template text")
            .with_correction("solution")
            .with_known_bug("bug zero")
            .with_known_bug("bug one")
            .with_offset(7)
    }

    #[test]
    fn revert_restores_the_template() {
        let mut file = file();
        assert_eq!(file.body, "edited");
        file.revert();
        assert_eq!(file.body, "template text");
        assert_eq!(file.template, "template text");
    }

    #[test]
    fn variant_body_selects_the_right_text() {
        let file = file();
        assert_eq!(file.variant_body(SourceVariant::Student), Some("edited"));
        assert_eq!(
            file.variant_body(SourceVariant::Correction),
            Some("solution")
        );
        assert_eq!(
            file.variant_body(SourceVariant::KnownBug(1)),
            Some("bug one")
        );
        assert_eq!(file.variant_body(SourceVariant::KnownBug(2)), None);
    }

    #[test]
    fn missing_correction_is_none() {
        let file = SourceFile::new(Language::new("java"), "Main", "x", "x");
        assert_eq!(file.variant_body(SourceVariant::Correction), None);
    }

    #[test]
    fn wire_round_trip_keeps_all_variants() {
        let file = file();
        let json = serde_json::to_value(&file).unwrap();
        let back: SourceFile = serde_json::from_value(json).unwrap();
        assert_eq!(back.name, "Main");
        assert_eq!(back.template, "template text");
        assert_eq!(back.correction, "solution");
        assert_eq!(back.known_bugs.len(), 2);
        assert_eq!(back.offset, 7);
    }
}
