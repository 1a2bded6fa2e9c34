//! Exercise aggregate
//!
//! One exercise owns its world snapshots, source buffers, mission texts,
//! and the result of its last graded attempt. Cloning is a deep copy:
//! clones share nothing, so one exercise instance can be handed to each
//! session.

pub mod wire;

use crate::config::types::Result;
use crate::exec::pipeline::{DemoReport, ExecutionPipeline};
use crate::lang::{Language, LanguageAdapter, SourceFile};
use crate::verdict::explain::{ErrorTextStore, NoExplanations};
use crate::verdict::progress::ExecutionProgress;
use crate::world::{World, WorldKind, WorldSnapshots};
use std::collections::HashMap;

#[derive(Clone)]
pub struct Exercise {
    id: String,
    name: String,
    tab_name: String,
    worlds: WorldSnapshots,
    sources: HashMap<Language, Vec<SourceFile>>,
    default_sources: HashMap<Language, SourceFile>,
    missions: HashMap<String, String>,
    last_result: Option<ExecutionProgress>,
}

impl Exercise {
    /// New empty exercise. The tab name defaults to the last dotted
    /// segment of the id ("lessons.sort.BubbleSort" tabs as
    /// "BubbleSort") and can be overridden.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let tab_name = id.rsplit('.').next().unwrap_or(id.as_str()).to_string();
        Self {
            worlds: WorldSnapshots::new(id.clone()),
            id,
            name: name.into(),
            tab_name,
            sources: HashMap::new(),
            default_sources: HashMap::new(),
            missions: HashMap::new(),
            last_result: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier the learner's editor tab compiles under.
    pub fn tab_name(&self) -> &str {
        &self.tab_name
    }

    pub fn set_tab_name(&mut self, tab_name: impl Into<String>) {
        self.tab_name = tab_name.into();
    }

    // ---- worlds -------------------------------------------------------

    /// Drop all worlds and reserve room for `count` per collection.
    pub fn init_worlds(&mut self, count: usize) {
        self.worlds.init_worlds(count);
    }

    /// Populate every snapshot collection from template worlds, plus one
    /// extra collection per known wrong implementation.
    pub fn setup_worlds(
        &mut self,
        templates: &[Box<dyn World>],
        known_bug_count: usize,
    ) -> Result<()> {
        self.worlds.setup(templates, known_bug_count)?;
        log::info!(
            "exercise {:?} set up with {} world(s) and {known_bug_count} known bug(s)",
            self.id,
            templates.len()
        );
        Ok(())
    }

    /// Restore every Current world from its Initial counterpart.
    pub fn reset(&mut self) {
        self.worlds.reset();
    }

    pub fn worlds(&self) -> &WorldSnapshots {
        &self.worlds
    }

    pub fn worlds_mut(&mut self) -> &mut WorldSnapshots {
        &mut self.worlds
    }

    pub fn world_count(&self) -> usize {
        self.worlds.count()
    }

    pub fn world(&self, kind: WorldKind, index: usize) -> Result<&dyn World> {
        self.worlds.world(kind, index)
    }

    pub fn index_of_current(&self, name: &str) -> Option<usize> {
        self.worlds.index_of_current(name)
    }

    // ---- sources ------------------------------------------------------

    /// Add a source buffer for its language. If the adapter needs a
    /// companion representation of the buffer, it is added alongside
    /// under the adapter's companion name.
    pub fn new_source(&mut self, adapter: &dyn LanguageAdapter, file: SourceFile) {
        let companion = adapter
            .companion_source_name(&file.name)
            .map(|name| file.renamed(name));
        let buffers = self.sources.entry(file.language.clone()).or_default();
        buffers.push(file);
        if let Some(companion) = companion {
            buffers.push(companion);
        }
    }

    pub fn source_files(&self, language: &Language) -> &[SourceFile] {
        self.sources
            .get(language)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn source_files_mut(&mut self, language: &Language) -> &mut Vec<SourceFile> {
        self.sources.entry(language.clone()).or_default()
    }

    pub fn source_file(&self, language: &Language, index: usize) -> Option<&SourceFile> {
        self.source_files(language).get(index)
    }

    /// Fallback buffer handed to exercises that ship none of their own
    /// for this language.
    pub fn add_default_source(&mut self, file: SourceFile) {
        self.default_sources.insert(file.language.clone(), file);
    }

    /// Fresh copy of the default buffer for a language.
    pub fn default_source(&self, language: &Language) -> Option<SourceFile> {
        self.default_sources.get(language).cloned()
    }

    /// A language is supported once the exercise ships a default buffer
    /// for it; authored sources alone do not count.
    pub fn is_language_supported(&self, language: &Language) -> bool {
        self.default_sources.contains_key(language)
    }

    /// Supported languages, sorted for stable iteration.
    pub fn languages(&self) -> Vec<Language> {
        let mut names: Vec<&str> = self.default_sources.keys().map(Language::as_str).collect();
        names.sort_unstable();
        names.into_iter().map(Language::new).collect()
    }

    // ---- missions -----------------------------------------------------

    /// Mission statement for a human-language locale.
    pub fn add_mission(&mut self, locale: impl Into<String>, text: impl Into<String>) {
        self.missions.insert(locale.into(), text.into());
    }

    /// Mission text for the locale, falling back to "en".
    pub fn mission(&self, locale: &str) -> Option<&str> {
        self.missions
            .get(locale)
            .or_else(|| self.missions.get("en"))
            .map(String::as_str)
    }

    /// Locales a mission text exists for, sorted.
    pub fn human_languages(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.missions.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }

    // ---- results ------------------------------------------------------

    /// Result of the last graded attempt, if any attempt finished.
    pub fn last_result(&self) -> Option<&ExecutionProgress> {
        self.last_result.as_ref()
    }

    pub(crate) fn set_last_result(&mut self, progress: ExecutionProgress) {
        self.last_result = Some(progress);
    }

    // ---- attempt entry points ----------------------------------------

    /// Grade the learner's current buffer with default limits and
    /// locale. Embedders needing custom limits, locale, or explanation
    /// stores drive `ExecutionPipeline` directly.
    pub fn run(
        &mut self,
        adapter: &dyn LanguageAdapter,
        explanations: &dyn ErrorTextStore,
    ) -> Result<ExecutionProgress> {
        ExecutionPipeline::new(adapter, explanations).run(self)
    }

    /// Author-side: execute the reference solution against the Answer
    /// worlds, materializing the expected final states.
    pub fn compute_answer(&mut self, adapter: &dyn LanguageAdapter) -> Result<DemoReport> {
        ExecutionPipeline::new(adapter, &NoExplanations).run_demo(self)
    }

    /// Author-side: execute the j-th known wrong implementation against
    /// its Error worlds.
    pub fn compute_known_bug(
        &mut self,
        adapter: &dyn LanguageAdapter,
        bug: usize,
    ) -> Result<DemoReport> {
        ExecutionPipeline::new(adapter, &NoExplanations).run_known_bug(self, bug)
    }
}
