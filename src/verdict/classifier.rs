//! Outcome classification over finished world state.

use crate::config::types::Result;
use crate::verdict::explain::ErrorTextStore;
use crate::verdict::progress::{ExecutionProgress, Outcome};
use crate::world::{World, WorldKind, WorldSnapshots};

/// Separator between per-world diff blocks in the accumulated report.
const DIFF_SEPARATOR: &str = "------------------------------------------";

/// Pure classification of a finished run.
///
/// Compares every Current world with its Answer world in index order,
/// counts partial credit, recognizes known wrong implementations, and
/// settles the attempt into Pass or Fail. The first known-bug match wins
/// and stops further matching for the whole attempt; worlds that differ
/// without matching still get a diff block.
pub struct OutcomeClassifier;

impl OutcomeClassifier {
    /// Classify one attempt. Runs only while the outcome is still
    /// Pending; compile errors, runtime faults, and timeouts settled
    /// earlier in the pipeline are left untouched.
    pub fn classify(
        progress: &mut ExecutionProgress,
        worlds: &WorldSnapshots,
        explanations: &dyn ErrorTextStore,
        exercise_id: &str,
        locale: &str,
    ) -> Result<()> {
        if progress.outcome != Outcome::Pending {
            return Ok(());
        }
        progress.common_error_id = None;
        progress.common_error_text = None;

        let mut all_winning = true;
        for index in 0..worlds.count() {
            let current = worlds.world(WorldKind::Current, index)?;
            let answer = worlds.world(WorldKind::Answer, index)?;
            progress.total_tests += 1;
            if current.winning(answer) {
                progress.passed_tests += 1;
                log::debug!("world {index} ({:?}) reached its answer state", current.name());
                continue;
            }
            all_winning = false;
            log::debug!("world {index} ({:?}) deviates from its answer state", current.name());

            if progress.common_error_id.is_none() {
                if let Some(bug) = Self::matching_known_bug(worlds, index, current)? {
                    progress.common_error_id = Some(bug);
                    match explanations.lookup(exercise_id, bug, locale) {
                        Ok(text) => progress.common_error_text = Some(text),
                        Err(miss) => {
                            log::warn!("no explanation text for {miss}, falling back to diff");
                            Self::append_diff(progress, answer, current);
                        }
                    }
                    continue;
                }
            }
            Self::append_diff(progress, answer, current);
        }

        progress.outcome = if all_winning { Outcome::Pass } else { Outcome::Fail };
        Ok(())
    }

    /// First known-bug collection whose world at `index` is equivalent
    /// to the failed Current world, in registration order.
    fn matching_known_bug(
        worlds: &WorldSnapshots,
        index: usize,
        current: &dyn World,
    ) -> Result<Option<usize>> {
        for bug in 0..worlds.known_bug_count() {
            let bug_world = worlds.world(WorldKind::Error(bug), index)?;
            if current.winning(bug_world) {
                return Ok(Some(bug));
            }
        }
        Ok(None)
    }

    fn append_diff(progress: &mut ExecutionProgress, answer: &dyn World, current: &dyn World) {
        let mut block = format!("The world '{}' differs", current.name());
        if let Some(diff) = answer.diff_to(current) {
            block.push_str(":\n");
            block.push_str(&diff);
        }
        block.push('\n');
        block.push_str(DIFF_SEPARATOR);
        progress.append_error(&block);
    }
}
