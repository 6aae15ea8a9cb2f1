//! Cycle bookkeeping across iterations
//!
//! `CycleState` is owned by exactly one approval-loop run. A host serving
//! multiple concurrent pipelines must construct one per run; sharing an
//! instance across runs corrupts verdicts and locators.

use std::collections::HashMap;

use tracing::debug;

use super::gate::Verdict;

/// Mutable record threaded through one approval-loop run
///
/// `verdicts` and `review_locators` only ever hold entries for reviewers
/// that have run in the *current* iteration; both are fully cleared (not
/// merged) when a new iteration starts, so a stale verdict from a prior
/// iteration can never be read as current.
#[derive(Debug, Clone, Default)]
pub struct CycleState {
    /// Current iteration (0 before the first pass, 1-indexed after)
    iteration: u32,

    /// Where the artifact under review lives (set by the producer)
    artifact_locator: Option<String>,

    /// Where each reviewer wrote its report this iteration
    review_locators: HashMap<String, String>,

    /// Latest verdict per reviewer this iteration
    verdicts: HashMap<String, Verdict>,

    /// True only if the loop terminated via unanimous approval
    final_approved: bool,
}

impl CycleState {
    /// Create a fresh state at iteration 0
    pub fn new() -> Self {
        debug!("CycleState::new: called");
        Self::default()
    }

    /// Begin a new iteration: bump the counter, clear per-iteration maps
    pub fn start_iteration(&mut self) {
        self.iteration += 1;
        debug!(iteration = self.iteration, "CycleState::start_iteration: called");
        self.review_locators.clear();
        self.verdicts.clear();
    }

    /// Record where the producer stored the artifact
    pub fn record_artifact(&mut self, locator: impl Into<String>) {
        let locator = locator.into();
        debug!(%locator, "CycleState::record_artifact: called");
        self.artifact_locator = Some(locator);
    }

    /// Record a reviewer's report location and verdict for this iteration
    pub fn record_review(&mut self, reviewer: &str, locator: impl Into<String>, verdict: Verdict) {
        let locator = locator.into();
        debug!(%reviewer, %locator, %verdict, "CycleState::record_review: called");
        self.review_locators.insert(reviewer.to_string(), locator);
        self.verdicts.insert(reviewer.to_string(), verdict);
    }

    /// Record a reviewer step that failed to complete
    ///
    /// Under the conservative failure policy a failed step counts as an
    /// automatic changes-requested, never as an approval.
    pub fn record_failure(&mut self, reviewer: &str) {
        debug!(%reviewer, "CycleState::record_failure: called");
        self.verdicts.insert(reviewer.to_string(), Verdict::ChangesRequested);
    }

    /// Check whether every required reviewer approved in this iteration
    ///
    /// A reviewer with no recorded verdict counts as not-approved.
    pub fn all_approved<S: AsRef<str>>(&self, required: &[S]) -> bool {
        let approved = required
            .iter()
            .all(|name| matches!(self.verdicts.get(name.as_ref()), Some(Verdict::Approved)));
        debug!(required = required.len(), approved, "CycleState::all_approved: called");
        approved
    }

    /// Mark the run as terminated via unanimous approval
    pub(crate) fn mark_approved(&mut self) {
        debug!("CycleState::mark_approved: called");
        self.final_approved = true;
    }

    /// Return to iteration 0 with all maps empty
    ///
    /// Must be called before reusing a state value for an unrelated run.
    pub fn reset(&mut self) {
        debug!("CycleState::reset: called");
        *self = Self::default();
    }

    /// Current iteration number
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Locator of the artifact under review, if the producer has run
    pub fn artifact_locator(&self) -> Option<&str> {
        self.artifact_locator.as_deref()
    }

    /// Locator of a reviewer's report for the current iteration
    pub fn review_locator(&self, reviewer: &str) -> Option<&str> {
        self.review_locators.get(reviewer).map(String::as_str)
    }

    /// All review locators recorded in the current iteration
    pub fn review_locators(&self) -> &HashMap<String, String> {
        &self.review_locators
    }

    /// Verdict of a reviewer for the current iteration
    pub fn verdict(&self, reviewer: &str) -> Option<Verdict> {
        self.verdicts.get(reviewer).copied()
    }

    /// All verdicts recorded in the current iteration
    pub fn verdicts(&self) -> &HashMap<String, Verdict> {
        &self.verdicts
    }

    /// Whether the loop terminated via unanimous approval
    pub fn final_approved(&self) -> bool {
        self.final_approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = CycleState::new();
        assert_eq!(state.iteration(), 0);
        assert!(state.artifact_locator().is_none());
        assert!(state.verdicts().is_empty());
        assert!(!state.final_approved());
    }

    #[test]
    fn test_start_iteration_clears_reviews() {
        let mut state = CycleState::new();
        state.start_iteration();
        state.record_artifact("a/b/code.py");
        state.record_review("lead", "a/b/review.md", Verdict::Approved);

        state.start_iteration();
        assert_eq!(state.iteration(), 2);
        assert!(state.verdicts().is_empty());
        assert!(state.review_locators().is_empty());
        // Artifact locator survives across iterations
        assert_eq!(state.artifact_locator(), Some("a/b/code.py"));
    }

    #[test]
    fn test_freshly_cleared_state_is_not_approved() {
        let mut state = CycleState::new();
        state.start_iteration();
        state.record_review("lead", "r.md", Verdict::Approved);
        state.record_review("security", "s.md", Verdict::Approved);
        assert!(state.all_approved(&["lead", "security"]));

        // Clearing law: a new iteration immediately reads as not-approved
        state.start_iteration();
        assert!(!state.all_approved(&["lead", "security"]));
    }

    #[test]
    fn test_all_approved_missing_entry_counts_as_rejection() {
        let mut state = CycleState::new();
        state.start_iteration();
        state.record_review("lead", "r.md", Verdict::Approved);
        assert!(!state.all_approved(&["lead", "security"]));
    }

    #[test]
    fn test_all_approved_mixed_verdicts() {
        let mut state = CycleState::new();
        state.start_iteration();
        state.record_review("lead", "r.md", Verdict::Approved);
        state.record_review("security", "s.md", Verdict::ChangesRequested);
        assert!(!state.all_approved(&["lead", "security"]));

        state.record_review("security", "s.md", Verdict::Approved);
        assert!(state.all_approved(&["lead", "security"]));
    }

    #[test]
    fn test_record_failure_is_changes_requested() {
        let mut state = CycleState::new();
        state.start_iteration();
        state.record_failure("security");
        assert_eq!(state.verdict("security"), Some(Verdict::ChangesRequested));
        assert!(state.review_locator("security").is_none());
    }

    #[test]
    fn test_reset_returns_to_initial() {
        let mut state = CycleState::new();
        state.start_iteration();
        state.record_artifact("code.py");
        state.record_review("lead", "r.md", Verdict::Approved);
        state.mark_approved();

        state.reset();
        assert_eq!(state.iteration(), 0);
        assert!(state.artifact_locator().is_none());
        assert!(state.verdicts().is_empty());
        assert!(!state.final_approved());
    }
}
