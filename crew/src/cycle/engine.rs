//! ApprovalLoop - drives produce → review × N iterations to a terminal outcome
//!
//! One run owns one `CycleState`. Steps run strictly sequentially: the
//! producer first, then each reviewer in order (later reviewers may be shown
//! earlier reviewers' output). The loop is bounded by `max_iterations`; there
//! is no unbounded-retry path. Step failures follow the configured
//! `FailurePolicy` and are never treated as approvals.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use eyre::WrapErr;
use tracing::{debug, info, warn};

use super::config::{CycleConfig, FailurePolicy};
use super::gate::Verdict;
use super::state::CycleState;

/// Typed result of one reviewer step
///
/// The free-text report lives at `locator`; the verdict is classified by the
/// step itself (via a `ReviewGate`), not parsed out of prose by the loop.
#[derive(Debug, Clone)]
pub struct Review {
    /// Where the report was written
    pub locator: String,

    /// Classified verdict for this iteration
    pub verdict: Verdict,
}

/// Creates or revises the artifact under review
///
/// On iteration 1 the producer builds the artifact from the task description;
/// on later iterations it builds a revision from the previous round's review
/// feedback (re-read from its deterministic locators). Returns where the
/// artifact was stored.
#[async_trait]
pub trait ProducerStep: Send + Sync {
    /// Step name for logging and error context
    fn name(&self) -> &str;

    /// Produce or revise the artifact, returning its locator
    async fn produce(&self, state: &CycleState) -> eyre::Result<String>;
}

/// Inspects the current artifact and renders a verdict
#[async_trait]
pub trait ReviewerStep: Send + Sync {
    /// Reviewer name; keys the per-reviewer verdict and locator maps
    fn name(&self) -> &str;

    /// Review the current artifact, returning the report locator and verdict
    async fn review(&self, state: &CycleState) -> eyre::Result<Review>;
}

/// Cooperative cancellation for a loop run
///
/// Checked at iteration boundaries and between steps; a long-running remote
/// call in flight is not interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a new, un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        debug!("CancelToken::cancel: called");
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How an approval loop run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Every reviewer approved
    Approved,
    /// The iteration cap was reached without unanimous approval
    ///
    /// A normal terminal outcome, not an error: the artifact and the last
    /// round's reports are still usable.
    CapReached,
    /// The caller cancelled the run between steps
    Cancelled,
}

impl std::fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleStatus::Approved => write!(f, "approved"),
            CycleStatus::CapReached => write!(f, "cap_reached"),
            CycleStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal result of an approval loop run
#[derive(Debug)]
pub struct CycleOutcome {
    /// Terminal status
    pub status: CycleStatus,

    /// Iterations actually executed
    pub iterations: u32,

    /// Final state: artifact locator, last round's review locators/verdicts
    pub state: CycleState,
}

impl CycleOutcome {
    /// Whether the run terminated via unanimous approval
    pub fn approved(&self) -> bool {
        self.status == CycleStatus::Approved
    }
}

/// Bounded produce-review loop
pub struct ApprovalLoop {
    config: CycleConfig,
    cancel: Option<CancelToken>,
}

impl ApprovalLoop {
    /// Create a loop with the given configuration
    pub fn new(config: CycleConfig) -> Self {
        debug!(
            max_iterations = config.max_iterations,
            ?config.failure_policy,
            "ApprovalLoop::new: called"
        );
        Self { config, cancel: None }
    }

    /// Attach a cancellation token checked between steps
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        debug!("ApprovalLoop::with_cancel: called");
        self.cancel = Some(token);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Run the loop to a terminal outcome
    ///
    /// Constructs a fresh `CycleState` owned by this run. Terminates within
    /// `max_iterations` passes regardless of reviewer output. With an empty
    /// reviewer list the first produced artifact is trivially approved.
    ///
    /// Step failures follow the configured policy: `Abort` propagates the
    /// error to the caller; `Conservative` records the failed reviewer as
    /// changes-requested (or skips the iteration's reviews on producer
    /// failure) and lets the cap bound the retries. The cap retries the whole
    /// produce-review cycle, never an individual step.
    pub async fn run(
        &self,
        producer: &dyn ProducerStep,
        reviewers: &[Box<dyn ReviewerStep>],
    ) -> eyre::Result<CycleOutcome> {
        debug!(
            producer = producer.name(),
            reviewer_count = reviewers.len(),
            max_iterations = self.config.max_iterations,
            "ApprovalLoop::run: called"
        );
        let mut state = CycleState::new();
        let required: Vec<String> = reviewers.iter().map(|r| r.name().to_string()).collect();

        info!(
            "Starting approval loop: producer={}, reviewers={:?}, max_iterations={}",
            producer.name(),
            required,
            self.config.max_iterations
        );

        while state.iteration() < self.config.max_iterations {
            if self.cancelled() {
                debug!(iteration = state.iteration(), "ApprovalLoop::run: cancelled before iteration");
                info!("Approval loop cancelled after {} iterations", state.iteration());
                return Ok(CycleOutcome {
                    status: CycleStatus::Cancelled,
                    iterations: state.iteration(),
                    state,
                });
            }

            state.start_iteration();
            info!(
                "Approval loop iteration {}/{}",
                state.iteration(),
                self.config.max_iterations
            );

            match producer.produce(&state).await {
                Ok(locator) => {
                    debug!(%locator, "ApprovalLoop::run: producer succeeded");
                    state.record_artifact(locator);
                }
                Err(e) => match self.config.failure_policy {
                    FailurePolicy::Abort => {
                        debug!(error = %e, "ApprovalLoop::run: producer failed, aborting");
                        return Err(e).wrap_err_with(|| format!("producer step '{}' failed", producer.name()));
                    }
                    FailurePolicy::Conservative => {
                        debug!(error = %e, "ApprovalLoop::run: producer failed, skipping iteration");
                        warn!(
                            iteration = state.iteration(),
                            error = %e,
                            "Producer step '{}' failed; skipping reviews this iteration",
                            producer.name()
                        );
                        continue;
                    }
                },
            }

            for reviewer in reviewers {
                if self.cancelled() {
                    debug!(reviewer = reviewer.name(), "ApprovalLoop::run: cancelled between steps");
                    info!("Approval loop cancelled during iteration {}", state.iteration());
                    return Ok(CycleOutcome {
                        status: CycleStatus::Cancelled,
                        iterations: state.iteration(),
                        state,
                    });
                }

                match reviewer.review(&state).await {
                    Ok(review) => {
                        debug!(
                            reviewer = reviewer.name(),
                            locator = %review.locator,
                            verdict = %review.verdict,
                            "ApprovalLoop::run: reviewer finished"
                        );
                        state.record_review(reviewer.name(), review.locator, review.verdict);
                    }
                    Err(e) => match self.config.failure_policy {
                        FailurePolicy::Abort => {
                            debug!(error = %e, "ApprovalLoop::run: reviewer failed, aborting");
                            return Err(e).wrap_err_with(|| format!("reviewer step '{}' failed", reviewer.name()));
                        }
                        FailurePolicy::Conservative => {
                            debug!(error = %e, "ApprovalLoop::run: reviewer failed, recording rejection");
                            warn!(
                                iteration = state.iteration(),
                                error = %e,
                                "Reviewer step '{}' failed; counting as changes-requested",
                                reviewer.name()
                            );
                            state.record_failure(reviewer.name());
                        }
                    },
                }
            }

            if state.all_approved(&required) {
                debug!(iteration = state.iteration(), "ApprovalLoop::run: all reviewers approved");
                state.mark_approved();
                let iterations = state.iteration();
                info!("Approval loop approved after {} iterations", iterations);
                return Ok(CycleOutcome {
                    status: CycleStatus::Approved,
                    iterations,
                    state,
                });
            }

            debug!(
                iteration = state.iteration(),
                verdicts = ?state.verdicts(),
                "ApprovalLoop::run: not all approved, continuing"
            );
        }

        let iterations = state.iteration();
        info!("Approval loop reached iteration cap ({}) without approval", iterations);
        Ok(CycleOutcome {
            status: CycleStatus::CapReached,
            iterations,
            state,
        })
    }
}
