//! Approval cycle module for Crew
//!
//! The approval loop drives produce → review × N iterations: a producer step
//! creates or revises an artifact, each reviewer step renders a verdict, and
//! the cycle repeats until every reviewer approves or the iteration cap is
//! reached. State is owned by a single run and never shared, so concurrent
//! pipelines cannot corrupt each other.

mod config;
mod engine;
mod gate;
mod state;

pub use config::{CycleConfig, DEFAULT_MAX_ITERATIONS, FailurePolicy};
pub use engine::{ApprovalLoop, CancelToken, CycleOutcome, CycleStatus, ProducerStep, Review, ReviewerStep};
pub use gate::{ReviewGate, Verdict};
pub use state::CycleState;
