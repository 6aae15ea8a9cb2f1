//! Integration tests for Crew
//!
//! These tests verify end-to-end behavior of the approval loop and the
//! supporting configuration, driving the public API the way a host
//! application would.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use crew::config::Config;
use crew::cycle::{
    ApprovalLoop, CancelToken, CycleConfig, CycleState, CycleStatus, FailurePolicy, ProducerStep, Review, ReviewGate,
    ReviewerStep, Verdict,
};

// =============================================================================
// Test steps
// =============================================================================

/// Producer that stamps its artifact locator with a label and iteration
struct LabelledProducer {
    label: String,
    calls: Arc<AtomicU32>,
}

impl LabelledProducer {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl ProducerStep for LabelledProducer {
    fn name(&self) -> &str {
        "producer"
    }

    async fn produce(&self, state: &CycleState) -> eyre::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent runs interleave
        tokio::task::yield_now().await;
        Ok(format!("{}/code-iter{}.py", self.label, state.iteration()))
    }
}

/// Reviewer that writes scripted report texts through the real gate
struct ScriptedReviewer {
    name: String,
    gate: ReviewGate,
    reports: Vec<String>,
}

impl ScriptedReviewer {
    fn boxed(name: &str, reports: &[&str]) -> Box<dyn ReviewerStep> {
        Box::new(Self {
            name: name.to_string(),
            gate: ReviewGate::code_review(),
            reports: reports.iter().map(|s| s.to_string()).collect(),
        })
    }
}

#[async_trait]
impl ReviewerStep for ScriptedReviewer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn review(&self, state: &CycleState) -> eyre::Result<Review> {
        let idx = (state.iteration() as usize).saturating_sub(1);
        let report = self
            .reports
            .get(idx)
            .or_else(|| self.reports.last())
            .cloned()
            .unwrap_or_default();

        Ok(Review {
            locator: format!("reviews/{}-iter{}.md", self.name, state.iteration()),
            verdict: self.gate.classify(&report),
        })
    }
}

// =============================================================================
// Scenario tests (report texts flow through the real gate)
// =============================================================================

#[tokio::test]
async fn test_scenario_a_both_approve_first_iteration() {
    // Task "Export to CSV", both reviewers approve on iteration 1
    let producer = LabelledProducer::new("export-to-csv");
    let reviewers = vec![
        ScriptedReviewer::boxed("reviewer1", &["Review Status: APPROVED"]),
        ScriptedReviewer::boxed("reviewer2", &["Looks solid. APPROVED"]),
    ];

    let outcome = ApprovalLoop::new(CycleConfig::default())
        .run(&producer, &reviewers)
        .await
        .unwrap();

    assert!(outcome.approved());
    assert_eq!(outcome.iterations, 1);
    assert!(outcome.state.final_approved());
}

#[tokio::test]
async fn test_scenario_b_rejection_runs_to_cap() {
    // Reviewer returns CHANGES_REQUESTED on every iteration
    let producer = LabelledProducer::new("widget");
    let reviewers = vec![ScriptedReviewer::boxed(
        "reviewer1",
        &["CHANGES_REQUESTED: missing null check"],
    )];

    let outcome = ApprovalLoop::new(CycleConfig::default())
        .run(&producer, &reviewers)
        .await
        .unwrap();

    assert!(!outcome.approved());
    assert_eq!(outcome.status, CycleStatus::CapReached);
    assert_eq!(outcome.iterations, 3);
    // Exactly 3 produce calls, never a fourth
    assert_eq!(producer.calls.load(Ordering::SeqCst), 3);
    // Last recorded review locator is non-empty
    let locator = outcome.state.review_locator("reviewer1").unwrap();
    assert!(!locator.is_empty());
    assert!(locator.contains("iter3"));
}

#[tokio::test]
async fn test_scenario_c_split_then_unanimous() {
    // Reviewer1 approves on iteration 1; reviewer2 requests changes on 1,
    // approves on 2
    let producer = LabelledProducer::new("widget");
    let reviewers = vec![
        ScriptedReviewer::boxed("reviewer1", &["APPROVED", "APPROVED"]),
        ScriptedReviewer::boxed("reviewer2", &["changes requested: naming", "APPROVED"]),
    ];

    let outcome = ApprovalLoop::new(CycleConfig::default())
        .run(&producer, &reviewers)
        .await
        .unwrap();

    assert!(outcome.approved());
    assert_eq!(outcome.iterations, 2);
}

#[tokio::test]
async fn test_ambiguous_report_never_approves() {
    // A reviewer whose reports carry no marker at all fails closed
    let producer = LabelledProducer::new("widget");
    let reviewers = vec![ScriptedReviewer::boxed("reviewer1", &["looks okay I guess"])];

    let outcome = ApprovalLoop::new(CycleConfig::default())
        .run(&producer, &reviewers)
        .await
        .unwrap();

    assert!(!outcome.approved());
    assert_eq!(outcome.iterations, 3);
}

// =============================================================================
// Concurrency: independent runs never observe each other's state
// =============================================================================

#[tokio::test]
async fn test_concurrent_runs_do_not_share_state() {
    let fast_producer = LabelledProducer::new("fast");
    let slow_producer = LabelledProducer::new("slow");

    let fast_reviewers = vec![ScriptedReviewer::boxed("reviewer", &["APPROVED"])];
    let slow_reviewers = vec![ScriptedReviewer::boxed("reviewer", &["CHANGES_REQUESTED: nope"])];

    let fast_loop = ApprovalLoop::new(CycleConfig::default());
    let slow_loop = ApprovalLoop::new(CycleConfig::default());

    let (fast, slow) = tokio::join!(
        fast_loop.run(&fast_producer, &fast_reviewers),
        slow_loop.run(&slow_producer, &slow_reviewers),
    );

    let fast = fast.unwrap();
    let slow = slow.unwrap();

    // Each run saw only its own iteration count and verdicts
    assert!(fast.approved());
    assert_eq!(fast.iterations, 1);
    assert_eq!(fast.state.verdict("reviewer"), Some(Verdict::Approved));

    assert!(!slow.approved());
    assert_eq!(slow.iterations, 3);
    assert_eq!(slow.state.verdict("reviewer"), Some(Verdict::ChangesRequested));

    // Artifact locators never leaked across runs
    assert!(fast.state.artifact_locator().unwrap().starts_with("fast/"));
    assert!(slow.state.artifact_locator().unwrap().starts_with("slow/"));
}

// =============================================================================
// Failure policy
// =============================================================================

struct ExplodingReviewer;

#[async_trait]
impl ReviewerStep for ExplodingReviewer {
    fn name(&self) -> &str {
        "exploding"
    }

    async fn review(&self, _state: &CycleState) -> eyre::Result<Review> {
        Err(eyre::eyre!("remote review store unavailable"))
    }
}

#[tokio::test]
async fn test_conservative_policy_never_approves_a_failed_step() {
    let producer = LabelledProducer::new("widget");
    let reviewers: Vec<Box<dyn ReviewerStep>> = vec![Box::new(ExplodingReviewer)];

    let outcome = ApprovalLoop::new(CycleConfig::default())
        .run(&producer, &reviewers)
        .await
        .unwrap();

    // The failed step was counted as changes-requested, never approved
    assert_eq!(outcome.status, CycleStatus::CapReached);
    assert_eq!(outcome.state.verdict("exploding"), Some(Verdict::ChangesRequested));
}

#[tokio::test]
async fn test_abort_policy_surfaces_the_step_error() {
    let producer = LabelledProducer::new("widget");
    let reviewers: Vec<Box<dyn ReviewerStep>> = vec![Box::new(ExplodingReviewer)];
    let config = CycleConfig {
        failure_policy: FailurePolicy::Abort,
        ..Default::default()
    };

    let result = ApprovalLoop::new(config).run(&producer, &reviewers).await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("exploding"));
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancellation_between_iterations() {
    struct CancellingReviewer {
        token: CancelToken,
    }

    #[async_trait]
    impl ReviewerStep for CancellingReviewer {
        fn name(&self) -> &str {
            "canceller"
        }

        async fn review(&self, _state: &CycleState) -> eyre::Result<Review> {
            // Request cancellation mid-run; rejection keeps the loop going
            self.token.cancel();
            Ok(Review {
                locator: "reviews/canceller.md".to_string(),
                verdict: Verdict::ChangesRequested,
            })
        }
    }

    let token = CancelToken::new();
    let producer = LabelledProducer::new("widget");
    let reviewers: Vec<Box<dyn ReviewerStep>> = vec![Box::new(CancellingReviewer { token: token.clone() })];

    let outcome = ApprovalLoop::new(CycleConfig::default())
        .with_cancel(token)
        .run(&producer, &reviewers)
        .await
        .unwrap();

    // The run stopped at the next checkpoint instead of exhausting the cap
    assert_eq!(outcome.status, CycleStatus::Cancelled);
    assert_eq!(outcome.iterations, 1);
}

// =============================================================================
// Config validation
// =============================================================================

#[test]
#[serial_test::serial]
fn test_config_validation_missing_api_key() {
    let mut config = Config::default();
    config.llm.api_key_env = "NONEXISTENT_TEST_API_KEY_12345".to_string();

    let result = config.validate();

    assert!(result.is_err(), "Should fail without API key");
    let err = result.unwrap_err().to_string();
    assert!(
        err.contains("NONEXISTENT_TEST_API_KEY_12345"),
        "Error should mention the env var"
    );
}

#[test]
#[serial_test::serial]
fn test_config_validation_with_keys_set() {
    // SAFETY: serialized test, no concurrent env access
    unsafe {
        std::env::set_var("ANTHROPIC_API_KEY", "test-key");
        std::env::set_var("GITHUB_TOKEN", "test-token");
    }

    let config = Config::default();
    let result = config.validate();

    // SAFETY: serialized test, no concurrent env access
    unsafe {
        std::env::remove_var("ANTHROPIC_API_KEY");
        std::env::remove_var("GITHUB_TOKEN");
    }

    assert!(result.is_ok(), "Should pass with both keys set");
}
