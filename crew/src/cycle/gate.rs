//! Verdict classification for reviewer reports
//!
//! Reviewers write free-text reports for humans; the gate turns that text
//! into exactly one verdict for the control flow. Negative markers take
//! precedence over positive markers, and text with no marker at all is
//! classified as changes-requested. An approval pipeline fails closed.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of classifying one reviewer's report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Reviewer signed off on the artifact
    Approved,
    /// Reviewer requested changes (or the report was ambiguous)
    ChangesRequested,
}

impl Verdict {
    /// Check if this verdict is an approval
    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Approved => write!(f, "approved"),
            Verdict::ChangesRequested => write!(f, "changes_requested"),
        }
    }
}

/// Classifies free-text reviewer reports into verdicts
///
/// Matching is case-insensitive substring search. Precedence:
/// 1. Any negative marker (or negative pair, both halves present) rejects.
/// 2. Otherwise any positive marker approves.
/// 3. Otherwise the report is ambiguous and rejects (fail closed).
#[derive(Debug, Clone)]
pub struct ReviewGate {
    negative_markers: Vec<String>,
    positive_markers: Vec<String>,
    negative_pairs: Vec<(String, String)>,
}

impl ReviewGate {
    /// Create a gate with explicit marker sets
    pub fn new<N, P>(negative: N, positive: P) -> Self
    where
        N: IntoIterator<Item = &'static str>,
        P: IntoIterator<Item = &'static str>,
    {
        Self {
            negative_markers: negative.into_iter().map(str::to_lowercase).collect(),
            positive_markers: positive.into_iter().map(str::to_lowercase).collect(),
            negative_pairs: Vec::new(),
        }
    }

    /// Add a negative pair: the report rejects when both halves appear
    pub fn with_negative_pair(mut self, a: &str, b: &str) -> Self {
        self.negative_pairs.push((a.to_lowercase(), b.to_lowercase()));
        self
    }

    /// Gate for code-quality reviews (Lead Engineer)
    pub fn code_review() -> Self {
        debug!("ReviewGate::code_review: called");
        Self::new(["changes_requested", "changes requested"], ["approved"])
    }

    /// Gate for security reviews (Security Engineer)
    ///
    /// Security reviewers use CHANGES_REQUIRED as their rejection marker and
    /// sometimes report severities without an explicit status line, so a
    /// critical finding or a high-severity vulnerability mention rejects on
    /// its own.
    pub fn security_review() -> Self {
        debug!("ReviewGate::security_review: called");
        Self::new(
            [
                "changes_required",
                "changes required",
                "changes_requested",
                "changes requested",
                "critical",
            ],
            ["approved"],
        )
        .with_negative_pair("high", "vulnerab")
    }

    /// Classify a report into exactly one verdict
    ///
    /// Never fails: a report with no recognizable marker is a defined
    /// outcome (ChangesRequested), not an error.
    pub fn classify(&self, report: &str) -> Verdict {
        debug!(report_len = report.len(), "ReviewGate::classify: called");
        let text = report.to_lowercase();

        if self.negative_markers.iter().any(|m| text.contains(m.as_str())) {
            debug!("ReviewGate::classify: negative marker found");
            return Verdict::ChangesRequested;
        }

        if self
            .negative_pairs
            .iter()
            .any(|(a, b)| text.contains(a.as_str()) && text.contains(b.as_str()))
        {
            debug!("ReviewGate::classify: negative pair found");
            return Verdict::ChangesRequested;
        }

        if self.positive_markers.iter().any(|m| text.contains(m.as_str())) {
            debug!("ReviewGate::classify: positive marker found");
            return Verdict::Approved;
        }

        debug!("ReviewGate::classify: no marker found, failing closed");
        Verdict::ChangesRequested
    }
}
