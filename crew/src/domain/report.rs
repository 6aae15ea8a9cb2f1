//! Typed stage reports
//!
//! Each pipeline stage returns a report carrying the fields the next stage
//! (or the user) needs. Locators and statuses are plain fields here - the
//! control flow never re-parses them out of narrative text.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cycle::Verdict;
use crate::domain::ProjectContext;

/// Terminal status of an implementation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every reviewer approved
    Approved,
    /// Iteration cap reached; result usable but flagged
    CompletedWithNotes,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Approved => write!(f, "APPROVED"),
            RunStatus::CompletedWithNotes => write!(f, "COMPLETED_WITH_NOTES"),
        }
    }
}

/// Result of the discovery stage
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    /// Where the requirements document was written
    pub document_path: PathBuf,

    /// Requirements document content
    pub content: String,

    /// Whether research actually ran
    pub research_conducted: bool,
}

/// Result of the architecture stage
#[derive(Debug, Clone)]
pub struct ArchitectureReport {
    /// Where the ticket file was written
    pub ticket_path: PathBuf,

    /// Technical architecture content
    pub architecture: String,
}

/// Result of the implementation cycle
#[derive(Debug, Clone)]
pub struct ImplementationReport {
    /// Product/feature name
    pub product_name: String,

    /// Terminal status
    pub status: RunStatus,

    /// Iterations actually used
    pub iterations: u32,

    /// Last code review verdict, if the reviewer ran
    pub code_review: Option<Verdict>,

    /// Last security review verdict, if the reviewer ran
    pub security_review: Option<Verdict>,

    /// Target repository
    pub project: ProjectContext,

    /// Implementation file path in the repository
    pub code_path: String,

    /// Code review report path in the repository
    pub code_review_path: Option<String>,

    /// Security review report path in the repository
    pub security_review_path: Option<String>,
}

impl ImplementationReport {
    /// Whether the run terminated via unanimous approval
    pub fn approved(&self) -> bool {
        self.status == RunStatus::Approved
    }

    /// Render the final summary for the user
    ///
    /// Always includes the status, iteration count and every artifact
    /// locator - a non-approval outcome still reports where everything is.
    pub fn render(&self) -> String {
        let verdict_line = |v: &Option<Verdict>| v.map(|v| v.to_string()).unwrap_or_else(|| "not run".to_string());

        format!(
            "## Implementation Cycle Complete\n\
             \n\
             **Product/Feature**: {}\n\
             **Status**: `{}`\n\
             **Iterations**: {}\n\
             **Code Review**: {}\n\
             **Security Review**: {}\n\
             \n\
             ### Repository\n\
             - [{}]({})\n\
             \n\
             ### Output Files\n\
             - **Code**: `{}`\n\
             - **Code Review**: `{}`\n\
             - **Security Review**: `{}`\n",
            self.product_name,
            self.status,
            self.iterations,
            verdict_line(&self.code_review),
            verdict_line(&self.security_review),
            self.project.full_name(),
            self.project.url(),
            self.code_path,
            self.code_review_path.as_deref().unwrap_or("n/a"),
            self.security_review_path.as_deref().unwrap_or("n/a"),
        )
    }
}

/// Result of the full discovery → architecture → implementation pipeline
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Run identifier
    pub run_id: String,

    /// Discovery stage result
    pub discovery: DiscoveryReport,

    /// Architecture stage result
    pub architecture: ArchitectureReport,

    /// Implementation stage result
    pub implementation: ImplementationReport,
}

impl PipelineReport {
    /// Whether the implementation cycle was fully approved
    pub fn approved(&self) -> bool {
        self.implementation.approved()
    }

    /// Render the final summary for the user
    pub fn render(&self) -> String {
        format!(
            "# Delivery Pipeline Complete ({})\n\
             \n\
             **Requirements**: `{}`\n\
             **Ticket**: `{}`\n\
             \n\
             {}",
            self.run_id,
            self.discovery.document_path.display(),
            self.architecture.ticket_path.display(),
            self.implementation.render(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report(status: RunStatus) -> ImplementationReport {
        ImplementationReport {
            product_name: "Export to CSV".to_string(),
            status,
            iterations: 2,
            code_review: Some(Verdict::Approved),
            security_review: Some(Verdict::ChangesRequested),
            project: ProjectContext::new("my-org", "my-app"),
            code_path: ".dev-team/implementations/software_engineer_export_to_csv.py".to_string(),
            code_review_path: Some(".dev-team/code_reviews/lead_engineer_review_export_to_csv.md".to_string()),
            security_review_path: None,
        }
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RunStatus::Approved.to_string(), "APPROVED");
        assert_eq!(RunStatus::CompletedWithNotes.to_string(), "COMPLETED_WITH_NOTES");
    }

    #[test]
    fn test_render_includes_locators_on_non_approval() {
        let report = sample_report(RunStatus::CompletedWithNotes);
        let rendered = report.render();

        // Non-approval still reports status, iterations and every locator
        assert!(rendered.contains("COMPLETED_WITH_NOTES"));
        assert!(rendered.contains("**Iterations**: 2"));
        assert!(rendered.contains("software_engineer_export_to_csv.py"));
        assert!(rendered.contains("lead_engineer_review_export_to_csv.md"));
        assert!(rendered.contains("n/a"));
        assert!(rendered.contains("https://github.com/my-org/my-app"));
    }

    #[test]
    fn test_approved_accessor() {
        assert!(sample_report(RunStatus::Approved).approved());
        assert!(!sample_report(RunStatus::CompletedWithNotes).approved());
    }
}
