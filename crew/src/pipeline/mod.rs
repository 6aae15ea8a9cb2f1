//! Delivery pipeline for Crew
//!
//! Chains the stages with typed hand-offs: discovery produces the
//! requirements document, architecture turns it into a technical design and
//! ticket, the implementation cycle builds and reviews the code in the
//! target repository. Each stage is also runnable on its own from the CLI.

mod architecture;
mod discovery;
mod implementation;
mod research;

pub use architecture::ArchitectureStage;
pub use discovery::DiscoveryStage;
pub use implementation::{ImplementationCycle, ImplementationRequest};
pub use research::{ResearchStage, fetch_references};

use std::sync::Arc;

use eyre::Result;
use tracing::{debug, info};

use crate::config::Config;
use crate::cycle::CancelToken;
use crate::domain::{PipelineInput, PipelineReport, ProjectContext, generate_run_id};
use crate::host::RepoHost;
use crate::llm::LlmClient;
use crate::prompts::PromptLoader;

/// The full discovery → architecture → implementation pipeline
pub struct Pipeline {
    llm: Arc<dyn LlmClient>,
    host: Arc<dyn RepoHost>,
    prompts: Arc<PromptLoader>,
    config: Config,
    cancel: Option<CancelToken>,
}

impl Pipeline {
    /// Create a pipeline from shared resources
    pub fn new(config: Config, llm: Arc<dyn LlmClient>, host: Arc<dyn RepoHost>, prompts: Arc<PromptLoader>) -> Self {
        debug!("Pipeline::new: called");
        Self {
            llm,
            host,
            prompts,
            config,
            cancel: None,
        }
    }

    /// Attach a cancellation token (checked between implementation steps)
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run the discovery stage alone
    pub async fn discover(&self, input: &PipelineInput) -> Result<crate::domain::DiscoveryReport> {
        debug!(product = %input.product_name, "Pipeline::discover: called");
        let stage = DiscoveryStage::new(self.llm.clone(), self.prompts.clone(), &self.config)?;
        stage.run(input).await
    }

    /// Run the architecture stage alone
    pub async fn architect(
        &self,
        product_name: &str,
        prd_content: &str,
        prd_path: Option<&std::path::Path>,
    ) -> Result<crate::domain::ArchitectureReport> {
        debug!(%product_name, "Pipeline::architect: called");
        let stage = ArchitectureStage::new(self.llm.clone(), self.prompts.clone(), &self.config)?;
        stage.run(product_name, prd_content, prd_path).await
    }

    /// Run the implementation cycle alone
    pub async fn implement(&self, request: &ImplementationRequest) -> Result<crate::domain::ImplementationReport> {
        debug!(product = %request.product_name, "Pipeline::implement: called");
        let mut cycle = ImplementationCycle::new(
            self.llm.clone(),
            self.host.clone(),
            self.prompts.clone(),
            self.config.clone(),
        );
        if let Some(token) = &self.cancel {
            cycle = cycle.with_cancel(token.clone());
        }
        cycle.run(request).await
    }

    /// Run the full pipeline
    ///
    /// `task_description` defaults to the product context when not given.
    pub async fn run(
        &self,
        input: &PipelineInput,
        project: &ProjectContext,
        task_description: Option<&str>,
    ) -> Result<PipelineReport> {
        let run_id = generate_run_id();
        debug!(%run_id, product = %input.product_name, "Pipeline::run: called");
        info!("Starting delivery pipeline {} for: {}", run_id, input.product_name);

        let discovery = self.discover(input).await?;
        info!("Discovery complete: {}", discovery.document_path.display());

        let architecture = self
            .architect(&input.product_name, &discovery.content, Some(&discovery.document_path))
            .await?;
        info!("Architecture complete: {}", architecture.ticket_path.display());

        let request = ImplementationRequest {
            product_name: input.product_name.clone(),
            task_description: task_description.unwrap_or(&input.product_context).to_string(),
            technical_document: architecture.architecture.clone(),
            project: project.clone(),
        };
        let implementation = self.implement(&request).await?;

        info!(
            "Pipeline {} complete: status={}, iterations={}",
            run_id, implementation.status, implementation.iterations
        );

        Ok(PipelineReport {
            run_id,
            discovery,
            architecture,
            implementation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunStatus;
    use crate::host::mock::InMemoryHost;
    use crate::llm::client::mock::MockLlmClient;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_full_pipeline_chains_stages() {
        let temp = tempdir().unwrap();
        let mut config = Config::default();
        config.pipeline.output_dir = temp.path().to_path_buf();

        // One reply per sequential LLM call: analysis, synthesis,
        // requirements, architecture, development, code review, security
        // review
        let llm = Arc::new(MockLlmClient::replies([
            "analysis output",
            "synthesis output",
            "# Requirements\n\nbuild the exporter",
            "# Architecture\n\ncomponents and tasks",
            "def export(): pass",
            "Review Status: APPROVED",
            "Security Status: APPROVED",
        ]));
        let host = Arc::new(InMemoryHost::new());
        let pipeline = Pipeline::new(config, llm, host.clone(), Arc::new(PromptLoader::embedded_only()));

        let input = PipelineInput::new("Export to CSV", "Export reports as CSV files");
        let project = ProjectContext::new("my-org", "my-app");
        let report = pipeline.run(&input, &project, None).await.unwrap();

        assert!(report.approved());
        assert_eq!(report.implementation.status, RunStatus::Approved);
        assert_eq!(report.implementation.iterations, 1);
        assert!(report.discovery.document_path.exists());
        assert!(report.architecture.ticket_path.exists());
        assert!(report.run_id.starts_with("run-"));

        // The implementation landed in the host at the deterministic path
        assert_eq!(
            host.file(&project, &report.implementation.code_path),
            Some("def export(): pass".to_string())
        );

        // Final summary carries the terminal status and every locator
        let rendered = report.render();
        assert!(rendered.contains("APPROVED"));
        assert!(rendered.contains("software_engineer_export_to_csv.py"));
    }

    #[tokio::test]
    async fn test_pipeline_reports_partial_success_at_cap() {
        let temp = tempdir().unwrap();
        let mut config = Config::default();
        config.pipeline.output_dir = temp.path().to_path_buf();

        let llm = Arc::new(MockLlmClient::repeating("CHANGES_REQUESTED: not good enough"));
        let host = Arc::new(InMemoryHost::new());
        let pipeline = Pipeline::new(config, llm, host, Arc::new(PromptLoader::embedded_only()));

        let input = PipelineInput::new("Widget", "A widget");
        let project = ProjectContext::new("my-org", "my-app");
        let report = pipeline.run(&input, &project, Some("build the widget")).await.unwrap();

        assert!(!report.approved());
        assert_eq!(report.implementation.status, RunStatus::CompletedWithNotes);
        assert_eq!(report.implementation.iterations, 3);
        // Partial success still reports the artifact locations
        assert!(report.implementation.code_review_path.is_some());
    }
}
