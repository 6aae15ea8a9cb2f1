//! Discovery stage - from request to requirements document
//!
//! Steps: analysis → conditional research → synthesis → requirements
//! document. The document format depends on scope: structured PRD for
//! products, simple goal/acceptance-criteria document for features. The
//! document is written to the local output directory and handed to the next
//! stage as a typed report.

use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Result, WrapErr};
use serde::Serialize;
use tracing::{debug, info};

use crate::agents::{Agent, AgentRole};
use crate::config::Config;
use crate::domain::{DiscoveryReport, PipelineInput, Scope};
use crate::host::safe_name;
use crate::llm::LlmClient;
use crate::prompts::PromptLoader;

use super::research::ResearchStage;

#[derive(Serialize)]
struct AnalysisContext<'a> {
    product_name: &'a str,
    product_context: &'a str,
    scope: String,
    target_audience: &'a str,
    user_prompt: &'a str,
}

#[derive(Serialize)]
struct SynthesisContext<'a> {
    product_name: &'a str,
    scope: String,
    analysis: &'a str,
    research: Option<&'a str>,
}

#[derive(Serialize)]
struct RequirementsContext<'a> {
    product_name: &'a str,
    product_context: &'a str,
    target_audience: &'a str,
    analysis: &'a str,
    synthesis: &'a str,
    research: Option<&'a str>,
}

/// The discovery stage
pub struct DiscoveryStage {
    analyst: Agent,
    synthesizer: Agent,
    product_lead: Agent,
    research: ResearchStage,
    prompts: Arc<PromptLoader>,
    output_dir: PathBuf,
}

impl DiscoveryStage {
    /// Create the discovery stage from shared resources
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, config: &Config) -> Result<Self> {
        debug!("DiscoveryStage::new: called");
        let model = &config.llm.model;
        let max_tokens = config.llm.max_tokens;

        let analyst = Agent::new(
            "Requirements Analyst",
            prompts.instructions("analyst")?,
            llm.clone(),
            model,
            max_tokens,
        );
        let synthesizer = Agent::new(
            "Requirements Synthesizer",
            prompts.instructions("synthesizer")?,
            llm.clone(),
            model,
            max_tokens,
        );
        let product_lead = Agent::for_role(AgentRole::ProductLead, &prompts, llm.clone(), model, max_tokens)?;
        let research = ResearchStage::new(llm, prompts.clone(), config.research.clone(), model, max_tokens)?;

        Ok(Self {
            analyst,
            synthesizer,
            product_lead,
            research,
            prompts,
            output_dir: config.pipeline.output_dir.clone(),
        })
    }

    /// Run discovery for the given input
    pub async fn run(&self, input: &PipelineInput) -> Result<DiscoveryReport> {
        debug!(product = %input.product_name, scope = %input.scope, "DiscoveryStage::run: called");
        info!("Starting discovery for: {}", input.product_name);

        // Step 1: analysis
        let analysis_prompt = self.prompts.render(
            "analysis",
            &AnalysisContext {
                product_name: &input.product_name,
                product_context: &input.product_context,
                scope: input.scope.to_string(),
                target_audience: input.target_audience.as_deref().unwrap_or("Not specified"),
                user_prompt: input.user_prompt.as_deref().unwrap_or("Not specified"),
            },
        )?;
        let analysis = self.analyst.run(analysis_prompt).await.wrap_err("Analysis step failed")?;
        info!("Analysis completed");

        // Step 2: conditional research (typed gating, decided by the input)
        let research = self.research.run(input).await?;
        let research_conducted = research.is_some();

        // Step 3: synthesis
        let synthesis_prompt = self.prompts.render(
            "synthesis",
            &SynthesisContext {
                product_name: &input.product_name,
                scope: input.scope.to_string(),
                analysis: &analysis,
                research: research.as_deref(),
            },
        )?;
        let synthesis = self
            .synthesizer
            .run(synthesis_prompt)
            .await
            .wrap_err("Synthesis step failed")?;
        info!("Synthesis completed");

        // Step 4: requirements document, format chosen by scope
        let template = match input.scope {
            Scope::Product => "prd-product",
            Scope::Feature => "prd-feature",
        };
        debug!(%template, "DiscoveryStage::run: rendering requirements prompt");
        let requirements_prompt = self.prompts.render(
            template,
            &RequirementsContext {
                product_name: &input.product_name,
                product_context: &input.product_context,
                target_audience: input.target_audience.as_deref().unwrap_or("Not specified"),
                analysis: &analysis,
                synthesis: &synthesis,
                research: research.as_deref(),
            },
        )?;
        let content = self
            .product_lead
            .run(requirements_prompt)
            .await
            .wrap_err("Requirements document step failed")?;

        let document_path = self.write_document(&input.product_name, &content).await?;
        info!("Requirements document saved to: {}", document_path.display());

        Ok(DiscoveryReport {
            document_path,
            content,
            research_conducted,
        })
    }

    /// Write the requirements document to the output directory
    async fn write_document(&self, product_name: &str, content: &str) -> Result<PathBuf> {
        debug!(%product_name, "DiscoveryStage::write_document: called");
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .wrap_err("Failed to create output directory")?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("prd_{}_{}.md", safe_name(product_name), timestamp);
        let path = self.output_dir.join(filename);

        tokio::fs::write(&path, content)
            .await
            .wrap_err_with(|| format!("Failed to write requirements document to {}", path.display()))?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use tempfile::tempdir;

    fn test_config(output_dir: PathBuf) -> Config {
        let mut config = Config::default();
        config.pipeline.output_dir = output_dir;
        config
    }

    #[tokio::test]
    async fn test_feature_discovery_without_research() {
        let temp = tempdir().unwrap();
        let llm = Arc::new(MockLlmClient::replies([
            "analysis output",
            "synthesis output",
            "# Feature Requirements\n\nthe document",
        ]));
        let stage = DiscoveryStage::new(
            llm,
            Arc::new(PromptLoader::embedded_only()),
            &test_config(temp.path().to_path_buf()),
        )
        .unwrap();

        let input = PipelineInput::new("Dark Mode Toggle", "Add dark mode to settings");
        let report = stage.run(&input).await.unwrap();

        assert!(!report.research_conducted);
        assert!(report.content.contains("the document"));
        assert!(report.document_path.exists());
        let filename = report.document_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(filename.starts_with("prd_dark_mode_toggle_"));
        assert!(filename.ends_with(".md"));
    }

    #[tokio::test]
    async fn test_product_discovery_with_research() {
        let temp = tempdir().unwrap();
        let llm = Arc::new(MockLlmClient::repeating("stage output"));
        let stage = DiscoveryStage::new(
            llm,
            Arc::new(PromptLoader::embedded_only()),
            &test_config(temp.path().to_path_buf()),
        )
        .unwrap();

        let input = PipelineInput::new("AI Assistant", "Help sales teams automate follow-ups")
            .with_scope(Scope::Product)
            .with_research(true, true);
        let report = stage.run(&input).await.unwrap();

        assert!(report.research_conducted);
        assert!(report.document_path.exists());
    }

    #[tokio::test]
    async fn test_document_content_written_to_disk() {
        let temp = tempdir().unwrap();
        let llm = Arc::new(MockLlmClient::replies(["a", "b", "final requirements text"]));
        let stage = DiscoveryStage::new(
            llm,
            Arc::new(PromptLoader::embedded_only()),
            &test_config(temp.path().to_path_buf()),
        )
        .unwrap();

        let input = PipelineInput::new("Widget", "A widget");
        let report = stage.run(&input).await.unwrap();

        let written = std::fs::read_to_string(&report.document_path).unwrap();
        assert_eq!(written, "final requirements text");
    }

    #[tokio::test]
    async fn test_analysis_failure_propagates() {
        let temp = tempdir().unwrap();
        let llm = Arc::new(MockLlmClient::new(vec![]));
        let stage = DiscoveryStage::new(
            llm,
            Arc::new(PromptLoader::embedded_only()),
            &test_config(temp.path().to_path_buf()),
        )
        .unwrap();

        let input = PipelineInput::new("Widget", "A widget");
        let result = stage.run(&input).await;
        assert!(result.is_err());
    }
}
