//! Architecture stage - from requirements to technical design and ticket
//!
//! The Lead Engineer turns the requirements document into a technical
//! architecture; a ticket file (architecture + implementation tasks) is
//! written to the local output directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyre::{Result, WrapErr};
use serde::Serialize;
use tracing::{debug, info};

use crate::agents::{Agent, AgentRole};
use crate::config::Config;
use crate::domain::ArchitectureReport;
use crate::host::safe_name;
use crate::llm::LlmClient;
use crate::prompts::PromptLoader;

#[derive(Serialize)]
struct ArchitectureContext<'a> {
    product_name: &'a str,
    prd_content: &'a str,
}

/// The architecture stage
pub struct ArchitectureStage {
    lead_engineer: Agent,
    prompts: Arc<PromptLoader>,
    output_dir: PathBuf,
}

impl ArchitectureStage {
    /// Create the architecture stage from shared resources
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, config: &Config) -> Result<Self> {
        debug!("ArchitectureStage::new: called");
        let lead_engineer = Agent::for_role(
            AgentRole::LeadEngineer,
            &prompts,
            llm,
            &config.llm.model,
            config.llm.max_tokens,
        )?;

        Ok(Self {
            lead_engineer,
            prompts,
            output_dir: config.pipeline.output_dir.clone(),
        })
    }

    /// Create the technical architecture and ticket file
    ///
    /// `prd_path` is referenced in the ticket header when the requirements
    /// document came from a file.
    pub async fn run(
        &self,
        product_name: &str,
        prd_content: &str,
        prd_path: Option<&Path>,
    ) -> Result<ArchitectureReport> {
        debug!(%product_name, prd_len = prd_content.len(), "ArchitectureStage::run: called");
        info!("Creating architecture for: {}", product_name);

        let prompt = self.prompts.render(
            "architecture",
            &ArchitectureContext {
                product_name,
                prd_content,
            },
        )?;
        let architecture = self
            .lead_engineer
            .run(prompt)
            .await
            .wrap_err("Architecture design step failed")?;
        info!("Architecture design completed");

        let ticket_path = self.write_ticket(product_name, &architecture, prd_path).await?;
        info!("Ticket saved to: {}", ticket_path.display());

        Ok(ArchitectureReport {
            ticket_path,
            architecture,
        })
    }

    /// Write the ticket file with the architecture and a status header
    async fn write_ticket(&self, product_name: &str, architecture: &str, prd_path: Option<&Path>) -> Result<PathBuf> {
        debug!(%product_name, "ArchitectureStage::write_ticket: called");
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .wrap_err("Failed to create output directory")?;

        let now = chrono::Local::now();
        let filename = format!("ticket_{}_{}.md", safe_name(product_name), now.format("%Y%m%d_%H%M%S"));
        let path = self.output_dir.join(filename);

        let content = format!(
            "# Architecture & Implementation Ticket\n\
             \n\
             **Product/Feature:** {}\n\
             **Created:** {}\n\
             \n\
             ---\n\
             \n\
             {}\n\
             \n\
             ---\n\
             \n\
             **Status:** Ready for Implementation\n\
             **PRD Reference:** {}\n",
            product_name,
            now.format("%Y-%m-%d %H:%M:%S"),
            architecture,
            prd_path.map(|p| p.display().to_string()).unwrap_or_else(|| "N/A".to_string()),
        );

        tokio::fs::write(&path, content)
            .await
            .wrap_err_with(|| format!("Failed to write ticket to {}", path.display()))?;

        Ok(path)
    }
}
