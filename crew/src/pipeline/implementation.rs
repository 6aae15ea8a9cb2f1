//! Implementation stage - development with review loops
//!
//! Instantiates the approval loop with the delivery-team steps: the Software
//! Engineer produces (or revises) the implementation, then the Lead Engineer
//! and Security Engineer review it in order. All artifacts move through the
//! repository host at deterministic paths, so revision iterations overwrite
//! the same files and each step can re-read the others' output.

use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agents::{Agent, AgentRole};
use crate::config::Config;
use crate::cycle::{
    ApprovalLoop, CancelToken, CycleConfig, CycleState, CycleStatus, ProducerStep, Review, ReviewGate, ReviewerStep,
};
use crate::domain::{ImplementationReport, ProjectContext, RunStatus};
use crate::host::{ArtifactPaths, RepoHost};
use crate::llm::LlmClient;
use crate::prompts::PromptLoader;

/// Reviewer name keys in cycle state and reports
const CODE_REVIEWER: &str = "code_review";
const SECURITY_REVIEWER: &str = "security_review";

/// What the implementation cycle is asked to build
#[derive(Debug, Clone)]
pub struct ImplementationRequest {
    /// Product/feature name (drives artifact paths)
    pub product_name: String,

    /// Specific task to implement
    pub task_description: String,

    /// Technical architecture/specification document
    pub technical_document: String,

    /// Target repository
    pub project: ProjectContext,
}

#[derive(Serialize)]
struct DevelopmentContext<'a> {
    product_name: &'a str,
    task_description: &'a str,
    language: &'a str,
    technical_document: &'a str,
}

#[derive(Serialize)]
struct RevisionContext<'a> {
    product_name: &'a str,
    task_description: &'a str,
    language: &'a str,
    current_code: &'a str,
    code_review: &'a str,
    security_review: &'a str,
}

#[derive(Serialize)]
struct ReviewContext<'a> {
    product_name: &'a str,
    iteration: u32,
    code: &'a str,
}

/// Software Engineer producer step
struct DevelopmentStep {
    agent: Agent,
    host: Arc<dyn RepoHost>,
    prompts: Arc<PromptLoader>,
    request: ImplementationRequest,
    paths: ArtifactPaths,
    language: String,
}

#[async_trait]
impl ProducerStep for DevelopmentStep {
    fn name(&self) -> &str {
        "development"
    }

    async fn produce(&self, state: &CycleState) -> Result<String> {
        debug!(iteration = state.iteration(), "DevelopmentStep::produce: called");

        let (content, message) = if state.iteration() <= 1 {
            // First iteration: idempotent repository setup, then fresh build
            self.host
                .ensure_repository(
                    &self.request.project,
                    &format!("Implementation for {}", self.request.product_name),
                )
                .await
                .wrap_err("Repository setup failed")?;

            let prompt = self.prompts.render(
                "development",
                &DevelopmentContext {
                    product_name: &self.request.product_name,
                    task_description: &self.request.task_description,
                    language: &self.language,
                    technical_document: &self.request.technical_document,
                },
            )?;

            info!("Development iteration {} (initial build)", state.iteration());
            let content = self.agent.run(prompt).await?;
            let message = format!("feat: implement {}", self.request.product_name);
            (content, message)
        } else {
            // Revision: re-read the code and both review reports from their
            // deterministic locations
            let current_code = self
                .host
                .get_file(&self.request.project, &self.paths.code)
                .await
                .wrap_err("Failed to read current code for revision")?
                .content;

            let code_review = self.read_review(&self.paths.code_review).await;
            let security_review = self.read_review(&self.paths.security_review).await;

            let prompt = self.prompts.render(
                "development-revision",
                &RevisionContext {
                    product_name: &self.request.product_name,
                    task_description: &self.request.task_description,
                    language: &self.language,
                    current_code: &current_code,
                    code_review: &code_review,
                    security_review: &security_review,
                },
            )?;

            info!("Development iteration {} (revision)", state.iteration());
            let content = self.agent.run(prompt).await?;
            let message = format!("fix: address review feedback for {}", self.request.product_name);
            (content, message)
        };

        self.host
            .put_file(&self.request.project, &self.paths.code, &content, &message)
            .await
            .wrap_err("Failed to write implementation")?;

        info!(
            "Code saved to {}/{}",
            self.request.project.full_name(),
            self.paths.code
        );
        Ok(self.paths.code.clone())
    }
}

impl DevelopmentStep {
    /// Read one review report, degrading when the reviewer never wrote it
    async fn read_review(&self, path: &str) -> String {
        debug!(%path, "DevelopmentStep::read_review: called");
        match self.host.get_file(&self.request.project, path).await {
            Ok(file) => file.content,
            Err(e) if e.is_not_found() => {
                warn!(%path, "Review report not found; revising without it");
                "(review report not available)".to_string()
            }
            Err(e) => {
                warn!(%path, error = %e, "Failed to read review report; revising without it");
                "(review report not available)".to_string()
            }
        }
    }
}

/// A reviewer step: read the code, generate a report, classify it, save it
struct ReviewStep {
    name: &'static str,
    template: &'static str,
    commit_prefix: &'static str,
    agent: Agent,
    gate: ReviewGate,
    host: Arc<dyn RepoHost>,
    prompts: Arc<PromptLoader>,
    request: ImplementationRequest,
    code_path: String,
    report_path: String,
}

#[async_trait]
impl ReviewerStep for ReviewStep {
    fn name(&self) -> &str {
        self.name
    }

    async fn review(&self, state: &CycleState) -> Result<Review> {
        debug!(reviewer = self.name, iteration = state.iteration(), "ReviewStep::review: called");

        let code = self
            .host
            .get_file(&self.request.project, &self.code_path)
            .await
            .wrap_err("Failed to read code under review")?
            .content;

        let prompt = self.prompts.render(
            self.template,
            &ReviewContext {
                product_name: &self.request.product_name,
                iteration: state.iteration(),
                code: &code,
            },
        )?;

        let report = self.agent.run(prompt).await?;
        let verdict = self.gate.classify(&report);
        info!(reviewer = self.name, %verdict, "Review classified");

        let message = format!("{} for iteration {}", self.commit_prefix, state.iteration());
        self.host
            .put_file(&self.request.project, &self.report_path, &report, &message)
            .await
            .wrap_err("Failed to write review report")?;

        info!(
            "Review saved to {}/{}",
            self.request.project.full_name(),
            self.report_path
        );
        Ok(Review {
            locator: self.report_path.clone(),
            verdict,
        })
    }
}

/// The implementation cycle stage
pub struct ImplementationCycle {
    llm: Arc<dyn LlmClient>,
    host: Arc<dyn RepoHost>,
    prompts: Arc<PromptLoader>,
    config: Config,
    cancel: Option<CancelToken>,
}

impl ImplementationCycle {
    /// Create the implementation cycle from shared resources
    pub fn new(llm: Arc<dyn LlmClient>, host: Arc<dyn RepoHost>, prompts: Arc<PromptLoader>, config: Config) -> Self {
        debug!("ImplementationCycle::new: called");
        Self {
            llm,
            host,
            prompts,
            config,
            cancel: None,
        }
    }

    /// Attach a cancellation token checked between steps
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run the development/review cycle to a terminal outcome
    pub async fn run(&self, request: &ImplementationRequest) -> Result<ImplementationReport> {
        debug!(product = %request.product_name, repo = %request.project.full_name(), "ImplementationCycle::run: called");
        let paths = ArtifactPaths::for_product(&request.product_name, self.config.pipeline.implementation_extension());
        let model = &self.config.llm.model;
        let max_tokens = self.config.llm.max_tokens;

        let producer = DevelopmentStep {
            agent: Agent::for_role(AgentRole::SoftwareEngineer, &self.prompts, self.llm.clone(), model, max_tokens)?,
            host: self.host.clone(),
            prompts: self.prompts.clone(),
            request: request.clone(),
            paths: paths.clone(),
            language: self.config.pipeline.language.clone(),
        };

        // Reviewer order matters: the security reviewer runs after the code
        // reviewer, so its report lands second and revisions see both
        let reviewers: Vec<Box<dyn ReviewerStep>> = vec![
            Box::new(ReviewStep {
                name: CODE_REVIEWER,
                template: "code-review",
                commit_prefix: "docs: add code review",
                agent: Agent::for_role(AgentRole::LeadEngineer, &self.prompts, self.llm.clone(), model, max_tokens)?,
                gate: ReviewGate::code_review(),
                host: self.host.clone(),
                prompts: self.prompts.clone(),
                request: request.clone(),
                code_path: paths.code.clone(),
                report_path: paths.code_review.clone(),
            }),
            Box::new(ReviewStep {
                name: SECURITY_REVIEWER,
                template: "security-review",
                commit_prefix: "docs: add security review",
                agent: Agent::for_role(AgentRole::SecurityEngineer, &self.prompts, self.llm.clone(), model, max_tokens)?,
                gate: ReviewGate::security_review(),
                host: self.host.clone(),
                prompts: self.prompts.clone(),
                request: request.clone(),
                code_path: paths.code.clone(),
                report_path: paths.security_review.clone(),
            }),
        ];

        let cycle_config = CycleConfig {
            max_iterations: self.config.pipeline.max_iterations,
            failure_policy: self.config.pipeline.failure_policy,
        };
        let mut approval_loop = ApprovalLoop::new(cycle_config);
        if let Some(token) = &self.cancel {
            approval_loop = approval_loop.with_cancel(token.clone());
        }

        let outcome = approval_loop.run(&producer, &reviewers).await?;

        let status = match outcome.status {
            CycleStatus::Approved => RunStatus::Approved,
            CycleStatus::CapReached => RunStatus::CompletedWithNotes,
            CycleStatus::Cancelled => {
                warn!("Implementation cycle cancelled; reporting partial result");
                RunStatus::CompletedWithNotes
            }
        };

        let report = ImplementationReport {
            product_name: request.product_name.clone(),
            status,
            iterations: outcome.iterations,
            code_review: outcome.state.verdict(CODE_REVIEWER),
            security_review: outcome.state.verdict(SECURITY_REVIEWER),
            project: request.project.clone(),
            code_path: paths.code,
            code_review_path: outcome.state.review_locator(CODE_REVIEWER).map(str::to_string),
            security_review_path: outcome.state.review_locator(SECURITY_REVIEWER).map(str::to_string),
        };

        info!(
            "Implementation cycle complete: status={}, iterations={}",
            report.status, report.iterations
        );
        Ok(report)
    }
}
