//! Pipeline input types

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scope of the work being delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Complete product built from scratch
    Product,
    /// Single feature or enhancement
    #[default]
    Feature,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Product => write!(f, "product"),
            Scope::Feature => write!(f, "feature"),
        }
    }
}

/// What the pipeline is asked to deliver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInput {
    /// Name of the product/feature
    pub product_name: String,

    /// Description of what needs to be built or enhanced
    pub product_context: String,

    /// Who will use this
    pub target_audience: Option<String>,

    /// Original user request, verbatim
    pub user_prompt: Option<String>,

    /// Product from scratch vs single feature
    pub scope: Scope,

    /// Conduct problem/market research (products only)
    pub enable_research: bool,

    /// Conduct competitor analysis (products only)
    pub enable_competitor_analysis: bool,
}

impl PipelineInput {
    /// Create an input with the common fields
    pub fn new(product_name: impl Into<String>, product_context: impl Into<String>) -> Self {
        let product_name = product_name.into();
        debug!(%product_name, "PipelineInput::new: called");
        Self {
            product_name,
            product_context: product_context.into(),
            target_audience: None,
            user_prompt: None,
            scope: Scope::default(),
            enable_research: false,
            enable_competitor_analysis: false,
        }
    }

    /// Set the work scope
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the target audience
    pub fn with_target_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = Some(audience.into());
        self
    }

    /// Set the original user request
    pub fn with_user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.user_prompt = Some(prompt.into());
        self
    }

    /// Enable market research and/or competitor analysis
    pub fn with_research(mut self, research: bool, competitors: bool) -> Self {
        self.enable_research = research;
        self.enable_competitor_analysis = competitors;
        self
    }

    /// Whether the research stage should run at all
    ///
    /// Research only applies to products built from scratch, and only when a
    /// research flag is enabled. This is a typed decision - nothing sniffs
    /// prose to find out.
    pub fn research_enabled(&self) -> bool {
        let enabled =
            self.scope == Scope::Product && (self.enable_research || self.enable_competitor_analysis);
        debug!(scope = %self.scope, enabled, "PipelineInput::research_enabled: called");
        enabled
    }
}

/// Target repository for implementation artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Repository owner/organization (e.g. "my-org")
    pub owner: String,

    /// Repository name (e.g. "my-app")
    pub repo: String,
}

impl ProjectContext {
    /// Create a project context
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// "owner/repo" form
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Browser URL of the repository
    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}
