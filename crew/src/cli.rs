//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::Scope;

/// Crew - multi-agent software delivery pipeline
#[derive(Parser)]
#[command(
    name = "crew",
    about = "Multi-agent software delivery pipeline orchestrator",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full pipeline: discovery -> architecture -> implementation
    Run {
        /// Product/feature name
        #[arg(long = "product-name")]
        product_name: String,

        /// Description of what needs to be built
        #[arg(long = "product-context")]
        product_context: String,

        /// Who will use this
        #[arg(long = "target-audience")]
        target_audience: Option<String>,

        /// Original user request, verbatim
        #[arg(long = "user-prompt")]
        user_prompt: Option<String>,

        /// Work scope
        #[arg(long, value_enum, default_value_t = Scope::Feature)]
        scope: Scope,

        /// Conduct market research (products only)
        #[arg(long = "enable-research")]
        enable_research: bool,

        /// Conduct competitor analysis (products only)
        #[arg(long = "enable-competitor-analysis")]
        enable_competitor_analysis: bool,

        /// Target repository owner (overrides config)
        #[arg(long)]
        owner: Option<String>,

        /// Target repository name (overrides config)
        #[arg(long)]
        repo: Option<String>,

        /// Specific task to implement (defaults to the product context)
        #[arg(long)]
        task: Option<String>,

        /// Implementation target language (overrides config)
        #[arg(long)]
        language: Option<String>,

        /// Maximum review iterations
        #[arg(short, long)]
        max_iterations: Option<u32>,
    },

    /// Run discovery only: create the requirements document
    Discover {
        /// Product/feature name
        #[arg(long = "product-name")]
        product_name: String,

        /// Description of what needs to be built
        #[arg(long = "product-context")]
        product_context: String,

        /// Who will use this
        #[arg(long = "target-audience")]
        target_audience: Option<String>,

        /// Original user request, verbatim
        #[arg(long = "user-prompt")]
        user_prompt: Option<String>,

        /// Work scope
        #[arg(long, value_enum, default_value_t = Scope::Feature)]
        scope: Scope,

        /// Conduct market research (products only)
        #[arg(long = "enable-research")]
        enable_research: bool,

        /// Conduct competitor analysis (products only)
        #[arg(long = "enable-competitor-analysis")]
        enable_competitor_analysis: bool,
    },

    /// Run architecture only: PRD file -> technical design and ticket
    Architect {
        /// Path to the requirements document
        #[arg(long = "prd-file")]
        prd_file: PathBuf,

        /// Product/feature name
        #[arg(long = "product-name")]
        product_name: String,
    },

    /// Run the implementation cycle only: architecture file -> reviewed code
    Implement {
        /// Path to the architecture/ticket file
        #[arg(long = "architecture-file")]
        architecture_file: PathBuf,

        /// Product/feature name
        #[arg(long = "product-name")]
        product_name: String,

        /// Specific task to implement
        #[arg(long)]
        task: String,

        /// Target repository owner (overrides config)
        #[arg(long)]
        owner: Option<String>,

        /// Target repository name (overrides config)
        #[arg(long)]
        repo: Option<String>,

        /// Implementation target language (overrides config)
        #[arg(long)]
        language: Option<String>,

        /// Maximum review iterations
        #[arg(short, long)]
        max_iterations: Option<u32>,
    },

    /// List the delivery-team roles
    Roles,
}
