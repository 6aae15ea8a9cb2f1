//! Crew - Multi-Agent Software Delivery Pipeline
//!
//! CLI entry point for running the delivery pipeline and its stages.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use crew::agents::AgentRole;
use crew::cli::{Cli, Command};
use crew::config::Config;
use crew::cycle::CancelToken;
use crew::domain::{PipelineInput, ProjectContext, RunStatus, Scope};
use crew::host::GitHubHost;
use crew::llm::create_client;
use crew::pipeline::{ArchitectureStage, DiscoveryStage, ImplementationRequest, Pipeline};
use crew::prompts::PromptLoader;

/// Exit code for a run that reached the iteration cap without approval
///
/// Distinct from generic failure (1): the artifacts exist and are reported,
/// they just never got unanimous approval.
const EXIT_NOT_APPROVED: i32 = 2;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crew")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = if let Some(s) = level_str {
        match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        }
    } else {
        tracing::Level::INFO
    };

    let log_file = fs::File::create(log_dir.join("crew.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("Crew loaded config: model={}", config.llm.model);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            product_name,
            product_context,
            target_audience,
            user_prompt,
            scope,
            enable_research,
            enable_competitor_analysis,
            owner,
            repo,
            task,
            language,
            max_iterations,
        } => {
            let input = build_input(
                product_name,
                product_context,
                target_audience,
                user_prompt,
                scope,
                enable_research,
                enable_competitor_analysis,
            );
            cmd_run(config, input, owner, repo, task, language, max_iterations).await
        }
        Command::Discover {
            product_name,
            product_context,
            target_audience,
            user_prompt,
            scope,
            enable_research,
            enable_competitor_analysis,
        } => {
            let input = build_input(
                product_name,
                product_context,
                target_audience,
                user_prompt,
                scope,
                enable_research,
                enable_competitor_analysis,
            );
            cmd_discover(config, input).await
        }
        Command::Architect {
            prd_file,
            product_name,
        } => cmd_architect(config, prd_file, product_name).await,
        Command::Implement {
            architecture_file,
            product_name,
            task,
            owner,
            repo,
            language,
            max_iterations,
        } => {
            cmd_implement(
                config,
                architecture_file,
                product_name,
                task,
                owner,
                repo,
                language,
                max_iterations,
            )
            .await
        }
        Command::Roles => cmd_roles(),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_input(
    product_name: String,
    product_context: String,
    target_audience: Option<String>,
    user_prompt: Option<String>,
    scope: Scope,
    enable_research: bool,
    enable_competitor_analysis: bool,
) -> PipelineInput {
    let mut input = PipelineInput::new(product_name, product_context)
        .with_scope(scope)
        .with_research(enable_research, enable_competitor_analysis);
    if let Some(audience) = target_audience {
        input = input.with_target_audience(audience);
    }
    if let Some(prompt) = user_prompt {
        input = input.with_user_prompt(prompt);
    }
    input
}

/// Resolve the target repository from CLI args and config defaults
fn resolve_project(config: &Config, owner: Option<String>, repo: Option<String>) -> Result<ProjectContext> {
    let owner = owner
        .or_else(|| config.host.owner.clone())
        .ok_or_else(|| eyre::eyre!("No repository owner given. Use --owner or set host.owner in config."))?;
    let repo = repo
        .or_else(|| config.host.repo.clone())
        .ok_or_else(|| eyre::eyre!("No repository name given. Use --repo or set host.repo in config."))?;
    Ok(ProjectContext::new(owner, repo))
}

/// Spawn a Ctrl+C handler that cancels the pipeline between steps
fn spawn_cancel_handler() -> CancelToken {
    let token = CancelToken::new();
    let handler_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, cancelling after the current step");
            eprintln!("\nCancelling after the current step finishes...");
            handler_token.cancel();
        }
    });
    token
}

/// Run the full pipeline
#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    config: Config,
    input: PipelineInput,
    owner: Option<String>,
    repo: Option<String>,
    task: Option<String>,
    language: Option<String>,
    max_iterations: Option<u32>,
) -> Result<()> {
    debug!(product = %input.product_name, "cmd_run: called");
    let mut config = config;
    if let Some(max) = max_iterations {
        config.pipeline.max_iterations = max;
    }
    if let Some(language) = language {
        config.pipeline.language = language;
    }
    config.validate()?;

    let project = resolve_project(&config, owner, repo)?;

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let host = Arc::new(GitHubHost::from_config(&config.host).context("Failed to create host client")?);
    let prompts = Arc::new(PromptLoader::new(std::env::current_dir()?));
    let token = spawn_cancel_handler();

    println!("Running delivery pipeline");
    println!("  Product: {}", input.product_name);
    println!("  Scope: {}", input.scope);
    println!("  Repository: {}", project.full_name());
    println!("  Max iterations: {}", config.pipeline.max_iterations);
    println!();

    let pipeline = Pipeline::new(config, llm, host, prompts).with_cancel(token);
    let report = pipeline.run(&input, &project, task.as_deref()).await?;

    println!("{}", report.render());
    print_status_line(report.implementation.status);

    if !report.approved() {
        std::process::exit(EXIT_NOT_APPROVED);
    }
    Ok(())
}

/// Run discovery only
async fn cmd_discover(config: Config, input: PipelineInput) -> Result<()> {
    debug!(product = %input.product_name, "cmd_discover: called");
    // Discovery never touches the repository host; only the LLM key matters
    config
        .llm
        .get_api_key()
        .context("LLM API key not found. Check api-key-env in your config.")?;

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let prompts = Arc::new(PromptLoader::new(std::env::current_dir()?));
    let stage = DiscoveryStage::new(llm, prompts, &config)?;

    println!("Running discovery for: {} ({})", input.product_name, input.scope);
    let report = stage.run(&input).await?;

    println!();
    println!("{}", report.content);
    println!();
    println!(
        "{} Requirements document saved to: {}",
        "✓".green(),
        report.document_path.display()
    );
    Ok(())
}

/// Run architecture only
async fn cmd_architect(config: Config, prd_file: PathBuf, product_name: String) -> Result<()> {
    debug!(?prd_file, %product_name, "cmd_architect: called");
    config
        .llm
        .get_api_key()
        .context("LLM API key not found. Check api-key-env in your config.")?;

    let prd_content = fs::read_to_string(&prd_file)
        .context(format!("Failed to read PRD file {}", prd_file.display()))?;

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let prompts = Arc::new(PromptLoader::new(std::env::current_dir()?));
    let stage = ArchitectureStage::new(llm, prompts, &config)?;

    println!("Running architecture design for: {}", product_name);
    let report = stage.run(&product_name, &prd_content, Some(&prd_file)).await?;

    println!();
    println!("{}", report.architecture);
    println!();
    println!("{} Ticket saved to: {}", "✓".green(), report.ticket_path.display());
    Ok(())
}

/// Run the implementation cycle only
#[allow(clippy::too_many_arguments)]
async fn cmd_implement(
    config: Config,
    architecture_file: PathBuf,
    product_name: String,
    task: String,
    owner: Option<String>,
    repo: Option<String>,
    language: Option<String>,
    max_iterations: Option<u32>,
) -> Result<()> {
    debug!(?architecture_file, %product_name, "cmd_implement: called");
    let mut config = config;
    if let Some(max) = max_iterations {
        config.pipeline.max_iterations = max;
    }
    if let Some(language) = language {
        config.pipeline.language = language;
    }
    config.validate()?;

    let project = resolve_project(&config, owner, repo)?;
    let technical_document = fs::read_to_string(&architecture_file)
        .context(format!("Failed to read architecture file {}", architecture_file.display()))?;

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let host = Arc::new(GitHubHost::from_config(&config.host).context("Failed to create host client")?);
    let prompts = Arc::new(PromptLoader::new(std::env::current_dir()?));
    let token = spawn_cancel_handler();

    println!("Running implementation cycle");
    println!("  Product: {}", product_name);
    println!("  Repository: {}", project.full_name());
    println!("  Max iterations: {}", config.pipeline.max_iterations);
    println!();

    let pipeline = Pipeline::new(config, llm, host, prompts).with_cancel(token);
    let request = ImplementationRequest {
        product_name,
        task_description: task,
        technical_document,
        project,
    };
    let report = pipeline.implement(&request).await?;

    println!("{}", report.render());
    print_status_line(report.status);

    if !report.approved() {
        std::process::exit(EXIT_NOT_APPROVED);
    }
    Ok(())
}

/// List the delivery-team roles
fn cmd_roles() -> Result<()> {
    debug!("cmd_roles: called");
    println!("Delivery-team roles:");
    println!();
    for role in AgentRole::all() {
        println!("  {}", role.name());
        println!("    {}", role.description());
        println!();
    }
    Ok(())
}

fn print_status_line(status: RunStatus) {
    match status {
        RunStatus::Approved => {
            println!("{} All reviews approved", "✓".green());
        }
        RunStatus::CompletedWithNotes => {
            println!(
                "{} Completed without full approval - artifacts reported above",
                "⚠".yellow()
            );
        }
    }
}
