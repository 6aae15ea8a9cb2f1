//! Crew - Multi-Agent Software Delivery Pipeline
//!
//! Crew wires LLM agents (Product Lead, Research, Lead Engineer, Software
//! Engineer, Security Engineer) into a multi-stage delivery pipeline:
//! requirements discovery → architecture design → implementation with review
//! loops, persisting artifacts to a repository host.
//!
//! # Core Concepts
//!
//! - **Typed Hand-offs**: stages exchange reports with plain fields, never
//!   by scanning prose for sentinels
//! - **Caller-Owned State**: each approval loop run owns its own state, so
//!   concurrent pipelines cannot interfere
//! - **Bounded Review Loop**: produce → review × N until unanimous approval
//!   or the iteration cap, always terminating
//! - **Fail-Closed Gate**: ambiguous reviewer text counts as
//!   changes-requested, never as approval
//!
//! # Modules
//!
//! - [`cycle`] - Verdict gate, cycle state, and the approval loop engine
//! - [`llm`] - LLM client trait and Anthropic implementation
//! - [`host`] - Repository host trait and GitHub implementation
//! - [`agents`] - Delivery-team roles and the agent runner
//! - [`prompts`] - Prompt template loading and rendering
//! - [`pipeline`] - Discovery, architecture, and implementation stages
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod agents;
pub mod cli;
pub mod config;
pub mod cycle;
pub mod domain;
pub mod host;
pub mod llm;
pub mod pipeline;
pub mod prompts;

// Re-export commonly used types
pub use agents::{Agent, AgentRole};
pub use config::{Config, HostConfig, LlmConfig, PipelineConfig, ResearchConfig};
pub use cycle::{
    ApprovalLoop, CancelToken, CycleConfig, CycleOutcome, CycleState, CycleStatus, FailurePolicy, ProducerStep,
    Review, ReviewGate, ReviewerStep, Verdict,
};
pub use domain::{
    ArchitectureReport, DiscoveryReport, ImplementationReport, PipelineInput, PipelineReport, ProjectContext,
    RunStatus, Scope, generate_run_id,
};
pub use host::{ArtifactPaths, GitHubHost, HostError, RemoteFile, RepoHost, safe_name};
pub use llm::{
    AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, StopReason, TokenUsage,
    create_client,
};
pub use pipeline::{ArchitectureStage, DiscoveryStage, ImplementationCycle, ImplementationRequest, Pipeline};
pub use prompts::PromptLoader;
