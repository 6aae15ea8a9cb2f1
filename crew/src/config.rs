//! Crew configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cycle::{DEFAULT_MAX_ITERATIONS, FailurePolicy};

/// Main Crew configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Repository host configuration
    pub host: HostConfig,

    /// Pipeline behavior
    pub pipeline: PipelineConfig,

    /// Research stage configuration
    pub research: ResearchConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); CLI flag wins
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that required environment variables are set. Call this early
    /// in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        if std::env::var(&self.host.token_env).is_err() {
            return Err(eyre::eyre!(
                "Repository host token not found. Set the {} environment variable.",
                self.host.token_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .crew.yml
        let local_config = PathBuf::from(".crew.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/crew/crew.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("crew").join("crew.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load only the log level, for use before logging is initialized
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .map_err(|_| eyre::eyre!("Environment variable {} is not set", self.api_key_env))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 16384,
            timeout_ms: 300_000,
        }
    }
}

/// Repository host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the access token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Branch that artifacts are committed to
    pub branch: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Default repository owner (overridable from the CLI)
    pub owner: Option<String>,

    /// Default repository name (overridable from the CLI)
    pub repo: Option<String>,
}

impl HostConfig {
    /// Read the access token from the configured environment variable
    pub fn get_token(&self) -> Result<String> {
        std::env::var(&self.token_env).map_err(|_| eyre::eyre!("Environment variable {} is not set", self.token_env))
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            branch: "main".to_string(),
            timeout_ms: 60_000,
            owner: None,
            repo: None,
        }
    }
}

/// Pipeline behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum produce-review rounds in the implementation cycle
    #[serde(rename = "max-iterations")]
    pub max_iterations: u32,

    /// What to do when a producer or reviewer step fails
    #[serde(rename = "failure-policy")]
    pub failure_policy: FailurePolicy,

    /// Directory for local artifacts (requirements docs, tickets)
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Implementation target language
    pub language: String,
}

impl PipelineConfig {
    /// File extension for the implementation target language
    pub fn implementation_extension(&self) -> &str {
        match self.language.to_lowercase().as_str() {
            "python" => "py",
            "rust" => "rs",
            "typescript" => "ts",
            "javascript" => "js",
            "go" => "go",
            "java" => "java",
            _ => "txt",
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            failure_policy: FailurePolicy::default(),
            output_dir: PathBuf::from("output"),
            language: "python".to_string(),
        }
    }
}

/// Research stage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Reference URLs fetched as research material
    pub sources: Vec<String>,

    /// Fetch timeout in milliseconds
    #[serde(rename = "fetch-timeout-ms")]
    pub fetch_timeout_ms: u64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            fetch_timeout_ms: 30_000,
        }
    }
}
