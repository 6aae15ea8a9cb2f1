//! GitHub REST API host implementation
//!
//! Uses the contents API for file reads/writes (base64 on the wire) and the
//! repos API for the idempotent ensure-repository check. Transient errors are
//! retried with exponential backoff.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{HostError, RemoteFile, RepoHost};
use crate::config::HostConfig;
use crate::domain::ProjectContext;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 500;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// GitHub REST API client
pub struct GitHubHost {
    base_url: String,
    token: String,
    branch: String,
    http: Client,
}

impl GitHubHost {
    /// Create a new client from configuration
    ///
    /// Reads the access token from the environment variable named in config.
    pub fn from_config(config: &HostConfig) -> Result<Self, HostError> {
        debug!(base_url = %config.base_url, "GitHubHost::from_config: called");
        let token = config
            .get_token()
            .map_err(|e| HostError::InvalidResponse(e.to_string()))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent("crew/0.1")
            .build()
            .map_err(HostError::Network)?;

        Ok(Self {
            base_url: config.base_url.clone(),
            token,
            branch: config.branch.clone(),
            http,
        })
    }

    /// Send a request with bounded retry on transient failures
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, HostError> {
        debug!(%method, %url, has_body = body.is_some(), "GitHubHost::send: called");
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, %url, "send: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let mut request = self
                .http
                .request(method.clone(), url)
                .header("authorization", format!("Bearer {}", self.token))
                .header("accept", "application/vnd.github+json")
                .header("x-github-api-version", "2022-11-28");

            if let Some(json) = body {
                request = request.json(json);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "send: network error");
                    last_error = Some(HostError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();
            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "send: retryable status");
                last_error = Some(HostError::ApiError { status, message: text });
                continue;
            }

            debug!(status, "send: response received");
            return Ok(response);
        }

        Err(last_error.unwrap_or_else(|| HostError::InvalidResponse("Max retries exceeded".to_string())))
    }

    fn contents_url(&self, project: &ProjectContext, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_url, project.owner, project.repo, path
        )
    }
}

#[async_trait]
impl RepoHost for GitHubHost {
    async fn ensure_repository(&self, project: &ProjectContext, description: &str) -> Result<bool, HostError> {
        debug!(repo = %project.full_name(), "GitHubHost::ensure_repository: called");

        // Check first - creation must not be attempted once the repo exists
        let url = format!("{}/repos/{}/{}", self.base_url, project.owner, project.repo);
        let response = self.send(Method::GET, &url, None).await?;

        if response.status().is_success() {
            debug!("ensure_repository: repository already exists");
            return Ok(false);
        }

        if response.status() != StatusCode::NOT_FOUND {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            debug!(status, "ensure_repository: unexpected status on existence check");
            return Err(HostError::ApiError { status, message: text });
        }

        info!("Creating repository {}", project.full_name());
        let create_url = format!("{}/user/repos", self.base_url);
        let body = serde_json::json!({
            "name": project.repo,
            "description": description,
            "private": false,
            "auto_init": true,
        });

        let response = self.send(Method::POST, &create_url, Some(&body)).await?;
        let status = response.status().as_u16();

        // 422 means the repo appeared between check and create - fine
        if response.status().is_success() || status == 422 {
            debug!(status, "ensure_repository: repository created");
            return Ok(status != 422);
        }

        let text = response.text().await.unwrap_or_default();
        Err(HostError::ApiError { status, message: text })
    }

    async fn get_file(&self, project: &ProjectContext, path: &str) -> Result<RemoteFile, HostError> {
        debug!(repo = %project.full_name(), %path, "GitHubHost::get_file: called");
        let url = format!("{}?ref={}", self.contents_url(project, path), self.branch);
        let response = self.send(Method::GET, &url, None).await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(%path, "get_file: not found");
            return Err(HostError::NotFound { path: path.to_string() });
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(HostError::ApiError { status, message: text });
        }

        let contents: ContentsResponse = response.json().await?;

        // The contents API wraps base64 at 60 columns
        let encoded: String = contents.content.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = BASE64
            .decode(&encoded)
            .map_err(|e| HostError::InvalidResponse(format!("Bad base64 content for {}: {}", path, e)))?;
        let content = String::from_utf8(decoded)
            .map_err(|e| HostError::InvalidResponse(format!("Non-UTF8 content for {}: {}", path, e)))?;

        debug!(%path, content_len = content.len(), "get_file: decoded");
        Ok(RemoteFile {
            content,
            sha: contents.sha,
        })
    }

    async fn put_file(
        &self,
        project: &ProjectContext,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), HostError> {
        debug!(repo = %project.full_name(), %path, content_len = content.len(), "GitHubHost::put_file: called");

        // Updating an existing file requires its blob sha
        let sha = match self.get_file(project, path).await {
            Ok(existing) => {
                debug!(%path, "put_file: updating existing file");
                Some(existing.sha)
            }
            Err(e) if e.is_not_found() => {
                debug!(%path, "put_file: creating new file");
                None
            }
            Err(e) => return Err(e),
        };

        let mut body = serde_json::json!({
            "message": message,
            "content": BASE64.encode(content),
            "branch": self.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::json!(sha);
        }

        let url = self.contents_url(project, path);
        let response = self.send(Method::PUT, &url, Some(&body)).await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            debug!(status, %path, "put_file: API error");
            return Err(HostError::ApiError { status, message: text });
        }

        info!("Wrote {} to {}", path, project.full_name());
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
}
