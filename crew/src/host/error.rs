//! Repo host error types

use thiserror::Error;

/// Errors that can occur talking to the repository host
#[derive(Debug, Error)]
pub enum HostError {
    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Repository not found: {owner}/{repo}")]
    RepoNotFound { owner: String, repo: String },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HostError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            HostError::ApiError { status, .. } => *status >= 500 || *status == 429,
            HostError::Network(_) => true,
            _ => false,
        }
    }

    /// Check if this is a not-found error (file or repository)
    pub fn is_not_found(&self) -> bool {
        matches!(self, HostError::NotFound { .. } | HostError::RepoNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(
            HostError::ApiError {
                status: 503,
                message: "unavailable".to_string()
            }
            .is_retryable()
        );
        assert!(
            HostError::ApiError {
                status: 429,
                message: "rate limited".to_string()
            }
            .is_retryable()
        );
        assert!(
            !HostError::ApiError {
                status: 404,
                message: "missing".to_string()
            }
            .is_retryable()
        );
        assert!(!HostError::NotFound { path: "a.md".to_string() }.is_retryable());
    }

    #[test]
    fn test_is_not_found() {
        assert!(HostError::NotFound { path: "x".to_string() }.is_not_found());
        assert!(
            HostError::RepoNotFound {
                owner: "o".to_string(),
                repo: "r".to_string()
            }
            .is_not_found()
        );
        assert!(!HostError::InvalidResponse("bad".to_string()).is_not_found());
    }
}
