//! Repository host capability for Crew
//!
//! Agents exchange artifacts through files in the target repository: the
//! Software Engineer writes implementations, reviewers read them and write
//! reports back. This module provides the host trait and the GitHub
//! implementation.

use async_trait::async_trait;

mod error;
mod github;
mod paths;

pub use error::HostError;
pub use github::GitHubHost;
pub use paths::{ArtifactPaths, DEV_TEAM_DIR, safe_name};

use crate::domain::ProjectContext;

/// A file retrieved from the host
#[derive(Debug, Clone)]
pub struct RemoteFile {
    /// Decoded file content
    pub content: String,

    /// Blob SHA, required when overwriting the file
    pub sha: String,
}

/// Remote repository host (GitHub or a stand-in)
///
/// All methods are idempotent from the pipeline's point of view:
/// `ensure_repository` is check-then-create, `put_file` creates or updates.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Ensure the target repository exists, creating it when missing
    ///
    /// Returns true if the repository was created by this call. Must not
    /// attempt creation when the repository already exists.
    async fn ensure_repository(&self, project: &ProjectContext, description: &str) -> Result<bool, HostError>;

    /// Read a file from the repository's default branch
    async fn get_file(&self, project: &ProjectContext, path: &str) -> Result<RemoteFile, HostError>;

    /// Create or update a file on the repository's default branch
    async fn put_file(
        &self,
        project: &ProjectContext,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<(), HostError>;
}
