//! The review pipeline: diff acquisition, prompt construction, completion request and
//! publication of the review comment.
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ReviewConfig;
use crate::github::{ChangedFile, GithubRepoName, PullRequestNumber};
use crate::llm::CompletionClient;

pub mod comment;
pub mod diff;
mod error;
pub mod event;
mod handlers;
pub mod prompt;
pub mod request;

pub use diff::{DiffMaterial, DiffSource, DirectFetchDiffSource, FileListDiffSource};
pub use error::{ReviewError, ReviewStage};
pub use handlers::handle_review_event;

use comment::Comment;

/// Provides functionality for working with pull requests of a remote repository.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// List the files changed by the given pull request, in the order returned by GitHub.
    async fn list_changed_files(
        &self,
        repo: &GithubRepoName,
        pr: PullRequestNumber,
    ) -> anyhow::Result<Vec<ChangedFile>>;

    /// Post a comment to the pull request with the given number.
    async fn post_comment(
        &self,
        repo: &GithubRepoName,
        pr: PullRequestNumber,
        comment: &Comment,
    ) -> anyhow::Result<()>;
}

/// Everything a review needs: the collaborators and the read-only configuration.
/// Constructed once at startup and shared by all deliveries.
pub struct ReviewContext {
    pub repository_client: Arc<dyn RepositoryClient>,
    pub diff_source: Arc<dyn DiffSource>,
    pub completion_client: Arc<dyn CompletionClient>,
    pub config: ReviewConfig,
}

impl ReviewContext {
    pub fn new(
        repository_client: Arc<dyn RepositoryClient>,
        diff_source: Arc<dyn DiffSource>,
        completion_client: Arc<dyn CompletionClient>,
        config: ReviewConfig,
    ) -> Self {
        Self {
            repository_client,
            diff_source,
            completion_client,
            config,
        }
    }
}
