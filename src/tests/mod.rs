use std::sync::Arc;

use axum::Router;

use crate::config::ReviewConfig;
use crate::github::server::{create_app, ServerState, ServerStateRef};
use crate::github::{GithubRepoName, PullRequestNumber, PullRequestRef, WebhookSecret};
use crate::review::{DiffSource, FileListDiffSource, ReviewContext};


// Public re-exports for use in tests
pub use io::load_test_file;
pub use mocks::{TestCompletionClient, TestRepositoryClient};
pub use webhook::{create_webhook_request, sign_body, TEST_WEBHOOK_SECRET};

/// The pull request described by the `webhook/pull-request-*.json` fixtures.
pub fn default_pr() -> PullRequestRef {
    PullRequestRef {
        repository: GithubRepoName::new("acme", "widget"),
        number: PullRequestNumber(42),
        diff_url: None,
        author: "alice".to_string(),
        title: "Add frobnication support".to_string(),
    }
}

/// Assembles a review context out of in-memory collaborators.
pub struct ReviewContextBuilder {
    repository_client: Arc<TestRepositoryClient>,
    completion_client: Arc<TestCompletionClient>,
    diff_source: Option<Arc<dyn DiffSource>>,
    config: ReviewConfig,
}

impl Default for ReviewContextBuilder {
    fn default() -> Self {
        Self {
            repository_client: Arc::new(TestRepositoryClient::default()),
            completion_client: Arc::new(TestCompletionClient::default()),
            diff_source: None,
            config: ReviewConfig::default(),
        }
    }
}

impl ReviewContextBuilder {
    pub fn repository_client(self, client: TestRepositoryClient) -> Self {
        Self {
            repository_client: Arc::new(client),
            ..self
        }
    }

    pub fn completion_client(self, client: TestCompletionClient) -> Self {
        Self {
            completion_client: Arc::new(client),
            ..self
        }
    }

    /// By default, the changed files are listed through the test repository client.
    pub fn diff_source(self, source: Arc<dyn DiffSource>) -> Self {
        Self {
            diff_source: Some(source),
            ..self
        }
    }

    pub fn max_patch_chars(mut self, max_patch_chars: usize) -> Self {
        self.config.max_patch_chars = max_patch_chars;
        self
    }

    pub fn review_on_push(mut self, review_on_push: bool) -> Self {
        self.config.review_on_push = review_on_push;
        self
    }

    /// Handles for inspecting the calls made during the test.
    pub fn clients(&self) -> (Arc<TestRepositoryClient>, Arc<TestCompletionClient>) {
        (
            self.repository_client.clone(),
            self.completion_client.clone(),
        )
    }

    pub fn build(self) -> ReviewContext {
        let diff_source: Arc<dyn DiffSource> = match self.diff_source {
            Some(source) => source,
            None => Arc::new(FileListDiffSource::new(self.repository_client.clone())),
        };
        ReviewContext::new(
            self.repository_client,
            diff_source,
            self.completion_client,
            self.config,
        )
    }

    pub fn server_state(self) -> ServerStateRef {
        Arc::new(self.into_state())
    }

    pub fn app(self) -> Router {
        create_app(self.into_state())
    }

    fn into_state(self) -> ServerState {
        ServerState::new(
            WebhookSecret::new(TEST_WEBHOOK_SECRET.to_string()),
            Arc::new(self.build()),
        )
    }
}
