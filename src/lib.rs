//! This is the library of the pull request review bot.
pub mod config;
pub mod github;
pub mod llm;
pub mod review;
pub mod utils;

#[cfg(test)]
mod tests;

pub use config::{
    require_secret, ConfigError, DiffStrategy, ReviewConfig, DEFAULT_MAX_PATCH_CHARS,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE,
};
pub use github::api::{base_github_url, create_github_client, GithubRepositoryClient};
pub use github::server::{create_app, ServerState};
pub use github::WebhookSecret;
pub use llm::{base_openai_url, CompletionClient, OpenAiClient};
pub use review::{
    handle_review_event, DiffSource, DirectFetchDiffSource, FileListDiffSource, RepositoryClient,
    ReviewContext, ReviewError,
};

pub(crate) const USER_AGENT: &str = concat!("reviewbot/", env!("CARGO_PKG_VERSION"));
