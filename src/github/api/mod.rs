use std::time::Duration;

use anyhow::Context;
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;
use secrecy::{ExposeSecret, SecretString};

pub mod client;

pub use client::GithubRepositoryClient;

/// How long do we wait for a single GitHub request (API call or diff download) before giving up.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn base_github_url() -> &'static str {
    "https://api.github.com"
}

/// Creates a GitHub client authenticated with a personal (or installation) access token.
/// All relative routes are resolved against `base_url`.
///
/// The built-in retry layer of octocrab is disabled, retries are done by
/// [`perform_retryable`](crate::utils::timing::perform_retryable) only.
pub fn create_github_client(token: &SecretString, base_url: &str) -> anyhow::Result<Octocrab> {
    Octocrab::builder()
        .base_uri(base_url)
        .with_context(|| format!("Invalid GitHub API URL {base_url}"))?
        .personal_token(token.expose_secret().clone())
        .add_retry_config(RetryConfig::None)
        .build()
        .context("Could not create octocrab client")
}
