//! Contains definitions of common types (pull request, repository name, changed file) needed
//! for working with GitHub repositories.
use std::fmt::{Debug, Display, Formatter};

use url::Url;

pub mod api;
mod error;
pub mod server;
pub mod webhook;

pub use error::AppError;
pub use webhook::WebhookSecret;

/// Unique identifier of a GitHub repository
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct GithubRepoName {
    owner: String,
    name: String,
}

impl GithubRepoName {
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_lowercase(),
            name: name.to_lowercase(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for GithubRepoName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}/{}", self.owner, self.name))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PullRequestNumber(pub u64);

impl From<u64> for PullRequestNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for PullRequestNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <u64 as Display>::fmt(&self.0, f)
    }
}

/// A pull request that should be reviewed, as described by a webhook payload.
#[derive(Clone, Debug, PartialEq)]
pub struct PullRequestRef {
    pub repository: GithubRepoName,
    pub number: PullRequestNumber,
    /// Location of the unified diff document of the PR, if GitHub sent it.
    pub diff_url: Option<Url>,
    pub author: String,
    pub title: String,
}

impl Display for PullRequestRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.repository, self.number)
    }
}

/// A single file changed by a pull request.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    /// Unified diff fragment. GitHub omits it for binary files, pure renames
    /// and very large changes.
    pub patch: Option<String>,
}
