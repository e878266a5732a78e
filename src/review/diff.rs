use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::github::{ChangedFile, PullRequestRef};
use crate::review::RepositoryClient;
use crate::USER_AGENT;

/// Diff documents are read up to this many bytes, the rest is dropped.
const MAX_DIFF_SIZE: usize = 10 * 1024 * 1024;

/// Reviewable changes of a pull request.
#[derive(Clone, Debug, PartialEq)]
pub enum DiffMaterial {
    /// Changed files as listed by the GitHub API.
    Files(Vec<ChangedFile>),
    /// The raw unified diff document of the pull request.
    Raw(String),
}

impl DiffMaterial {
    /// Does the pull request contain no detectable changes?
    pub fn is_empty(&self) -> bool {
        match self {
            DiffMaterial::Files(files) => files.is_empty(),
            DiffMaterial::Raw(diff) => diff.trim().is_empty(),
        }
    }
}

/// Produces reviewable diff material for a pull request.
#[async_trait]
pub trait DiffSource: Send + Sync {
    async fn acquire(&self, pr: &PullRequestRef) -> anyhow::Result<DiffMaterial>;
}

/// Enumerates the changed files of a pull request through the repository client.
pub struct FileListDiffSource {
    client: Arc<dyn RepositoryClient>,
}

impl FileListDiffSource {
    pub fn new(client: Arc<dyn RepositoryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DiffSource for FileListDiffSource {
    async fn acquire(&self, pr: &PullRequestRef) -> anyhow::Result<DiffMaterial> {
        let files = self
            .client
            .list_changed_files(&pr.repository, pr.number)
            .await?;
        Ok(DiffMaterial::Files(files))
    }
}

/// Downloads the unified diff document of a pull request.
///
/// Uses the `diff_url` from the webhook payload when it is present, otherwise asks the REST API
/// for the pull request in the diff media type.
pub struct DirectFetchDiffSource {
    client: reqwest::Client,
    api_url: Url,
    token: SecretString,
    max_size: usize,
}

impl DirectFetchDiffSource {
    pub fn new(api_url: &str, token: SecretString) -> anyhow::Result<Self> {
        // The trailing slash makes `Url::join` append to the path instead of replacing
        // its last segment (e.g. `/api/v3` on GitHub Enterprise).
        let api_url = Url::parse(&format!("{}/", api_url.trim_end_matches('/')))
            .with_context(|| format!("Invalid GitHub API URL {api_url}"))?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Cannot create HTTP client")?;
        Ok(Self {
            client,
            api_url,
            token,
            max_size: MAX_DIFF_SIZE,
        })
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    fn diff_url(&self, pr: &PullRequestRef) -> anyhow::Result<Url> {
        match &pr.diff_url {
            Some(url) => Ok(url.clone()),
            None => self
                .api_url
                .join(&format!(
                    "repos/{}/{}/pulls/{}",
                    pr.repository.owner(),
                    pr.repository.name(),
                    pr.number
                ))
                .context("Cannot build pull request API URL"),
        }
    }
}

#[async_trait]
impl DiffSource for DirectFetchDiffSource {
    async fn acquire(&self, pr: &PullRequestRef) -> anyhow::Result<DiffMaterial> {
        let url = self.diff_url(pr)?;
        tracing::debug!("Downloading diff of {pr} from {url}");

        let mut response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3.diff")
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .with_context(|| format!("Cannot download diff from {url}"))?
            .error_for_status()
            .with_context(|| format!("Diff download from {url} failed"))?;

        let mut body: Vec<u8> = vec![];
        while let Some(chunk) = response.chunk().await.context("Cannot read diff body")? {
            let remaining = self.max_size - body.len();
            if chunk.len() >= remaining {
                body.extend_from_slice(&chunk[..remaining]);
                if chunk.len() > remaining {
                    tracing::warn!("Diff of {pr} exceeds {} bytes, the rest is dropped", self.max_size);
                    break;
                }
            } else {
                body.extend_from_slice(&chunk);
            }
        }
        Ok(DiffMaterial::Raw(String::from_utf8_lossy(&body).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::github::ChangedFile;
    use crate::review::diff::{DiffMaterial, DiffSource, DirectFetchDiffSource, FileListDiffSource};
    use crate::tests::{default_pr, TestRepositoryClient};

    const DIFF: &str = "diff --git a/src/lib.rs b/src/lib.rs\n--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1 +1 @@\n-a\n+b\n";

    #[tokio::test]
    async fn file_list_returns_files_in_order() {
        let files = vec![
            ChangedFile {
                filename: "b.rs".to_string(),
                patch: Some("+b".to_string()),
            },
            ChangedFile {
                filename: "a.rs".to_string(),
                patch: None,
            },
        ];
        let client = Arc::new(TestRepositoryClient::with_files(files.clone()));
        let source = FileListDiffSource::new(client.clone());

        let material = source.acquire(&default_pr()).await.unwrap();
        assert_eq!(material, DiffMaterial::Files(files));
        assert_eq!(client.listed_prs(), vec![default_pr().number]);
    }

    #[tokio::test]
    async fn file_list_tolerates_empty_pr() {
        let client = Arc::new(TestRepositoryClient::with_files(vec![]));
        let material = FileListDiffSource::new(client)
            .acquire(&default_pr())
            .await
            .unwrap();
        assert!(material.is_empty());
    }

    #[tokio::test]
    async fn file_list_propagates_failure() {
        let client = Arc::new(TestRepositoryClient::default());
        client.fail_list_files();
        let result = FileListDiffSource::new(client).acquire(&default_pr()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn direct_fetch_uses_payload_diff_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/acme/widget/pull/42.diff"))
            .and(header("authorization", "Bearer gh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DIFF))
            .expect(1)
            .mount(&server)
            .await;

        let mut pr = default_pr();
        pr.diff_url = Some(
            format!("{}/acme/widget/pull/42.diff", server.uri())
                .parse()
                .unwrap(),
        );
        let source =
            DirectFetchDiffSource::new("https://api.github.com", "gh-token".to_string().into())
                .unwrap();
        assert_eq!(
            source.acquire(&pr).await.unwrap(),
            DiffMaterial::Raw(DIFF.to_string())
        );
    }

    #[tokio::test]
    async fn direct_fetch_falls_back_to_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/repos/acme/widget/pulls/42"))
            .and(header("accept", "application/vnd.github.v3.diff"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .expect(1)
            .mount(&server)
            .await;

        let source = DirectFetchDiffSource::new(
            &format!("{}/api/v3", server.uri()),
            "gh-token".to_string().into(),
        )
        .unwrap();
        let material = source.acquire(&default_pr()).await.unwrap();
        assert_eq!(material, DiffMaterial::Raw(String::new()));
        assert!(material.is_empty());
    }

    #[tokio::test]
    async fn direct_fetch_stops_at_size_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(1000)))
            .mount(&server)
            .await;

        let source = DirectFetchDiffSource::new(&server.uri(), "gh-token".to_string().into())
            .unwrap()
            .with_max_size(64);
        assert_eq!(
            source.acquire(&default_pr()).await.unwrap(),
            DiffMaterial::Raw("x".repeat(64))
        );
    }

    #[tokio::test]
    async fn direct_fetch_reports_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source =
            DirectFetchDiffSource::new(&server.uri(), "gh-token".to_string().into()).unwrap();
        assert!(source.acquire(&default_pr()).await.is_err());
    }
}
