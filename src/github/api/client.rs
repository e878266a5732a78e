use anyhow::Context;
use async_trait::async_trait;
use octocrab::Octocrab;

use crate::github::{ChangedFile, GithubRepoName, PullRequestNumber};
use crate::review::comment::Comment;
use crate::review::RepositoryClient;

/// GitHub returns at most 100 files per page.
const FILES_PER_PAGE: u32 = 100;
/// The file listing endpoint stops at 3000 files.
const MAX_FILE_PAGES: u32 = 30;

/// Provides access to pull requests using the GitHub REST API.
pub struct GithubRepositoryClient {
    client: Octocrab,
}

impl GithubRepositoryClient {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    fn format_pr(&self, repo: &GithubRepoName, pr: PullRequestNumber) -> String {
        format!("{repo}#{pr}")
    }
}

#[async_trait]
impl RepositoryClient for GithubRepositoryClient {
    async fn list_changed_files(
        &self,
        repo: &GithubRepoName,
        pr: PullRequestNumber,
    ) -> anyhow::Result<Vec<ChangedFile>> {
        #[derive(serde::Serialize)]
        struct Pagination {
            per_page: u32,
            page: u32,
        }

        // https://docs.github.com/en/rest/pulls/pulls#list-pull-requests-files
        let route = format!(
            "/repos/{}/{}/pulls/{}/files",
            repo.owner(),
            repo.name(),
            pr
        );

        let mut files = vec![];
        for page in 1..=MAX_FILE_PAGES {
            let batch: Vec<ChangedFile> = self
                .client
                .get(
                    &route,
                    Some(&Pagination {
                        per_page: FILES_PER_PAGE,
                        page,
                    }),
                )
                .await
                .with_context(|| {
                    format!(
                        "Cannot list files of {} (page {page})",
                        self.format_pr(repo, pr)
                    )
                })?;
            let last_page = batch.len() < FILES_PER_PAGE as usize;
            files.extend(batch);
            if last_page {
                break;
            }
        }
        Ok(files)
    }

    /// The comment will be posted as the user that owns the access token.
    async fn post_comment(
        &self,
        repo: &GithubRepoName,
        pr: PullRequestNumber,
        comment: &Comment,
    ) -> anyhow::Result<()> {
        // https://docs.github.com/en/rest/issues/comments#create-an-issue-comment
        // The created comment is not needed, so it is not deserialized into a full model.
        let _: serde_json::Value = self
            .client
            .post(
                format!(
                    "/repos/{}/{}/issues/{}/comments",
                    repo.owner(),
                    repo.name(),
                    pr
                ),
                Some(&serde_json::json!({ "body": comment.render() })),
            )
            .await
            .with_context(|| format!("Cannot post comment to {}", self.format_pr(repo, pr)))?;
        Ok(())
    }
}
