use crate::github::PullRequestRef;
use crate::review::{RepositoryClient, ReviewError};
use crate::utils::timing::{perform_retryable, RetryMethod, RetryableOpError};

/// Heading that marks comments posted by the review bot.
pub const REVIEW_COMMENT_HEADER: &str = "**AI Code Review**";

/// A comment that can be posted to a pull request.
#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    text: String,
}

impl Comment {
    pub fn new(text: String) -> Self {
        Self { text }
    }

    pub fn render(&self) -> &str {
        &self.text
    }
}

pub fn review_comment(review: &str) -> Comment {
    Comment::new(format!("{REVIEW_COMMENT_HEADER}\n\n{review}"))
}

/// Posts the generated review as a new comment on the pull request.
pub async fn publish_review(
    client: &dyn RepositoryClient,
    pr: &PullRequestRef,
    review: &str,
    retry: RetryMethod,
) -> Result<(), ReviewError> {
    let comment = review_comment(review);
    perform_retryable("publish_review", retry, || {
        client.post_comment(&pr.repository, pr.number, &comment)
    })
    .await
    .map_err(|error: RetryableOpError<anyhow::Error>| ReviewError::Publish(error.into()))
}
