use std::fmt::{Display, Formatter};

/// Stage of the review pipeline, used to tell operators where a review failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewStage {
    AcquireDiff,
    RequestReview,
    PublishComment,
}

impl Display for ReviewStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            ReviewStage::AcquireDiff => "acquire-diff",
            ReviewStage::RequestReview => "request-review",
            ReviewStage::PublishComment => "publish-comment",
        };
        f.write_str(stage)
    }
}

/// Failures that stop the review of a single pull request.
/// None of them is reported back to the webhook sender.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Cannot acquire the diff of the pull request")]
    Fetch(#[source] anyhow::Error),
    #[error("Completion request failed")]
    Completion(#[source] anyhow::Error),
    #[error("Completion service returned no choices")]
    EmptyResponse,
    #[error("Cannot publish the review comment")]
    Publish(#[source] anyhow::Error),
}

impl ReviewError {
    pub fn stage(&self) -> ReviewStage {
        match self {
            ReviewError::Fetch(_) => ReviewStage::AcquireDiff,
            ReviewError::Completion(_) | ReviewError::EmptyResponse => ReviewStage::RequestReview,
            ReviewError::Publish(_) => ReviewStage::PublishComment,
        }
    }
}
