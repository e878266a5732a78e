use crate::github::PullRequestRef;

/// Pull request actions that can trigger a review.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PullRequestAction {
    /// A new pull request was opened.
    Opened,
    /// New commits were pushed to the pull request.
    Synchronize,
}

impl PullRequestAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "opened" => Some(Self::Opened),
            "synchronize" => Some(Self::Synchronize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Synchronize => "synchronize",
        }
    }
}

/// A verified pull request event that may be reviewed.
#[derive(Clone, Debug, PartialEq)]
pub struct ReviewEvent {
    pub action: PullRequestAction,
    pub pull_request: PullRequestRef,
}
