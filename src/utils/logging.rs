use anyhow::Error;
use tracing::span::Span;

use crate::review::ReviewError;

pub trait LogError {
    fn log_error(&self, error: Error);

    /// Logs a failed review together with the pipeline stage where it stopped.
    fn log_review_error(&self, error: ReviewError);
}

impl LogError for Span {
    fn log_error(&self, error: Error) {
        self.in_scope(|| {
            tracing::error!("Error: {error:?}");
        });
    }

    fn log_review_error(&self, error: ReviewError) {
        let stage = error.stage();
        let error = Error::from(error);
        self.in_scope(|| {
            tracing::error!(stage = %stage, "Review failed: {error:?}");
        });
    }
}
