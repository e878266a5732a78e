use std::sync::Arc;

use crate::review::comment::publish_review;
use crate::review::event::ReviewEvent;
use crate::review::prompt::ReviewPrompt;
use crate::review::request::request_review;
use crate::review::{DiffMaterial, ReviewContext, ReviewError};
use crate::utils::text::pluralize;
use crate::utils::timing::{perform_retryable, RetryMethod, RetryableOpError};

/// Reviews a single pull request: acquires its diff, asks the completion service for a review
/// and publishes it as a comment.
///
/// Stops at the first failing stage, nothing is published in that case.
pub async fn handle_review_event(
    event: ReviewEvent,
    ctx: Arc<ReviewContext>,
) -> Result<(), ReviewError> {
    let pr = &event.pull_request;
    tracing::info!(
        "Reviewing {pr} ({}) by {}: {}",
        event.action.as_str(),
        pr.author,
        pr.title
    );

    let github_retry = RetryMethod::default().with_timeout(ctx.config.github_timeout);

    let diff = perform_retryable("acquire_diff", github_retry.clone(), || {
        ctx.diff_source.acquire(pr)
    })
    .await
    .map_err(|error: RetryableOpError<anyhow::Error>| ReviewError::Fetch(error.into()))?;
    log_diff(&diff);
    if diff.is_empty() {
        tracing::info!("{pr} has no detectable changes, reviewing it anyway");
    }

    let prompt = ReviewPrompt::build(&diff, ctx.config.max_patch_chars);
    let review = request_review(ctx.completion_client.as_ref(), &prompt, &ctx.config).await?;
    if review.is_empty() {
        tracing::warn!("Completion service returned an empty review for {pr}");
    }

    publish_review(ctx.repository_client.as_ref(), pr, &review, github_retry).await?;
    tracing::info!("Review of {pr} was published");
    Ok(())
}

fn log_diff(diff: &DiffMaterial) {
    match diff {
        DiffMaterial::Files(files) => {
            let patched = files.iter().filter(|file| file.patch.is_some()).count();
            tracing::debug!(
                "Found {} changed {} ({patched} with a textual patch)",
                files.len(),
                pluralize("file", files.len())
            );
        }
        DiffMaterial::Raw(diff) => {
            tracing::debug!("Downloaded diff with {} bytes", diff.len());
        }
    }
}
