use crate::config::ReviewConfig;
use crate::llm::{ChatMessage, CompletionClient, CompletionRequest};
use crate::review::prompt::ReviewPrompt;
use crate::review::ReviewError;
use crate::utils::timing::{perform_retryable, RetryMethod, RetryableOpError};

/// Builds the completion request for the given prompt.
pub fn completion_request(prompt: &ReviewPrompt, config: &ReviewConfig) -> CompletionRequest {
    CompletionRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage::system(config.system_prompt.as_str()),
            ChatMessage::user(prompt.as_str()),
        ],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

/// Asks the completion service for a review and returns the text of the first choice.
///
/// The request is sent exactly once. A choice without content yields an empty review.
pub async fn request_review(
    client: &dyn CompletionClient,
    prompt: &ReviewPrompt,
    config: &ReviewConfig,
) -> Result<String, ReviewError> {
    let request = completion_request(prompt, config);
    let response = perform_retryable(
        "request_review",
        RetryMethod::no_retry().with_timeout(config.completion_timeout),
        || client.complete(&request),
    )
    .await
    .map_err(|error: RetryableOpError<anyhow::Error>| ReviewError::Completion(error.into()))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(ReviewError::EmptyResponse)?;
    Ok(choice.message.content.unwrap_or_default())
}
