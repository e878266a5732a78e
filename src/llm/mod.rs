//! Access to an OpenAI-compatible chat completion service.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod client;

pub use client::{base_openai_url, OpenAiClient};

/// Role in the chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
}

/// A message in a chat conversation with the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of a `POST /v1/chat/completions` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompletionChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChoiceMessage {
    /// Can be `null`, e.g. when the model refused to answer.
    pub content: Option<String>,
}

/// A text generation service consumed as a black box.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends one completion request and returns the parsed response.
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_openai_format() {
        let request = CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage::system("persona"), ChatMessage::user("prompt")],
            temperature: 0.5,
            max_tokens: 500,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    { "role": "system", "content": "persona" },
                    { "role": "user", "content": "prompt" },
                ],
                "temperature": 0.5,
                "max_tokens": 500,
            })
        );
    }

    #[test]
    fn response_without_choices() {
        let response: CompletionResponse =
            serde_json::from_str(r#"{"id": "chatcmpl-1", "choices": []}"#).unwrap();
        assert!(response.choices.is_empty());

        let response: CompletionResponse = serde_json::from_str(r#"{"id": "chatcmpl-1"}"#).unwrap();
        assert!(response.choices.is_empty());
    }

    #[test]
    fn response_with_null_content() {
        let response: CompletionResponse = serde_json::from_str(
            r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": null}}]}"#,
        )
        .unwrap();
        assert_eq!(response.choices[0].message.content, None);
    }
}
