//! Text enhancement: the single point of entry for calls to the chat-completions API.
//!
//! One attempt per request: no retries, no local timeout. A failure leaves the
//! document untouched; the caller only writes back a successful result.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod handlers;
pub mod prompts;

pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat:free";

#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("enhancement returned empty content")]
    EmptyContent,
}

/// `enhance(prompt, originalText) -> improvedText`. Carried in `AppState` as
/// `Arc<dyn TextEnhancer>`.
#[async_trait]
pub trait TextEnhancer: Send + Sync {
    async fn enhance(&self, prompt: &str, original_text: &str) -> Result<String, EnhanceError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Prompt and text joined the way the model receives them.
fn user_message(prompt: &str, original_text: &str) -> String {
    format!("{prompt}\n\n{original_text}")
}

/// `choices[0].message.content`, rejecting a missing or blank result.
fn first_choice(body: &str) -> Result<String, EnhanceError> {
    let parsed: ChatResponse = serde_json::from_str(body)?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(EnhanceError::EmptyContent)
}

/// OpenRouter chat-completions client.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(api_url: String, api_key: String, model: String) -> Result<Self, EnhanceError> {
        Ok(Self {
            client: Client::builder().build()?,
            api_url,
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextEnhancer for OpenRouterClient {
    async fn enhance(&self, prompt: &str, original_text: &str) -> Result<String, EnhanceError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: user_message(prompt, original_text),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Enhancement API returned {status}");
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(EnhanceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let content = first_choice(&body)?;
        debug!(
            "Enhancement succeeded: {} chars in, {} chars out",
            original_text.chars().count(),
            content.chars().count()
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_joins_with_blank_line() {
        assert_eq!(user_message("Improve:", "did stuff"), "Improve:\n\ndid stuff");
    }

    #[test]
    fn test_first_choice_extracts_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Led a team"}}]}"#;
        assert_eq!(first_choice(body).unwrap(), "Led a team");
    }

    #[test]
    fn test_first_choice_rejects_empty() {
        assert!(matches!(first_choice(r#"{"choices":[]}"#), Err(EnhanceError::EmptyContent)));
        assert!(matches!(
            first_choice(r#"{"choices":[{"message":{"content":"  "}}]}"#),
            Err(EnhanceError::EmptyContent)
        ));
        assert!(matches!(first_choice("not json"), Err(EnhanceError::Parse(_))));
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: DEFAULT_MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: user_message("p", "t"),
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "deepseek/deepseek-chat:free");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "p\n\nt");
    }
}
