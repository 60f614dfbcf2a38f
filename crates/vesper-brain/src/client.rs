use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::ConversationHistory;

#[derive(Error, Debug)]
pub enum BrainError {
    #[error("Reasoning request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Reasoning service error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed reasoning response: {0}")]
    Malformed(String),
}

/// The remote reasoning service. Stateless per call; all memory is
/// supplied by the caller as the ordered history.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        history: &ConversationHistory,
    ) -> Result<String, BrainError>;
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Reasoning over an Anthropic-style messages endpoint.
pub struct HttpReasoningClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl HttpReasoningClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_endpoint(api_key, model, "https://api.anthropic.com/v1/messages".into())
    }

    pub fn with_endpoint(api_key: String, model: String, endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
            // Replies are spoken aloud; long answers read badly.
            max_tokens: 512,
        }
    }
}

#[async_trait]
impl ReasoningClient for HttpReasoningClient {
    async fn complete(
        &self,
        system: &str,
        history: &ConversationHistory,
    ) -> Result<String, BrainError> {
        let messages: Vec<WireMessage> = history
            .iter()
            .map(|turn| WireMessage {
                role: turn.role.as_str(),
                content: &turn.text,
            })
            .collect();

        tracing::debug!(
            turns = messages.len(),
            model = %self.model,
            "Sending conversation to reasoning service"
        );

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrainError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| BrainError::Malformed("no text block in response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ConversationHistory;

    #[test]
    fn request_serializes_roles_in_order() {
        let mut history = ConversationHistory::new(4);
        history.push_user("hello");
        history.push_assistant("hi there");
        history.push_user("what time is it");

        let messages: Vec<WireMessage> = history
            .iter()
            .map(|turn| WireMessage {
                role: turn.role.as_str(),
                content: &turn.text,
            })
            .collect();
        let request = MessagesRequest {
            model: "test-model",
            max_tokens: 512,
            system: "persona",
            messages,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["messages"][2]["content"], "what time is it");
        assert_eq!(json["max_tokens"], 512);
    }

    #[test]
    fn response_takes_first_text_block() {
        let raw = r#"{"content":[{"type":"thinking"},{"type":"text","text":"Done."}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        let text = parsed
            .content
            .into_iter()
            .find(|b| b.kind == "text")
            .and_then(|b| b.text)
            .unwrap();
        assert_eq!(text, "Done.");
    }
}
