use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, CompletionRequest};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl From<&ChatMessage> for Message {
    fn from(msg: &ChatMessage) -> Self {
        Message {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

impl ErrorResponse {
    /// The remote-supplied error message, if the body carries one.
    pub fn message_from(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .map(|e| e.error.message)
            .filter(|m| !m.trim().is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub index: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(model: String, messages: Vec<Message>, temperature: f32, max_tokens: u32) -> Self {
        ChatRequest {
            model,
            messages,
            temperature,
            max_tokens,
        }
    }

    /// Builds the wire request, taking overrides from `request` and the rest
    /// from the given defaults.
    pub fn from_completion(
        request: &CompletionRequest,
        default_model: &str,
        default_temperature: f32,
        default_max_tokens: u32,
    ) -> Self {
        ChatRequest::new(
            request
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            request.messages.iter().map(Message::from).collect(),
            request.temperature.unwrap_or(default_temperature),
            request.max_tokens.unwrap_or(default_max_tokens),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: Option<String>,
    pub object: Option<String>,
    pub created: Option<i64>,
    pub model: Option<String>,
    pub usage: Option<Usage>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ChatResponse {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Text of the first choice, when present and not blank.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_take_precedence() {
        let request = CompletionRequest::new(vec![ChatMessage::user("hi")]).with_temperature(0.1);
        let wire = ChatRequest::from_completion(&request, "gpt-4o-mini", 0.7, 2000);

        assert_eq!(wire.model, "gpt-4o-mini");
        assert_eq!(wire.temperature, 0.1);
        assert_eq!(wire.max_tokens, 2000);
        assert_eq!(
            wire.messages,
            vec![Message {
                role: "user".to_string(),
                content: "hi".to_string()
            }]
        );
    }

    #[test]
    fn test_response_text_and_usage() {
        let body = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o-mini",
            "usage": {"prompt_tokens": 12, "completion_tokens": 30, "total_tokens": 42},
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "ROLE:\nX"}, "finish_reason": "stop"}]
        }"#;
        let response = ChatResponse::from_json(body).unwrap();
        assert_eq!(response.text(), Some("ROLE:\nX"));
        let usage = response.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 30);
    }

    #[test]
    fn test_blank_content_is_no_text() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "  "}, "finish_reason": "stop"}]}"#;
        assert_eq!(ChatResponse::from_json(body).unwrap().text(), None);
        let body = r#"{"choices": []}"#;
        assert_eq!(ChatResponse::from_json(body).unwrap().text(), None);
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            ErrorResponse::message_from(r#"{"error": {"message": "model not found"}}"#).as_deref(),
            Some("model not found")
        );
        assert_eq!(ErrorResponse::message_from("<html>bad gateway</html>"), None);
    }
}
