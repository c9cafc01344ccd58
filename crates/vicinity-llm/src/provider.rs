//! Generation client abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vicinity_core::Result;

/// Abstraction over text generation services.
///
/// Lets the retrieval pipeline swap the backing service (or a test fake)
/// without changing query code.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a full answer for `request`.
    ///
    /// Transport failures surface as `UpstreamUnavailable`.
    async fn generate(&self, request: GenerationRequest) -> Result<String>;

    /// The client name for diagnostics.
    fn name(&self) -> &str;
}

/// A single-turn generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier understood by the service (e.g. "llama3.2").
    pub model: String,

    /// The full prompt.
    pub prompt: String,
}

impl GenerationRequest {
    /// Create a request.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
        }
    }

    /// The chat messages sent for this request.
    pub fn messages(&self) -> Vec<Message> {
        vec![Message::user(self.prompt.clone())]
    }
}

/// A message in a chat exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the sender
    pub role: Role,

    /// Message content
    pub content: String,
}

impl Message {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant message
    Assistant,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, Role::User);
        assert_eq!(user_msg.content, "Hello");

        let asst_msg = Message::assistant("Hi there");
        assert_eq!(asst_msg.role, Role::Assistant);
    }

    #[test]
    fn test_request_messages() {
        let request = GenerationRequest::new("llama3.2", "Which stops serve route 72?");
        assert_eq!(
            request.messages(),
            vec![Message::user("Which stops serve route 72?")]
        );
    }

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn test_trait_object_safety() {
        fn _assert_object_safe(_: &dyn GenerationClient) {}
    }
}
