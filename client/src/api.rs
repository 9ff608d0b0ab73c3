use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role/content pair as the chat endpoint expects it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request payload for the chat endpoint: the full transcript so far.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new<'a>(messages: impl IntoIterator<Item = &'a ChatMessage>) -> Self {
        ChatRequest {
            messages: messages.into_iter().cloned().collect(),
        }
    }
}

/// A retrieved passage cited as support for an assistant answer.
///
/// The payload is opaque to the client beyond the snippet text and an
/// optional locator; extra fields are ignored. `pageContent`/`metadata`
/// are accepted as aliases for backends that emit document objects in
/// that shape.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SourceDocument {
    #[serde(alias = "pageContent", alias = "page_content")]
    pub text: String,
    #[serde(
        default,
        alias = "metadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub locator: Option<serde_json::Value>,
}
