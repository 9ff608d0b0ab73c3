//! In-memory conversation transcript.
//!
//! The transcript is append-only within a session: messages are never
//! reordered or deleted, and only the tail message is ever mutated (by
//! appended chunks while a reply is streaming).

use chrono::{DateTime, Utc};
use client::{ChatMessage, Role};
use uuid::Uuid;

/// One transcript entry. Assistant content grows while its reply streams and
/// is immutable afterwards.
#[derive(Clone, Debug)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// An empty assistant message, created the moment a reply stream opens.
    pub fn assistant() -> Self {
        Message {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// Ordered conversation transcript, insertion order = chronological order.
#[derive(Default)]
pub struct Session {
    messages: Vec<Message>,
}

impl Session {
    pub fn new() -> Self {
        Session {
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Open the assistant message that the incoming stream will fill.
    pub fn begin_assistant(&mut self) {
        self.messages.push(Message::assistant());
    }

    /// Append a chunk to the in-progress tail message. Chunks for a stream
    /// arrive in order and only the tail is ever touched.
    pub fn append_to_tail(&mut self, chunk: &str) {
        if let Some(tail) = self.messages.last_mut() {
            tail.content.push_str(chunk);
        }
    }

    /// The transcript in wire form, ready to send as conversation context.
    pub fn wire_messages(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
