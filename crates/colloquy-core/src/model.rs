//! Conversation data model: messages, blocks, and stream events.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::Display;
use uuid::Uuid;

/// Identifier for a message. Stable for the message's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for a content block within a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(String);

impl BlockId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Lifecycle status shared by messages and blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Pending,
    Streaming,
    Complete,
    Error,
}

impl ContentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ContentStatus::Complete | ContentStatus::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Thinking,
    Tool,
    Citation,
}

/// An ordered content unit within a message. `content` is append-only while
/// the block is streaming and frozen once the status turns terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub content: String,
    pub status: ContentStatus,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: BlockId::generate(),
            kind,
            content: String::new(),
            status: ContentStatus::Pending,
        }
    }

    pub fn with_id(id: BlockId, kind: BlockKind) -> Self {
        Self {
            id,
            kind,
            content: String::new(),
            status: ContentStatus::Pending,
        }
    }
}

/// A single conversation entry. `created_at_ms` defines canonical display
/// order; activity never re-sorts messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub created_at_ms: i64,
    pub status: ContentStatus,
    pub block_ids: Vec<BlockId>,
    /// Upstream failure description once the message is in `Error`.
    pub error: Option<String>,
}

impl Message {
    pub fn new(role: Role) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            created_at_ms: now_ms(),
            status: ContentStatus::Pending,
            block_ids: Vec::new(),
            error: None,
        }
    }

    pub fn with_id(id: MessageId, role: Role) -> Self {
        Self {
            id,
            role,
            created_at_ms: now_ms(),
            status: ContentStatus::Pending,
            block_ids: Vec::new(),
            error: None,
        }
    }
}

pub fn now_ms() -> i64 {
    let now = time::OffsetDateTime::now_utc();
    (now.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Topic channels carried by the stream event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StreamTopic {
    TextDelta,
    TextComplete,
    ThinkingDelta,
    StreamError,
    ForceScrollToBottom,
}

/// Payload of a stream lifecycle fact emitted by the upstream producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPayload {
    TextDelta {
        message_id: MessageId,
        block_id: BlockId,
        delta: String,
    },
    ThinkingDelta {
        message_id: MessageId,
        block_id: BlockId,
        delta: String,
    },
    TextComplete {
        message_id: MessageId,
        block_id: BlockId,
    },
    StreamError {
        message_id: MessageId,
        block_id: BlockId,
        error: String,
    },
    ForceScrollToBottom,
}

/// An immutable stream fact. Never mutated after emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub payload: StreamPayload,
    pub timestamp_ms: i64,
}

impl StreamEvent {
    pub fn new(payload: StreamPayload) -> Self {
        Self {
            payload,
            timestamp_ms: now_ms(),
        }
    }

    pub fn topic(&self) -> StreamTopic {
        match self.payload {
            StreamPayload::TextDelta { .. } => StreamTopic::TextDelta,
            StreamPayload::ThinkingDelta { .. } => StreamTopic::ThinkingDelta,
            StreamPayload::TextComplete { .. } => StreamTopic::TextComplete,
            StreamPayload::StreamError { .. } => StreamTopic::StreamError,
            StreamPayload::ForceScrollToBottom => StreamTopic::ForceScrollToBottom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_matches_payload() {
        let ev = StreamEvent::new(StreamPayload::TextDelta {
            message_id: MessageId::from("m1"),
            block_id: BlockId::from("b1"),
            delta: "hi".to_string(),
        });
        assert_eq!(ev.topic(), StreamTopic::TextDelta);

        let ev = StreamEvent::new(StreamPayload::ForceScrollToBottom);
        assert_eq!(ev.topic(), StreamTopic::ForceScrollToBottom);
    }

    #[test]
    fn terminal_statuses() {
        assert!(ContentStatus::Complete.is_terminal());
        assert!(ContentStatus::Error.is_terminal());
        assert!(!ContentStatus::Streaming.is_terminal());
        assert!(!ContentStatus::Pending.is_terminal());
    }
}
