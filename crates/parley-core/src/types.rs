use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Per-connection identifier (random UUID, never reused across reconnects).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub String);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConnId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Chat message identifier: wall-clock milliseconds, bumped so that every
/// id is strictly greater than the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Next id after `prev` for a message created at `now`.
    pub fn next(prev: Option<MessageId>, now: DateTime<Utc>) -> Self {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        match prev {
            Some(MessageId(last)) if millis <= last => MessageId(last + 1),
            _ => MessageId(millis),
        }
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat line as stored in history and sent to clients.
///
/// Wire:
/// `{ "id": 1718000000000, "username": "Bob", "text": "hi", "timestamp": "2024-06-10T06:13:20Z" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    #[serde(rename = "username")]
    pub author: String,
    pub text: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        id: MessageId,
        author: impl Into<String>,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            author: author.into(),
            text: text.into(),
            created_at,
        }
    }
}
