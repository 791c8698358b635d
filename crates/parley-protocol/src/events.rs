use parley_core::error::ParleyError;
use parley_core::types::ChatMessage;
use serde::{Deserialize, Serialize};

/// Client → Server event.
/// Wire: `{ "event": "send-message", "payload": "hello" }`
///
/// `Disconnect` never travels on the wire; the transport raises it when the
/// socket closes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ClientEvent {
    Join(String),
    SendMessage(String),
    Typing(bool),
    #[serde(skip_deserializing)]
    Disconnect,
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Join(_) => crate::names::JOIN,
            ClientEvent::SendMessage(_) => crate::names::SEND_MESSAGE,
            ClientEvent::Typing(_) => crate::names::TYPING,
            ClientEvent::Disconnect => "disconnect",
        }
    }
}

/// Server → Client event.
/// Wire: `{ "event": "update-online-count", "payload": 2 }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Private replay for the joining connection.
    ChatHistory(Vec<ChatMessage>),
    NewMessage(ChatMessage),
    UserJoined(String),
    UserLeft(String),
    UpdateOnlineCount(usize),
    UserTyping(TypingPayload),
    Error(ErrorShape),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ChatHistory(_) => crate::names::CHAT_HISTORY,
            ServerEvent::NewMessage(_) => crate::names::NEW_MESSAGE,
            ServerEvent::UserJoined(_) => crate::names::USER_JOINED,
            ServerEvent::UserLeft(_) => crate::names::USER_LEFT,
            ServerEvent::UpdateOnlineCount(_) => crate::names::UPDATE_ONLINE_COUNT,
            ServerEvent::UserTyping(_) => crate::names::USER_TYPING,
            ServerEvent::Error(_) => crate::names::ERROR,
        }
    }

    pub fn typing(username: impl Into<String>, is_typing: bool) -> Self {
        ServerEvent::UserTyping(TypingPayload {
            username: username.into(),
            is_typing,
        })
    }

    pub fn error(err: &ParleyError) -> Self {
        ServerEvent::Error(ErrorShape {
            code: err.code().to_string(),
            message: err.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub username: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
}
