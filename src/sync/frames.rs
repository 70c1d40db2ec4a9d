//! Wire codec for live-channel frames and snapshot entries.
//!
//! Inbound frames form a closed union over `message`, `bot_message` and
//! `typing`; anything else decodes to [`InboundFrame::Unrecognized`] so the
//! dispatcher never fails on an unexpected payload.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::message::{parse_timestamp, Message, MessageId, MessageKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Message(Message),
    BotMessage(Message),
    Typing { user_name: String },
    Unrecognized { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundFrame {
    Message { user_id: i64, content: String },
    Typing { user_name: String },
}

impl OutboundFrame {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::Typing { .. } => "typing",
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireMessageError {
    #[error("message {id} has unparseable timestamp {raw:?}")]
    InvalidTimestamp { id: MessageId, raw: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(i64),
    Text(String),
}

impl From<WireId> for MessageId {
    fn from(value: WireId) -> Self {
        match value {
            WireId::Number(number) => MessageId::from(number),
            WireId::Text(text) => MessageId::new(text),
        }
    }
}

/// Message object as carried by frames and the snapshot endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    id: WireId,
    content: String,
    #[serde(default)]
    sender_id: Option<i64>,
    #[serde(default)]
    sender_name: Option<String>,
    timestamp: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl WireMessage {
    /// Converts into a domain message. `kind` overrides whatever the payload says;
    /// without it the `type` field decides, falling back to "bot iff no sender".
    pub fn into_message(self, kind: Option<MessageKind>) -> Result<Message, WireMessageError> {
        let id = MessageId::from(self.id);
        let timestamp =
            parse_timestamp(&self.timestamp).ok_or_else(|| WireMessageError::InvalidTimestamp {
                id: id.clone(),
                raw: self.timestamp.clone(),
            })?;

        let kind = kind.unwrap_or_else(|| match self.kind.as_deref() {
            Some("bot") => MessageKind::Bot,
            Some(_) => MessageKind::User,
            None if self.sender_id.is_none() => MessageKind::Bot,
            None => MessageKind::User,
        });

        let (sender_id, sender_name) = match kind {
            MessageKind::User => (self.sender_id, self.sender_name),
            MessageKind::Bot => (None, None),
        };

        Ok(Message {
            id,
            content: self.content,
            sender_id,
            sender_name,
            timestamp,
            kind,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WireInbound {
    Message { message: WireMessage },
    BotMessage { message: WireMessage },
    Typing { user: Option<String> },
}

pub fn decode_inbound(raw: &str) -> InboundFrame {
    let wire = match serde_json::from_str::<WireInbound>(raw) {
        Ok(wire) => wire,
        Err(error) => {
            return InboundFrame::Unrecognized {
                reason: error.to_string(),
            }
        }
    };

    match wire {
        WireInbound::Message { message } => match message.into_message(Some(MessageKind::User)) {
            Ok(message) => InboundFrame::Message(message),
            Err(error) => InboundFrame::Unrecognized {
                reason: error.to_string(),
            },
        },
        WireInbound::BotMessage { message } => match message.into_message(Some(MessageKind::Bot))
        {
            Ok(message) => InboundFrame::BotMessage(message),
            Err(error) => InboundFrame::Unrecognized {
                reason: error.to_string(),
            },
        },
        WireInbound::Typing {
            user: Some(user_name),
        } if !user_name.trim().is_empty() => InboundFrame::Typing { user_name },
        WireInbound::Typing { .. } => InboundFrame::Unrecognized {
            reason: "typing frame without user".to_owned(),
        },
    }
}
