use chrono::{DateTime, Utc};

use super::{connection::ConnectionState, timeline::Timeline};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Tick,
    QuitRequested,
    InputKey(KeyInput),
    ChatUpdated(ChatUpdate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub key: String,
    pub ctrl: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>, ctrl: bool) -> Self {
        Self {
            key: key.into(),
            ctrl,
        }
    }
}

/// Everything the chat view needs to render one frame of sync state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUpdate {
    pub timeline: Timeline,
    pub typing_user: Option<String>,
    pub connection: ConnectionState,
    pub rendered_at: DateTime<Utc>,
}
