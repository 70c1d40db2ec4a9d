use anyhow::Result;
use async_trait::async_trait;

use crate::{
    api::ApiError,
    domain::{
        chat_view_state::ChatViewState,
        events::AppEvent,
        message::{CurrentUser, MessageId},
    },
};

pub trait AppEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>>;
}

pub trait ChatOrchestrator {
    fn state(&self) -> &ChatViewState;
    fn handle_event(&mut self, event: AppEvent) -> Result<()>;
}

/// Account-level calls the chat session needs besides the message snapshot.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn current_user(&self) -> Result<CurrentUser, ApiError>;
    async fn mark_read(&self, message_id: &MessageId) -> Result<(), ApiError>;
}
