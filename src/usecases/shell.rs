use anyhow::Result;

use crate::domain::{
    chat_view_state::{ChatViewState, Focus},
    events::{AppEvent, KeyInput},
};

use super::{
    contracts::ChatOrchestrator,
    send_message::{send_message, MessageSender, SendMessageError},
};

const OFFLINE_NOTICE: &str = "Not connected. Message kept as draft.";
const SESSION_CLOSED_NOTICE: &str = "Chat session closed.";
const SESSION_CLOSED: &str = "SYNC_SESSION_CLOSED";

pub struct DefaultChatOrchestrator<M>
where
    M: MessageSender,
{
    state: ChatViewState,
    sender: M,
}

impl<M> DefaultChatOrchestrator<M>
where
    M: MessageSender,
{
    pub fn new(state: ChatViewState, sender: M) -> Self {
        Self { state, sender }
    }

    fn handle_key(&mut self, key: KeyInput) {
        if key.ctrl && key.key == "c" {
            self.state.stop();
            return;
        }

        match self.state.focus() {
            Focus::Messages => self.handle_messages_key(&key.key),
            Focus::Input => self.handle_input_key(&key.key),
        }
    }

    fn handle_messages_key(&mut self, key: &str) {
        match key {
            "q" => self.state.stop(),
            "i" | "enter" => self.state.focus_input(),
            "j" | "down" => self.state.select_next(),
            "k" | "up" => self.state.select_previous(),
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: &str) {
        match key {
            "esc" => self.state.focus_messages(),
            "enter" => self.submit(),
            "backspace" => self.state.input_mut().backspace(),
            "left" => self.state.input_mut().move_left(),
            "right" => self.state.input_mut().move_right(),
            other => {
                let mut chars = other.chars();
                if let (Some(ch), None) = (chars.next(), chars.next()) {
                    if self.state.input_mut().insert_char(ch) {
                        self.sender.notify_typing();
                    }
                }
            }
        }
    }

    fn submit(&mut self) {
        if self.state.input().is_blank() {
            return;
        }

        let draft = self.state.input().text().to_owned();
        match send_message(&self.sender, &draft) {
            Ok(()) => {
                self.state.input_mut().clear();
                self.state.clear_notice();
            }
            Err(SendMessageError::EmptyMessage) => {}
            Err(SendMessageError::ChannelUnavailable) => self.state.set_notice(OFFLINE_NOTICE),
            Err(SendMessageError::SessionClosed) => {
                tracing::warn!(code = SESSION_CLOSED, "send attempted after session closed");
                self.state.set_notice(SESSION_CLOSED_NOTICE);
            }
        }
    }
}

impl<M> ChatOrchestrator for DefaultChatOrchestrator<M>
where
    M: MessageSender,
{
    fn state(&self) -> &ChatViewState {
        &self.state
    }

    fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Tick => {}
            AppEvent::QuitRequested => self.state.stop(),
            AppEvent::InputKey(key) => self.handle_key(key),
            AppEvent::ChatUpdated(update) => self.state.apply_update(update),
        }

        Ok(())
    }
}
