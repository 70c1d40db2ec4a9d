use chrono::{DateTime, Utc};

use super::{
    connection::ConnectionState, events::ChatUpdate, message_input_state::MessageInputState,
    timeline::Timeline,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Messages,
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatViewState {
    running: bool,
    group_title: String,
    local_user_id: Option<i64>,
    timeline: Timeline,
    typing_user: Option<String>,
    connection: ConnectionState,
    rendered_at: DateTime<Utc>,
    input: MessageInputState,
    focus: Focus,
    selected_index: Option<usize>,
    /// Keeps the selection pinned to the newest message as updates arrive.
    follow_latest: bool,
    notice: Option<String>,
}

impl ChatViewState {
    pub fn new(group_title: impl Into<String>, local_user_id: Option<i64>) -> Self {
        Self {
            running: true,
            group_title: group_title.into(),
            local_user_id,
            timeline: Timeline::default(),
            typing_user: None,
            connection: ConnectionState::Idle,
            rendered_at: Utc::now(),
            input: MessageInputState::default(),
            focus: Focus::Messages,
            selected_index: None,
            follow_latest: true,
            notice: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn group_title(&self) -> &str {
        &self.group_title
    }

    pub fn local_user_id(&self) -> Option<i64> {
        self.local_user_id
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn typing_user(&self) -> Option<&str> {
        self.typing_user.as_deref()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn rendered_at(&self) -> DateTime<Utc> {
        self.rendered_at
    }

    pub fn input(&self) -> &MessageInputState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut MessageInputState {
        &mut self.input
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn focus_input(&mut self) {
        self.focus = Focus::Input;
    }

    pub fn focus_messages(&mut self) {
        self.focus = Focus::Messages;
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn apply_update(&mut self, update: ChatUpdate) {
        if update.connection.is_open() && !self.connection.is_open() {
            self.notice = None;
        }

        self.timeline = update.timeline;
        self.typing_user = update.typing_user;
        self.connection = update.connection;
        self.rendered_at = update.rendered_at;

        let count = self.timeline.len();
        self.selected_index = match (count, self.selected_index) {
            (0, _) => None,
            (_, None) => Some(count - 1),
            (_, Some(_)) if self.follow_latest => Some(count - 1),
            (_, Some(idx)) => Some(idx.min(count - 1)),
        };
    }

    /// Moves the selection towards newer messages.
    pub fn select_next(&mut self) {
        let count = self.timeline.len();
        if count == 0 {
            return;
        }

        let next = match self.selected_index {
            None => count - 1,
            Some(idx) => (idx + 1).min(count - 1),
        };
        self.selected_index = Some(next);
        self.follow_latest = next == count - 1;
    }

    /// Moves the selection towards older messages and stops following new ones.
    pub fn select_previous(&mut self) {
        let count = self.timeline.len();
        if count == 0 {
            return;
        }

        let previous = match self.selected_index {
            None => count - 1,
            Some(idx) => idx.saturating_sub(1),
        };
        self.selected_index = Some(previous);
        self.follow_latest = previous == count - 1;
    }
}
