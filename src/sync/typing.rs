use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_TYPING_TTL: Duration = Duration::from_millis(3_000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingState {
    pub user_name: String,
    pub expires_at: Instant,
}

/// Ephemeral "who is typing" state: one entry, last typer wins.
#[derive(Debug, Clone)]
pub struct TypingIndicatorTracker {
    ttl: Duration,
    local_user_name: Option<String>,
    active: Option<TypingState>,
}

impl TypingIndicatorTracker {
    pub fn new(ttl: Duration, local_user_name: Option<String>) -> Self {
        Self {
            ttl,
            local_user_name,
            active: None,
        }
    }

    /// Records a typing event. Returns false when it was ignored because it
    /// came from the local user; such events never replace another user's entry.
    pub fn on_typing(&mut self, user_name: &str, now: Instant) -> bool {
        if self.local_user_name.as_deref() == Some(user_name) {
            return false;
        }

        self.active = Some(TypingState {
            user_name: user_name.to_owned(),
            expires_at: now + self.ttl,
        });
        true
    }

    /// Returns the active typer, clearing the entry once it has expired.
    pub fn current(&mut self, now: Instant) -> Option<&str> {
        if self
            .active
            .as_ref()
            .is_some_and(|state| now >= state.expires_at)
        {
            self.active = None;
        }

        self.active.as_ref().map(|state| state.user_name.as_str())
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.active.as_ref().map(|state| state.expires_at)
    }

    pub fn clear(&mut self) {
        self.active = None;
    }
}
