use std::{
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::{
    domain::events::{AppEvent, ChatUpdate, KeyInput},
    usecases::contracts::AppEventSource,
};

const EVENT_POLL_TIMEOUT: Duration = Duration::from_millis(100);
const UPDATES_DISCONNECTED: &str = "SYNC_UPDATES_DISCONNECTED";

/// Terminal keys merged with sync updates from the chat session.
pub struct CrosstermEventSource {
    updates: Option<Receiver<ChatUpdate>>,
}

impl CrosstermEventSource {
    pub fn new(updates: Receiver<ChatUpdate>) -> Self {
        Self {
            updates: Some(updates),
        }
    }

    /// Only the newest pending update matters; older ones are superseded.
    fn latest_update(&mut self) -> Option<ChatUpdate> {
        let updates = self.updates.as_ref()?;
        let mut latest = None;
        let mut disconnected = false;

        loop {
            match updates.try_recv() {
                Ok(update) => latest = Some(update),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        if disconnected {
            tracing::warn!(
                code = UPDATES_DISCONNECTED,
                "chat updates channel closed"
            );
            self.updates = None;
        }

        latest
    }
}

impl AppEventSource for CrosstermEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>> {
        if let Some(update) = self.latest_update() {
            return Ok(Some(AppEvent::ChatUpdated(update)));
        }

        if !event::poll(EVENT_POLL_TIMEOUT)? {
            return Ok(Some(AppEvent::Tick));
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(map_key(key)),
            _ => Ok(None),
        }
    }
}

fn map_key(key: KeyEvent) -> Option<AppEvent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl && key.code == KeyCode::Char('c') {
        return Some(AppEvent::QuitRequested);
    }

    let name = match key.code {
        KeyCode::Char(ch) => ch.to_string(),
        KeyCode::Enter => "enter".to_owned(),
        KeyCode::Esc => "esc".to_owned(),
        KeyCode::Backspace => "backspace".to_owned(),
        KeyCode::Left => "left".to_owned(),
        KeyCode::Right => "right".to_owned(),
        KeyCode::Up => "up".to_owned(),
        KeyCode::Down => "down".to_owned(),
        _ => return None,
    };

    Some(AppEvent::InputKey(KeyInput::new(name, ctrl)))
}

#[cfg(test)]
pub struct MockEventSource {
    queue: std::collections::VecDeque<AppEvent>,
}

#[cfg(test)]
impl MockEventSource {
    pub fn from(events: Vec<AppEvent>) -> Self {
        Self {
            queue: events.into(),
        }
    }
}

#[cfg(test)]
impl AppEventSource for MockEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>> {
        Ok(self.queue.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use chrono::Utc;

    use super::*;
    use crate::domain::{connection::ConnectionState, timeline::Timeline};

    fn update(connection: ConnectionState) -> ChatUpdate {
        ChatUpdate {
            timeline: Timeline::default(),
            typing_user: None,
            connection,
            rendered_at: Utc::now(),
        }
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn ctrl_c_maps_to_quit() {
        assert_eq!(
            map_key(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(AppEvent::QuitRequested)
        );
    }

    #[test]
    fn plain_q_is_left_to_the_orchestrator() {
        assert_eq!(
            map_key(key(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(AppEvent::InputKey(KeyInput::new("q", false)))
        );
    }

    #[test]
    fn named_keys_map_to_stable_names() {
        assert_eq!(
            map_key(key(KeyCode::Enter, KeyModifiers::NONE)),
            Some(AppEvent::InputKey(KeyInput::new("enter", false)))
        );
        assert_eq!(
            map_key(key(KeyCode::Esc, KeyModifiers::NONE)),
            Some(AppEvent::InputKey(KeyInput::new("esc", false)))
        );
        assert_eq!(map_key(key(KeyCode::F(5), KeyModifiers::NONE)), None);
    }

    #[test]
    fn pending_updates_collapse_to_latest() {
        let (tx, rx) = mpsc::channel();
        let mut source = CrosstermEventSource::new(rx);
        tx.send(update(ConnectionState::Connecting)).expect("send");
        tx.send(update(ConnectionState::Open)).expect("send");

        let latest = source.latest_update().expect("update pending");

        assert_eq!(latest.connection, ConnectionState::Open);
        assert!(source.latest_update().is_none());
    }

    #[test]
    fn disconnected_updates_channel_is_dropped() {
        let (tx, rx) = mpsc::channel::<ChatUpdate>();
        let mut source = CrosstermEventSource::new(rx);
        drop(tx);

        assert!(source.latest_update().is_none());
        assert!(source.updates.is_none());
    }

    #[test]
    fn mock_source_replays_events() {
        let mut source = MockEventSource::from(vec![AppEvent::Tick, AppEvent::QuitRequested]);

        assert_eq!(source.next_event().expect("event"), Some(AppEvent::Tick));
        assert_eq!(
            source.next_event().expect("event"),
            Some(AppEvent::QuitRequested)
        );
        assert_eq!(source.next_event().expect("event"), None);
    }
}
