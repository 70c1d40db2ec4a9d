use std::{sync::Arc, time::Duration};

use chrono::{FixedOffset, Offset, Utc};
use thiserror::Error;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::domain::{
    connection::ConnectionState,
    events::ChatUpdate,
    message::{CurrentUser, GroupId, Message},
    timeline::Timeline,
};

use super::{
    contracts::{LiveChannelConnector, SnapshotSource, SnapshotSourceError},
    frames::{decode_inbound, InboundFrame, OutboundFrame},
    poll::{PollFallbackScheduler, DEFAULT_POLL_INTERVAL},
    store::MessageStore,
    transport::{ReconnectPolicy, TransportManager, TransportOutcome, TransportSignal},
    typing::{TypingIndicatorTracker, DEFAULT_TYPING_TTL},
};

const FRAME_UNRECOGNIZED: &str = "SYNC_FRAME_UNRECOGNIZED";
const INITIAL_SNAPSHOT_FAILED: &str = "SYNC_INITIAL_SNAPSHOT_FAILED";

pub const DEFAULT_TYPING_THROTTLE: Duration = Duration::from_millis(1_000);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

#[derive(Debug, Error)]
pub enum OpenChatError {
    #[error("cannot open chat: initial snapshot failed: {0}")]
    InitialSnapshot(#[source] SnapshotSourceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    pub reconnect: ReconnectPolicy,
    pub typing_ttl: Duration,
    pub typing_throttle: Duration,
    pub refresh_interval: Duration,
    pub display_offset: FixedOffset,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect: ReconnectPolicy::default(),
            typing_ttl: DEFAULT_TYPING_TTL,
            typing_throttle: DEFAULT_TYPING_THROTTLE,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            display_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

/// Inputs produced by the coordinator's own timers and poll loop.
#[derive(Debug)]
enum SyncInput {
    Snapshot(Vec<Message>),
    TypingExpired,
    RefreshTick,
}

/// Per-group sync core.
///
/// Owns the message store, typing tracker, poll fallback and live transport
/// for one open chat view, plus the named timer handles that go with them.
/// Everything is torn down by [`SyncCoordinator::deactivate`], which runs once.
pub struct SyncCoordinator {
    group_id: GroupId,
    local_user: CurrentUser,
    source: Arc<dyn SnapshotSource>,
    settings: SyncSettings,
    store: MessageStore,
    typing: TypingIndicatorTracker,
    poll: PollFallbackScheduler,
    transport: TransportManager,
    inputs_tx: mpsc::UnboundedSender<SyncInput>,
    inputs: mpsc::UnboundedReceiver<SyncInput>,
    signals: mpsc::UnboundedReceiver<TransportSignal>,
    typing_timer: Option<JoinHandle<()>>,
    refresh_timer: Option<JoinHandle<()>>,
    last_typing_sent: Option<Instant>,
    subscribers: Vec<std::sync::mpsc::Sender<ChatUpdate>>,
    active: bool,
}

impl SyncCoordinator {
    /// Opens the group view: loads the initial snapshot, starts the display
    /// refresh, the live transport and, until the channel opens, the poll fallback.
    pub async fn activate(
        group_id: GroupId,
        local_user: CurrentUser,
        source: Arc<dyn SnapshotSource>,
        connector: Arc<dyn LiveChannelConnector>,
        settings: SyncSettings,
    ) -> Result<Self, OpenChatError> {
        let initial = source.fetch_messages(group_id).await.map_err(|error| {
            tracing::error!(
                code = INITIAL_SNAPSHOT_FAILED,
                group_id = %group_id,
                error = %error,
                "initial snapshot failed"
            );
            OpenChatError::InitialSnapshot(error)
        })?;

        let (inputs_tx, inputs) = mpsc::unbounded_channel();
        let (signals_tx, signals) = mpsc::unbounded_channel();
        let transport =
            TransportManager::new(group_id, connector, settings.reconnect, signals_tx);

        let mut coordinator = Self {
            group_id,
            typing: TypingIndicatorTracker::new(settings.typing_ttl, Some(local_user.name.clone())),
            local_user,
            source,
            settings,
            store: MessageStore::default(),
            poll: PollFallbackScheduler::new(),
            transport,
            inputs_tx,
            inputs,
            signals,
            typing_timer: None,
            refresh_timer: None,
            last_typing_sent: None,
            subscribers: Vec::new(),
            active: true,
        };

        let applied = coordinator.store.merge(initial);
        tracing::info!(
            group_id = %group_id,
            messages = applied,
            "chat view activated"
        );

        coordinator.start_refresh_timer();
        coordinator.transport.connect();
        coordinator.sync_poll_with_transport();

        Ok(coordinator)
    }

    /// Waits for the next timer, poll result or transport signal and applies it.
    /// Returns false once the coordinator has been deactivated.
    pub async fn step(&mut self) -> bool {
        if !self.active {
            return false;
        }

        tokio::select! {
            biased;
            Some(signal) = self.signals.recv() => self.apply_signal(signal),
            Some(input) = self.inputs.recv() => self.apply_input(input),
            else => return false,
        }

        true
    }

    /// Applies one pending event without waiting. Returns false when nothing was pending.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn try_step(&mut self) -> bool {
        if !self.active {
            return false;
        }

        if let Ok(signal) = self.signals.try_recv() {
            self.apply_signal(signal);
            return true;
        }

        if let Ok(input) = self.inputs.try_recv() {
            self.apply_input(input);
            return true;
        }

        false
    }

    /// Subscribes to view updates. The current state is delivered immediately.
    pub fn subscribe(&mut self) -> std::sync::mpsc::Receiver<ChatUpdate> {
        let (tx, rx) = std::sync::mpsc::channel();
        let _ = tx.send(self.snapshot());
        self.subscribers.push(tx);
        rx
    }

    /// Sends a chat message over the live channel. Returns false when the text
    /// was blank or the channel was not open; nothing is queued either way.
    pub fn send_message(&mut self, text: &str) -> bool {
        let content = text.trim();
        if !self.active || content.is_empty() {
            return false;
        }

        self.transport.send(&OutboundFrame::Message {
            user_id: self.local_user.id,
            content: content.to_owned(),
        })
    }

    /// Announces that the local user is typing, at most once per throttle window.
    pub fn notify_typing(&mut self) -> bool {
        if !self.active {
            return false;
        }

        let now = Instant::now();
        if self
            .last_typing_sent
            .is_some_and(|sent| now.duration_since(sent) < self.settings.typing_throttle)
        {
            return false;
        }

        let sent = self.transport.send(&OutboundFrame::Typing {
            user_name: self.local_user.name.clone(),
        });
        if sent {
            self.last_typing_sent = Some(now);
        }
        sent
    }

    /// Single teardown point for the view. Closes the transport and cancels the
    /// poll interval, reconnect timer, typing expiry and display refresh.
    /// Returns false when already deactivated.
    pub fn deactivate(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;

        self.transport.close();
        self.poll.stop();
        if let Some(timer) = self.typing_timer.take() {
            timer.abort();
        }
        if let Some(timer) = self.refresh_timer.take() {
            timer.abort();
        }
        self.typing.clear();
        self.subscribers.clear();

        tracing::info!(group_id = %self.group_id, "chat view deactivated");
        true
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn timeline(&self) -> Timeline {
        self.store.view(self.settings.display_offset)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_polling(&self) -> bool {
        self.poll.is_running()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn store_len(&self) -> usize {
        self.store.len()
    }

    pub fn typing_user(&mut self) -> Option<String> {
        self.typing.current(Instant::now()).map(str::to_owned)
    }

    /// True while any timer or connection handle owned by this view is alive.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn has_live_handles(&self) -> bool {
        self.poll.is_running()
            || self.transport.has_pending_reconnect()
            || self.transport.state().is_active()
            || self.typing_timer.is_some()
            || self.refresh_timer.is_some()
    }

    fn apply_signal(&mut self, signal: TransportSignal) {
        match self.transport.handle_signal(signal) {
            TransportOutcome::Ignored => {}
            TransportOutcome::StateChanged(state) => {
                tracing::debug!(
                    group_id = %self.group_id,
                    state = state.as_label(),
                    "connection state changed"
                );
                self.sync_poll_with_transport();
                self.publish();
            }
            TransportOutcome::Frame(raw) => self.dispatch_frame(&raw),
        }
    }

    fn apply_input(&mut self, input: SyncInput) {
        match input {
            SyncInput::Snapshot(messages) => {
                if self.store.merge(messages) > 0 {
                    self.publish();
                }
            }
            SyncInput::TypingExpired => {
                self.typing_timer = None;
                self.publish();
            }
            SyncInput::RefreshTick => self.publish(),
        }
    }

    fn dispatch_frame(&mut self, raw: &str) {
        match decode_inbound(raw) {
            InboundFrame::Message(message) | InboundFrame::BotMessage(message) => {
                if self.store.merge([message]) > 0 {
                    self.publish();
                }
            }
            InboundFrame::Typing { user_name } => {
                if self.typing.on_typing(&user_name, Instant::now()) {
                    self.arm_typing_timer();
                    self.publish();
                }
            }
            InboundFrame::Unrecognized { reason } => {
                tracing::warn!(
                    code = FRAME_UNRECOGNIZED,
                    group_id = %self.group_id,
                    reason = %reason,
                    "inbound frame dropped"
                );
            }
        }
    }

    /// Polls exactly while the live channel is not open.
    fn sync_poll_with_transport(&mut self) {
        if self.transport.state().is_open() {
            self.poll.stop();
            return;
        }

        let inputs = self.inputs_tx.clone();
        self.poll.start(
            Arc::clone(&self.source),
            self.group_id,
            self.settings.poll_interval,
            move |messages| {
                let _ = inputs.send(SyncInput::Snapshot(messages));
            },
        );
    }

    fn arm_typing_timer(&mut self) {
        if let Some(timer) = self.typing_timer.take() {
            timer.abort();
        }

        let Some(expires_at) = self.typing.expires_at() else {
            return;
        };
        let inputs = self.inputs_tx.clone();
        self.typing_timer = Some(tokio::spawn(async move {
            time::sleep_until(expires_at).await;
            let _ = inputs.send(SyncInput::TypingExpired);
        }));
    }

    fn start_refresh_timer(&mut self) {
        let period = self.settings.refresh_interval;
        let first_tick = Instant::now() + period;
        let inputs = self.inputs_tx.clone();
        self.refresh_timer = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if inputs.send(SyncInput::RefreshTick).is_err() {
                    break;
                }
            }
        }));
    }

    fn snapshot(&mut self) -> ChatUpdate {
        ChatUpdate {
            timeline: self.timeline(),
            typing_user: self.typing_user(),
            connection: self.transport.state(),
            rendered_at: Utc::now(),
        }
    }

    fn publish(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }

        let update = self.snapshot();
        self.subscribers
            .retain(|subscriber| subscriber.send(update.clone()).is_ok());
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        self.deactivate();
    }
}
