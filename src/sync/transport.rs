use std::{sync::Arc, time::Duration};

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant},
};

use crate::domain::{connection::ConnectionState, message::GroupId};

use super::{
    contracts::{ChannelCommand, ChannelEvent, LiveChannel, LiveChannelConnector, TransportError},
    frames::OutboundFrame,
};

const TRANSPORT_CONNECT_FAILED: &str = "SYNC_TRANSPORT_CONNECT_FAILED";
const TRANSPORT_CLOSED: &str = "SYNC_TRANSPORT_CLOSED";
const TRANSPORT_ENCODE_FAILED: &str = "SYNC_TRANSPORT_ENCODE_FAILED";
const TRANSPORT_SEND_FAILED: &str = "SYNC_TRANSPORT_SEND_FAILED";

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3_000);

/// What to do after the live channel closes on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Retry on every close after a fixed delay.
    Always { delay: Duration },
    /// Make a single attempt and stay closed afterwards.
    Once,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Always {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Report from a connection task or reconnect timer back to the manager.
///
/// Every signal carries the generation of the attempt that produced it; the
/// manager drops signals from attempts it has already abandoned.
#[derive(Debug)]
pub enum TransportSignal {
    Opened {
        generation: u64,
        outbound: mpsc::UnboundedSender<ChannelCommand>,
    },
    ConnectFailed {
        generation: u64,
        error: TransportError,
    },
    Frame {
        generation: u64,
        raw: String,
    },
    Closed {
        generation: u64,
        reason: Option<String>,
    },
    ReconnectDue {
        generation: u64,
    },
}

/// Result of feeding a signal into the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    Ignored,
    StateChanged(ConnectionState),
    Frame(String),
}

/// Owns the live-channel lifecycle for one group view.
///
/// `Idle --connect--> Connecting --opened--> Open`; failures and closes move to
/// `Closed`, from where the reconnect policy may call `connect` again. At most
/// one connection task and one reconnect timer exist at any time.
pub struct TransportManager {
    group_id: GroupId,
    connector: Arc<dyn LiveChannelConnector>,
    policy: ReconnectPolicy,
    signals: mpsc::UnboundedSender<TransportSignal>,
    state: ConnectionState,
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<ChannelCommand>>,
    connection_task: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
    attempts: u64,
}

impl TransportManager {
    pub fn new(
        group_id: GroupId,
        connector: Arc<dyn LiveChannelConnector>,
        policy: ReconnectPolicy,
        signals: mpsc::UnboundedSender<TransportSignal>,
    ) -> Self {
        Self {
            group_id,
            connector,
            policy,
            signals,
            state: ConnectionState::Idle,
            generation: 0,
            outbound: None,
            connection_task: None,
            reconnect_timer: None,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Total connection attempts started by this manager.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.reconnect_timer
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// Starts a connection attempt. No-op while `Connecting` or `Open`.
    pub fn connect(&mut self) -> bool {
        if self.state.is_active() {
            return false;
        }

        self.cancel_reconnect();
        self.generation += 1;
        self.attempts += 1;
        self.state = ConnectionState::Connecting;

        tracing::info!(
            group_id = %self.group_id,
            attempt = self.attempts,
            "live channel connecting"
        );

        self.connection_task = Some(tokio::spawn(run_connection(
            Arc::clone(&self.connector),
            self.group_id,
            self.generation,
            self.signals.clone(),
        )));
        true
    }

    /// Hands a frame to the open channel. Dropped silently unless `Open`.
    pub fn send(&self, frame: &OutboundFrame) -> bool {
        let Some(outbound) = self.outbound.as_ref().filter(|_| self.state.is_open()) else {
            tracing::debug!(
                kind = frame.kind(),
                state = self.state.as_label(),
                "outbound frame dropped; live channel not open"
            );
            return false;
        };

        let encoded = match frame.encode() {
            Ok(encoded) => encoded,
            Err(error) => {
                tracing::warn!(
                    code = TRANSPORT_ENCODE_FAILED,
                    kind = frame.kind(),
                    error = %error,
                    "outbound frame could not be encoded"
                );
                return false;
            }
        };

        if outbound.send(ChannelCommand::Frame(encoded)).is_err() {
            tracing::warn!(
                code = TRANSPORT_SEND_FAILED,
                kind = frame.kind(),
                "live channel writer is gone; frame dropped"
            );
            return false;
        }

        true
    }

    pub fn handle_signal(&mut self, signal: TransportSignal) -> TransportOutcome {
        match signal {
            TransportSignal::Opened {
                generation,
                outbound,
            } => {
                if generation != self.generation || self.state != ConnectionState::Connecting {
                    let _ = outbound.send(ChannelCommand::Close);
                    return TransportOutcome::Ignored;
                }

                self.outbound = Some(outbound);
                self.state = ConnectionState::Open;
                tracing::info!(group_id = %self.group_id, "live channel open");
                TransportOutcome::StateChanged(ConnectionState::Open)
            }
            TransportSignal::Frame { generation, raw } => {
                if generation != self.generation || !self.state.is_open() {
                    return TransportOutcome::Ignored;
                }

                TransportOutcome::Frame(raw)
            }
            TransportSignal::ConnectFailed { generation, error } => {
                if generation != self.generation || !self.state.is_active() {
                    return TransportOutcome::Ignored;
                }

                tracing::warn!(
                    code = TRANSPORT_CONNECT_FAILED,
                    group_id = %self.group_id,
                    error = %error,
                    "live channel connect failed"
                );
                self.on_closed()
            }
            TransportSignal::Closed { generation, reason } => {
                if generation != self.generation || !self.state.is_active() {
                    return TransportOutcome::Ignored;
                }

                tracing::warn!(
                    code = TRANSPORT_CLOSED,
                    group_id = %self.group_id,
                    reason = reason.as_deref().unwrap_or("none"),
                    "live channel closed"
                );
                self.on_closed()
            }
            TransportSignal::ReconnectDue { generation } => {
                if generation != self.generation || self.state != ConnectionState::Closed {
                    return TransportOutcome::Ignored;
                }

                self.reconnect_timer = None;
                if self.connect() {
                    TransportOutcome::StateChanged(ConnectionState::Connecting)
                } else {
                    TransportOutcome::Ignored
                }
            }
        }
    }

    /// Explicit teardown: closes the channel, cancels the attempt and any
    /// pending reconnect. Nothing scheduled by this manager fires afterwards.
    pub fn close(&mut self) {
        self.cancel_reconnect();

        if let Some(outbound) = self.outbound.take() {
            let _ = outbound.send(ChannelCommand::Close);
        }

        if let Some(task) = self.connection_task.take() {
            task.abort();
        }

        // Invalidate signals already queued by the abandoned attempt.
        self.generation += 1;

        if self.state.is_active() {
            tracing::info!(group_id = %self.group_id, "live channel closed by view");
            self.state = ConnectionState::Closed;
        }
    }

    fn on_closed(&mut self) -> TransportOutcome {
        self.outbound = None;
        self.connection_task = None;
        self.state = ConnectionState::Closed;
        self.schedule_reconnect();
        TransportOutcome::StateChanged(ConnectionState::Closed)
    }

    fn schedule_reconnect(&mut self) {
        let delay = match self.policy {
            ReconnectPolicy::Always { delay } => delay,
            ReconnectPolicy::Once => {
                tracing::info!(
                    group_id = %self.group_id,
                    "live channel stays closed; reconnect policy is single attempt"
                );
                return;
            }
        };

        self.cancel_reconnect();

        let signals = self.signals.clone();
        let generation = self.generation;
        let due = Instant::now() + delay;
        tracing::debug!(
            group_id = %self.group_id,
            delay_ms = delay.as_millis() as u64,
            "live channel reconnect scheduled"
        );
        self.reconnect_timer = Some(tokio::spawn(async move {
            time::sleep_until(due).await;
            let _ = signals.send(TransportSignal::ReconnectDue { generation });
        }));
    }

    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
    }
}

impl Drop for TransportManager {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_connection(
    connector: Arc<dyn LiveChannelConnector>,
    group_id: GroupId,
    generation: u64,
    signals: mpsc::UnboundedSender<TransportSignal>,
) {
    let LiveChannel {
        outbound,
        mut inbound,
    } = match connector.connect(group_id).await {
        Ok(channel) => channel,
        Err(error) => {
            let _ = signals.send(TransportSignal::ConnectFailed { generation, error });
            return;
        }
    };

    if signals
        .send(TransportSignal::Opened {
            generation,
            outbound,
        })
        .is_err()
    {
        return;
    }

    while let Some(event) = inbound.recv().await {
        match event {
            ChannelEvent::Frame(raw) => {
                if signals
                    .send(TransportSignal::Frame { generation, raw })
                    .is_err()
                {
                    return;
                }
            }
            ChannelEvent::Closed { reason } => {
                let _ = signals.send(TransportSignal::Closed { generation, reason });
                return;
            }
        }
    }

    let _ = signals.send(TransportSignal::Closed {
        generation,
        reason: None,
    });
}
