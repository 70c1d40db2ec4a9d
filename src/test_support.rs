use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::{mpsc, Notify};

use crate::{
    domain::message::{GroupId, Message, MessageId, MessageKind},
    sync::contracts::{
        ChannelCommand, ChannelEvent, LiveChannel, LiveChannelConnector, SnapshotSource,
        SnapshotSourceError, TransportError,
    },
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().expect("env lock should not be poisoned")
}

/// User message from Alice at 10:`minute` UTC on a fixed day.
pub fn message(id: i64, minute: u32) -> Message {
    Message {
        id: MessageId::from(id),
        content: format!("message {id}"),
        sender_id: Some(7),
        sender_name: Some("Alice".to_owned()),
        timestamp: Utc
            .with_ymd_and_hms(2026, 2, 14, 10, minute, 0)
            .single()
            .expect("valid fixture timestamp"),
        kind: MessageKind::User,
    }
}

/// Lets spawned tasks run until they park on a timer or channel.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Snapshot source replaying a scripted response list.
///
/// Once the script runs out the last `Ok` payload is repeated.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<Message>, SnapshotSourceError>>>,
    fallback: Mutex<Vec<Message>>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn always(messages: Vec<Message>) -> Self {
        Self::scripted(Vec::new(), messages)
    }

    pub fn failing_first(failures: usize, messages: Vec<Message>) -> Self {
        let script = (0..failures)
            .map(|_| Err(SnapshotSourceError::Unavailable("scripted failure".to_owned())))
            .collect();
        Self::scripted(script, messages)
    }

    pub fn scripted(
        script: Vec<Result<Vec<Message>, SnapshotSourceError>>,
        fallback: Vec<Message>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Mutex::new(fallback),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch_messages(&self, _group_id: GroupId) -> Result<Vec<Message>, SnapshotSourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(next) = self.script.lock().expect("script lock").pop_front() {
            return next;
        }

        Ok(self.fallback.lock().expect("fallback lock").clone())
    }
}

#[derive(Clone)]
pub enum ConnectStep {
    Accept,
    Refuse,
    /// Waits for the notify before accepting.
    Gate(Arc<Notify>),
}

/// Server side of a channel handed out by [`ScriptedConnector`].
pub struct ChannelPeer {
    pub to_client: mpsc::UnboundedSender<ChannelEvent>,
    pub from_client: mpsc::UnboundedReceiver<ChannelCommand>,
}

impl ChannelPeer {
    pub fn push_frame(&self, raw: &str) {
        let _ = self.to_client.send(ChannelEvent::Frame(raw.to_owned()));
    }

    pub fn close(&self, reason: &str) {
        let _ = self.to_client.send(ChannelEvent::Closed {
            reason: Some(reason.to_owned()),
        });
    }
}

/// Connector following a scripted list of outcomes; refuses once exhausted.
pub struct ScriptedConnector {
    steps: Mutex<VecDeque<ConnectStep>>,
    peers: Mutex<VecDeque<ChannelPeer>>,
    attempts: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(steps: Vec<ConnectStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            peers: Mutex::new(VecDeque::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Takes the oldest accepted channel that has not been taken yet.
    pub fn take_peer(&self) -> Option<ChannelPeer> {
        self.peers.lock().expect("peers lock").pop_front()
    }
}

#[async_trait]
impl LiveChannelConnector for ScriptedConnector {
    async fn connect(&self, _group_id: GroupId) -> Result<LiveChannel, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .expect("steps lock")
            .pop_front()
            .unwrap_or(ConnectStep::Refuse);

        match step {
            ConnectStep::Refuse => {
                return Err(TransportError::Connect("scripted refusal".to_owned()))
            }
            ConnectStep::Gate(gate) => gate.notified().await,
            ConnectStep::Accept => {}
        }

        let (outbound, from_client) = mpsc::unbounded_channel();
        let (to_client, inbound) = mpsc::unbounded_channel();
        self.peers.lock().expect("peers lock").push_back(ChannelPeer {
            to_client,
            from_client,
        });

        Ok(LiveChannel { outbound, inbound })
    }
}
