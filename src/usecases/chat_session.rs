//! Runs the sync core for one group on a dedicated worker thread.
//!
//! The worker owns a current-thread tokio runtime and the [`SyncCoordinator`];
//! the UI thread talks to it through [`ChatCommand`]s and reads [`ChatUpdate`]s
//! from a plain std channel, so the terminal loop never touches async code.

use std::{
    sync::{mpsc as std_mpsc, Arc},
    thread,
    time::Duration,
};

use thiserror::Error;
use tokio::{sync::mpsc, task::JoinSet};

use crate::{
    api::ApiError,
    domain::{
        events::ChatUpdate,
        message::{CurrentUser, GroupId, MessageId},
        timeline::Timeline,
    },
    sync::{
        contracts::{LiveChannelConnector, SnapshotSource},
        coordinator::{OpenChatError, SyncCoordinator, SyncSettings},
    },
    usecases::{
        contracts::ChatBackend,
        send_message::{MessageSender, SendMessageSourceError},
    },
};

const READ_RECEIPT_FAILED: &str = "SYNC_READ_RECEIPT_FAILED";
const WORKER_PANICKED: &str = "SYNC_WORKER_PANICKED";
const SEND_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub enum ChatCommand {
    Send {
        text: String,
        reply: std_mpsc::Sender<bool>,
    },
    Typing,
    Close,
}

#[derive(Debug, Error)]
pub enum ChatSessionError {
    #[error("failed to start chat worker: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("cannot open chat: current user unavailable: {0}")]
    CurrentUser(#[source] ApiError),
    #[error(transparent)]
    Open(#[from] OpenChatError),
    #[error("chat worker exited before the view opened")]
    WorkerExited,
}

/// Collaborators the worker needs, all shareable across threads.
#[derive(Clone)]
pub struct ChatServices {
    pub backend: Arc<dyn ChatBackend>,
    pub source: Arc<dyn SnapshotSource>,
    pub connector: Arc<dyn LiveChannelConnector>,
}

struct Opened {
    local_user: CurrentUser,
    updates: std_mpsc::Receiver<ChatUpdate>,
}

/// Handle to an open group chat. Dropping it deactivates the view and joins the worker.
pub struct ChatSession {
    group_id: GroupId,
    local_user: CurrentUser,
    commands: mpsc::UnboundedSender<ChatCommand>,
    updates: Option<std_mpsc::Receiver<ChatUpdate>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl ChatSession {
    /// Blocks until the view is open (current user resolved, initial snapshot merged)
    /// or has failed to open.
    pub fn open(
        group_id: GroupId,
        services: ChatServices,
        settings: SyncSettings,
    ) -> Result<Self, ChatSessionError> {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::channel();

        let worker = thread::Builder::new()
            .name(format!("splitchat-sync-{group_id}"))
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(error) => {
                        let _ = ready_tx.send(Err(ChatSessionError::Runtime(error)));
                        return;
                    }
                };

                runtime.block_on(run_worker(group_id, services, settings, command_rx, ready_tx));
            })
            .map_err(ChatSessionError::Runtime)?;

        let opened = match ready_rx.recv() {
            Ok(Ok(opened)) => opened,
            Ok(Err(error)) => {
                let _ = worker.join();
                return Err(error);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(ChatSessionError::WorkerExited);
            }
        };

        Ok(Self {
            group_id,
            local_user: opened.local_user,
            commands,
            updates: Some(opened.updates),
            worker: Some(worker),
        })
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn local_user(&self) -> &CurrentUser {
        &self.local_user
    }

    /// Update stream for the view; the first item is the state at open time.
    pub fn take_updates(&mut self) -> Option<std_mpsc::Receiver<ChatUpdate>> {
        self.updates.take()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        let _ = self.commands.send(ChatCommand::Close);
        if worker.join().is_err() {
            tracing::error!(
                code = WORKER_PANICKED,
                group_id = %self.group_id,
                "chat worker panicked"
            );
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl MessageSender for ChatSession {
    fn send_text(&self, text: &str) -> Result<(), SendMessageSourceError> {
        let (reply, answer) = std_mpsc::channel();
        self.commands
            .send(ChatCommand::Send {
                text: text.to_owned(),
                reply,
            })
            .map_err(|_| SendMessageSourceError::SessionClosed)?;

        match answer.recv_timeout(SEND_REPLY_TIMEOUT) {
            Ok(true) => Ok(()),
            Ok(false) => Err(SendMessageSourceError::ChannelUnavailable),
            Err(_) => Err(SendMessageSourceError::SessionClosed),
        }
    }

    fn notify_typing(&self) {
        let _ = self.commands.send(ChatCommand::Typing);
    }
}

async fn run_worker(
    group_id: GroupId,
    services: ChatServices,
    settings: SyncSettings,
    mut commands: mpsc::UnboundedReceiver<ChatCommand>,
    ready: std_mpsc::Sender<Result<Opened, ChatSessionError>>,
) {
    let local_user = match services.backend.current_user().await {
        Ok(user) => user,
        Err(error) => {
            let _ = ready.send(Err(ChatSessionError::CurrentUser(error)));
            return;
        }
    };

    let mut coordinator = match SyncCoordinator::activate(
        group_id,
        local_user.clone(),
        Arc::clone(&services.source),
        Arc::clone(&services.connector),
        settings,
    )
    .await
    {
        Ok(coordinator) => coordinator,
        Err(error) => {
            let _ = ready.send(Err(error.into()));
            return;
        }
    };

    let updates = coordinator.subscribe();
    if ready.send(Ok(Opened { local_user, updates })).is_err() {
        coordinator.deactivate();
        return;
    }

    let mut receipts = ReadReceipts::new(Arc::clone(&services.backend));
    receipts.observe(&coordinator.timeline());

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(ChatCommand::Send { text, reply }) => {
                    let _ = reply.send(coordinator.send_message(&text));
                }
                Some(ChatCommand::Typing) => {
                    coordinator.notify_typing();
                }
                Some(ChatCommand::Close) | None => break,
            },
            progressed = coordinator.step() => {
                if !progressed {
                    break;
                }
            }
        }

        receipts.observe(&coordinator.timeline());
    }

    coordinator.deactivate();
    receipts.cancel();
}

/// Marks the newest message as read, once per id, without blocking the loop.
struct ReadReceipts {
    backend: Arc<dyn ChatBackend>,
    last_marked: Option<MessageId>,
    pending: JoinSet<()>,
}

impl ReadReceipts {
    fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            last_marked: None,
            pending: JoinSet::new(),
        }
    }

    fn observe(&mut self, timeline: &Timeline) {
        while self.pending.try_join_next().is_some() {}

        let Some(latest) = timeline.latest() else {
            return;
        };
        if self.last_marked.as_ref() == Some(&latest.id) {
            return;
        }

        let message_id = latest.id.clone();
        self.last_marked = Some(message_id.clone());
        let backend = Arc::clone(&self.backend);
        self.pending.spawn(async move {
            if let Err(error) = backend.mark_read(&message_id).await {
                tracing::warn!(
                    code = READ_RECEIPT_FAILED,
                    message_id = %message_id,
                    error = %error,
                    "read receipt failed"
                );
            }
        });
    }

    fn cancel(&mut self) {
        self.pending.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Mutex,
        time::{Duration, Instant},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::connection::ConnectionState,
        sync::contracts::{ChannelCommand, SnapshotSourceError},
        test_support::{message, ChannelPeer, ConnectStep, ScriptedConnector, ScriptedSource},
        usecases::send_message::{send_message, SendMessageError},
    };

    const WAIT: Duration = Duration::from_secs(3);

    struct StubBackend {
        fail_user: bool,
        marked: Mutex<Vec<String>>,
    }

    impl StubBackend {
        fn new() -> Self {
            Self {
                fail_user: false,
                marked: Mutex::new(Vec::new()),
            }
        }

        fn marked(&self) -> Vec<String> {
            self.marked.lock().expect("marked lock").clone()
        }
    }

    #[async_trait]
    impl ChatBackend for StubBackend {
        async fn current_user(&self) -> Result<CurrentUser, ApiError> {
            if self.fail_user {
                return Err(ApiError::Unauthorized);
            }

            Ok(CurrentUser {
                id: 42,
                name: "Me".to_owned(),
            })
        }

        async fn mark_read(&self, message_id: &MessageId) -> Result<(), ApiError> {
            self.marked
                .lock()
                .expect("marked lock")
                .push(message_id.as_str().to_owned());
            Ok(())
        }
    }

    fn services(
        backend: Arc<StubBackend>,
        source: Arc<ScriptedSource>,
        connector: Arc<ScriptedConnector>,
    ) -> ChatServices {
        ChatServices {
            backend,
            source,
            connector,
        }
    }

    fn wait_for_update<F>(updates: &std_mpsc::Receiver<ChatUpdate>, predicate: F) -> ChatUpdate
    where
        F: Fn(&ChatUpdate) -> bool,
    {
        let deadline = Instant::now() + WAIT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let update = updates
                .recv_timeout(remaining)
                .expect("expected update before deadline");
            if predicate(&update) {
                return update;
            }
        }
    }

    fn wait_for_command(peer: &mut ChannelPeer) -> ChannelCommand {
        let deadline = Instant::now() + WAIT;
        loop {
            if let Ok(command) = peer.from_client.try_recv() {
                return command;
            }
            assert!(Instant::now() < deadline, "expected command before deadline");
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn open_session(
        backend: Arc<StubBackend>,
        source: Arc<ScriptedSource>,
        connector: Arc<ScriptedConnector>,
    ) -> ChatSession {
        ChatSession::open(
            GroupId(8),
            services(backend, source, connector),
            SyncSettings::default(),
        )
        .expect("session should open")
    }

    #[test]
    fn publishes_initial_timeline_then_open_state() {
        let source = Arc::new(ScriptedSource::always(vec![message(1, 0), message(2, 5)]));
        let connector = Arc::new(ScriptedConnector::new(vec![ConnectStep::Accept]));
        let mut session = open_session(Arc::new(StubBackend::new()), source, connector);
        let updates = session.take_updates().expect("updates available once");

        let first = updates.recv_timeout(WAIT).expect("initial update");
        assert_eq!(first.timeline.len(), 2);
        assert_eq!(session.local_user().name, "Me");

        let open = wait_for_update(&updates, |update| update.connection.is_open());
        assert_eq!(open.timeline.len(), 2);
        assert!(session.take_updates().is_none());
    }

    #[test]
    fn send_reaches_open_channel() {
        let source = Arc::new(ScriptedSource::always(vec![]));
        let connector = Arc::new(ScriptedConnector::new(vec![ConnectStep::Accept]));
        let mut session = open_session(Arc::new(StubBackend::new()), source, connector.clone());
        let updates = session.take_updates().expect("updates");
        wait_for_update(&updates, |update| update.connection == ConnectionState::Open);
        let mut peer = connector.take_peer().expect("peer");

        assert_eq!(send_message(&session, "  dinner is 40  "), Ok(()));

        assert_eq!(
            wait_for_command(&mut peer),
            ChannelCommand::Frame(
                r#"{"event":"message","user_id":42,"content":"dinner is 40"}"#.to_owned()
            )
        );
    }

    #[test]
    fn send_while_connecting_reports_unavailable() {
        let source = Arc::new(ScriptedSource::always(vec![]));
        let gate = Arc::new(tokio::sync::Notify::new());
        let connector = Arc::new(ScriptedConnector::new(vec![ConnectStep::Gate(gate)]));
        let session = open_session(Arc::new(StubBackend::new()), source, connector);

        assert_eq!(
            send_message(&session, "hello"),
            Err(SendMessageError::ChannelUnavailable)
        );
    }

    #[test]
    fn current_user_failure_cannot_open() {
        let backend = Arc::new(StubBackend {
            fail_user: true,
            marked: Mutex::new(Vec::new()),
        });
        let source = Arc::new(ScriptedSource::always(vec![]));
        let connector = Arc::new(ScriptedConnector::new(vec![ConnectStep::Accept]));

        let result = ChatSession::open(
            GroupId(8),
            services(backend, source.clone(), connector.clone()),
            SyncSettings::default(),
        );

        assert!(matches!(result, Err(ChatSessionError::CurrentUser(_))));
        assert_eq!(source.fetches(), 0);
        assert_eq!(connector.attempts(), 0);
    }

    #[test]
    fn snapshot_failure_cannot_open() {
        let source = Arc::new(ScriptedSource::scripted(
            vec![Err(SnapshotSourceError::NotFound)],
            vec![],
        ));
        let connector = Arc::new(ScriptedConnector::new(vec![ConnectStep::Accept]));

        let result = ChatSession::open(
            GroupId(8),
            services(Arc::new(StubBackend::new()), source, connector),
            SyncSettings::default(),
        );

        assert!(matches!(
            result,
            Err(ChatSessionError::Open(OpenChatError::InitialSnapshot(
                SnapshotSourceError::NotFound
            )))
        ));
    }

    #[test]
    fn closing_session_closes_live_channel_and_joins_worker() {
        let source = Arc::new(ScriptedSource::always(vec![]));
        let connector = Arc::new(ScriptedConnector::new(vec![ConnectStep::Accept]));
        let mut session = open_session(Arc::new(StubBackend::new()), source, connector.clone());
        let updates = session.take_updates().expect("updates");
        wait_for_update(&updates, |update| update.connection.is_open());
        let mut peer = connector.take_peer().expect("peer");

        session.close();

        assert_eq!(peer.from_client.try_recv().ok(), Some(ChannelCommand::Close));
        assert!(updates.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn marks_newest_message_read_once() {
        let backend = Arc::new(StubBackend::new());
        let source = Arc::new(ScriptedSource::always(vec![message(2, 5), message(1, 0)]));
        let gate = Arc::new(tokio::sync::Notify::new());
        let connector = Arc::new(ScriptedConnector::new(vec![ConnectStep::Gate(gate)]));
        let session = open_session(backend.clone(), source, connector);

        let deadline = Instant::now() + WAIT;
        while backend.marked().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        drop(session);

        assert_eq!(backend.marked(), vec!["2".to_owned()]);
    }
}
