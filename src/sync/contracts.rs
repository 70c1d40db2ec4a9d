//! Seams between the sync core and the network adapters.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::message::{GroupId, Message};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotSourceError {
    #[error("not authorized to read group messages")]
    Unauthorized,
    #[error("group not found")]
    NotFound,
    #[error("snapshot endpoint unavailable: {0}")]
    Unavailable(String),
    #[error("snapshot payload violated the data contract: {0}")]
    InvalidData(String),
}

/// Full fetch of a group's current message list.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_messages(&self, group_id: GroupId) -> Result<Vec<Message>, SnapshotSourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("live channel connect failed: {0}")]
    Connect(String),
}

/// Command from the transport to an open channel's write side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCommand {
    Frame(String),
    Close,
}

/// Event from an open channel's read side. `Closed` is the last event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Frame(String),
    Closed { reason: Option<String> },
}

/// An established live channel, split into its two directions.
#[derive(Debug)]
pub struct LiveChannel {
    pub outbound: mpsc::UnboundedSender<ChannelCommand>,
    pub inbound: mpsc::UnboundedReceiver<ChannelEvent>,
}

#[async_trait]
pub trait LiveChannelConnector: Send + Sync {
    async fn connect(&self, group_id: GroupId) -> Result<LiveChannel, TransportError>;
}
