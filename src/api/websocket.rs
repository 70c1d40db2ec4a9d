use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

use crate::{
    domain::message::GroupId,
    infra::secrets::{redact_text, redact_url},
    sync::contracts::{
        ChannelCommand, ChannelEvent, LiveChannel, LiveChannelConnector, TransportError,
    },
};

use super::rest::ApiClient;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens the group chat socket and bridges it to channel command/event queues.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    api: Arc<ApiClient>,
}

impl WebSocketConnector {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl LiveChannelConnector for WebSocketConnector {
    async fn connect(&self, group_id: GroupId) -> Result<LiveChannel, TransportError> {
        let url = self.api.live_channel_url(group_id);
        tracing::debug!(url = %redact_url(&url), "opening live channel socket");
        let (socket, _response) = connect_async(url.as_str())
            .await
            .map_err(|error| TransportError::Connect(redact_text(&error.to_string())))?;

        let (sink, stream) = socket.split();
        let (outbound, commands) = mpsc::unbounded_channel();
        let (events, inbound) = mpsc::unbounded_channel();

        tokio::spawn(write_pump(sink, commands));
        tokio::spawn(read_pump(stream, events));

        Ok(LiveChannel { outbound, inbound })
    }
}

async fn write_pump(
    mut sink: SplitSink<Socket, WsMessage>,
    mut commands: mpsc::UnboundedReceiver<ChannelCommand>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            ChannelCommand::Frame(text) => {
                if let Err(error) = sink.send(WsMessage::text(text)).await {
                    tracing::debug!(error = %error, "live channel write failed");
                    break;
                }
            }
            ChannelCommand::Close => {
                let _ = sink.send(WsMessage::Close(None)).await;
                break;
            }
        }
    }

    let _ = sink.close().await;
}

async fn read_pump(mut stream: SplitStream<Socket>, events: mpsc::UnboundedSender<ChannelEvent>) {
    let mut reason = None;

    while let Some(next) = stream.next().await {
        match next {
            Ok(WsMessage::Text(text)) => {
                if events
                    .send(ChannelEvent::Frame(text.as_str().to_owned()))
                    .is_err()
                {
                    return;
                }
            }
            Ok(WsMessage::Close(frame)) => {
                reason = frame
                    .map(|frame| frame.reason.as_str().to_owned())
                    .filter(|reason| !reason.is_empty());
                break;
            }
            Ok(_) => {}
            Err(error) => {
                reason = Some(redact_text(&error.to_string()));
                break;
            }
        }
    }

    let _ = events.send(ChannelEvent::Closed { reason });
}
