// Websocket transport - one driver task per topic with bounded backoff
use crate::application::channel_manager::{ChannelError, ChannelEvent, ChannelTransport};
use crate::domain::topic::Topic;
use crate::infrastructure::config::ReconnectConfig;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Bounded exponential backoff: doubles per failed attempt up to a cap,
/// resets after a successful connect.
struct Backoff {
    initial: Duration,
    max: Duration,
    delay: Duration,
}

impl Backoff {
    fn new(config: &ReconnectConfig) -> Self {
        let initial = config.initial_delay();
        Self {
            initial,
            max: config.max_delay(),
            delay: initial,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.delay;
        self.delay = (self.delay * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.delay = self.initial;
    }
}

/// Production transport: each channel gets a long-lived driver task that
/// dials the endpoint, pumps frames, and reconnects with backoff. Dropping
/// the outbound sender (explicit close) stops the driver for good.
pub struct WsTransport {
    reconnect: ReconnectConfig,
}

impl WsTransport {
    pub fn new(reconnect: ReconnectConfig) -> Self {
        Self { reconnect }
    }
}

#[async_trait]
impl ChannelTransport for WsTransport {
    async fn connect(
        &self,
        topic: Topic,
        endpoint: String,
        events: mpsc::Sender<ChannelEvent>,
    ) -> Result<mpsc::Sender<String>, ChannelError> {
        let (outbound_tx, outbound_rx) = mpsc::channel(32);
        tokio::spawn(drive(topic, endpoint, events, outbound_rx, self.reconnect.clone()));
        Ok(outbound_tx)
    }
}

async fn drive(
    topic: Topic,
    endpoint: String,
    events: mpsc::Sender<ChannelEvent>,
    mut outbound: mpsc::Receiver<String>,
    reconnect: ReconnectConfig,
) {
    let mut backoff = Backoff::new(&reconnect);
    loop {
        if events.send(ChannelEvent::Connecting(topic)).await.is_err() {
            return;
        }
        match connect_async(endpoint.as_str()).await {
            Ok((stream, _)) => {
                backoff.reset();
                tracing::info!(%topic, %endpoint, "channel connected");
                if events.send(ChannelEvent::Opened(topic)).await.is_err() {
                    return;
                }
                if pump(topic, stream, &events, &mut outbound).await == PumpExit::OutboundClosed {
                    tracing::info!(%topic, "channel closed by owner");
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(%topic, %endpoint, %err, "connection attempt failed");
            }
        }
        if events.send(ChannelEvent::Down(topic)).await.is_err() {
            return;
        }

        let delay = backoff.next_delay();
        tracing::debug!(%topic, ?delay, "reconnecting after backoff");
        let reconnect_at = tokio::time::sleep(delay);
        tokio::pin!(reconnect_at);
        loop {
            tokio::select! {
                _ = &mut reconnect_at => break,
                frame = outbound.recv() => match frame {
                    // Owner dropped the sender during the wait: stop
                    // reconnecting.
                    None => return,
                    // The channel is not Open; a stray frame is dropped
                    // without shortening the wait.
                    Some(_) => {}
                },
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PumpExit {
    /// Owner dropped the outbound sender; do not reconnect.
    OutboundClosed,
    /// The connection failed or the peer closed; reconnect with backoff.
    ConnectionLost,
}

async fn pump(
    topic: Topic,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    events: &mpsc::Sender<ChannelEvent>,
    outbound: &mut mpsc::Receiver<String>,
) -> PumpExit {
    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(text) => {
                    if let Err(err) = write.send(Message::Text(text)).await {
                        tracing::warn!(%topic, %err, "write failed");
                        return PumpExit::ConnectionLost;
                    }
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    return PumpExit::OutboundClosed;
                }
            },
            message = read.next() => match message {
                Some(Ok(Message::Text(raw))) => {
                    if events.send(ChannelEvent::Message { topic, raw }).await.is_err() {
                        return PumpExit::OutboundClosed;
                    }
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!(%topic, "connection closed by peer");
                    return PumpExit::ConnectionLost;
                }
                Some(Err(err)) => {
                    tracing::warn!(%topic, %err, "read error");
                    return PumpExit::ConnectionLost;
                }
            },
        }
    }
}
