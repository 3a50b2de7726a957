// Channel manager - owns one live connection per topic
use crate::domain::topic::Topic;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transport failed to start for {topic}: {reason}")]
    Transport { topic: Topic, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Point-in-time view of one channel, for the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub topic: Topic,
    pub endpoint: String,
    pub state: ConnectionState,
}

/// Lifecycle and data events a transport driver reports to the manager.
/// All drivers feed one mpsc consumed by a single coordination task, which
/// keeps per-topic processing in arrival order and last-writer-wins.
#[derive(Debug)]
pub enum ChannelEvent {
    Connecting(Topic),
    Opened(Topic),
    Message { topic: Topic, raw: String },
    Down(Topic),
}

/// Seam between the manager and the wire. The production implementation
/// drives a websocket; tests substitute a recording fake.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Start the connection driver for one topic. Inbound frames and state
    /// transitions are delivered through `events`; the returned sender
    /// carries outbound text frames. Dropping the sender stops the driver.
    async fn connect(
        &self,
        topic: Topic,
        endpoint: String,
        events: mpsc::Sender<ChannelEvent>,
    ) -> Result<mpsc::Sender<String>, ChannelError>;
}

struct ChannelHandle {
    endpoint: String,
    state: ConnectionState,
    /// `None` once the channel has been explicitly closed.
    outbound: Option<mpsc::Sender<String>>,
}

/// Owns the fixed set of telemetry channels, exposes the latest parsed
/// snapshot per topic, and forwards outbound commands to the right
/// connection.
pub struct ChannelManager {
    transport: Arc<dyn ChannelTransport>,
    channels: RwLock<HashMap<Topic, ChannelHandle>>,
    snapshots: RwLock<HashMap<Topic, Value>>,
    events_tx: mpsc::Sender<ChannelEvent>,
    notify: broadcast::Sender<Topic>,
}

impl ChannelManager {
    pub fn new(transport: Arc<dyn ChannelTransport>) -> (Arc<Self>, mpsc::Receiver<ChannelEvent>) {
        let (events_tx, events_rx) = mpsc::channel(256);
        let (notify, _) = broadcast::channel(64);
        let manager = Arc::new(Self {
            transport,
            channels: RwLock::new(HashMap::new()),
            snapshots: RwLock::new(HashMap::new()),
            events_tx,
            notify,
        });
        (manager, events_rx)
    }

    /// Open a channel for `topic`. Idempotent while the channel is live:
    /// a second call is a no-op and never creates a second connection.
    pub async fn open(&self, topic: Topic, endpoint: &str) -> Result<(), ChannelError> {
        {
            let channels = self.channels.read();
            if let Some(handle) = channels.get(&topic) {
                if handle.outbound.is_some() && handle.state != ConnectionState::Closed {
                    tracing::debug!(%topic, "channel already live, open is a no-op");
                    return Ok(());
                }
            }
        }

        let outbound = self
            .transport
            .connect(topic, endpoint.to_string(), self.events_tx.clone())
            .await?;

        let mut channels = self.channels.write();
        // Re-check under the write lock: a concurrent open may have won.
        if let Some(handle) = channels.get(&topic) {
            if handle.outbound.is_some() && handle.state != ConnectionState::Closed {
                tracing::debug!(%topic, "lost open race, dropping duplicate connection");
                return Ok(());
            }
        }
        tracing::info!(%topic, %endpoint, "opening channel");
        channels.insert(
            topic,
            ChannelHandle {
                endpoint: endpoint.to_string(),
                state: ConnectionState::Connecting,
                outbound: Some(outbound),
            },
        );
        Ok(())
    }

    /// Transmit a text frame on `topic`. Frames for channels that are not
    /// Open are silently dropped; callers hold no delivery guarantee.
    pub async fn send(&self, topic: Topic, message: String) {
        let outbound = {
            let channels = self.channels.read();
            match channels.get(&topic) {
                Some(handle) if handle.state == ConnectionState::Open => handle.outbound.clone(),
                _ => None,
            }
        };
        match outbound {
            Some(sender) => {
                if sender.send(message).await.is_err() {
                    tracing::debug!(%topic, "dropping send, transport is gone");
                }
            }
            None => tracing::debug!(%topic, "dropping send, channel not open"),
        }
    }

    /// Handle one inbound frame. A parse failure discards the frame and
    /// keeps the prior snapshot; it is never fatal.
    pub fn on_message(&self, topic: Topic, raw: &str) {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => {
                self.snapshots.write().insert(topic, value);
                // Subscribers are told on every message, not on a diff.
                let _ = self.notify.send(topic);
            }
            Err(err) => {
                tracing::warn!(%topic, %err, "discarding unparsable frame, keeping prior snapshot");
            }
        }
    }

    /// Latest successfully parsed payload for `topic`, if any.
    pub fn latest_snapshot(&self, topic: Topic) -> Option<Value> {
        self.snapshots.read().get(&topic).cloned()
    }

    pub fn state(&self, topic: Topic) -> Option<ConnectionState> {
        self.channels.read().get(&topic).map(|handle| handle.state)
    }

    /// Snapshot of every channel's topic, endpoint, and connection state.
    pub fn statuses(&self) -> Vec<ChannelStatus> {
        self.channels
            .read()
            .iter()
            .map(|(topic, handle)| ChannelStatus {
                topic: *topic,
                endpoint: handle.endpoint.clone(),
                state: handle.state,
            })
            .collect()
    }

    /// Per-message notification stream carrying the topic that changed.
    pub fn subscribe(&self) -> broadcast::Receiver<Topic> {
        self.notify.subscribe()
    }

    /// Terminate the connection for `topic`. Dropping the outbound sender
    /// stops the transport driver; the channel stays Closed until reopened.
    pub fn close(&self, topic: Topic) {
        let mut channels = self.channels.write();
        if let Some(handle) = channels.get_mut(&topic) {
            if handle.outbound.take().is_some() {
                tracing::info!(%topic, "closing channel");
            }
            handle.state = ConnectionState::Closed;
        }
    }

    /// Terminate every connection. Must run on teardown of the owning scope.
    pub fn close_all(&self) {
        let mut channels = self.channels.write();
        for (topic, handle) in channels.iter_mut() {
            if handle.outbound.take().is_some() {
                tracing::info!(%topic, "closing channel");
            }
            handle.state = ConnectionState::Closed;
        }
    }

    /// Coordination loop. The single consumer of every transport's events;
    /// runs until all transports and the manager's own sender are gone.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<ChannelEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                ChannelEvent::Connecting(topic) => {
                    self.transition(topic, ConnectionState::Connecting)
                }
                ChannelEvent::Opened(topic) => self.transition(topic, ConnectionState::Open),
                ChannelEvent::Down(topic) => self.transition(topic, ConnectionState::Closed),
                ChannelEvent::Message { topic, raw } => self.on_message(topic, &raw),
            }
        }
    }

    fn transition(&self, topic: Topic, next: ConnectionState) {
        let mut channels = self.channels.write();
        match channels.get_mut(&topic) {
            // A handle without an outbound sender was explicitly closed;
            // late transitions from its driver are ignored.
            Some(handle) if handle.outbound.is_some() => {
                if handle.state != next {
                    tracing::info!(%topic, ?next, "channel state transition");
                    handle.state = next;
                }
            }
            _ => tracing::debug!(%topic, ?next, "ignoring transition for closed channel"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeTransport;
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    const ENDPOINT: &str = "ws://localhost:8000/ws/flight-events";

    async fn open_manager() -> (Arc<ChannelManager>, Arc<FakeTransport>) {
        let transport = FakeTransport::new();
        let (manager, events_rx) = ChannelManager::new(transport.clone());
        tokio::spawn(Arc::clone(&manager).run(events_rx));
        manager
            .open(Topic::FlightEvents, ENDPOINT)
            .await
            .expect("open");
        (manager, transport)
    }

    async fn drive(transport: &FakeTransport, event: ChannelEvent) {
        let events = transport.events.lock().clone().expect("events sender");
        events.send(event).await.expect("event delivered");
        // Let the coordination task drain the event.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_open_is_idempotent_while_live() {
        let (manager, transport) = open_manager().await;
        manager
            .open(Topic::FlightEvents, ENDPOINT)
            .await
            .expect("second open");
        assert_eq!(transport.connects.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_open_after_explicit_close_reconnects() {
        let (manager, transport) = open_manager().await;
        manager.close(Topic::FlightEvents);
        assert_eq!(manager.state(Topic::FlightEvents), Some(ConnectionState::Closed));

        manager
            .open(Topic::FlightEvents, ENDPOINT)
            .await
            .expect("reopen");
        assert_eq!(transport.connects.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_send_while_not_open_is_silently_dropped() {
        let (manager, transport) = open_manager().await;
        // Still Connecting: the frame must not reach the transport.
        manager.send(Topic::FlightEvents, "{}".to_string()).await;
        let mut outbounds = transport.outbounds.lock();
        let rx = outbounds.get_mut(&Topic::FlightEvents).unwrap();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_send_while_open_transmits() {
        let (manager, transport) = open_manager().await;
        drive(&transport, ChannelEvent::Opened(Topic::FlightEvents)).await;
        assert_eq!(manager.state(Topic::FlightEvents), Some(ConnectionState::Open));

        manager
            .send(Topic::FlightEvents, "{\"command\":\"abort\"}".to_string())
            .await;
        let mut outbounds = transport.outbounds.lock();
        let rx = outbounds.get_mut(&Topic::FlightEvents).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "{\"command\":\"abort\"}");
    }

    #[tokio::test]
    async fn test_send_to_unknown_topic_does_not_panic() {
        let (manager, _transport) = open_manager().await;
        manager.send(Topic::Command, "noop".to_string()).await;
    }

    #[tokio::test]
    async fn test_parse_failure_keeps_prior_snapshot() {
        let (manager, transport) = open_manager().await;
        drive(
            &transport,
            ChannelEvent::Message {
                topic: Topic::FlightEvents,
                raw: "{\"flight_records\": []}".to_string(),
            },
        )
        .await;
        let before = manager.latest_snapshot(Topic::FlightEvents).unwrap();

        drive(
            &transport,
            ChannelEvent::Message {
                topic: Topic::FlightEvents,
                raw: "{not json".to_string(),
            },
        )
        .await;
        assert_eq!(manager.latest_snapshot(Topic::FlightEvents).unwrap(), before);
    }

    #[tokio::test]
    async fn test_messages_notify_subscribers_every_time() {
        let (manager, transport) = open_manager().await;
        let mut notifications = manager.subscribe();
        for _ in 0..2 {
            drive(
                &transport,
                ChannelEvent::Message {
                    topic: Topic::FlightEvents,
                    raw: "{\"flight_records\": []}".to_string(),
                },
            )
            .await;
        }
        assert_eq!(notifications.try_recv().unwrap(), Topic::FlightEvents);
        assert_eq!(notifications.try_recv().unwrap(), Topic::FlightEvents);
    }

    #[tokio::test]
    async fn test_transport_down_marks_channel_closed() {
        let (manager, transport) = open_manager().await;
        drive(&transport, ChannelEvent::Opened(Topic::FlightEvents)).await;
        drive(&transport, ChannelEvent::Down(Topic::FlightEvents)).await;
        assert_eq!(manager.state(Topic::FlightEvents), Some(ConnectionState::Closed));

        // Send capability is gone with the connection.
        manager.send(Topic::FlightEvents, "{}".to_string()).await;
        let mut outbounds = transport.outbounds.lock();
        let rx = outbounds.get_mut(&Topic::FlightEvents).unwrap();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_close_all_tears_down_every_channel() {
        let (manager, transport) = open_manager().await;
        manager
            .open(Topic::OrbitInfo, "ws://localhost:8000/ws/orbit-info")
            .await
            .expect("open second");
        manager.close_all();
        assert_eq!(manager.state(Topic::FlightEvents), Some(ConnectionState::Closed));
        assert_eq!(manager.state(Topic::OrbitInfo), Some(ConnectionState::Closed));

        // Late lifecycle events from a closed driver are ignored.
        drive(&transport, ChannelEvent::Opened(Topic::OrbitInfo)).await;
        assert_eq!(manager.state(Topic::OrbitInfo), Some(ConnectionState::Closed));
    }

    #[tokio::test]
    async fn test_open_surfaces_transport_failure() {
        let transport = FakeTransport::new();
        let (manager, _events_rx) = ChannelManager::new(transport.clone());
        *transport.fail.lock() = true;
        let result = manager.open(Topic::OrbitInfo, ENDPOINT).await;
        assert!(result.is_err());
        assert_eq!(manager.state(Topic::OrbitInfo), None);
    }
}
