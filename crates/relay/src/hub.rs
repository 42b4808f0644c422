use relay_protocol::RelayEvent;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

pub(crate) type ConnectionId = Uuid;

struct ConnectionEntry {
    peer: String,
    connected_at: Instant,
}

/// Registry of live WebSocket connections plus the alert fan-out channel.
///
/// Delivery is fire-and-forget: only receivers registered when
/// [`AlertHub::broadcast`] runs see the event, and a receiver that falls more
/// than `capacity` events behind skips the oldest ones.
#[derive(Clone)]
pub(crate) struct AlertHub {
    tx: broadcast::Sender<RelayEvent>,
    connections: Arc<RwLock<HashMap<ConnectionId, ConnectionEntry>>>,
}

pub(crate) struct Subscription {
    pub(crate) id: ConnectionId,
    pub(crate) rx: broadcast::Receiver<RelayEvent>,
}

impl AlertHub {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub(crate) async fn register(&self, peer: impl Into<String>) -> Subscription {
        let id = Uuid::new_v4();
        // Subscribe before the entry becomes visible so a counted connection
        // never misses a broadcast.
        let rx = self.tx.subscribe();
        self.connections.write().await.insert(
            id,
            ConnectionEntry {
                peer: peer.into(),
                connected_at: Instant::now(),
            },
        );
        Subscription { id, rx }
    }

    pub(crate) async fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.connections.write().await.remove(&id);
        match removed {
            Some(entry) => {
                tracing::debug!(
                    connection_id = %id,
                    peer = %entry.peer,
                    connected_for_ms = entry.connected_at.elapsed().as_millis() as u64,
                    "connection unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Returns how many receivers the event was queued for.
    pub(crate) fn broadcast(&self, event: RelayEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub(crate) async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
