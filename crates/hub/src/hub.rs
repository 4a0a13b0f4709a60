use parking_lot::Mutex;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Depth of a client's outbound frame buffer. When full, the hub closes
/// the connection and evicts the client — the sole backpressure policy.
pub const CLIENT_SEND_BUFFER: usize = 256;

/// Subscription topics a client may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Full `BlockData` push on every new block.
    Data,
    /// Just the `BlockStats` row of every new block.
    BlockStats,
    /// Pushed whenever the connected-client count changes.
    ClientsCount,
    /// Pushed whenever a calendar bucket is refreshed.
    AggregatesData,
}

impl Topic {
    /// Parse a topic name as accepted by `eth_subscribe`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "data" => Some(Self::Data),
            "blockStats" => Some(Self::BlockStats),
            "clientsCount" => Some(Self::ClientsCount),
            "aggregatesData" => Some(Self::AggregatesData),
            _ => None,
        }
    }
}

struct ClientHandle {
    sender: mpsc::Sender<String>,
    subscriptions: Mutex<HashMap<String, Topic>>,
}

/// The subscription hub: tracks connected clients and their topic
/// subscriptions, and fans out broadcast frames with a non-blocking,
/// evict-on-full backpressure policy.
#[derive(Debug, Default)]
pub struct Hub {
    clients: Mutex<HashMap<u64, Arc<ClientHandle>>>,
    next_client_id: AtomicU64,
}

impl Hub {
    /// An empty hub.
    pub fn new() -> Self {
        Self { clients: Mutex::new(HashMap::new()), next_client_id: AtomicU64::new(1) }
    }

    /// Register a new client, returning its id and the receiver half it
    /// should forward to its websocket write side.
    pub fn register(&self) -> (u64, mpsc::Receiver<String>) {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_SEND_BUFFER);
        let handle = Arc::new(ClientHandle { sender: tx, subscriptions: Mutex::new(HashMap::new()) });
        self.clients.lock().insert(id, handle);
        (id, rx)
    }

    /// Remove a client (on disconnect, protocol error, or backpressure
    /// eviction).
    pub fn unregister(&self, id: u64) {
        self.clients.lock().remove(&id);
    }

    /// Number of currently connected clients.
    pub fn client_count(&self) -> i64 {
        self.clients.lock().len() as i64
    }

    /// Subscribe `client_id` to `topic`, returning a fresh 130-bit random
    /// hex subscription id.
    pub fn subscribe(&self, client_id: u64, topic: Topic) -> Option<String> {
        let clients = self.clients.lock();
        let handle = clients.get(&client_id)?;
        let sub_id = random_subscription_id();
        handle.subscriptions.lock().insert(sub_id.clone(), topic);
        Some(sub_id)
    }

    /// Remove a subscription by id. Returns whether it existed.
    pub fn unsubscribe(&self, client_id: u64, sub_id: &str) -> bool {
        let clients = self.clients.lock();
        let Some(handle) = clients.get(&client_id) else { return false };
        handle.subscriptions.lock().remove(sub_id).is_some()
    }

    /// Send a single frame directly to `client_id` (a request/response
    /// reply, as opposed to a topic broadcast). Evicts the client on a
    /// full buffer, same as [`Hub::broadcast`].
    pub fn send_to(&self, client_id: u64, frame: String) {
        let handle = self.clients.lock().get(&client_id).cloned();
        let Some(handle) = handle else { return };
        if handle.sender.try_send(frame).is_err() {
            warn!(client_id, "client outbound buffer full, evicting");
            self.unregister(client_id);
        }
    }

    /// Send a pre-rendered JSON-RPC frame to every client subscribed to
    /// `topic`. Clients whose outbound buffer is full are evicted.
    pub fn broadcast(&self, topic: Topic, render: impl Fn(&str) -> String) {
        let clients = self.clients.lock();
        let mut to_evict = Vec::new();
        for (&id, handle) in clients.iter() {
            let subs = handle.subscriptions.lock();
            let Some(sub_id) = subs.iter().find(|(_, &t)| t == topic).map(|(id, _)| id.clone()) else {
                continue;
            };
            drop(subs);
            let frame = render(&sub_id);
            if handle.sender.try_send(frame).is_err() {
                to_evict.push(id);
            }
        }
        drop(clients);
        for id in to_evict {
            warn!(client_id = id, "client outbound buffer full, evicting");
            self.unregister(id);
        }
    }
}

/// A cryptographically random subscription id, up to 130 bits, rendered
/// as `0x`-prefixed hex — matching `crypto/rand`-backed generation in the
/// system this was distilled from (`rand.Int(rand.Reader, 2^130 - 1)`).
fn random_subscription_id() -> String {
    let mut bytes = [0u8; 17];
    rand::thread_rng().fill_bytes(&mut bytes);
    // Clear the top 6 bits of the first byte so the value never exceeds
    // 130 bits (17 bytes = 136 bits; drop 6).
    bytes[0] &= 0b0000_0011;
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_subscribe_roundtrip() {
        let hub = Hub::new();
        let (id, _rx) = hub.register();
        let sub_id = hub.subscribe(id, Topic::Data).unwrap();
        assert!(sub_id.starts_with("0x"));
        assert!(hub.unsubscribe(id, &sub_id));
        assert!(!hub.unsubscribe(id, &sub_id));
    }

    #[test]
    fn client_count_tracks_register_unregister() {
        let hub = Hub::new();
        assert_eq!(hub.client_count(), 0);
        let (id, _rx) = hub.register();
        assert_eq!(hub.client_count(), 1);
        hub.unregister(id);
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn subscription_ids_are_distinct() {
        let a = random_subscription_id();
        let b = random_subscription_id();
        assert_ne!(a, b);
    }

    #[test]
    fn full_buffer_evicts_without_affecting_other_clients() {
        let hub = Hub::new();
        let (slow_id, _slow_rx) = hub.register();
        let (healthy_id, mut healthy_rx) = hub.register();
        hub.subscribe(slow_id, Topic::Data).unwrap();
        hub.subscribe(healthy_id, Topic::Data).unwrap();

        // Never drain `_slow_rx`; its 256-deep buffer fills on the 257th
        // broadcast and the hub evicts it. `healthy_rx` is drained as we
        // go, so it never fills.
        for n in 0..(CLIENT_SEND_BUFFER + 1) {
            hub.broadcast(Topic::Data, |sub_id| format!("{sub_id}:{n}"));
            let _ = healthy_rx.try_recv();
        }

        assert_eq!(hub.client_count(), 1);
    }
}
