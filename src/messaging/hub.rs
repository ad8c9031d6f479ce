//! In-process connection hub backing the WebSocket endpoint

use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ws::protocol::{encode, ServerMsg};

use super::{DispatchError, Listener, Messenger, MessagingError, DISCONNECT_TOPIC};

/// Outbound queue depth per connection
const OUTBOUND_CAPACITY: usize = 256;

/// Identifies one socket of an identity
pub type ConnectionId = u64;

struct Connection {
    id: ConnectionId,
    outbound: mpsc::Sender<String>,
}

/// Connected identities and their topic listeners.
///
/// An identity has at most one live connection; connecting again replaces
/// (and thereby closes) the previous one.
pub struct ConnectionHub {
    connections: DashMap<Uuid, Connection>,
    listeners: DashMap<(Uuid, String), Listener>,
    next_connection: AtomicU64,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            listeners: DashMap::new(),
            next_connection: AtomicU64::new(1),
        }
    }

    /// Attach a new connection for `identity`. Returns its id and the
    /// receiver of encoded outbound messages.
    pub fn connect(&self, identity: Uuid) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        let (outbound, rx) = mpsc::channel(OUTBOUND_CAPACITY);

        if self
            .connections
            .insert(identity, Connection { id, outbound })
            .is_some()
        {
            info!(client_id = %identity, "Replaced existing connection");
        }

        (id, rx)
    }

    /// Detach a connection. Only the current connection of `identity`
    /// counts; a stale one that was already replaced is ignored. Fires the
    /// identity's disconnect listener when the connection was current.
    pub fn disconnect(&self, identity: Uuid, connection: ConnectionId) -> bool {
        let removed = self
            .connections
            .remove_if(&identity, |_, current| current.id == connection)
            .is_some();

        if removed {
            debug!(client_id = %identity, "Connection closed");
            if let Some(listener) = self.listener(identity, DISCONNECT_TOPIC) {
                listener(&json!({ "topic": DISCONNECT_TOPIC }));
            }
        }
        removed
    }

    /// Route an inbound text frame to the listener for its topic
    pub fn dispatch(&self, identity: Uuid, text: &str) -> Result<(), DispatchError> {
        let payload: Value = serde_json::from_str(text)?;
        let topic = payload
            .get("topic")
            .and_then(Value::as_str)
            .ok_or(DispatchError::MissingTopic)?;

        let listener = self
            .listener(identity, topic)
            .ok_or_else(|| DispatchError::NoListener {
                topic: topic.to_string(),
            })?;

        listener(&payload);
        Ok(())
    }

    pub fn online_count(&self) -> usize {
        self.connections.len()
    }

    /// Clone the handler out so no map guard is held while it runs
    fn listener(&self, identity: Uuid, topic: &str) -> Option<Listener> {
        self.listeners
            .get(&(identity, topic.to_string()))
            .map(|entry| entry.value().clone())
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Messenger for ConnectionHub {
    fn send(&self, identity: Uuid, message: &ServerMsg) -> Result<(), MessagingError> {
        let outbound = self
            .connections
            .get(&identity)
            .map(|c| c.outbound.clone())
            .ok_or(MessagingError::Offline(identity))?;

        let text = encode(message)?;
        match outbound.try_send(text) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(MessagingError::ChannelFull(identity)),
            Err(TrySendError::Closed(_)) => Err(MessagingError::Offline(identity)),
        }
    }

    fn add_listener(&self, identity: Uuid, topic: &str, handler: Listener) {
        self.listeners.insert((identity, topic.to_string()), handler);
    }

    fn remove_listener(&self, identity: Uuid, topic: &str) {
        self.listeners.remove(&(identity, topic.to_string()));
    }

    fn is_online(&self, identity: Uuid) -> bool {
        self.connections
            .get(&identity)
            .map(|c| !c.outbound.is_closed())
            .unwrap_or(false)
    }
}
