//! Messaging collaborator: per-identity delivery and topic listeners

pub mod hub;

pub use hub::{ConnectionHub, ConnectionId};

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// Topic fired by the messenger when an identity's connection closes
pub const DISCONNECT_TOPIC: &str = "disconnect";

/// Callback invoked with the raw JSON payload of an inbound message
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Delivery of messages to identities and routing of inbound topics.
///
/// Implementations must not block: the match tick calls `send` inline.
pub trait Messenger: Send + Sync {
    fn send(&self, identity: Uuid, message: &ServerMsg) -> Result<(), MessagingError>;

    /// Register `handler` for `topic` on `identity`, replacing any existing one
    fn add_listener(&self, identity: Uuid, topic: &str, handler: Listener);

    fn remove_listener(&self, identity: Uuid, topic: &str);

    fn is_online(&self, identity: Uuid) -> bool;
}

/// Messaging errors
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("identity {0} is not connected")]
    Offline(Uuid),

    #[error("outbound queue for {0} is full")]
    ChannelFull(Uuid),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Inbound dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("payload has no topic")]
    MissingTopic,

    #[error("no listener for topic {topic}")]
    NoListener { topic: String },
}
