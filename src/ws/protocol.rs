//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//! Every message is a JSON object carrying `"topic": "pong"`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::game::vector::Vector2D;
use crate::game::{Keys, MatchMode, MatchStatus, Score, Side};

/// Topic all match traffic is published under
pub const TOPIC: &str = "pong";

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Held-key state
    Input(InputMsg),
}

/// Input payload. Remote matches use `up`/`down` (plus an optional
/// `clientId`), local matches use the four `p1_*`/`p2_*` flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMsg {
    #[serde(rename = "clientId", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p1_up: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p1_down: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2_up: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2_down: Option<bool>,
}

/// Input after shape validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedInput {
    /// One side's keys; the side comes from the sender
    Single(Keys),
    /// Both sides at once (local mode)
    Both { p1: Keys, p2: Keys },
}

impl InputMsg {
    /// Validate the payload shape against the match mode. Missing flags in
    /// an otherwise valid payload read as released.
    pub fn decode(&self, mode: MatchMode) -> Option<DecodedInput> {
        let single = self.up.is_some() || self.down.is_some();
        let dual = self.p1_up.is_some()
            || self.p1_down.is_some()
            || self.p2_up.is_some()
            || self.p2_down.is_some();

        match mode {
            MatchMode::Remote if single && !dual => Some(DecodedInput::Single(Keys::new(
                self.up.unwrap_or(false),
                self.down.unwrap_or(false),
            ))),
            MatchMode::Local if dual && !single => Some(DecodedInput::Both {
                p1: Keys::new(self.p1_up.unwrap_or(false), self.p1_down.unwrap_or(false)),
                p2: Keys::new(self.p2_up.unwrap_or(false), self.p2_down.unwrap_or(false)),
            }),
            _ => None,
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Full match state, sent every tick
    State(StateMsg),

    /// A point was just scored
    Score { p1_score: u32, p2_score: u32 },
}

/// Side-relative state message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMsg {
    /// Which paddle the receiver controls
    pub side: Side,
    pub ball: BallState,
    pub paddles: PaddleState,
    pub score: Score,
    pub status: MatchStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub x: f32,
    pub y: f32,
    pub velocity: Vector2D,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddleState {
    #[serde(rename = "p1_Y")]
    pub p1_y: f32,
    pub p1_input: Keys,
    #[serde(rename = "p2_Y")]
    pub p2_y: f32,
    pub p2_input: Keys,
}

/// Serialize a server message with its topic
pub fn encode(msg: &ServerMsg) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(msg)?;
    if let Value::Object(map) = &mut value {
        map.insert("topic".to_string(), Value::from(TOPIC));
    }
    serde_json::to_string(&value)
}

/// Decode an inbound client payload already routed on [`TOPIC`]
pub fn decode_client(value: &Value) -> Result<ClientMsg, serde_json::Error> {
    ClientMsg::deserialize(value)
}

/// Decode a server message received as text (client side)
pub fn decode_server(text: &str) -> Result<ServerMsg, serde_json::Error> {
    serde_json::from_str(text)
}
