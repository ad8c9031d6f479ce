//! Held-key input state and routing of inbound input to a side

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ws::protocol::{DecodedInput, InputMsg};

use super::paddle::Direction;
use super::{MatchMode, Participants, Side};

/// Up/down keys currently held by one side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keys {
    pub up: bool,
    pub down: bool,
}

impl Keys {
    pub fn new(up: bool, down: bool) -> Self {
        Self { up, down }
    }

    /// Both or neither held means no movement
    pub fn direction(&self) -> Option<Direction> {
        match (self.up, self.down) {
            (true, false) => Some(Direction::Up),
            (false, true) => Some(Direction::Down),
            _ => None,
        }
    }
}

/// Latest input per side, last write wins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    pub p1: Keys,
    pub p2: Keys,
}

impl InputSnapshot {
    pub fn set(&mut self, side: Side, keys: Keys) {
        match side {
            Side::Left => self.p1 = keys,
            Side::Right => self.p2 = keys,
        }
    }
}

/// Why an input payload was dropped
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputRejected {
    #[error("payload shape does not match a {0} match")]
    ShapeMismatch(MatchMode),

    #[error("sender is not a participant of this match")]
    UnknownSender,

    #[error("clientId does not match the sending connection")]
    SpoofedSender,
}

/// Writes decoded input into a match's shared snapshot.
///
/// Cloned into every listener; the lock guards the snapshot only, never
/// the tick.
#[derive(Clone)]
pub struct InputRouter {
    participants: Participants,
    snapshot: Arc<Mutex<InputSnapshot>>,
}

impl InputRouter {
    pub fn new(participants: Participants) -> Self {
        Self {
            participants,
            snapshot: Arc::new(Mutex::new(InputSnapshot::default())),
        }
    }

    /// Copy of the current snapshot
    pub fn read(&self) -> InputSnapshot {
        *self.snapshot.lock()
    }

    /// Apply an input message. `channel` is the identity of the connection
    /// the message arrived on, if any.
    pub fn route(&self, channel: Option<Uuid>, msg: &InputMsg) -> Result<(), InputRejected> {
        let mode = self.participants.mode();
        let decoded = msg.decode(mode).ok_or(InputRejected::ShapeMismatch(mode))?;

        match decoded {
            DecodedInput::Single(keys) => {
                let sender = match (channel, msg.client_id) {
                    (Some(channel), Some(claimed)) if channel != claimed => {
                        return Err(InputRejected::SpoofedSender)
                    }
                    (Some(channel), _) => channel,
                    (None, Some(claimed)) => claimed,
                    (None, None) => return Err(InputRejected::UnknownSender),
                };
                let side = self
                    .participants
                    .side_of(sender)
                    .ok_or(InputRejected::UnknownSender)?;
                self.snapshot.lock().set(side, keys);
            }
            DecodedInput::Both { p1, p2 } => {
                if let Some(channel) = channel {
                    if self.participants.side_of(channel).is_none() {
                        return Err(InputRejected::UnknownSender);
                    }
                }
                let mut snapshot = self.snapshot.lock();
                snapshot.p1 = p1;
                snapshot.p2 = p2;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> (InputRouter, Uuid, Uuid) {
        let left = Uuid::new_v4();
        let right = Uuid::new_v4();
        (
            InputRouter::new(Participants::Remote { left, right }),
            left,
            right,
        )
    }

    fn single(up: bool, down: bool) -> InputMsg {
        InputMsg {
            up: Some(up),
            down: Some(down),
            ..InputMsg::default()
        }
    }

    #[test]
    fn remote_input_lands_on_sender_side() {
        let (router, left, right) = remote();

        router.route(Some(right), &single(true, false)).unwrap();
        assert_eq!(router.read().p2, Keys::new(true, false));
        assert_eq!(router.read().p1, Keys::default());

        router.route(Some(left), &single(false, true)).unwrap();
        router.route(Some(left), &single(false, false)).unwrap();
        assert_eq!(router.read().p1, Keys::default());
    }

    #[test]
    fn remote_rejects_strangers_and_spoofing() {
        let (router, left, right) = remote();

        assert_eq!(
            router.route(Some(Uuid::new_v4()), &single(true, false)),
            Err(InputRejected::UnknownSender)
        );

        let spoofed = InputMsg {
            client_id: Some(right),
            ..single(true, false)
        };
        assert_eq!(
            router.route(Some(left), &spoofed),
            Err(InputRejected::SpoofedSender)
        );
        assert_eq!(router.read(), InputSnapshot::default());
    }

    #[test]
    fn explicit_sender_identity_without_channel() {
        let (router, _, right) = remote();
        let msg = InputMsg {
            client_id: Some(right),
            ..single(false, true)
        };

        router.route(None, &msg).unwrap();

        assert_eq!(router.read().p2, Keys::new(false, true));
    }

    #[test]
    fn local_mode_sets_both_sides() {
        let owner = Uuid::new_v4();
        let router = InputRouter::new(Participants::Local(owner));
        let msg = InputMsg {
            p1_down: Some(true),
            p2_up: Some(true),
            ..InputMsg::default()
        };

        router.route(Some(owner), &msg).unwrap();

        let snapshot = router.read();
        assert_eq!(snapshot.p1, Keys::new(false, true));
        assert_eq!(snapshot.p2, Keys::new(true, false));
    }

    #[test]
    fn mode_and_shape_mismatch_is_rejected() {
        let owner = Uuid::new_v4();
        let router = InputRouter::new(Participants::Local(owner));

        assert_eq!(
            router.route(Some(owner), &single(true, false)),
            Err(InputRejected::ShapeMismatch(MatchMode::Local))
        );
    }

    #[test]
    fn both_keys_held_means_no_direction() {
        assert_eq!(Keys::new(true, true).direction(), None);
        assert_eq!(Keys::new(true, false).direction(), Some(Direction::Up));
    }
}
