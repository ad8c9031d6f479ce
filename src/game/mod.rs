//! Game simulation modules

pub mod ball;
pub mod body;
pub mod input;
pub mod r#match;
pub mod paddle;
pub mod registry;
pub mod settings;
pub mod snapshot;
pub mod vector;

pub use input::{InputRouter, InputSnapshot, Keys};
pub use r#match::{EndReason, GameMatch, MatchCommand, MatchHandle};
pub use registry::{MatchRegistry, RegistryError};
pub use settings::GameSettings;
pub use snapshot::StateView;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client-relative orientation: `left` is player 1, `right` is player 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Sign of x velocity for a ball travelling toward this side
    pub fn sign(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

/// Match score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub p1: u32,
    pub p2: u32,
}

impl Score {
    pub fn award(&mut self, side: Side) {
        match side {
            Side::Left => self.p1 += 1,
            Side::Right => self.p2 += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.p1 + self.p2
    }

    /// Either side has reached `target`
    pub fn reached(&self, target: u32) -> bool {
        self.p1 >= target || self.p2 >= target
    }
}

/// Match lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Constructed, not yet ticking physics
    Initialised,
    /// Running
    Ongoing,
    /// Terminal
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// One viewer controls both paddles
    Local,
    /// Two viewers, one paddle each
    Remote,
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMode::Local => f.write_str("local"),
            MatchMode::Remote => f.write_str("remote"),
        }
    }
}

/// Participant identities bound to a match for its whole life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participants {
    Local(Uuid),
    Remote { left: Uuid, right: Uuid },
}

impl Participants {
    pub fn mode(&self) -> MatchMode {
        match self {
            Participants::Local(_) => MatchMode::Local,
            Participants::Remote { .. } => MatchMode::Remote,
        }
    }

    /// Each identity with the side it views the table from
    pub fn seats(&self) -> Vec<(Uuid, Side)> {
        match *self {
            Participants::Local(owner) => vec![(owner, Side::Left)],
            Participants::Remote { left, right } => vec![(left, Side::Left), (right, Side::Right)],
        }
    }

    pub fn identities(&self) -> Vec<Uuid> {
        self.seats().into_iter().map(|(id, _)| id).collect()
    }

    pub fn side_of(&self, identity: Uuid) -> Option<Side> {
        self.seats()
            .into_iter()
            .find(|(id, _)| *id == identity)
            .map(|(_, side)| side)
    }
}
