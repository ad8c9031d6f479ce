//! Full state view and side-relative state messages

use serde::{Deserialize, Serialize};

use crate::ws::protocol::{BallState, PaddleState, ServerMsg, StateMsg};

use super::ball::Ball;
use super::input::InputSnapshot;
use super::paddle::Paddles;
use super::{MatchMode, MatchStatus, Score, Side};

/// Everything a viewer needs to render a match. Published every tick and
/// served to clients that reconnect mid-match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateView {
    pub match_id: i64,
    pub mode: MatchMode,
    pub status: MatchStatus,
    pub ball: BallState,
    pub paddles: PaddleState,
    pub score: Score,
}

impl StateView {
    pub fn capture(
        match_id: i64,
        mode: MatchMode,
        status: MatchStatus,
        ball: &Ball,
        paddles: &Paddles,
        input: &InputSnapshot,
        score: &Score,
    ) -> Self {
        Self {
            match_id,
            mode,
            status,
            ball: BallState {
                x: ball.x(),
                y: ball.y(),
                velocity: ball.velocity(),
            },
            paddles: PaddleState {
                p1_y: paddles.p1.y(),
                p1_input: input.p1,
                p2_y: paddles.p2.y(),
                p2_input: input.p2,
            },
            score: *score,
        }
    }

    /// State message for the viewer playing `side`
    pub fn for_side(&self, side: Side) -> ServerMsg {
        ServerMsg::State(StateMsg {
            side,
            ball: self.ball,
            paddles: self.paddles,
            score: self.score,
            status: self.status,
        })
    }
}
