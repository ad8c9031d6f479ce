//! Client-side prediction between authoritative state messages

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::game::body::Size;
use crate::game::paddle::Direction;
use crate::game::vector::Vector2D;
use crate::game::{GameSettings, Keys, MatchStatus, Score, Side};
use crate::ws::protocol::{InputMsg, ServerMsg, StateMsg};

/// Rendering surface and server parameters the predictor scales against
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Client drawing surface
    pub canvas: Size,
    /// Server's logical table
    pub table: Size,
    pub server_tick_rate: u32,
    /// Client frames per second
    pub frame_rate: u32,
    /// Server paddle step per tick, in table units
    pub paddle_move_offset: f32,
    pub paddle_height: f32,
    /// Local matches drive both paddles from one keyboard
    pub local_mode: bool,
}

impl PredictorConfig {
    pub fn new(canvas: Size, settings: &GameSettings, frame_rate: u32, local_mode: bool) -> Self {
        Self {
            canvas,
            table: settings.table,
            server_tick_rate: settings.tick_rate,
            frame_rate,
            paddle_move_offset: settings.paddle_move_offset,
            paddle_height: settings.paddle_size.height,
            local_mode,
        }
    }

    fn scale_x(&self) -> f32 {
        self.canvas.width / self.table.width
    }

    fn scale_y(&self) -> f32 {
        self.canvas.height / self.table.height
    }

    /// Paddle centre range the server allows, in canvas units
    fn paddle_bounds(&self) -> (f32, f32) {
        let margin = (self.paddle_move_offset + self.paddle_height / 2.0) * self.scale_y();
        (margin, self.canvas.height - margin)
    }

    /// Server ticks that elapse per client frame
    fn ticks_per_frame(&self) -> f32 {
        self.server_tick_rate as f32 / self.frame_rate.max(1) as f32
    }
}

/// What the client draws, in canvas units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Frame {
    pub side: Side,
    pub ball: Vector2D,
    /// Ball displacement per client frame
    pub ball_velocity: Vector2D,
    pub p1_y: f32,
    pub p2_y: f32,
    pub score: Score,
    pub status: MatchStatus,
}

pub struct ClientPredictor {
    config: PredictorConfig,
    frame: Frame,
    p1_keys: Keys,
    p2_keys: Keys,
}

impl ClientPredictor {
    pub fn new(config: PredictorConfig) -> Self {
        let center = Vector2D::new(config.canvas.width / 2.0, config.canvas.height / 2.0);
        let frame = Frame {
            side: Side::Left,
            ball: center,
            ball_velocity: Vector2D::zero(),
            p1_y: center.y(),
            p2_y: center.y(),
            score: Score::default(),
            status: MatchStatus::Initialised,
        };
        Self {
            config,
            frame,
            p1_keys: Keys::default(),
            p2_keys: Keys::default(),
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Replace the predicted state with the server's
    pub fn apply_state(&mut self, state: &StateMsg) {
        let sx = self.config.scale_x();
        let sy = self.config.scale_y();
        let per_frame = self.config.ticks_per_frame();
        let velocity = state.ball.velocity;

        self.frame = Frame {
            side: state.side,
            ball: Vector2D::new(state.ball.x * sx, state.ball.y * sy),
            ball_velocity: Vector2D::new(
                velocity.x() * sx * per_frame,
                velocity.y() * sy * per_frame,
            ),
            p1_y: state.paddles.p1_y * sy,
            p2_y: state.paddles.p2_y * sy,
            score: state.score,
            status: state.status,
        };
    }

    pub fn apply_score(&mut self, p1: u32, p2: u32) {
        self.frame.score = Score { p1, p2 };
    }

    pub fn apply(&mut self, message: &ServerMsg) {
        match message {
            ServerMsg::State(state) => self.apply_state(state),
            ServerMsg::Score { p1_score, p2_score } => self.apply_score(*p1_score, *p2_score),
        }
    }

    /// Keys held for the paddle this client controls
    pub fn set_keys(&mut self, keys: Keys) {
        match self.frame.side {
            Side::Left => self.p1_keys = keys,
            Side::Right => self.p2_keys = keys,
        }
    }

    /// Keys for both paddles (local mode)
    pub fn set_both_keys(&mut self, p1: Keys, p2: Keys) {
        self.p1_keys = p1;
        self.p2_keys = p2;
    }

    /// Input payload matching the currently held keys
    pub fn input_message(&self) -> InputMsg {
        if self.config.local_mode {
            return InputMsg {
                p1_up: Some(self.p1_keys.up),
                p1_down: Some(self.p1_keys.down),
                p2_up: Some(self.p2_keys.up),
                p2_down: Some(self.p2_keys.down),
                ..InputMsg::default()
            };
        }
        let own = match self.frame.side {
            Side::Left => self.p1_keys,
            Side::Right => self.p2_keys,
        };
        InputMsg {
            up: Some(own.up),
            down: Some(own.down),
            ..InputMsg::default()
        }
    }

    /// Advance one client frame
    pub fn step(&mut self) {
        if self.frame.status != MatchStatus::Ongoing {
            return;
        }
        self.frame.ball.add(&self.frame.ball_velocity);

        let offset =
            self.config.paddle_move_offset * self.config.scale_y() * self.config.ticks_per_frame();
        let (low, high) = self.config.paddle_bounds();

        let predict_p1 = self.config.local_mode || self.frame.side == Side::Left;
        let predict_p2 = self.config.local_mode || self.frame.side == Side::Right;
        if predict_p1 {
            self.frame.p1_y = predicted(self.frame.p1_y, self.p1_keys, offset, low, high);
        }
        if predict_p2 {
            self.frame.p2_y = predicted(self.frame.p2_y, self.p2_keys, offset, low, high);
        }
    }

    /// Drive the predictor at the client frame rate. Server messages are
    /// applied as they arrive; every frame is published on `frames`.
    /// Returns when the inbound channel closes.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<ServerMsg>,
        frames: watch::Sender<Frame>,
    ) {
        let period = Duration::from_micros(1_000_000 / self.config.frame_rate.max(1) as u64);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                message = inbound.recv() => match message {
                    Some(message) => self.apply(&message),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.step();
                    frames.send_replace(self.frame);
                }
            }
        }
        debug!("Predictor stopped");
    }
}

/// A step that would leave `[low, high]` is dropped, as on the server
fn predicted(y: f32, keys: Keys, offset: f32, low: f32, high: f32) -> f32 {
    let next = match keys.direction() {
        Some(Direction::Up) => y - offset,
        Some(Direction::Down) => y + offset,
        None => return y,
    };
    if (low..=high).contains(&next) {
        next
    } else {
        y
    }
}
