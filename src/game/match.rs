//! Match state and authoritative tick loop

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::messaging::{Listener, Messenger, DISCONNECT_TOPIC};
use crate::store::{self, MatchStore};
use crate::ws::protocol::{decode_client, ClientMsg, InputMsg, ServerMsg, TOPIC};

use super::ball::{Ball, Goal};
use super::input::{InputRejected, InputRouter, InputSnapshot};
use super::paddle::Paddles;
use super::settings::GameSettings;
use super::snapshot::StateView;
use super::{MatchMode, MatchStatus, Participants, Score, Side};

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// A side reached the win score
    ScoreLimit,
    /// The owner of a local match went away
    Disconnected,
    /// Participants never came online
    Abandoned,
    /// Server shutting down
    Shutdown,
    /// Ended on request before finishing
    Cancelled,
    /// Physical state became invalid
    Corrupted,
}

/// Out-of-band signals for a running match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchCommand {
    /// A participant's connection closed
    ParticipantLeft(Uuid),
    /// Force the match to end for the given reason
    Terminate(EndReason),
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Finished(EndReason),
}

#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error("ball state invalid at tick {tick}: x={x} y={y}")]
    Corrupted { tick: u64, x: f32, y: f32 },
}

/// Authoritative physical state of a match (owned by the match task)
pub struct MatchState {
    pub id: i64,
    pub participants: Participants,
    pub status: MatchStatus,
    pub tick: u64,
    pub ball: Ball,
    pub paddles: Paddles,
    pub score: Score,
    /// Input as read at the start of the last tick
    pub input: InputSnapshot,
    pub rng: ChaCha8Rng,
}

impl MatchState {
    pub fn new(id: i64, participants: Participants, settings: &GameSettings, seed: u64) -> Self {
        Self {
            id,
            participants,
            status: MatchStatus::Initialised,
            tick: 0,
            ball: Ball::new(settings),
            paddles: Paddles::new(settings),
            score: Score::default(),
            input: InputSnapshot::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn view(&self) -> StateView {
        StateView::capture(
            self.id,
            self.participants.mode(),
            self.status,
            &self.ball,
            &self.paddles,
            &self.input,
            &self.score,
        )
    }
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: i64,
    pub participants: Participants,
    input: InputRouter,
    command_tx: mpsc::Sender<MatchCommand>,
    view_rx: watch::Receiver<StateView>,
}

impl MatchHandle {
    pub fn mode(&self) -> MatchMode {
        self.participants.mode()
    }

    /// Apply an input submitted outside a socket listener
    pub fn submit_input(&self, sender: Option<Uuid>, msg: &InputMsg) -> Result<(), InputRejected> {
        self.input.route(sender, msg)
    }

    /// Latest published state
    pub fn state(&self) -> StateView {
        self.view_rx.borrow().clone()
    }

    pub fn status(&self) -> MatchStatus {
        self.view_rx.borrow().status
    }

    /// Ask the match to end. Returns false if it is already gone.
    pub fn terminate(&self, reason: EndReason) -> bool {
        self.command_tx
            .try_send(MatchCommand::Terminate(reason))
            .is_ok()
    }
}

/// The authoritative game match
pub struct GameMatch {
    state: MatchState,
    settings: Arc<GameSettings>,
    input: InputRouter,
    command_tx: mpsc::Sender<MatchCommand>,
    command_rx: mpsc::Receiver<MatchCommand>,
    view_tx: watch::Sender<StateView>,
    messenger: Arc<dyn Messenger>,
    store: Arc<dyn MatchStore>,
    started: bool,
    ticks_waiting: u64,
}

impl GameMatch {
    /// Create a new match
    pub fn new(
        id: i64,
        participants: Participants,
        settings: Arc<GameSettings>,
        seed: u64,
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn MatchStore>,
    ) -> (Self, MatchHandle) {
        let (command_tx, command_rx) = mpsc::channel(16);
        let state = MatchState::new(id, participants, &settings, seed);
        let (view_tx, view_rx) = watch::channel(state.view());
        let input = InputRouter::new(participants);

        let handle = MatchHandle {
            id,
            participants,
            input: input.clone(),
            command_tx: command_tx.clone(),
            view_rx,
        };

        let game_match = Self {
            state,
            settings,
            input,
            command_tx,
            command_rx,
            view_tx,
            messenger,
            store,
            started: false,
            ticks_waiting: 0,
        };

        (game_match, handle)
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Run the authoritative tick loop until the match ends
    pub async fn run(mut self) -> EndReason {
        info!(
            match_id = self.state.id,
            mode = %self.state.participants.mode(),
            "Match created"
        );
        self.register_listeners();

        let mut tick_interval = interval(self.settings.tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let reason = loop {
            tokio::select! {
                // Commands win over a due tick so a forced end never
                // lets one more update through.
                biased;

                Some(command) = self.command_rx.recv() => {
                    if let Some(reason) = self.handle_command(command) {
                        break reason;
                    }
                }
                _ = tick_interval.tick() => {
                    match self.tick() {
                        Ok(TickOutcome::Continue) => {}
                        Ok(TickOutcome::Finished(reason)) => break reason,
                        Err(e) => {
                            error!(match_id = self.state.id, error = %e, "Tick failed, ending match");
                            break EndReason::Corrupted;
                        }
                    }
                }
            }
        };

        drop(tick_interval);
        self.end(reason);
        reason
    }

    fn handle_command(&mut self, command: MatchCommand) -> Option<EndReason> {
        match command {
            MatchCommand::Terminate(reason) => Some(reason),
            MatchCommand::ParticipantLeft(identity) => match self.state.participants.mode() {
                MatchMode::Local => {
                    info!(match_id = self.state.id, client_id = %identity, "Owner left local match");
                    Some(EndReason::Disconnected)
                }
                MatchMode::Remote => {
                    info!(match_id = self.state.id, client_id = %identity, "Participant disconnected");
                    None
                }
            },
        }
    }

    /// Arm the match: random serve, initial state broadcast. Idempotent.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        let serve = if self.state.rng.gen_bool(0.5) {
            Side::Left
        } else {
            Side::Right
        };
        self.state.ball.respawn(serve, &mut self.state.paddles);

        let store = Arc::clone(&self.store);
        let id = self.state.id;
        store::dispatch(id, "start_match", async move { store.start_match(id).await });

        self.publish();
        info!(match_id = id, serve = ?serve, "Match started");
    }

    /// Run a single simulation tick
    pub fn tick(&mut self) -> Result<TickOutcome, TickError> {
        self.state.tick += 1;

        match self.state.status {
            MatchStatus::Ended => return Ok(TickOutcome::Finished(EndReason::Shutdown)),
            MatchStatus::Initialised if !self.started => return Ok(self.wait_for_participants()),
            MatchStatus::Initialised => {
                self.state.status = MatchStatus::Ongoing;
                debug!(match_id = self.state.id, "Match ongoing");
            }
            MatchStatus::Ongoing => {}
        }

        self.state.input = self.input.read();
        self.move_paddles();

        let goal = self.state.ball.update(
            &mut self.state.paddles,
            &mut self.state.score,
            &mut self.state.rng,
        );

        if !self.state.ball.is_sane() {
            return Err(TickError::Corrupted {
                tick: self.state.tick,
                x: self.state.ball.x(),
                y: self.state.ball.y(),
            });
        }

        if let Some(goal) = goal {
            self.on_goal(goal);
            if self.state.score.reached(self.settings.win_score) {
                return Ok(TickOutcome::Finished(EndReason::ScoreLimit));
            }
        }

        self.publish();
        Ok(TickOutcome::Continue)
    }

    /// Transition to `ended`: final broadcast, persistence, listener
    /// teardown. Returns false if the match had already ended.
    pub fn end(&mut self, reason: EndReason) -> bool {
        if self.state.status == MatchStatus::Ended {
            return false;
        }
        self.state.status = MatchStatus::Ended;
        self.publish();

        let store = Arc::clone(&self.store);
        let id = self.state.id;
        store::dispatch(id, "end_match", async move { store.end_match(id, reason).await });

        self.unregister_listeners();

        info!(
            match_id = id,
            reason = ?reason,
            p1 = self.state.score.p1,
            p2 = self.state.score.p2,
            ticks = self.state.tick,
            "Match ended"
        );
        true
    }

    fn wait_for_participants(&mut self) -> TickOutcome {
        let identities = self.state.participants.identities();
        if identities.iter().all(|id| self.messenger.is_online(*id)) {
            self.start();
            return TickOutcome::Continue;
        }

        self.ticks_waiting += 1;
        if self.ticks_waiting >= self.settings.join_timeout_ticks() {
            warn!(match_id = self.state.id, "Participants never joined");
            return TickOutcome::Finished(EndReason::Abandoned);
        }
        TickOutcome::Continue
    }

    fn move_paddles(&mut self) {
        let offset = self.settings.paddle_move_offset;
        let bounds = self.settings.paddle_bounds();
        let input = self.state.input;

        if let Some(direction) = input.p1.direction() {
            self.state.paddles.p1.step(direction, offset, bounds);
        }
        if let Some(direction) = input.p2.direction() {
            self.state.paddles.p2.step(direction, offset, bounds);
        }
    }

    fn on_goal(&mut self, goal: Goal) {
        let id = self.state.id;
        let Score { p1, p2 } = self.state.score;
        info!(match_id = id, scorer = ?goal.scorer, p1, p2, "Point scored");

        let message = ServerMsg::Score {
            p1_score: p1,
            p2_score: p2,
        };
        self.send_all(|_| message.clone());

        let store = Arc::clone(&self.store);
        store::dispatch(id, "update_score", async move {
            store.update_score(id, p1, p2).await
        });
    }

    /// Publish the state view and push a side-relative copy to every participant
    fn publish(&mut self) {
        let view = self.state.view();
        self.send_all(|side| view.for_side(side));
        self.view_tx.send_replace(view);
    }

    fn send_all(&self, message_for: impl Fn(Side) -> ServerMsg) {
        for (identity, side) in self.state.participants.seats() {
            if let Err(e) = self.messenger.send(identity, &message_for(side)) {
                debug!(match_id = self.state.id, client_id = %identity, error = %e, "Send failed");
            }
        }
    }

    fn register_listeners(&self) {
        let id = self.state.id;
        for identity in self.state.participants.identities() {
            let router = self.input.clone();
            let on_input: Listener = Arc::new(move |payload: &Value| match decode_client(payload) {
                Ok(ClientMsg::Input(msg)) => {
                    if let Err(e) = router.route(Some(identity), &msg) {
                        debug!(match_id = id, client_id = %identity, error = %e, "Input dropped");
                    }
                }
                Err(e) => {
                    debug!(match_id = id, client_id = %identity, error = %e, "Malformed input");
                }
            });
            self.messenger.add_listener(identity, TOPIC, on_input);

            let command_tx = self.command_tx.clone();
            let on_disconnect: Listener = Arc::new(move |_: &Value| {
                let _ = command_tx.try_send(MatchCommand::ParticipantLeft(identity));
            });
            self.messenger
                .add_listener(identity, DISCONNECT_TOPIC, on_disconnect);
        }
    }

    fn unregister_listeners(&self) {
        for identity in self.state.participants.identities() {
            self.messenger.remove_listener(identity, TOPIC);
            self.messenger.remove_listener(identity, DISCONNECT_TOPIC);
        }
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut MatchState {
        &mut self.state
    }
}
