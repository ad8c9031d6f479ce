//! Table geometry and match tuning

use std::time::Duration;

use super::body::Size;

/// Tuning for a single match. Distances are logical table units,
/// speeds are units per tick.
#[derive(Debug, Clone)]
pub struct GameSettings {
    /// Logical table extent
    pub table: Size,
    pub ball_size: Size,
    pub paddle_size: Size,
    /// Distance from each goal line to the paddle center
    pub paddle_margin: f32,
    /// Vertical paddle step per tick of held input
    pub paddle_move_offset: f32,
    /// Ball speed on serve
    pub ball_initial_speed: f32,
    /// Ball speed never exceeds this
    pub ball_max_speed: f32,
    /// Speed multiplier applied on every wall/paddle bounce
    pub ball_speed_growth: f32,
    /// Serve angle is drawn from [-max, max] radians
    pub serve_max_angle: f32,
    /// Pause between respawn and serve
    pub serve_delay: Duration,
    /// Score that ends the match
    pub win_score: u32,
    /// Ticks per second
    pub tick_rate: u32,
    /// How long a match waits for its participants before giving up
    pub join_timeout: Duration,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            table: Size::new(800.0, 400.0),
            ball_size: Size::new(10.0, 10.0),
            paddle_size: Size::new(10.0, 80.0),
            paddle_margin: 20.0,
            paddle_move_offset: 6.0,
            ball_initial_speed: 5.0,
            ball_max_speed: 12.0,
            ball_speed_growth: 1.05,
            serve_max_angle: std::f32::consts::FRAC_PI_6,
            serve_delay: Duration::from_millis(1000),
            win_score: 7,
            tick_rate: 60,
            join_timeout: Duration::from_secs(60),
        }
    }
}

impl GameSettings {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate.max(1) as u64)
    }

    /// Serve delay expressed in whole ticks (at least one)
    pub fn serve_delay_ticks(&self) -> u32 {
        let ticks = self.serve_delay.as_micros() / self.tick_duration().as_micros().max(1);
        (ticks as u32).max(1)
    }

    pub fn join_timeout_ticks(&self) -> u64 {
        (self.join_timeout.as_micros() / self.tick_duration().as_micros().max(1)) as u64
    }

    /// Lowest and highest y a paddle center may occupy
    pub fn paddle_bounds(&self) -> (f32, f32) {
        let half = self.paddle_size.half_height();
        (
            self.paddle_move_offset + half,
            self.table.height - self.paddle_move_offset - half,
        )
    }

    /// Check the invariants the physics relies on
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tick_rate == 0 {
            return Err(SettingsError::ZeroTickRate);
        }
        if self.tick_duration().is_zero() {
            return Err(SettingsError::TickRateTooHigh(self.tick_rate));
        }
        if self.win_score == 0 {
            return Err(SettingsError::ZeroWinScore);
        }
        if self.ball_initial_speed <= 0.0 || self.ball_initial_speed > self.ball_max_speed {
            return Err(SettingsError::InitialSpeedAboveCap);
        }
        let (low, high) = self.paddle_bounds();
        if low > high {
            return Err(SettingsError::PaddleTooTall);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("tick rate must be positive")]
    ZeroTickRate,

    #[error("win score must be positive")]
    ZeroWinScore,

    #[error("initial ball speed must be positive and not above the speed cap")]
    InitialSpeedAboveCap,

    #[error("tick rate {0} is above one tick per microsecond")]
    TickRateTooHigh(u32),

    #[error("paddle does not fit on the table")]
    PaddleTooTall,
}
