//! Ball entity: wall bounces, paddle blocks, scoring and serve

use rand::Rng;

use super::body::{Body, Size};
use super::paddle::{Paddle, Paddles};
use super::settings::GameSettings;
use super::vector::Vector2D;
use super::{Score, Side};

/// A point scored during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Goal {
    /// Side that won the point
    pub scorer: Side,
}

#[derive(Debug, Clone, Copy)]
struct PendingServe {
    toward: Side,
    ticks_left: u32,
}

/// The ball. Paddles and score are owned by the match and passed in
/// for collision and scoring checks.
#[derive(Debug, Clone)]
pub struct Ball {
    body: Body,
    table: Size,
    initial_speed: f32,
    max_speed: f32,
    speed_growth: f32,
    serve_max_angle: f32,
    serve_delay_ticks: u32,
    pending_serve: Option<PendingServe>,
}

impl Ball {
    /// Ball at table center, at rest
    pub fn new(settings: &GameSettings) -> Self {
        Self {
            body: Body::new(
                settings.table.width / 2.0,
                settings.table.height / 2.0,
                settings.ball_size,
            ),
            table: settings.table,
            initial_speed: settings.ball_initial_speed,
            max_speed: settings.ball_max_speed,
            speed_growth: settings.ball_speed_growth,
            serve_max_angle: settings.serve_max_angle,
            serve_delay_ticks: settings.serve_delay_ticks(),
            pending_serve: None,
        }
    }

    pub fn x(&self) -> f32 {
        self.body.x()
    }

    pub fn y(&self) -> f32 {
        self.body.y()
    }

    pub fn velocity(&self) -> Vector2D {
        *self.body.velocity()
    }

    pub fn is_serving(&self) -> bool {
        self.pending_serve.is_some()
    }

    /// Position and velocity are finite and the ball is on the table
    pub fn is_sane(&self) -> bool {
        self.body.position().is_finite()
            && self.body.velocity().is_finite()
            && (0.0..=self.table.width).contains(&self.x())
            && (0.0..=self.table.height).contains(&self.y())
    }

    /// One tick of ball physics. Checks run in a fixed order:
    /// walls, then paddles, then goal lines.
    pub fn update<R: Rng>(
        &mut self,
        paddles: &mut Paddles,
        score: &mut Score,
        rng: &mut R,
    ) -> Option<Goal> {
        self.tick_serve(rng);
        self.body.advance();

        let top = Vector2D::new(0.0, 0.0);
        let bottom = Vector2D::new(0.0, self.table.height);
        self.reflect(&top, &Vector2D::new(0.0, 1.0));
        self.reflect(&bottom, &Vector2D::new(0.0, -1.0));

        self.paddle_block(&paddles.p1);
        self.paddle_block(&paddles.p2);

        let left = Vector2D::new(0.0, 0.0);
        let right = Vector2D::new(self.table.width, 0.0);
        if let Some(goal) = self.score_check(&left, &Vector2D::new(1.0, 0.0), score, paddles) {
            return Some(goal);
        }
        self.score_check(&right, &Vector2D::new(-1.0, 0.0), score, paddles)
    }

    /// Bounce off a wall line when closer than half the ball's extent
    /// and moving toward it. Returns whether a bounce happened.
    pub fn reflect(&mut self, line_point: &Vector2D, normal: &Vector2D) -> bool {
        let normal = normal.normalized();
        let extent = self.extent_along(&normal);
        let distance = self.signed_distance(line_point, &normal);

        if distance >= extent || !self.approaching(&normal) {
            return false;
        }

        self.reflect_velocity(&normal);
        self.push_out(&normal, extent - distance);
        true
    }

    /// Bounce off a paddle's facing edge. The hit zone is rectangular:
    /// the ball's y must be within the paddle's half-height, and anything
    /// from the edge back to the goal line counts. The ball is put back
    /// exactly against the edge, so no speed can carry it through.
    pub fn paddle_block(&mut self, paddle: &Paddle) -> bool {
        let normal = paddle.facing().normalized();
        let edge = paddle.edge_point();
        let extent = self.extent_along(&normal);
        let distance = self.signed_distance(&edge, &normal);

        if distance >= extent {
            return false;
        }
        if (self.y() - paddle.y()).abs() > paddle.size().half_height() {
            return false;
        }
        if !self.approaching(&normal) {
            return false;
        }

        self.reflect_velocity(&normal);
        self.push_out(&normal, extent - distance);
        true
    }

    /// Award a point when the ball reaches a goal line, then respawn
    /// serving toward the side that conceded.
    pub fn score_check(
        &mut self,
        line_point: &Vector2D,
        normal: &Vector2D,
        score: &mut Score,
        paddles: &mut Paddles,
    ) -> Option<Goal> {
        let normal = normal.normalized();
        let extent = self.extent_along(&normal);
        if self.signed_distance(line_point, &normal) >= extent {
            return None;
        }

        let half = self.body.size().half_width();
        let scorer = if self.x() <= half {
            Side::Right
        } else if self.x() >= self.table.width - half {
            Side::Left
        } else {
            return None;
        };

        score.award(scorer);
        self.respawn(scorer.opposite(), paddles);
        Some(Goal { scorer })
    }

    /// Back to the center at rest; the serve toward `toward` follows
    /// after the serve delay. Paddles are recentered.
    pub fn respawn(&mut self, toward: Side, paddles: &mut Paddles) {
        self.body
            .relocate(self.table.width / 2.0, self.table.height / 2.0);
        self.body.set_velocity(Vector2D::zero());
        self.pending_serve = Some(PendingServe {
            toward,
            ticks_left: self.serve_delay_ticks,
        });
        paddles.recenter(self.table.height);
    }

    fn tick_serve<R: Rng>(&mut self, rng: &mut R) {
        let Some(serve) = self.pending_serve.as_mut() else {
            return;
        };
        serve.ticks_left = serve.ticks_left.saturating_sub(1);
        if serve.ticks_left > 0 {
            return;
        }

        let toward = serve.toward;
        self.pending_serve = None;

        let angle = rng.gen_range(-self.serve_max_angle..=self.serve_max_angle);
        let velocity = Vector2D::from_angle(angle, self.initial_speed);
        self.body
            .set_velocity(Vector2D::new(velocity.x() * toward.sign(), velocity.y()));
    }

    fn signed_distance(&self, line_point: &Vector2D, normal: &Vector2D) -> f32 {
        self.body.position().minus(line_point).dot(normal)
    }

    /// Half the ball's extent measured along `normal`
    fn extent_along(&self, normal: &Vector2D) -> f32 {
        let size = self.body.size();
        normal.x().abs() * size.half_width() + normal.y().abs() * size.half_height()
    }

    fn approaching(&self, normal: &Vector2D) -> bool {
        self.body.velocity().dot(normal) < 0.0
    }

    /// Negate the normal component, keep the tangential one
    fn reflect_velocity(&mut self, normal: &Vector2D) {
        let velocity = *self.body.velocity();
        let normal_part = normal.scaled(velocity.dot(normal));
        let mut reflected = velocity.minus(&normal_part);
        reflected.add(&normal_part.scaled(-1.0));
        self.body.set_velocity(reflected);
        self.grow_speed();
    }

    fn grow_speed(&mut self) {
        let speed = self.body.velocity().magnitude();
        if speed == 0.0 || speed >= self.max_speed {
            return;
        }
        let target = (speed * self.speed_growth).min(self.max_speed);
        self.body.velocity_mut().scale(target / speed);
    }

    fn push_out(&mut self, normal: &Vector2D, depth: f32) {
        let shift = normal.scaled(depth);
        self.body.relocate(self.x() + shift.x(), self.y() + shift.y());
    }

    #[cfg(test)]
    pub(crate) fn place(&mut self, x: f32, y: f32, velocity: Vector2D) {
        self.pending_serve = None;
        self.body.relocate(x, y);
        self.body.set_velocity(velocity);
    }
}
