//! Paddle entity

use super::body::{Body, Size};
use super::settings::GameSettings;
use super::vector::Vector2D;

/// Vertical direction of a single paddle step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A paddle: fixed x, y driven directly by input
#[derive(Debug, Clone)]
pub struct Paddle {
    body: Body,
    /// Unit normal of the edge facing the table center
    facing: Vector2D,
}

impl Paddle {
    /// Left paddle (player 1)
    pub fn left(settings: &GameSettings) -> Self {
        Self::new(settings.paddle_margin, settings, Vector2D::new(1.0, 0.0))
    }

    /// Right paddle (player 2)
    pub fn right(settings: &GameSettings) -> Self {
        Self::new(
            settings.table.width - settings.paddle_margin,
            settings,
            Vector2D::new(-1.0, 0.0),
        )
    }

    fn new(x: f32, settings: &GameSettings, facing: Vector2D) -> Self {
        Self {
            body: Body::new(x, settings.table.height / 2.0, settings.paddle_size),
            facing,
        }
    }

    pub fn x(&self) -> f32 {
        self.body.x()
    }

    pub fn y(&self) -> f32 {
        self.body.y()
    }

    pub fn size(&self) -> Size {
        self.body.size()
    }

    pub fn facing(&self) -> Vector2D {
        self.facing
    }

    /// Point on the edge facing the table, level with the paddle center
    pub fn edge_point(&self) -> Vector2D {
        let offset = self.facing.scaled(self.size().half_width());
        Vector2D::new(self.x() + offset.x(), self.y() + offset.y())
    }

    /// Step once in `direction`. A step that would leave `bounds` is
    /// dropped, not clamped. Returns whether the paddle moved.
    pub fn step(&mut self, direction: Direction, offset: f32, bounds: (f32, f32)) -> bool {
        let target = match direction {
            Direction::Up => self.y() - offset,
            Direction::Down => self.y() + offset,
        };
        let (low, high) = bounds;
        if target < low || target > high {
            return false;
        }
        self.body.relocate(self.x(), target);
        true
    }

    pub fn recenter(&mut self, table_height: f32) {
        self.body.relocate(self.x(), table_height / 2.0);
    }

    #[cfg(test)]
    pub(crate) fn place_at(&mut self, y: f32) {
        self.body.relocate(self.x(), y);
    }
}

/// Both paddles of a match
#[derive(Debug, Clone)]
pub struct Paddles {
    pub p1: Paddle,
    pub p2: Paddle,
}

impl Paddles {
    pub fn new(settings: &GameSettings) -> Self {
        Self {
            p1: Paddle::left(settings),
            p2: Paddle::right(settings),
        }
    }

    pub fn recenter(&mut self, table_height: f32) {
        self.p1.recenter(table_height);
        self.p2.recenter(table_height);
    }
}
