//! Shared physical state for paddles and the ball

use super::vector::Vector2D;

/// Extent of a body, fixed for its lifetime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    pub fn half_height(&self) -> f32 {
        self.height / 2.0
    }
}

/// Position (center point), size and velocity of a moving body.
///
/// Position only changes through [`Body::advance`] or [`Body::relocate`].
#[derive(Debug, Clone)]
pub struct Body {
    position: Vector2D,
    size: Size,
    velocity: Vector2D,
}

impl Body {
    pub fn new(x: f32, y: f32, size: Size) -> Self {
        Self {
            position: Vector2D::new(x, y),
            size,
            velocity: Vector2D::zero(),
        }
    }

    pub fn position(&self) -> &Vector2D {
        &self.position
    }

    pub fn x(&self) -> f32 {
        self.position.x()
    }

    pub fn y(&self) -> f32 {
        self.position.y()
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn velocity(&self) -> &Vector2D {
        &self.velocity
    }

    pub fn velocity_mut(&mut self) -> &mut Vector2D {
        &mut self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vector2D) {
        self.velocity = velocity;
    }

    /// Apply one tick of velocity
    pub fn advance(&mut self) {
        let velocity = self.velocity;
        self.position.add(&velocity);
    }

    pub fn relocate(&mut self, x: f32, y: f32) {
        self.position.set(x, y);
    }
}
