//! 2D vector with tracked magnitude

use serde::{Deserialize, Serialize};

/// 2D vector. `magnitude` is recomputed on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawVector", into = "RawVector")]
pub struct Vector2D {
    x: f32,
    y: f32,
    magnitude: f32,
}

#[derive(Serialize, Deserialize)]
struct RawVector {
    x: f32,
    y: f32,
}

impl From<RawVector> for Vector2D {
    fn from(raw: RawVector) -> Self {
        Self::new(raw.x, raw.y)
    }
}

impl From<Vector2D> for RawVector {
    fn from(v: Vector2D) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl Vector2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            magnitude: (x * x + y * y).sqrt(),
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Vector of magnitude `length` pointing at `angle` radians
    pub fn from_angle(angle: f32, length: f32) -> Self {
        Self::new(angle.cos() * length, angle.sin() * length)
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn magnitude(&self) -> f32 {
        self.magnitude
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn set(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.recompute();
    }

    pub fn scale(&mut self, factor: f32) {
        self.x *= factor;
        self.y *= factor;
        self.recompute();
    }

    pub fn add(&mut self, other: &Vector2D) {
        self.x += other.x;
        self.y += other.y;
        self.recompute();
    }

    pub fn dot(&self, other: &Vector2D) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn scaled(&self, factor: f32) -> Vector2D {
        Vector2D::new(self.x * factor, self.y * factor)
    }

    pub fn minus(&self, other: &Vector2D) -> Vector2D {
        Vector2D::new(self.x - other.x, self.y - other.y)
    }

    /// Unit-length copy; the zero vector stays zero
    pub fn normalized(&self) -> Vector2D {
        if self.magnitude == 0.0 {
            return *self;
        }
        Vector2D::new(self.x / self.magnitude, self.y / self.magnitude)
    }

    fn recompute(&mut self) {
        self.magnitude = (self.x * self.x + self.y * self.y).sqrt();
    }
}

impl Default for Vector2D {
    fn default() -> Self {
        Self::zero()
    }
}
