// Pure 2D math used by movement, collision and interaction checks.
// Screen convention: +x to the right, +y downward.

use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::{Add, Mul, Sub};

/// Immutable 2D point or displacement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dist_to(self, other: Vec2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Signed angle from `self` to `other` in (-pi, pi], 0 along +x.
    ///
    /// Because y grows downward, a target above `self` yields a positive angle.
    pub fn angle_to(self, other: Vec2) -> f64 {
        (self.y - other.y).atan2(other.x - self.x)
    }

    pub fn with_x(self, x: f64) -> Self {
        Self { x, y: self.y }
    }

    pub fn with_y(self, y: f64) -> Self {
        Self { x: self.x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, scalar: f64) -> Vec2 {
        Vec2::new(self.x * scalar, self.y * scalar)
    }
}

/// One of the four cardinal facings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Up,
    Right,
    Down,
}

impl Direction {
    /// Parses a single wire character (`l`, `u`, `r`, `d`).
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'l' => Some(Direction::Left),
            'u' => Some(Direction::Up),
            'r' => Some(Direction::Right),
            'd' => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Direction::Left => 'l',
            Direction::Up => 'u',
            Direction::Right => 'r',
            Direction::Down => 'd',
        }
    }

    /// Angle from the +x axis, matching `Vec2::angle_to`.
    pub fn angle(self) -> f64 {
        match self {
            Direction::Left => PI,
            Direction::Up => FRAC_PI_2,
            Direction::Right => 0.0,
            Direction::Down => -FRAC_PI_2,
        }
    }

    pub fn unit(self) -> Vec2 {
        match self {
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Right => Vec2::new(1.0, 0.0),
            Direction::Down => Vec2::new(0.0, 1.0),
        }
    }
}

/// Axis-aligned rectangle; `min` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl BoundingBox {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Square box of side `size` anchored at `pos`.
    pub fn square(pos: Vec2, size: f64) -> Self {
        Self::new(pos, pos + Vec2::new(size, size))
    }

    pub fn left(&self) -> f64 {
        self.min.x
    }

    pub fn top(&self) -> f64 {
        self.min.y
    }

    pub fn right(&self) -> f64 {
        self.max.x
    }

    pub fn bottom(&self) -> f64 {
        self.max.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Inclusive overlap test: boxes sharing an edge are touching.
    pub fn touching(&self, other: &BoundingBox) -> bool {
        !(other.left() > self.right()
            || other.right() < self.left()
            || other.top() > self.bottom()
            || other.bottom() < self.top())
    }
}

/// Wraps an angle into (-pi, pi].
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}
