//! Geometry primitives for the layout engine
//!
//! All coordinates live in one global, whole-number coordinate space
//! (millimetres on the sheet). Helpers here keep values integral and snap
//! them to step grids.

use std::fmt;
use std::ops::{Add, Sub};

use serde::Deserialize;

/// Tolerance used when comparing stored lengths and coordinates
pub const TOLERANCE: f64 = 1e-6;

/// Compare two values with [`TOLERANCE`]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= TOLERANCE
}

/// `a <= b` with [`TOLERANCE`]
pub fn approx_le(a: f64, b: f64) -> bool {
    a <= b + TOLERANCE
}

/// Drop the fractional part of a stored length or coordinate
pub fn whole(value: f64) -> f64 {
    value.trunc()
}

/// Round `value` up to the next multiple of `step`
pub fn ceil_to_step(value: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return value;
    }
    ((value - TOLERANCE) / step).ceil() * step
}

/// Round `value` down to the previous multiple of `step`
pub fn floor_to_step(value: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return value;
    }
    ((value + TOLERANCE) / step).floor() * step
}

/// Check whether `value` sits on the grid `origin + k * step`
pub fn is_on_step(value: f64, origin: f64, step: f64) -> bool {
    if step <= 0.0 {
        return true;
    }
    let steps = (value - origin) / step;
    approx_eq(steps, steps.round())
}

/// A 2D point in global coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The same point with both coordinates truncated to whole numbers
    pub fn truncated(self) -> Self {
        Self::new(whole(self.x), whole(self.y))
    }

    /// Coordinate along an axis (Z maps to nothing and yields 0)
    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => 0.0,
        }
    }

    /// The same point with the coordinate along `axis` replaced
    pub fn with_along(mut self, axis: Axis, value: f64) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => {}
        }
        self
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A displacement between two points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
}

impl Vector {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Manhattan length, used to rank candidate moves
    pub fn manhattan(&self) -> f64 {
        self.dx.abs() + self.dy.abs()
    }
}

impl Add<Vector> for Point {
    type Output = Point;

    fn add(self, v: Vector) -> Point {
        Point::new(self.x + v.dx, self.y + v.dy)
    }
}

impl Sub<Vector> for Point {
    type Output = Point;

    fn sub(self, v: Vector) -> Point {
        Point::new(self.x - v.dx, self.y - v.dy)
    }
}

impl Sub<Point> for Point {
    type Output = Vector;

    fn sub(self, other: Point) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y)
    }
}

/// Sheet axes; Z is the vertical (height) axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// The other planar axis
    pub fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
            Axis::Z => Axis::Z,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
            Axis::Z => write!(f, "Z"),
        }
    }
}

/// Grip point a move, resize or rotation pivots on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    #[default]
    TopLeft,
    Center,
    BottomRight,
}

/// An axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a zero-sized bounding box at the origin
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Right edge x-coordinate
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Center point of the bounding box
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if this bounding box contains another one (edges inclusive)
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        approx_le(self.x, other.x)
            && approx_le(self.y, other.y)
            && approx_le(other.right(), self.right())
            && approx_le(other.bottom(), self.bottom())
    }

    /// Check if this bounding box intersects another with positive area
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.right() - TOLERANCE
            && self.right() > other.x + TOLERANCE
            && self.y < other.bottom() - TOLERANCE
            && self.bottom() > other.y + TOLERANCE
    }

    /// Grow the box by `mx` on the left and right and by `my` on the top and bottom
    pub fn expanded(&self, mx: f64, my: f64) -> BoundingBox {
        BoundingBox::new(
            self.x - mx,
            self.y - my,
            self.width + 2.0 * mx,
            self.height + 2.0 * my,
        )
    }

    /// Intersection of two boxes, if it has positive area
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Some(BoundingBox::new(x, y, right - x, bottom - y))
    }

    /// Squared distance from a point to the closest point of this box
    pub fn distance_squared_to(&self, p: Point) -> f64 {
        let dx = (self.x - p.x).max(0.0).max(p.x - self.right());
        let dy = (self.y - p.y).max(0.0).max(p.y - self.bottom());
        dx * dx + dy * dy
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::zero()
    }
}
