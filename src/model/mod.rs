//! Rectangle model
//!
//! A [`Rectangle`] is the single entity the sheet holds. Its kind-specific
//! data lives in [`Body`]; margin and overlap rules dispatch on [`Kind`].
//! After placement a rectangle changes only through
//! [`Rectangle::set_property`] and [`Rectangle::rotate`].

pub mod rack;
mod setter;
pub mod state;

use std::fmt;

pub use rack::{Bracing, Pallet, PalletConfiguration, Rack, RackLevel};
pub use state::GeometryState;

use crate::layout::config::RackRules;
use crate::layout::error::{LayoutError, LayoutWarning};
use crate::layout::solver::{Candidate, Placement};
use crate::layout::types::{
    approx_eq, floor_to_step, is_on_step, whole, Anchor, Axis, BoundingBox, Point, Vector,
    TOLERANCE,
};

/// Identity of a rectangle on its sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RectId(pub u64);

impl fmt::Display for RectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability tag used by the margin rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Rack,
    Column,
    Block,
    Wall,
    Shutter,
    AisleSpace,
    Elevation,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Rack => write!(f, "rack"),
            Kind::Column => write!(f, "column"),
            Kind::Block => write!(f, "block"),
            Kind::Wall => write!(f, "wall"),
            Kind::Shutter => write!(f, "shutter"),
            Kind::AisleSpace => write!(f, "aisle space"),
            Kind::Elevation => write!(f, "elevation"),
        }
    }
}

/// Allowed values for one length: `min <= v <= max`, `v = min + k * step`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SizeRange {
    pub fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    /// A range that admits exactly one value
    pub fn fixed(value: f64) -> Self {
        Self::new(value, value, 0.0)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min - TOLERANCE && value <= self.max + TOLERANCE
    }

    pub fn is_on_step(&self, value: f64) -> bool {
        is_on_step(value, self.min, self.step)
    }

    /// Nearest whole value on the step grid, clamped into the range
    pub fn snap(&self, value: f64) -> f64 {
        let clamped = value.clamp(self.min, self.max);
        if self.step <= 0.0 {
            return whole(clamped);
        }
        let steps = ((clamped - self.min) / self.step).round();
        let mut snapped = self.min + steps * self.step;
        if snapped > self.max + TOLERANCE {
            snapped -= self.step;
        }
        whole(snapped.max(self.min))
    }

    /// Largest value on the step grid not above `value`, if it is at least `min`
    pub fn floor(&self, value: f64) -> Option<f64> {
        if value < self.min - TOLERANCE {
            return None;
        }
        let capped = value.min(self.max);
        Some(whole(self.min + floor_to_step(capped - self.min, self.step)))
    }

    /// Reject values outside the range; snap off-grid values with a warning
    pub fn validate(
        &self,
        subject: &str,
        value: f64,
    ) -> Result<(f64, Option<LayoutWarning>), LayoutError> {
        if !value.is_finite() || !self.contains(value) {
            return Err(LayoutError::out_of_range(subject, value, self.min, self.max));
        }
        let snapped = self.snap(value);
        let warning = (!approx_eq(snapped, value)).then(|| LayoutWarning::StepViolation {
            subject: subject.to_string(),
            value,
            step: self.step,
            corrected: snapped,
        });
        Ok((snapped, warning))
    }
}

/// Shutter (door) embedded in a wall
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Shutter {
    /// Doors swing out on both sides instead of rolling up
    pub swing_door: bool,
}

/// Kind-specific data of a rectangle
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Rack(Box<Rack>),
    Column,
    Block,
    Wall,
    Shutter(Shutter),
    AisleSpace,
    Elevation,
}

impl Body {
    pub fn kind(&self) -> Kind {
        match self {
            Body::Rack(_) => Kind::Rack,
            Body::Column => Kind::Column,
            Body::Block => Kind::Block,
            Body::Wall => Kind::Wall,
            Body::Shutter(_) => Kind::Shutter,
            Body::AisleSpace => Kind::AisleSpace,
            Body::Elevation => Kind::Elevation,
        }
    }
}

/// Default (x, y, z) ranges for each kind
fn default_ranges(kind: Kind) -> (SizeRange, SizeRange, SizeRange) {
    match kind {
        Kind::Column => (
            SizeRange::new(100.0, 3000.0, 10.0),
            SizeRange::new(100.0, 3000.0, 10.0),
            SizeRange::new(1000.0, 30000.0, 10.0),
        ),
        Kind::Block => (
            SizeRange::new(10.0, 200000.0, 10.0),
            SizeRange::new(10.0, 200000.0, 10.0),
            SizeRange::new(0.0, 30000.0, 10.0),
        ),
        Kind::Wall => (
            SizeRange::new(10.0, 200000.0, 1.0),
            SizeRange::new(10.0, 200000.0, 1.0),
            SizeRange::new(0.0, 30000.0, 1.0),
        ),
        Kind::Shutter => (
            SizeRange::new(300.0, 20000.0, 10.0),
            SizeRange::new(50.0, 1000.0, 10.0),
            SizeRange::new(1000.0, 10000.0, 10.0),
        ),
        Kind::AisleSpace => (
            SizeRange::new(100.0, 200000.0, 10.0),
            SizeRange::new(100.0, 200000.0, 10.0),
            SizeRange::fixed(0.0),
        ),
        Kind::Elevation => (
            SizeRange::new(1.0, 200000.0, 1.0),
            SizeRange::new(1.0, 200000.0, 1.0),
            SizeRange::fixed(0.0),
        ),
        Kind::Rack => rack_ranges(&RackRules::default()),
    }
}

fn rack_ranges(rules: &RackRules) -> (SizeRange, SizeRange, SizeRange) {
    (
        SizeRange::new(rules.length_range.0, rules.length_range.1, 1.0),
        SizeRange::new(rules.depth_range.0, rules.depth_range.1, 1.0),
        SizeRange::new(rules.height_range.0, rules.height_range.1, 1.0),
    )
}

/// An axis-aligned object on the sheet
#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    id: RectId,
    name: String,
    text: String,
    fill_color: u32,
    top_left: Point,
    length_x: f64,
    length_y: f64,
    length_z: f64,
    range_x: SizeRange,
    range_y: SizeRange,
    range_z: SizeRange,
    margin_x: f64,
    margin_y: f64,
    is_horizontal: bool,
    is_init: bool,
    is_selected: bool,
    update_counter: u64,
    body: Body,
}

impl Rectangle {
    /// Create an unplaced rectangle with the default size policy of its kind
    pub fn new(id: RectId, body: Body) -> Self {
        let (range_x, range_y, range_z) = default_ranges(body.kind());
        Self::with_policy(id, body, range_x, range_y, range_z)
    }

    /// Create an unplaced rack whose ranges follow `rules`
    pub fn new_rack(id: RectId, rack: Rack, rules: &RackRules) -> Self {
        let (range_x, range_y, range_z) = rack_ranges(rules);
        Self::with_policy(id, Body::Rack(Box::new(rack)), range_x, range_y, range_z)
    }

    pub fn block(id: RectId) -> Self {
        Self::new(id, Body::Block)
    }

    pub fn wall(id: RectId) -> Self {
        Self::new(id, Body::Wall)
    }

    pub fn column(id: RectId) -> Self {
        Self::new(id, Body::Column)
    }

    pub fn new_shutter(id: RectId, swing_door: bool) -> Self {
        Self::new(id, Body::Shutter(Shutter { swing_door }))
    }

    fn with_policy(
        id: RectId,
        body: Body,
        range_x: SizeRange,
        range_y: SizeRange,
        range_z: SizeRange,
    ) -> Self {
        Self {
            id,
            name: String::new(),
            text: String::new(),
            fill_color: 0xffffff,
            top_left: Point::default(),
            length_x: range_x.min,
            length_y: range_y.min,
            length_z: range_z.min,
            range_x,
            range_y,
            range_z,
            margin_x: 0.0,
            margin_y: 0.0,
            is_horizontal: true,
            is_init: false,
            is_selected: false,
            update_counter: 0,
            body,
        }
    }

    // ============== Builder (before placement) ==============

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.top_left = Point::new(x, y).truncated();
        self
    }

    pub fn with_size(mut self, length_x: f64, length_y: f64) -> Self {
        self.length_x = whole(length_x);
        self.length_y = whole(length_y);
        self
    }

    pub fn with_height(mut self, length_z: f64) -> Self {
        self.length_z = whole(length_z);
        self
    }

    pub fn with_margin(mut self, margin_x: f64, margin_y: f64) -> Self {
        self.margin_x = margin_x;
        self.margin_y = margin_y;
        self
    }

    pub fn with_ranges(mut self, range_x: SizeRange, range_y: SizeRange) -> Self {
        self.range_x = range_x;
        self.range_y = range_y;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Lay the rectangle out with its length along Y instead of X
    pub fn vertical(mut self) -> Self {
        if self.is_horizontal {
            self.swap_axes();
        }
        self
    }

    // ============== Accessors ==============

    pub fn id(&self) -> RectId {
        self.id
    }

    pub fn kind(&self) -> Kind {
        self.body.kind()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn rack(&self) -> Option<&Rack> {
        match &self.body {
            Body::Rack(rack) => Some(rack),
            _ => None,
        }
    }

    pub fn shutter(&self) -> Option<&Shutter> {
        match &self.body {
            Body::Shutter(shutter) => Some(shutter),
            _ => None,
        }
    }

    pub fn is_rack(&self) -> bool {
        matches!(self.body, Body::Rack(_))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn fill_color(&self) -> u32 {
        self.fill_color
    }

    /// Name if set, otherwise the id
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            format!("\"{}\"", self.name)
        }
    }

    pub fn top_left(&self) -> Point {
        self.top_left
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.top_left.x, self.top_left.y + self.length_y)
    }

    pub fn top_right(&self) -> Point {
        Point::new(self.top_left.x + self.length_x, self.top_left.y)
    }

    pub fn bottom_right(&self) -> Point {
        self.top_left + Vector::new(self.length_x, self.length_y)
    }

    pub fn center(&self) -> Point {
        self.top_left + Vector::new(self.length_x / 2.0, self.length_y / 2.0)
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.top_left.x,
            self.top_left.y,
            self.length_x,
            self.length_y,
        )
    }

    pub fn length_x(&self) -> f64 {
        self.length_x
    }

    pub fn length_y(&self) -> f64 {
        self.length_y
    }

    pub fn length_z(&self) -> f64 {
        self.length_z
    }

    pub fn length_along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.length_x,
            Axis::Y => self.length_y,
            Axis::Z => self.length_z,
        }
    }

    pub fn range_x(&self) -> SizeRange {
        self.range_x
    }

    pub fn range_y(&self) -> SizeRange {
        self.range_y
    }

    pub fn range_z(&self) -> SizeRange {
        self.range_z
    }

    pub fn range_along(&self, axis: Axis) -> SizeRange {
        match axis {
            Axis::X => self.range_x,
            Axis::Y => self.range_y,
            Axis::Z => self.range_z,
        }
    }

    /// Stored own margin; racks compute theirs, see `layout::margin::own_margin`
    pub fn margin(&self) -> (f64, f64) {
        (self.margin_x, self.margin_y)
    }

    pub fn is_horizontal(&self) -> bool {
        self.is_horizontal
    }

    /// Axis the rectangle's length runs along
    pub fn length_axis(&self) -> Axis {
        if self.is_horizontal {
            Axis::X
        } else {
            Axis::Y
        }
    }

    /// Axis across the length (rack depth)
    pub fn depth_axis(&self) -> Axis {
        self.length_axis().other()
    }

    pub fn is_init(&self) -> bool {
        self.is_init
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    /// Selection is view state; it is not an edit and does not bump the counter
    pub fn set_selected(&mut self, selected: bool) {
        self.is_selected = selected;
    }

    pub fn update_counter(&self) -> u64 {
        self.update_counter
    }

    /// Every length sits inside its range and on its step grid
    pub fn sizes_are_valid(&self) -> bool {
        [Axis::X, Axis::Y, Axis::Z].iter().all(|axis| {
            let range = self.range_along(*axis);
            let length = self.length_along(*axis);
            range.contains(length) && range.is_on_step(length)
        })
    }

    /// Point that stays fixed when pivoting on `anchor`
    pub fn anchor_point(&self, anchor: Anchor) -> Point {
        match anchor {
            Anchor::TopLeft => self.top_left,
            Anchor::Center => self.center(),
            Anchor::BottomRight => self.bottom_right(),
        }
    }

    /// Solver view of the rectangle; rack sizes are derived and stay pinned
    pub fn as_candidate(&self) -> Candidate {
        let (range_x, range_y) = if self.is_rack() {
            (
                SizeRange::fixed(self.length_x),
                SizeRange::fixed(self.length_y),
            )
        } else {
            (self.range_x, self.range_y)
        };
        Candidate {
            top_left: self.top_left,
            length_x: self.length_x,
            length_y: self.length_y,
            range_x,
            range_y,
        }
    }

    // ============== Crate-internal mutation ==============

    pub(crate) fn rack_mut(&mut self) -> Option<&mut Rack> {
        match &mut self.body {
            Body::Rack(rack) => Some(rack),
            _ => None,
        }
    }

    pub(crate) fn mark_placed(&mut self) {
        self.is_init = true;
    }

    pub(crate) fn bump(&mut self) {
        self.update_counter += 1;
    }

    pub(crate) fn set_top_left(&mut self, top_left: Point) {
        self.top_left = top_left.truncated();
    }

    pub(crate) fn set_length_along(&mut self, axis: Axis, length: f64) {
        let length = whole(length);
        match axis {
            Axis::X => self.length_x = length,
            Axis::Y => self.length_y = length,
            Axis::Z => self.length_z = length,
        }
    }

    /// Re-derive `top_left` so that `pivot` sits at `point` for the current lengths
    pub(crate) fn pin_anchor(&mut self, anchor: Anchor, point: Point) {
        let top_left = match anchor {
            Anchor::TopLeft => point,
            Anchor::Center => point - Vector::new(self.length_x / 2.0, self.length_y / 2.0),
            Anchor::BottomRight => point - Vector::new(self.length_x, self.length_y),
        };
        self.set_top_left(top_left);
    }

    pub(crate) fn apply_placement(&mut self, placement: &Placement) {
        self.set_top_left(placement.top_left);
        self.length_x = whole(placement.length_x);
        self.length_y = whole(placement.length_y);
    }

    /// Swap the X and Y role of every size-related field
    pub(crate) fn swap_axes(&mut self) {
        std::mem::swap(&mut self.length_x, &mut self.length_y);
        std::mem::swap(&mut self.range_x, &mut self.range_y);
        std::mem::swap(&mut self.margin_x, &mut self.margin_y);
        self.is_horizontal = !self.is_horizontal;
    }
}
