//! Pairwise margins and the overlap predicate
//!
//! Two rectangles overlap when they come closer than their margin on both
//! axes at once. Touching at exactly the margin is allowed. Swing-door
//! shutters additionally keep quarter-disk swing zones free.

use super::config::MarginRules;
use super::types::{Axis, BoundingBox, Point, TOLERANCE};
use crate::model::{Kind, Rectangle};

/// How far pallets stick out past the rack frame on each side of its depth
pub fn rack_overhang(rect: &Rectangle) -> f64 {
    let Some(rack) = rect.rack() else {
        return 0.0;
    };
    let depth = rect.length_along(rect.depth_axis());
    ((rack.max_pallet_width() - depth) / 2.0).max(0.0)
}

/// Margin a rectangle keeps on its own, e.g. from the sheet border
pub fn own_margin(rect: &Rectangle, rules: &MarginRules) -> (f64, f64) {
    if !rect.is_rack() {
        return rect.margin();
    }
    if !rules.pallet_overhang {
        return (0.0, 0.0);
    }
    let overhang = rack_overhang(rect);
    match rect.depth_axis() {
        Axis::X => (overhang, 0.0),
        _ => (0.0, overhang),
    }
}

/// Required clearance between `a` and `b` per axis, or `None` when the pair
/// may overlap freely
pub fn margin(a: &Rectangle, b: &Rectangle, rules: &MarginRules) -> Option<(f64, f64)> {
    use Kind::*;
    match (a.kind(), b.kind()) {
        (Elevation, _) | (_, Elevation) => None,
        (Shutter, Wall) | (Wall, Shutter) => None,
        (Rack, AisleSpace) | (AisleSpace, Rack) => Some((0.0, 0.0)),
        (Rack, Block) | (Block, Rack) => Some((rules.rack_to_block, rules.rack_to_block)),
        (Rack, Wall) | (Wall, Rack) => Some((rules.rack_to_wall, rules.rack_to_wall)),
        (Rack, Rack) if a.is_horizontal() == b.is_horizontal() => {
            let mut back_to_back = rules.rack_back_to_back;
            if rules.pallet_overhang {
                back_to_back += rack_overhang(a) + rack_overhang(b);
            }
            Some(match a.depth_axis() {
                Axis::X => (back_to_back, 0.0),
                _ => (0.0, back_to_back),
            })
        }
        _ => {
            let (ax, ay) = own_margin(a, rules);
            let (bx, by) = own_margin(b, rules);
            Some((ax + bx, ay + by))
        }
    }
}

/// Boxes are closer than `(mx, my)` on both axes
pub fn boxes_conflict(a: &BoundingBox, b: &BoundingBox, mx: f64, my: f64) -> bool {
    let gap_x = (b.x - a.right()).max(a.x - b.right());
    let gap_y = (b.y - a.bottom()).max(a.y - b.bottom());
    gap_x < mx - TOLERANCE && gap_y < my - TOLERANCE
}

pub fn overlaps(a: &Rectangle, b: &Rectangle, rules: &MarginRules) -> bool {
    let Some((mx, my)) = margin(a, b, rules) else {
        return false;
    };
    boxes_conflict(&a.bounds(), &b.bounds(), mx, my)
        || swing_conflict(a, b)
        || swing_conflict(b, a)
}

/// Area inside which a rectangle must stay on a `length x width` sheet
pub fn sheet_area(rect: &Rectangle, sheet: (f64, f64), rules: &MarginRules) -> BoundingBox {
    let (mx, my) = own_margin(rect, rules);
    BoundingBox::new(mx, my, sheet.0 - 2.0 * mx, sheet.1 - 2.0 * my)
}

pub fn within_sheet(rect: &Rectangle, sheet: (f64, f64), rules: &MarginRules) -> bool {
    sheet_area(rect, sheet, rules).contains_box(&rect.bounds())
}

/// A quarter disk kept free by a swinging door leaf
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingZone {
    /// Hinge corner
    pub center: Point,
    pub radius: f64,
    /// Square holding the quarter disk
    pub quadrant: BoundingBox,
}

impl SwingZone {
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        match self.quadrant.intersection(other) {
            Some(part) => part.distance_squared_to(self.center) < self.radius * self.radius - TOLERANCE,
            None => false,
        }
    }
}

/// Swing zones of a swing-door shutter; empty for anything else
///
/// Each of the two leaves spans half the opening. Leaves hinge on the four
/// corners and open out on both faces of the wall.
pub fn swing_zones(rect: &Rectangle) -> Vec<SwingZone> {
    if !rect.shutter().is_some_and(|s| s.swing_door) {
        return Vec::new();
    }
    let b = rect.bounds();
    let r = rect.length_along(rect.length_axis()) / 2.0;
    let zone = |cx: f64, cy: f64, qx: f64, qy: f64| SwingZone {
        center: Point::new(cx, cy),
        radius: r,
        quadrant: BoundingBox::new(qx, qy, r, r),
    };
    if rect.is_horizontal() {
        vec![
            zone(b.x, b.y, b.x, b.y - r),
            zone(b.right(), b.y, b.right() - r, b.y - r),
            zone(b.x, b.bottom(), b.x, b.bottom()),
            zone(b.right(), b.bottom(), b.right() - r, b.bottom()),
        ]
    } else {
        vec![
            zone(b.x, b.y, b.x - r, b.y),
            zone(b.x, b.bottom(), b.x - r, b.bottom() - r),
            zone(b.right(), b.y, b.right(), b.y),
            zone(b.right(), b.bottom(), b.right(), b.bottom() - r),
        ]
    }
}

/// Bounding box of a shutter together with its swing zones
pub fn swing_envelope(rect: &Rectangle) -> BoundingBox {
    let zones = swing_zones(rect);
    if zones.is_empty() {
        return rect.bounds();
    }
    let r = zones[0].radius;
    match rect.depth_axis() {
        Axis::X => rect.bounds().expanded(r, 0.0),
        _ => rect.bounds().expanded(0.0, r),
    }
}

fn swing_conflict(shutter: &Rectangle, other: &Rectangle) -> bool {
    let other = other.bounds();
    swing_zones(shutter).iter().any(|zone| zone.intersects(&other))
}
