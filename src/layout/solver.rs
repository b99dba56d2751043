//! Auto-reposition solver
//!
//! When a candidate overlaps its neighbours the solver proposes a new
//! placement: with a [`Anchor::Center`] grip it slides the rectangle clear,
//! with a corner grip it shrinks the rectangle away from the fixed corner.
//! [`settle`] repeats this until the layout is correct or the iteration cap
//! is reached.

use tracing::debug;

use super::error::LayoutError;
use super::margin::{margin, sheet_area, swing_envelope};
use super::types::{Anchor, BoundingBox, Point, TOLERANCE};
use crate::model::{RectId, Rectangle, SizeRange};
use crate::sheet::Sheet;

/// Geometry the solver may change
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub top_left: Point,
    pub length_x: f64,
    pub length_y: f64,
    pub range_x: SizeRange,
    pub range_y: SizeRange,
}

impl Candidate {
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.top_left.x, self.top_left.y, self.length_x, self.length_y)
    }
}

/// A neighbour to keep clear of, with the margin required towards it
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub bounds: BoundingBox,
    pub margin: (f64, f64),
}

impl Obstacle {
    /// Obstacle `other` presents to `rect`
    pub fn between(rect: &Rectangle, other: &Rectangle, sheet: &dyn Sheet) -> Self {
        Self {
            bounds: swing_envelope(other),
            margin: margin(rect, other, sheet.margin_rules()).unwrap_or((0.0, 0.0)),
        }
    }
}

/// Proposed geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub top_left: Point,
    pub length_x: f64,
    pub length_y: f64,
}

/// Outer edges of the obstacles, each pushed out by its margin
struct Extrema {
    top: f64,
    bottom: f64,
    left: f64,
    right: f64,
}

fn extrema(obstacles: &[Obstacle]) -> Extrema {
    obstacles.iter().fold(
        Extrema {
            top: f64::INFINITY,
            bottom: f64::NEG_INFINITY,
            left: f64::INFINITY,
            right: f64::NEG_INFINITY,
        },
        |acc, o| {
            let (mx, my) = o.margin;
            Extrema {
                top: acc.top.min(o.bounds.y - my),
                bottom: acc.bottom.max(o.bounds.bottom() + my),
                left: acc.left.min(o.bounds.x - mx),
                right: acc.right.max(o.bounds.right() + mx),
            }
        },
    )
}

/// Propose a placement that clears every obstacle at once, inside `area`
pub fn resolve_overlap(
    candidate: &Candidate,
    obstacles: &[Obstacle],
    anchor: Anchor,
    area: &BoundingBox,
) -> Option<Placement> {
    if obstacles.is_empty() {
        return None;
    }
    let ext = extrema(obstacles);
    match anchor {
        Anchor::Center => translate(candidate, &ext, area),
        Anchor::TopLeft => shrink_from_top_left(candidate, &ext),
        Anchor::BottomRight => shrink_from_bottom_right(candidate, &ext),
    }
}

/// Smallest move up, down, left or right that clears all obstacles
fn translate(candidate: &Candidate, ext: &Extrema, area: &BoundingBox) -> Option<Placement> {
    let b = candidate.bounds();
    let up = (ext.top - b.height).floor();
    let down = ext.bottom.ceil();
    let left = (ext.left - b.width).floor();
    let right = ext.right.ceil();

    let moves = [
        (up < b.y - TOLERANCE && up >= area.y - TOLERANCE).then(|| Point::new(b.x, up)),
        (down > b.y + TOLERANCE && down + b.height <= area.bottom() + TOLERANCE)
            .then(|| Point::new(b.x, down)),
        (left < b.x - TOLERANCE && left >= area.x - TOLERANCE).then(|| Point::new(left, b.y)),
        (right > b.x + TOLERANCE && right + b.width <= area.right() + TOLERANCE)
            .then(|| Point::new(right, b.y)),
    ];

    moves
        .into_iter()
        .flatten()
        .min_by(|p, q| {
            (*p - b.top_left())
                .manhattan()
                .total_cmp(&(*q - b.top_left()).manhattan())
        })
        .map(|top_left| Placement {
            top_left,
            length_x: candidate.length_x,
            length_y: candidate.length_y,
        })
}

/// New length so that the moving edge stops at `limit`; `None` if shrinking
/// this axis cannot help or would fall below the minimum
fn shrunk_length(current: f64, limit: f64, range: &SizeRange) -> Option<f64> {
    if limit >= current - TOLERANCE {
        return None;
    }
    range.floor(limit)
}

/// Prefer the axis that loses less
fn pick_axis(
    current: (f64, f64),
    shrunk: (Option<f64>, Option<f64>),
) -> Option<(f64, f64)> {
    match shrunk {
        (Some(x), Some(y)) if current.0 - x <= current.1 - y => Some((x, current.1)),
        (_, Some(y)) => Some((current.0, y)),
        (Some(x), None) => Some((x, current.1)),
        (None, None) => None,
    }
}

fn shrink_from_top_left(candidate: &Candidate, ext: &Extrema) -> Option<Placement> {
    let b = candidate.bounds();
    let shrunk_x = shrunk_length(b.width, ext.left - b.x, &candidate.range_x);
    let shrunk_y = shrunk_length(b.height, ext.top - b.y, &candidate.range_y);
    let (length_x, length_y) = pick_axis((b.width, b.height), (shrunk_x, shrunk_y))?;
    Some(Placement {
        top_left: b.top_left(),
        length_x,
        length_y,
    })
}

fn shrink_from_bottom_right(candidate: &Candidate, ext: &Extrema) -> Option<Placement> {
    let b = candidate.bounds();
    let shrunk_x = shrunk_length(b.width, b.right() - ext.right, &candidate.range_x);
    let shrunk_y = shrunk_length(b.height, b.bottom() - ext.bottom, &candidate.range_y);
    let (length_x, length_y) = pick_axis((b.width, b.height), (shrunk_x, shrunk_y))?;
    Some(Placement {
        top_left: Point::new(b.right() - length_x, b.bottom() - length_y),
        length_x,
        length_y,
    })
}

/// Reposition `rect` until it no longer overlaps anything on `sheet`
///
/// Returns the number of adjustments made. Fails with a layout conflict
/// naming the last overlapping neighbours when no move exists or the cap
/// is reached.
pub fn settle(
    rect: &mut Rectangle,
    anchor: Anchor,
    sheet: &dyn Sheet,
    ignore: &[RectId],
    max_iterations: usize,
) -> Result<usize, LayoutError> {
    let area = sheet_area(rect, sheet.bounds(), sheet.margin_rules());
    let mut overlapping = Vec::new();

    for iteration in 0..=max_iterations {
        let check = sheet.is_layout_correct(rect, ignore);
        if check.is_ok() {
            return Ok(iteration);
        }
        overlapping = check.overlapping;
        if iteration == max_iterations || overlapping.is_empty() {
            return Err(LayoutError::conflict(rect.id(), overlapping, iteration));
        }

        let obstacles: Vec<Obstacle> = overlapping
            .iter()
            .filter_map(|id| sheet.get(*id))
            .map(|other| Obstacle::between(rect, other, sheet))
            .collect();
        let placement = resolve_overlap(&rect.as_candidate(), &obstacles, anchor, &area)
            .ok_or_else(|| LayoutError::conflict(rect.id(), overlapping.clone(), iteration))?;

        debug!(
            "{} repositioned to {} ({} x {}) clearing {} neighbours",
            rect.id(),
            placement.top_left,
            placement.length_x,
            placement.length_y,
            obstacles.len()
        );
        rect.apply_placement(&placement);
    }

    Err(LayoutError::conflict(rect.id(), overlapping, max_iterations))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x: f64, y: f64, w: f64, h: f64) -> Candidate {
        Candidate {
            top_left: Point::new(x, y),
            length_x: w,
            length_y: h,
            range_x: SizeRange::new(100.0, 5000.0, 10.0),
            range_y: SizeRange::new(100.0, 5000.0, 10.0),
        }
    }

    fn obstacle(x: f64, y: f64, w: f64, h: f64) -> Obstacle {
        Obstacle {
            bounds: BoundingBox::new(x, y, w, h),
            margin: (0.0, 0.0),
        }
    }

    fn area() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 10000.0, 10000.0)
    }

    #[test]
    fn test_no_obstacles_means_no_move() {
        assert!(resolve_overlap(&candidate(0.0, 0.0, 500.0, 500.0), &[], Anchor::Center, &area()).is_none());
    }

    #[test]
    fn test_translate_picks_smallest_move() {
        let c = candidate(1000.0, 1000.0, 500.0, 500.0);
        let o = obstacle(1400.0, 900.0, 1000.0, 1000.0);
        let p = resolve_overlap(&c, &[o], Anchor::Center, &area()).unwrap();
        assert_eq!(p.top_left, Point::new(900.0, 1000.0));
        assert_eq!((p.length_x, p.length_y), (500.0, 500.0));
    }

    #[test]
    fn test_translate_respects_margin_and_area() {
        let c = candidate(0.0, 1000.0, 500.0, 500.0);
        let o = Obstacle {
            bounds: BoundingBox::new(400.0, 1000.0, 1000.0, 100.0),
            margin: (50.0, 50.0),
        };
        // Left is blocked by the sheet edge
        let p = resolve_overlap(&c, &[o], Anchor::Center, &area()).unwrap();
        assert_eq!(p.top_left, Point::new(0.0, 1150.0));
    }

    #[test]
    fn test_shrink_from_top_left_keeps_corner() {
        let c = candidate(1000.0, 1000.0, 1000.0, 1000.0);
        let o = obstacle(1805.0, 0.0, 500.0, 5000.0);
        let p = resolve_overlap(&c, &[o], Anchor::TopLeft, &area()).unwrap();
        assert_eq!(p.top_left, Point::new(1000.0, 1000.0));
        assert_eq!((p.length_x, p.length_y), (800.0, 1000.0));
    }

    #[test]
    fn test_shrink_from_bottom_right_keeps_corner() {
        let c = candidate(1000.0, 1000.0, 1000.0, 1000.0);
        let o = obstacle(0.0, 0.0, 5000.0, 1300.0);
        let p = resolve_overlap(&c, &[o], Anchor::BottomRight, &area()).unwrap();
        assert_eq!((p.length_x, p.length_y), (1000.0, 700.0));
        assert_eq!(p.top_left, Point::new(1000.0, 1300.0));
    }

    #[test]
    fn test_shrink_below_minimum_fails() {
        let c = candidate(1000.0, 1000.0, 1000.0, 1000.0);
        let o = obstacle(1050.0, 1050.0, 100.0, 100.0);
        assert!(resolve_overlap(&c, &[o], Anchor::TopLeft, &area()).is_none());
    }
}
