//! Property setter and rotation
//!
//! Both follow the same steps: snapshot, apply, check the sheet boundary,
//! check or settle the layout, then commit by bumping the update counter or
//! restore the snapshot.

use tracing::{debug, warn};

use super::{Body, RectId, Rectangle};
use crate::cascade;
use crate::edit::EditContext;
use crate::layout::error::{LayoutError, LayoutWarning};
use crate::layout::margin::within_sheet;
use crate::layout::solver;
use crate::layout::types::{approx_eq, whole, Anchor, Axis, Point};
use crate::property::{PropertyKey, Value};

/// Parse `#rrggbb` or a plain number
fn parse_color(key: &str, value: &Value) -> Result<u32, LayoutError> {
    if let Value::Number(n) = value {
        if *n >= 0.0 && *n <= f64::from(0xffffff) && n.fract() == 0.0 {
            return Ok(*n as u32);
        }
        return Err(LayoutError::invalid(key, format!("{} is not a color", n)));
    }
    let text = value.as_text(key)?;
    text.strip_prefix('#')
        .filter(|hex| hex.len() == 6)
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .ok_or_else(|| LayoutError::invalid(key, format!("'{}' is not a #rrggbb color", text)))
}

fn axis_subject(key: &PropertyKey, axis: Axis) -> String {
    match key {
        PropertyKey::DimensionX | PropertyKey::DimensionY => key.to_string(),
        _ => format!("{} {}", key, axis),
    }
}

impl Rectangle {
    /// Set one property
    ///
    /// On success the update counter is bumped and step corrections are
    /// returned as warnings. On failure every field is restored.
    pub fn set_property(
        &mut self,
        key: &PropertyKey,
        value: &Value,
        validate_layout: bool,
        ctx: &EditContext<'_>,
    ) -> Result<Vec<LayoutWarning>, LayoutError> {
        let snapshot = self.snapshot();
        let mut warnings = Vec::new();
        let result = self
            .apply_property(key, value, ctx, &mut warnings)
            .and_then(|anchor| self.validate_placement(anchor, validate_layout, ctx));
        match result {
            Ok(()) => {
                self.bump();
                for warning in &warnings {
                    debug!("{} {}: {}", self.id(), key, warning);
                }
                Ok(warnings)
            }
            Err(err) => {
                self.restore(&snapshot);
                warn!("{} {} rolled back: {}", self.id(), key, err);
                Err(err)
            }
        }
    }

    /// Rotate by 90 degrees around the configured rotation anchor
    ///
    /// With auto-reposition on, a rotated rectangle that lands on a
    /// neighbour is slid clear like a move, so the anchor point holds only
    /// when nothing is in the way. Without it the rotation fails instead.
    pub fn rotate(&mut self, validate_layout: bool, ctx: &EditContext<'_>) -> Result<(), LayoutError> {
        let snapshot = self.snapshot();
        let anchor = ctx.config.rotation_anchor;
        let pivot = self.anchor_point(anchor);
        self.swap_axes();
        self.pin_anchor(anchor, pivot);
        match self.validate_placement(Anchor::Center, validate_layout, ctx) {
            Ok(()) => {
                self.bump();
                Ok(())
            }
            Err(err) => {
                self.restore(&snapshot);
                warn!("{} rotation rolled back: {}", self.id(), err);
                Err(err)
            }
        }
    }

    /// Apply the value and return the grip the solver should keep fixed
    fn apply_property(
        &mut self,
        key: &PropertyKey,
        value: &Value,
        ctx: &EditContext<'_>,
        warnings: &mut Vec<LayoutWarning>,
    ) -> Result<Anchor, LayoutError> {
        let name = key.to_string();
        match key {
            PropertyKey::TopLeftX => {
                let x = value.as_number(&name)?;
                self.set_top_left(Point::new(x, self.top_left.y));
                Ok(Anchor::Center)
            }
            PropertyKey::TopLeftY => {
                let y = value.as_number(&name)?;
                self.set_top_left(Point::new(self.top_left.x, y));
                Ok(Anchor::Center)
            }
            PropertyKey::CenterPoint => {
                let center = value.as_point(&name)?;
                self.pin_anchor(Anchor::Center, center);
                Ok(Anchor::Center)
            }
            PropertyKey::TopLeftPoint => {
                let p = value.as_point(&name)?;
                let bottom_right = self.bottom_right();
                let size = bottom_right - p;
                self.resize(key, size.dx, size.dy, Anchor::BottomRight, ctx, warnings)?;
                Ok(Anchor::BottomRight)
            }
            PropertyKey::BotRightPoint => {
                let p = value.as_point(&name)?;
                let size = p - self.top_left;
                self.resize(key, size.dx, size.dy, Anchor::TopLeft, ctx, warnings)?;
                Ok(Anchor::TopLeft)
            }
            PropertyKey::DimensionX => {
                let v = value.as_number(&name)?;
                let anchor = ctx.config.resize_anchor;
                self.resize(key, v, self.length_y, anchor, ctx, warnings)?;
                Ok(anchor)
            }
            PropertyKey::DimensionY => {
                let v = value.as_number(&name)?;
                let anchor = ctx.config.resize_anchor;
                self.resize(key, self.length_x, v, anchor, ctx, warnings)?;
                Ok(anchor)
            }
            PropertyKey::DimensionZ => {
                if self.is_rack() {
                    return Err(LayoutError::invalid(
                        name,
                        "rack height is derived from its levels",
                    ));
                }
                let v = value.as_number(&name)?;
                let (v, warning) = self.range_z.validate(&name, v)?;
                warnings.extend(warning);
                self.length_z = v;
                Ok(Anchor::Center)
            }
            PropertyKey::Name => {
                self.name = value.as_text(&name)?.to_string();
                Ok(Anchor::Center)
            }
            PropertyKey::Text => {
                self.text = value.as_text(&name)?.to_string();
                Ok(Anchor::Center)
            }
            PropertyKey::FillColor => {
                self.fill_color = parse_color(&name, value)?;
                Ok(Anchor::Center)
            }
            PropertyKey::ShutterSwingDoor => {
                let kind = self.kind();
                match &mut self.body {
                    Body::Shutter(shutter) => {
                        shutter.swing_door = value.as_bool(&name)?;
                        Ok(Anchor::Center)
                    }
                    _ => Err(LayoutError::UnsupportedProperty { key: name, kind }),
                }
            }
            _ if key.is_rack_key() => {
                let kind = self.kind();
                let Some(rack) = self.rack_mut() else {
                    return Err(LayoutError::UnsupportedProperty { key: name, kind });
                };
                rack.apply(key, value, ctx, warnings)?;
                let requested = match key {
                    PropertyKey::RackColumn => rack.selected_column().map(str::to_string),
                    _ => None,
                };
                cascade::recompute(self, ctx, warnings)?;
                if let Some(requested) = requested {
                    self.ensure_column(&requested)?;
                }
                Ok(Anchor::Center)
            }
            _ => Err(LayoutError::UnsupportedProperty {
                key: name,
                kind: self.kind(),
            }),
        }
    }

    /// An explicit column choice must not be silently replaced
    fn ensure_column(&self, requested: &str) -> Result<(), LayoutError> {
        let used = self
            .rack()
            .and_then(|rack| rack.column())
            .map(|column| column.name.as_str());
        if used == Some(requested) {
            return Ok(());
        }
        Err(LayoutError::bounds(
            PropertyKey::RackColumn.to_string(),
            format!(
                "column '{}' is weaker than the required '{}'",
                requested,
                used.unwrap_or("?")
            ),
        ))
    }

    /// Resize to `length_x` x `length_y`, keeping `pivot` in place
    fn resize(
        &mut self,
        key: &PropertyKey,
        length_x: f64,
        length_y: f64,
        pivot: Anchor,
        ctx: &EditContext<'_>,
        warnings: &mut Vec<LayoutWarning>,
    ) -> Result<(), LayoutError> {
        let fixed = self.anchor_point(pivot);
        if self.is_rack() {
            self.resize_rack(length_x, length_y, ctx, warnings)?;
        } else {
            let (length_x, warning_x) = self.range_x.validate(&axis_subject(key, Axis::X), length_x)?;
            let (length_y, warning_y) = self.range_y.validate(&axis_subject(key, Axis::Y), length_y)?;
            warnings.extend(warning_x);
            warnings.extend(warning_y);
            self.length_x = length_x;
            self.length_y = length_y;
        }
        self.pin_anchor(pivot, fixed);
        Ok(())
    }

    /// Push requested rack lengths back into the pallets, then re-derive
    fn resize_rack(
        &mut self,
        length_x: f64,
        length_y: f64,
        ctx: &EditContext<'_>,
        warnings: &mut Vec<LayoutWarning>,
    ) -> Result<(), LayoutError> {
        let rules = &ctx.config.rack;
        let length_axis = self.length_axis();
        let requested = |axis: Axis| match axis {
            Axis::X => whole(length_x),
            _ => whole(length_y),
        };
        let new_length = requested(length_axis);
        let new_depth = requested(length_axis.other());
        let length_changed = !approx_eq(new_length, self.length_along(length_axis));
        let depth_changed = !approx_eq(new_depth, self.length_along(length_axis.other()));

        if let Some(rack) = self.rack_mut() {
            if depth_changed {
                let width = new_depth + rules.frame_depth_reduction;
                if new_depth <= 0.0 || width > rules.max_pallet_dimension {
                    return Err(LayoutError::out_of_range(
                        "rack depth",
                        new_depth,
                        rules.depth_range.0,
                        rules.depth_range.1,
                    ));
                }
                rack.fit_pallet_width(width)?;
            }
            if length_changed {
                let column_length = rack.column().map_or(0.0, |c| c.length);
                let uprights = if rack.is_first_in_row_column() { 2.0 } else { 1.0 };
                rack.fit_clear_length(new_length - uprights * column_length, rules.pallet_gap)?;
            }
        }
        cascade::recompute(self, ctx, warnings)?;

        let actual = self.length_along(length_axis);
        if length_changed && !approx_eq(actual, new_length) {
            warnings.push(LayoutWarning::StepViolation {
                subject: "rack length".to_string(),
                value: new_length,
                step: rules.clear_length_step,
                corrected: actual,
            });
        }
        Ok(())
    }

    /// Whether this rack still holds its place in the row `before` stood in.
    /// Sliding along the row line at the same length leaves the row, and so
    /// does any move off the line.
    pub(crate) fn keeps_row_of(&self, before: &Rectangle) -> bool {
        if !self.is_rack() || !before.is_rack() || self.is_horizontal != before.is_horizontal {
            return false;
        }
        let axis = self.length_axis();
        let depth = axis.other();
        if !approx_eq(self.top_left.along(depth), before.top_left.along(depth)) {
            return false;
        }
        approx_eq(self.top_left.along(axis), before.top_left.along(axis))
            || !approx_eq(self.length_along(axis), before.length_along(axis))
    }

    /// Row members the editor re-lays and validates after the edit: the
    /// live row while the rack keeps it, otherwise the racks it touches
    /// where it now stands
    fn row_neighbours(&self, ctx: &EditContext<'_>) -> Vec<RectId> {
        if !self.is_rack() {
            return Vec::new();
        }
        let sheet = ctx.sheet;
        let row = match sheet.get(self.id) {
            Some(live) if self.keeps_row_of(live) => sheet.rack_group(live),
            _ => sheet.row_at(self),
        };
        row.into_iter().filter(|id| *id != self.id).collect()
    }

    /// Boundary check, then the layout check or the solver
    pub(crate) fn validate_placement(
        &mut self,
        anchor: Anchor,
        validate_layout: bool,
        ctx: &EditContext<'_>,
    ) -> Result<(), LayoutError> {
        if !self.is_init {
            return Ok(());
        }
        let sheet = ctx.sheet;
        if !within_sheet(self, sheet.bounds(), sheet.margin_rules()) {
            return Err(LayoutError::bounds(
                self.label(),
                format!("{} x {} at {} leaves the sheet", self.length_x, self.length_y, self.top_left),
            ));
        }
        if !validate_layout {
            return Ok(());
        }
        let ignore = self.row_neighbours(ctx);
        if ctx.config.solver.auto_reposition {
            let iterations = solver::settle(self, anchor, sheet, &ignore, ctx.config.solver.max_iterations)?;
            if iterations > 0 {
                debug!("{} settled after {} iterations", self.id(), iterations);
            }
            return Ok(());
        }
        let check = sheet.is_layout_correct(self, &ignore);
        if check.is_ok() {
            Ok(())
        } else {
            Err(LayoutError::conflict(self.id(), check.overlapping, 0))
        }
    }
}
