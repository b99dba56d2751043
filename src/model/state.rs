//! Rollback snapshots

use super::{Body, Rectangle, SizeRange};
use crate::layout::types::Point;

/// Every mutable field of a [`Rectangle`], captured before an edit
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryState {
    name: String,
    text: String,
    fill_color: u32,
    top_left: Point,
    lengths: (f64, f64, f64),
    ranges: (SizeRange, SizeRange, SizeRange),
    margins: (f64, f64),
    is_horizontal: bool,
    is_init: bool,
    is_selected: bool,
    update_counter: u64,
    body: Body,
}

impl GeometryState {
    pub fn top_left(&self) -> Point {
        self.top_left
    }

    pub fn lengths(&self) -> (f64, f64, f64) {
        self.lengths
    }
}

impl Rectangle {
    pub fn snapshot(&self) -> GeometryState {
        GeometryState {
            name: self.name.clone(),
            text: self.text.clone(),
            fill_color: self.fill_color,
            top_left: self.top_left,
            lengths: (self.length_x, self.length_y, self.length_z),
            ranges: (self.range_x, self.range_y, self.range_z),
            margins: (self.margin_x, self.margin_y),
            is_horizontal: self.is_horizontal,
            is_init: self.is_init,
            is_selected: self.is_selected,
            update_counter: self.update_counter,
            body: self.body.clone(),
        }
    }

    /// Put every field back to the captured values. The id is never touched.
    pub fn restore(&mut self, state: &GeometryState) {
        self.name.clone_from(&state.name);
        self.text.clone_from(&state.text);
        self.fill_color = state.fill_color;
        self.top_left = state.top_left;
        (self.length_x, self.length_y, self.length_z) = state.lengths;
        (self.range_x, self.range_y, self.range_z) = state.ranges;
        (self.margin_x, self.margin_y) = state.margins;
        self.is_horizontal = state.is_horizontal;
        self.is_init = state.is_init;
        self.is_selected = state.is_selected;
        self.update_counter = state.update_counter;
        self.body.clone_from(&state.body);
    }
}
