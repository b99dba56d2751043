//! The sheet: the document a rectangle lives on
//!
//! [`Sheet`] is the narrow interface the engine needs from the host
//! document. [`Drawing`] is a complete in-memory implementation.

use std::collections::BTreeMap;

use tracing::debug;

use crate::layout::config::{EngineConfig, MarginRules};
use crate::layout::margin::{overlaps, within_sheet};
use crate::layout::types::{approx_eq, Axis};
use crate::model::{PalletConfiguration, RectId, Rectangle};

/// Result of validating a candidate against a sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutCheck {
    /// Candidate leaves the sheet (with its own margin)
    pub out_of_bounds: bool,
    /// Neighbours the candidate overlaps
    pub overlapping: Vec<RectId>,
}

impl LayoutCheck {
    pub fn is_ok(&self) -> bool {
        !self.out_of_bounds && self.overlapping.is_empty()
    }
}

pub trait Sheet {
    /// Sheet length (X) and width (Y)
    fn bounds(&self) -> (f64, f64);

    fn margin_rules(&self) -> &MarginRules;

    fn rectangles(&self) -> Box<dyn Iterator<Item = &Rectangle> + '_>;

    /// Insert or overwrite by id, returning the previous value
    fn replace(&mut self, rect: Rectangle) -> Option<Rectangle>;

    fn remove(&mut self, id: RectId) -> Option<Rectangle>;

    /// A size index no rack on the sheet uses yet
    fn allocate_size_index(&mut self) -> u32;

    /// Called once per property edit, whatever the outcome
    fn notify_property_changed(&mut self, id: RectId, key: &str, success: bool, error: Option<&str>);

    fn get(&self, id: RectId) -> Option<&Rectangle> {
        self.rectangles().find(|r| r.id() == id)
    }

    /// Height under the roof available to racks
    fn roof_clearance(&self) -> Option<f64> {
        None
    }

    fn pallet_configuration(&self, _name: &str) -> Option<PalletConfiguration> {
        None
    }

    /// Check `candidate` against the sheet boundary and every placed
    /// rectangle other than itself and `ignore`
    fn is_layout_correct(&self, candidate: &Rectangle, ignore: &[RectId]) -> LayoutCheck {
        if !candidate.is_init() {
            return LayoutCheck::default();
        }
        let rules = self.margin_rules();
        let out_of_bounds = !within_sheet(candidate, self.bounds(), rules);
        let overlapping = self
            .rectangles()
            .filter(|other| {
                other.id() != candidate.id() && other.is_init() && !ignore.contains(&other.id())
            })
            .filter(|other| overlaps(candidate, other, rules))
            .map(Rectangle::id)
            .collect();
        LayoutCheck {
            out_of_bounds,
            overlapping,
        }
    }

    /// Racks forming a row with `rack`, ordered along the row
    ///
    /// Members share orientation and depth-axis position and touch end to
    /// end. The live geometry is used when `rack` is on the sheet.
    fn rack_group(&self, rack: &Rectangle) -> Vec<RectId> {
        self.row_at(self.get(rack.id()).unwrap_or(rack))
    }

    /// The row `seed` forms at its given position. Its stored copy, if
    /// any, takes no part.
    fn row_at(&self, seed: &Rectangle) -> Vec<RectId> {
        if !seed.is_rack() {
            return Vec::new();
        }
        let axis = seed.length_axis();
        let depth = axis.other();
        let row: Vec<&Rectangle> = self
            .rectangles()
            .filter(|r| {
                r.is_rack()
                    && r.is_init()
                    && r.id() != seed.id()
                    && r.is_horizontal() == seed.is_horizontal()
                    && approx_eq(r.top_left().along(depth), seed.top_left().along(depth))
            })
            .collect();

        let mut members = vec![seed];
        loop {
            let before = members.len();
            for candidate in &row {
                let joined = members.iter().any(|m| m.id() == candidate.id());
                if !joined && members.iter().any(|m| touches(m, candidate, axis)) {
                    members.push(*candidate);
                }
            }
            if members.len() == before {
                break;
            }
        }
        members.sort_by(|a, b| a.top_left().along(axis).total_cmp(&b.top_left().along(axis)));
        members.iter().map(|m| m.id()).collect()
    }

    /// Racks sharing `rack`'s size index
    fn size_siblings(&self, rack: &Rectangle) -> Vec<RectId> {
        let Some(index) = rack.rack().map(|r| r.size_index()).filter(|i| *i != 0) else {
            return Vec::new();
        };
        self.rectangles()
            .filter(|r| r.id() != rack.id() && r.rack().is_some_and(|data| data.size_index() == index))
            .map(Rectangle::id)
            .collect()
    }
}

fn touches(a: &Rectangle, b: &Rectangle, axis: Axis) -> bool {
    let a_start = a.top_left().along(axis);
    let b_start = b.top_left().along(axis);
    approx_eq(a_start + a.length_along(axis), b_start)
        || approx_eq(b_start + b.length_along(axis), a_start)
}

/// One entry of the property change log
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub id: RectId,
    pub key: String,
    pub success: bool,
    pub error: Option<String>,
}

/// In-memory sheet
#[derive(Debug, Clone)]
pub struct Drawing {
    length: f64,
    width: f64,
    margins: MarginRules,
    roof_clearance: Option<f64>,
    pallet_configurations: Vec<PalletConfiguration>,
    rectangles: BTreeMap<RectId, Rectangle>,
    next_id: u64,
    next_size_index: u32,
    changes: Vec<PropertyChange>,
}

impl Drawing {
    pub fn new(length: f64, width: f64) -> Self {
        Self {
            length,
            width,
            margins: MarginRules::default(),
            roof_clearance: None,
            pallet_configurations: Vec::new(),
            rectangles: BTreeMap::new(),
            next_id: 1,
            next_size_index: 1,
            changes: Vec::new(),
        }
    }

    /// A drawing using the margins of `config`
    pub fn from_config(length: f64, width: f64, config: &EngineConfig) -> Self {
        Self::new(length, width).with_margins(config.margins.clone())
    }

    pub fn with_margins(mut self, margins: MarginRules) -> Self {
        self.margins = margins;
        self
    }

    pub fn with_roof_clearance(mut self, height: f64) -> Self {
        self.roof_clearance = Some(height);
        self
    }

    pub fn with_pallet_configuration(mut self, configuration: PalletConfiguration) -> Self {
        self.pallet_configurations.push(configuration);
        self
    }

    /// Redefine a pallet configuration; bound pallets pick it up on their
    /// next recompute
    pub fn define_pallet_configuration(&mut self, configuration: PalletConfiguration) {
        match self
            .pallet_configurations
            .iter_mut()
            .find(|c| c.name == configuration.name)
        {
            Some(existing) => *existing = configuration,
            None => self.pallet_configurations.push(configuration),
        }
    }

    /// A fresh id for a new rectangle
    pub fn next_id(&mut self) -> RectId {
        let id = RectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Place a rectangle as-is, without validation
    pub fn push(&mut self, mut rect: Rectangle) -> RectId {
        rect.mark_placed();
        let id = rect.id();
        self.replace(rect);
        id
    }

    pub fn len(&self) -> usize {
        self.rectangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rectangles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rectangle> {
        self.rectangles.values()
    }

    /// Every property edit seen so far, oldest first
    pub fn changes(&self) -> &[PropertyChange] {
        &self.changes
    }
}

impl Sheet for Drawing {
    fn bounds(&self) -> (f64, f64) {
        (self.length, self.width)
    }

    fn margin_rules(&self) -> &MarginRules {
        &self.margins
    }

    fn rectangles(&self) -> Box<dyn Iterator<Item = &Rectangle> + '_> {
        Box::new(self.rectangles.values())
    }

    fn get(&self, id: RectId) -> Option<&Rectangle> {
        self.rectangles.get(&id)
    }

    fn replace(&mut self, rect: Rectangle) -> Option<Rectangle> {
        self.next_id = self.next_id.max(rect.id().0 + 1);
        if let Some(index) = rect.rack().map(|r| r.size_index()) {
            self.next_size_index = self.next_size_index.max(index + 1);
        }
        self.rectangles.insert(rect.id(), rect)
    }

    fn remove(&mut self, id: RectId) -> Option<Rectangle> {
        self.rectangles.remove(&id)
    }

    fn allocate_size_index(&mut self) -> u32 {
        let index = self.next_size_index;
        self.next_size_index += 1;
        index
    }

    fn notify_property_changed(&mut self, id: RectId, key: &str, success: bool, error: Option<&str>) {
        debug!(
            "{} {} {}{}",
            id,
            key,
            if success { "committed" } else { "rejected" },
            error.map(|e| format!(": {}", e)).unwrap_or_default()
        );
        self.changes.push(PropertyChange {
            id,
            key: key.to_string(),
            success,
            error: error.map(str::to_string),
        });
    }

    fn roof_clearance(&self) -> Option<f64> {
        self.roof_clearance
    }

    fn pallet_configuration(&self, name: &str) -> Option<PalletConfiguration> {
        self.pallet_configurations.iter().find(|c| c.name == name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::config::RackRules;
    use crate::model::{Pallet, Rack};

    fn rack(id: u64, x: f64, y: f64, length: f64) -> Rectangle {
        let rack = Rack::uniform(2, 1, Pallet::new(1000.0, 1000.0, 1000.0, 500.0));
        Rectangle::new_rack(RectId(id), rack, &RackRules::default())
            .at(x, y)
            .with_size(length, 900.0)
    }

    #[test]
    fn test_layout_check_reports_overlaps() {
        let mut drawing = Drawing::new(10000.0, 10000.0)
            .with_margins(MarginRules::default().with_rack_back_to_back(0.0));
        drawing.push(rack(1, 0.0, 0.0, 1000.0));
        drawing.push(rack(2, 2000.0, 0.0, 1000.0));

        let mut candidate = rack(3, 500.0, 0.0, 1000.0);
        candidate.mark_placed();
        let check = drawing.is_layout_correct(&candidate, &[]);
        assert_eq!(check.overlapping, vec![RectId(1)]);
        assert!(!check.out_of_bounds);

        let check = drawing.is_layout_correct(&candidate, &[RectId(1)]);
        assert!(check.is_ok());
    }

    #[test]
    fn test_unplaced_candidate_is_always_correct() {
        let mut drawing = Drawing::new(1000.0, 1000.0);
        drawing.push(rack(1, 0.0, 0.0, 1000.0));
        let candidate = rack(2, 0.0, 0.0, 5000.0);
        assert!(drawing.is_layout_correct(&candidate, &[]).is_ok());
    }

    #[test]
    fn test_out_of_bounds() {
        let drawing = Drawing::new(1000.0, 1000.0);
        let mut candidate = rack(1, 500.0, 0.0, 1000.0);
        candidate.mark_placed();
        let check = drawing.is_layout_correct(&candidate, &[]);
        assert!(check.out_of_bounds);
        assert!(!check.is_ok());
    }

    #[test]
    fn test_rack_group_chains_touching_racks() {
        let mut drawing = Drawing::new(20000.0, 20000.0);
        drawing.push(rack(3, 2000.0, 0.0, 1000.0));
        drawing.push(rack(1, 0.0, 0.0, 1000.0));
        drawing.push(rack(2, 1000.0, 0.0, 1000.0));
        drawing.push(rack(4, 3500.0, 0.0, 1000.0));
        drawing.push(rack(5, 3000.0, 5000.0, 1000.0));

        let seed = drawing.get(RectId(3)).unwrap().clone();
        assert_eq!(drawing.rack_group(&seed), vec![RectId(1), RectId(2), RectId(3)]);

        let lonely = drawing.get(RectId(4)).unwrap().clone();
        assert_eq!(drawing.rack_group(&lonely), vec![RectId(4)]);
    }

    #[test]
    fn test_size_siblings_share_index() {
        let mut drawing = Drawing::new(20000.0, 20000.0);
        let shared = Rack::uniform(2, 1, Pallet::default()).with_size_index(7);
        drawing.push(Rectangle::new_rack(RectId(1), shared.clone(), &RackRules::default()));
        drawing.push(Rectangle::new_rack(RectId(2), shared, &RackRules::default()));
        drawing.push(rack(3, 0.0, 0.0, 1000.0));

        let first = drawing.get(RectId(1)).unwrap().clone();
        assert_eq!(drawing.size_siblings(&first), vec![RectId(2)]);
        let other = drawing.get(RectId(3)).unwrap().clone();
        assert!(drawing.size_siblings(&other).is_empty());
        assert_eq!(drawing.allocate_size_index(), 8);
    }

    #[test]
    fn test_notifications_are_logged() {
        let mut drawing = Drawing::new(1000.0, 1000.0);
        drawing.notify_property_changed(RectId(1), "NAME", true, None);
        drawing.notify_property_changed(RectId(1), "DIMENSION_X", false, Some("too big"));
        assert_eq!(drawing.changes().len(), 2);
        assert_eq!(drawing.changes()[1].error.as_deref(), Some("too big"));
    }
}
