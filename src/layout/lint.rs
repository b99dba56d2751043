//! Sheet-wide consistency checks.
//!
//! The editor keeps every committed state valid on its own; this pass is
//! for sheets assembled by hand or loaded from elsewhere. It reports
//! overlapping pairs, rectangles leaving the sheet, lengths off their
//! range or step, and rack rows whose members disagree on shared data.

use std::collections::BTreeSet;
use std::fmt;

use super::margin::{overlaps, within_sheet};
use super::types::Axis;
use crate::model::{RectId, Rectangle};
use crate::sheet::Sheet;

/// A lint warning about a sheet defect
#[derive(Debug)]
pub struct LintWarning {
    pub category: LintCategory,
    pub message: String,
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

/// Category of lint defect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintCategory {
    Overlap,
    Bounds,
    Step,
    Group,
}

impl fmt::Display for LintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintCategory::Overlap => write!(f, "overlap"),
            LintCategory::Bounds => write!(f, "bounds"),
            LintCategory::Step => write!(f, "step"),
            LintCategory::Group => write!(f, "group"),
        }
    }
}

/// Run all lint checks over the placed rectangles of a sheet.
pub fn check(sheet: &dyn Sheet) -> Vec<LintWarning> {
    let placed: Vec<&Rectangle> = sheet.rectangles().filter(|r| r.is_init()).collect();
    let mut warnings = Vec::new();
    check_overlaps(sheet, &placed, &mut warnings);
    check_bounds(sheet, &placed, &mut warnings);
    check_steps(&placed, &mut warnings);
    check_rows(sheet, &placed, &mut warnings);
    warnings
}

fn check_overlaps(sheet: &dyn Sheet, placed: &[&Rectangle], warnings: &mut Vec<LintWarning>) {
    let rules = sheet.margin_rules();
    for (i, a) in placed.iter().enumerate() {
        for b in &placed[i + 1..] {
            if overlaps(a, b, rules) {
                warnings.push(LintWarning {
                    category: LintCategory::Overlap,
                    message: format!("{} {} overlaps {} {}", a.kind(), a.label(), b.kind(), b.label()),
                });
            }
        }
    }
}

fn check_bounds(sheet: &dyn Sheet, placed: &[&Rectangle], warnings: &mut Vec<LintWarning>) {
    let (length, width) = sheet.bounds();
    for rect in placed {
        if !within_sheet(rect, (length, width), sheet.margin_rules()) {
            let bounds = rect.bounds();
            warnings.push(LintWarning {
                category: LintCategory::Bounds,
                message: format!(
                    "{} {} at {} ({} x {}) leaves the {} x {} sheet",
                    rect.kind(),
                    rect.label(),
                    rect.top_left(),
                    bounds.width,
                    bounds.height,
                    length,
                    width
                ),
            });
        }
    }
}

fn check_steps(placed: &[&Rectangle], warnings: &mut Vec<LintWarning>) {
    for rect in placed {
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let range = rect.range_along(axis);
            let length = rect.length_along(axis);
            let message = if !range.contains(length) {
                format!(
                    "{} length {} = {} is outside [{}, {}]",
                    rect.label(),
                    axis,
                    length,
                    range.min,
                    range.max
                )
            } else if !range.is_on_step(length) {
                format!(
                    "{} length {} = {} is off the {} step from {}",
                    rect.label(),
                    axis,
                    length,
                    range.step,
                    range.min
                )
            } else {
                continue;
            };
            warnings.push(LintWarning {
                category: LintCategory::Step,
                message,
            });
        }
    }
}

fn row_label(row: &[RectId]) -> String {
    row.iter().map(RectId::to_string).collect::<Vec<_>>().join(", ")
}

/// Members of a row share one column profile and only the first owns
/// both uprights
fn check_rows(sheet: &dyn Sheet, placed: &[&Rectangle], warnings: &mut Vec<LintWarning>) {
    let mut seen = BTreeSet::new();
    for rect in placed.iter().filter(|r| r.is_rack()) {
        if seen.contains(&rect.id()) {
            continue;
        }
        let row = sheet.rack_group(rect);
        seen.extend(row.iter().copied());
        if row.len() < 2 {
            continue;
        }

        let members: Vec<&Rectangle> = row.iter().filter_map(|id| sheet.get(*id)).collect();
        let columns: BTreeSet<&str> = members
            .iter()
            .filter_map(|m| m.rack().and_then(|r| r.column()))
            .map(|c| c.name.as_str())
            .collect();
        if columns.len() > 1 {
            let names: Vec<&str> = columns.into_iter().collect();
            warnings.push(LintWarning {
                category: LintCategory::Group,
                message: format!("row {} mixes columns {}", row_label(&row), names.join(", ")),
            });
        }

        for (position, member) in members.iter().enumerate() {
            let Some(rack) = member.rack() else {
                continue;
            };
            if rack.is_first_in_row_column() != (position == 0) {
                let role = if position == 0 { "lead" } else { "follower" };
                warnings.push(LintWarning {
                    category: LintCategory::Group,
                    message: format!(
                        "{} is the {} of row {} but {} both uprights",
                        member.label(),
                        role,
                        row_label(&row),
                        if rack.is_first_in_row_column() { "owns" } else { "does not own" }
                    ),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, TableCatalog};
    use crate::layout::config::RackRules;
    use crate::model::{Pallet, Rack};
    use crate::sheet::Drawing;

    fn render(warnings: &[LintWarning]) -> String {
        warnings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn rack(id: u64, x: f64, first: bool, column: &str) -> Rectangle {
        let catalog = TableCatalog::default();
        let mut rect = Rectangle::new_rack(
            RectId(id),
            Rack::uniform(2, 1, Pallet::new(1000.0, 1000.0, 1000.0, 500.0)),
            &RackRules::default(),
        )
        .at(x, 0.0)
        .with_size(1000.0, 900.0)
        .with_height(2300.0);
        if let Some(data) = rect.rack_mut() {
            let column = catalog.column_by_name(column).unwrap();
            data.set_column(column.clone(), column);
            data.set_first_in_row(first);
        }
        rect
    }

    #[test]
    fn test_clean_sheet_has_no_warnings() {
        let mut drawing = Drawing::new(10000.0, 10000.0);
        drawing.push(rack(1, 0.0, true, "C80/1.5"));
        drawing.push(rack(2, 1000.0, false, "C80/1.5"));
        drawing.push(Rectangle::block(RectId(3)).at(5000.0, 5000.0).with_size(1000.0, 1000.0));
        assert!(check(&drawing).is_empty());
    }

    #[test]
    fn test_overlap_detected() {
        let mut drawing = Drawing::new(10000.0, 10000.0);
        drawing.push(Rectangle::block(RectId(1)).at(0.0, 0.0).with_size(1000.0, 1000.0));
        drawing.push(
            Rectangle::block(RectId(2))
                .with_name("pillar")
                .at(500.0, 500.0)
                .with_size(1000.0, 1000.0),
        );
        insta::assert_snapshot!(render(&check(&drawing)), @r#"[overlap] block #1 overlaps block "pillar""#);
    }

    #[test]
    fn test_unplaced_rectangles_are_skipped() {
        let mut drawing = Drawing::new(1000.0, 1000.0);
        drawing.push(Rectangle::block(RectId(1)).with_size(1000.0, 1000.0));
        drawing.replace(Rectangle::block(RectId(2)).with_size(5000.0, 1000.0));
        assert!(check(&drawing).is_empty());
    }

    #[test]
    fn test_bounds_and_steps() {
        let mut drawing = Drawing::new(2000.0, 2000.0);
        drawing.push(Rectangle::block(RectId(1)).at(1500.0, 0.0).with_size(1005.0, 1000.0));
        insta::assert_snapshot!(render(&check(&drawing)), @r"
        [bounds] block #1 at (1500, 0) (1005 x 1000) leaves the 2000 x 2000 sheet
        [step] #1 length X = 1005 is off the 10 step from 10
        ");
    }

    #[test]
    fn test_row_with_mixed_columns() {
        let mut drawing = Drawing::new(10000.0, 10000.0);
        drawing.push(rack(1, 0.0, true, "C80/1.5"));
        drawing.push(rack(2, 1000.0, true, "C100/2.0"));
        let warnings = check(&drawing);
        assert!(warnings.iter().all(|w| w.category == LintCategory::Group));
        insta::assert_snapshot!(render(&warnings), @r"
        [group] row #1, #2 mixes columns C100/2.0, C80/1.5
        [group] #2 is the follower of row #1, #2 but owns both uprights
        ");
    }
}
