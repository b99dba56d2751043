//! Transactional editing
//!
//! [`Editor`] is the entry point for every change to a sheet. Each
//! operation edits a clone, writes it and any affected row members through
//! a [`Transaction`], validates the result and either commits or restores
//! every touched rectangle.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::cascade;
use crate::catalog::Catalog;
use crate::decision::{Decision, GroupAnswer};
use crate::layout::config::EngineConfig;
use crate::layout::error::{LayoutError, LayoutWarning};
use crate::layout::margin::within_sheet;
use crate::layout::types::{approx_eq, Anchor};
use crate::model::{RectId, Rectangle};
use crate::property::{PropertyKey, Value};
use crate::sheet::Sheet;

/// Read-only inputs of an edit
#[derive(Clone, Copy)]
pub struct EditContext<'a> {
    pub config: &'a EngineConfig,
    pub catalog: &'a dyn Catalog,
    pub sheet: &'a dyn Sheet,
}

/// Outcome of a committed edit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditReport {
    /// Update counter of the edited rectangle after the edit
    pub update_counter: u64,
    pub warnings: Vec<LayoutWarning>,
    /// Size siblings dropped because the change did not fit them
    pub removed: Vec<RectId>,
    /// Every rectangle written, including re-laid row members
    pub touched: Vec<RectId>,
}

/// Records the original of every rectangle it writes or removes
#[derive(Debug, Default)]
pub struct Transaction {
    saved: Vec<(RectId, Option<Rectangle>)>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    fn save(&mut self, id: RectId, previous: Option<Rectangle>) {
        if !self.has_written(id) {
            self.saved.push((id, previous));
        }
    }

    pub fn put(&mut self, sheet: &mut dyn Sheet, rect: Rectangle) {
        let id = rect.id();
        let previous = sheet.replace(rect);
        self.save(id, previous);
    }

    pub fn take(&mut self, sheet: &mut dyn Sheet, id: RectId) -> Option<Rectangle> {
        let previous = sheet.remove(id);
        if let Some(rect) = &previous {
            self.save(id, Some(rect.clone()));
        }
        previous
    }

    pub fn has_written(&self, id: RectId) -> bool {
        self.saved.iter().any(|(saved, _)| *saved == id)
    }

    pub fn touched(&self) -> Vec<RectId> {
        self.saved.iter().map(|(id, _)| *id).collect()
    }

    /// Put every original back, newest first
    pub fn rollback(self, sheet: &mut dyn Sheet) {
        for (id, previous) in self.saved.into_iter().rev() {
            match previous {
                Some(rect) => {
                    sheet.replace(rect);
                }
                None => {
                    sheet.remove(id);
                }
            }
        }
    }

    pub fn commit(self) -> Vec<RectId> {
        self.touched()
    }
}

/// Applies edits to sheets
pub struct Editor<'a> {
    config: &'a EngineConfig,
    catalog: &'a dyn Catalog,
}

impl<'a> Editor<'a> {
    pub fn new(config: &'a EngineConfig, catalog: &'a dyn Catalog) -> Self {
        Self { config, catalog }
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    pub fn context<'s>(&'s self, sheet: &'s dyn Sheet) -> EditContext<'s> {
        EditContext {
            config: self.config,
            catalog: self.catalog,
            sheet,
        }
    }

    /// Set a property by its wire name
    ///
    /// The sheet is notified of the outcome either way. On failure the sheet
    /// is exactly as it was before the call.
    pub fn set_property(
        &self,
        sheet: &mut dyn Sheet,
        decision: &mut dyn Decision,
        id: RectId,
        key: &str,
        value: impl Into<Value>,
        validate_layout: bool,
    ) -> Result<EditReport, LayoutError> {
        let result = self.try_set_property(sheet, decision, id, key, value.into(), validate_layout);
        let error = result.as_ref().err().map(ToString::to_string);
        sheet.notify_property_changed(id, key, result.is_ok(), error.as_deref());
        result
    }

    fn try_set_property(
        &self,
        sheet: &mut dyn Sheet,
        decision: &mut dyn Decision,
        id: RectId,
        key: &str,
        value: Value,
        validate_layout: bool,
    ) -> Result<EditReport, LayoutError> {
        let key: PropertyKey = key.parse()?;
        let original = sheet.get(id).cloned().ok_or(LayoutError::NotFound { id })?;
        let mut candidate = original.clone();
        let mut warnings =
            candidate.set_property(&key, &value, validate_layout, &self.context(&*sheet))?;

        let mut previous = rows_before(&*sheet, &original, &candidate);
        let mut sibling_results = Vec::new();
        let siblings = if candidate.is_rack() && key.affects_size() {
            sheet.size_siblings(&original)
        } else {
            Vec::new()
        };
        if !siblings.is_empty() {
            match decision.ask_apply_to_group(&original, &siblings) {
                GroupAnswer::Cancel => return Err(LayoutError::Cancelled),
                GroupAnswer::No => {
                    let index = sheet.allocate_size_index();
                    if let Some(rack) = candidate.rack_mut() {
                        rack.set_size_index(index);
                    }
                }
                GroupAnswer::Yes => {
                    let ctx = self.context(&*sheet);
                    for sibling_id in &siblings {
                        let Some(sibling) = sheet.get(*sibling_id) else {
                            continue;
                        };
                        let mut edited = sibling.clone();
                        let outcome = edited.set_property(&key, &value, validate_layout, &ctx);
                        // a sibling that fails leaves its row as on removal
                        let rows = match &outcome {
                            Ok(_) => rows_before(&*sheet, sibling, &edited),
                            Err(_) => split_row(&*sheet, sibling),
                        };
                        sibling_results.push((*sibling_id, rows, outcome.map(|w| (edited, w))));
                    }
                }
            }
        }

        let mut txn = Transaction::new();
        let mut removed = Vec::new();
        for (sibling_id, rows, outcome) in sibling_results {
            match outcome {
                Ok((edited, sibling_warnings)) => {
                    warnings.extend(sibling_warnings);
                    txn.put(sheet, edited);
                }
                Err(err) => {
                    warn!("{} dropped from size group {}: {}", sibling_id, id, err);
                    txn.take(sheet, sibling_id);
                    removed.push(sibling_id);
                }
            }
            previous.extend(rows);
        }
        txn.put(sheet, candidate);

        self.finish(sheet, txn, id, previous, validate_layout, warnings, removed)
    }

    /// Rotate a rectangle by 90 degrees
    pub fn rotate(
        &self,
        sheet: &mut dyn Sheet,
        id: RectId,
        validate_layout: bool,
    ) -> Result<EditReport, LayoutError> {
        let result = self.try_rotate(sheet, id, validate_layout);
        let error = result.as_ref().err().map(ToString::to_string);
        sheet.notify_property_changed(id, "ROTATE", result.is_ok(), error.as_deref());
        result
    }

    fn try_rotate(
        &self,
        sheet: &mut dyn Sheet,
        id: RectId,
        validate_layout: bool,
    ) -> Result<EditReport, LayoutError> {
        let original = sheet.get(id).cloned().ok_or(LayoutError::NotFound { id })?;
        let mut candidate = original.clone();
        candidate.rotate(validate_layout, &self.context(&*sheet))?;

        let previous = rows_before(&*sheet, &original, &candidate);
        let mut txn = Transaction::new();
        txn.put(sheet, candidate);
        self.finish(sheet, txn, id, previous, validate_layout, Vec::new(), Vec::new())
    }

    /// Place a new rectangle. Racks are sized from their pallets first.
    pub fn insert(
        &self,
        sheet: &mut dyn Sheet,
        rect: Rectangle,
        validate_layout: bool,
    ) -> Result<EditReport, LayoutError> {
        let id = rect.id();
        if sheet.get(id).is_some() {
            return Err(LayoutError::invalid("ID", format!("{} is already on the sheet", id)));
        }
        let mut rect = rect;
        rect.mark_placed();
        let mut warnings = Vec::new();
        {
            let ctx = self.context(&*sheet);
            cascade::recompute(&mut rect, &ctx, &mut warnings)?;
            rect.validate_placement(Anchor::Center, validate_layout, &ctx)?;
        }
        let mut txn = Transaction::new();
        txn.put(sheet, rect);
        self.finish(sheet, txn, id, vec![vec![id]], validate_layout, warnings, Vec::new())
    }

    /// Remove a rectangle. What is left of its row falls apart into the
    /// pieces that still touch, each re-laid as a row of its own.
    pub fn remove(&self, sheet: &mut dyn Sheet, id: RectId) -> Result<EditReport, LayoutError> {
        let original = sheet.get(id).cloned().ok_or(LayoutError::NotFound { id })?;
        let previous = split_row(&*sheet, &original);
        let mut txn = Transaction::new();
        txn.take(sheet, id);
        let mut report = self.finish(sheet, txn, id, previous, true, Vec::new(), Vec::new())?;
        report.removed.push(id);
        Ok(report)
    }

    /// Re-lay the rows the edit touched, validate, then commit or roll back
    ///
    /// `previous` holds rows as they were before the edit.
    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        sheet: &mut dyn Sheet,
        mut txn: Transaction,
        id: RectId,
        previous: Vec<Vec<RectId>>,
        validate_layout: bool,
        mut warnings: Vec<LayoutWarning>,
        removed: Vec<RectId>,
    ) -> Result<EditReport, LayoutError> {
        if let Err(err) = self.regroup(sheet, &mut txn, &previous, validate_layout, &mut warnings) {
            warn!("edit of {} rolled back: {}", id, err);
            txn.rollback(sheet);
            return Err(err);
        }
        let update_counter = sheet.get(id).map_or(0, Rectangle::update_counter);
        let touched = txn.commit();
        debug!("edit of {} committed, {} rectangles touched", id, touched.len());
        Ok(EditReport {
            update_counter,
            warnings,
            removed,
            touched,
        })
    }

    fn regroup(
        &self,
        sheet: &mut dyn Sheet,
        txn: &mut Transaction,
        previous: &[Vec<RectId>],
        validate_layout: bool,
        warnings: &mut Vec<LayoutWarning>,
    ) -> Result<(), LayoutError> {
        let mut done = HashSet::new();
        let mut rows = Vec::new();
        for seed in previous.iter().flatten() {
            if done.contains(seed) {
                continue;
            }
            let Some(rect) = sheet.get(*seed).filter(|r| r.is_rack()) else {
                continue;
            };
            let row = current_row(&*sheet, rect, previous);
            done.extend(row.iter().copied());

            let patches = cascade::recompute_group(&row, &self.context(&*sheet), warnings)?;
            for patch in patches {
                let Some(mut member) = sheet.get(patch.id).cloned() else {
                    continue;
                };
                if patch.differs_from(&member) {
                    patch.apply_to(&mut member);
                    // rectangles the edit wrote itself are already counted
                    if !txn.has_written(member.id()) {
                        member.bump();
                    }
                    txn.put(sheet, member);
                }
            }
            rows.push(row);
        }

        let rules = sheet.margin_rules();
        for row in &rows {
            for member_id in row {
                let Some(member) = sheet.get(*member_id) else {
                    continue;
                };
                if !within_sheet(member, sheet.bounds(), rules) {
                    return Err(LayoutError::bounds(member.label(), "row leaves the sheet"));
                }
                if !validate_layout {
                    continue;
                }
                let check = sheet.is_layout_correct(member, row);
                if !check.overlapping.is_empty() {
                    return Err(LayoutError::conflict(*member_id, check.overlapping, 0));
                }
            }
        }
        Ok(())
    }
}

/// Rows around `original` before `candidate` replaces it. A rack that
/// keeps its row brings the whole row along; one that leaves it splits
/// the rest like a removal.
fn rows_before(
    sheet: &dyn Sheet,
    original: &Rectangle,
    candidate: &Rectangle,
) -> Vec<Vec<RectId>> {
    if candidate.keeps_row_of(original) {
        return vec![sheet.rack_group(original)];
    }
    let mut rows = split_row(sheet, original);
    rows.push(vec![original.id()]);
    rows
}

/// The other members of `rack`'s row, each as a row of its own
fn split_row(sheet: &dyn Sheet, rack: &Rectangle) -> Vec<Vec<RectId>> {
    sheet
        .rack_group(rack)
        .into_iter()
        .filter(|member| *member != rack.id())
        .map(|member| vec![member])
        .collect()
}

/// The live row of `rack`, joined with the members of its earlier rows
/// that still sit on the same line, ordered along the row
fn current_row(sheet: &dyn Sheet, rack: &Rectangle, previous: &[Vec<RectId>]) -> Vec<RectId> {
    let axis = rack.length_axis();
    let depth = axis.other();
    let mut members: Vec<&Rectangle> = sheet
        .rack_group(rack)
        .iter()
        .filter_map(|id| sheet.get(*id))
        .collect();
    let earlier = previous.iter().filter(|row| row.contains(&rack.id())).flatten();
    for id in earlier {
        let Some(member) = sheet.get(*id) else {
            continue;
        };
        let same_line = member.is_rack()
            && member.is_horizontal() == rack.is_horizontal()
            && approx_eq(member.top_left().along(depth), rack.top_left().along(depth));
        if same_line && !members.iter().any(|m| m.id() == *id) {
            members.push(member);
        }
    }
    members.sort_by(|a, b| a.top_left().along(axis).total_cmp(&b.top_left().along(axis)));
    members.iter().map(|m| m.id()).collect()
}
