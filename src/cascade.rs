//! Rack sizing cascade
//!
//! Pallets drive everything else: the widest level sets the clear length
//! between uprights, the level loads pick the beams, the beams and pallet
//! heights set the level pitches, and the frame load picks the upright
//! thickness. Racks in one row share a column profile, so the column is
//! chosen against the strongest requirement of the whole row.

use tracing::debug;

use crate::catalog::{Catalog, RackBeam, RackColumn};
use crate::edit::EditContext;
use crate::layout::config::RackRules;
use crate::layout::error::{CascadeStage, LayoutError, LayoutWarning};
use crate::layout::types::{ceil_to_step, Axis, Point};
use crate::model::{Rack, RectId, Rectangle};
use crate::sheet::Sheet;

/// Everything one rack's pallets demand
#[derive(Debug, Clone, PartialEq)]
pub struct Requirements {
    /// Distance between the uprights
    pub clear_length: f64,
    /// Frame depth
    pub depth: f64,
    /// Free height of each level
    pub level_heights: Vec<f64>,
    /// Beam of each level; `None` on the ground level
    pub beams: Vec<Option<RackBeam>>,
    /// Upright height
    pub column_height: f64,
    /// Upright height or the top of the highest pallets, whichever is taller
    pub height: f64,
    /// Narrowest upright every beam connector fits
    pub min_column_length: f64,
    /// Upright thickness the frame load needs
    pub min_thickness: f64,
}

/// Re-read every bound pallet from the sheet's configuration table
pub fn resolve_configurations(rack: &mut Rack, sheet: &dyn Sheet) -> Result<(), LayoutError> {
    for level in rack.levels_mut() {
        for pallet in &mut level.pallets {
            let Some(name) = pallet.configuration().map(str::to_string) else {
                continue;
            };
            let configuration = sheet.pallet_configuration(&name).ok_or_else(|| {
                LayoutError::cascade(
                    CascadeStage::Pallet,
                    format!("pallet configuration '{}' no longer exists", name),
                )
            })?;
            pallet.resolve(&configuration);
        }
    }
    Ok(())
}

/// Height of the ground slot before rounding
fn ground_slot(rack: &Rack, rules: &RackRules) -> f64 {
    let ground = &rack.levels()[0];
    if rack.has_underpass() {
        rack.underpass()
    } else if rack.is_material_on_ground() && !ground.pallets.is_empty() {
        ground.max_pallet_height() + rules.level_clearance
    } else {
        rules.min_ground_height
    }
}

/// Derive everything the pallets of `rack` demand
pub fn requirements(
    rack: &Rack,
    rules: &RackRules,
    catalog: &dyn Catalog,
) -> Result<Requirements, LayoutError> {
    let levels = rack.levels();
    if levels.len() < rules.min_levels || levels.len() > rules.max_levels {
        return Err(LayoutError::cascade(
            CascadeStage::Level,
            format!(
                "{} levels is outside [{}, {}]",
                levels.len(),
                rules.min_levels,
                rules.max_levels
            ),
        ));
    }
    if let Some(empty) = levels.iter().skip(1).find(|level| level.pallets.is_empty()) {
        return Err(LayoutError::cascade(
            CascadeStage::Level,
            format!("level {} carries no pallets", empty.index()),
        ));
    }

    let clear_length = rack
        .counted_levels()
        .filter(|level| !level.pallets.is_empty())
        .map(|level| ceil_to_step(level.occupied_length(rules.pallet_gap), rules.clear_length_step))
        .fold(0.0, f64::max);
    let depth = rack.max_pallet_width() - rules.frame_depth_reduction;
    let span = clear_length - rules.beam_gap;

    let mut beams = Vec::with_capacity(levels.len());
    beams.push(None);
    for level in levels.iter().skip(1) {
        let load = level.load() / 2.0;
        let beam = catalog.find_beam(span, load).ok_or_else(|| {
            LayoutError::catalog(
                "beam",
                format!("span {} with load {} on level {}", span, load, level.index()),
            )
        })?;
        beams.push(Some(beam));
    }

    let slots: Vec<f64> = levels
        .iter()
        .map(|level| match level.index() {
            0 => ground_slot(rack, rules),
            _ => level.max_pallet_height() + rules.level_clearance,
        })
        .collect();

    let mut level_heights = Vec::with_capacity(levels.len());
    let mut base = rules.ground_offset;
    for (index, slot) in slots.iter().enumerate() {
        match beams.get(index + 1).and_then(Option::as_ref) {
            Some(next) => {
                let pitch = ceil_to_step(slot + next.height, rules.level_pitch_step);
                level_heights.push(pitch - next.height);
                base += pitch;
            }
            None => level_heights.push(ceil_to_step(*slot, rules.level_pitch_step)),
        }
    }
    let top = level_heights.last().copied().unwrap_or_default();

    let (extension_min, extension_max) = rules.top_extension;
    let step = rules.column_height_step;
    let extension = if step > 0.0 {
        extension_min + (step - (base + extension_min).rem_euclid(step)).rem_euclid(step)
    } else {
        extension_min
    };
    if extension > extension_max {
        return Err(LayoutError::cascade(
            CascadeStage::Height,
            format!(
                "top extension {} is outside [{}, {}]",
                extension, extension_min, extension_max
            ),
        ));
    }
    let column_height = base + extension;
    let height = column_height.max(base + top);

    let min_column_length = beams
        .iter()
        .flatten()
        .map(|beam| beam.min_column_length)
        .fold(0.0, f64::max);
    let frame_load = rack.beam_load() / 2.0 / rack.bracing().load_factor();
    let min_thickness = catalog.min_thickness(frame_load).ok_or_else(|| {
        LayoutError::catalog("column", format!("frame load {}", frame_load))
    })?;

    Ok(Requirements {
        clear_length,
        depth,
        level_heights,
        beams,
        column_height,
        height,
        min_column_length,
        min_thickness,
    })
}

/// Column for one rack of a row
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChoice {
    pub column: RackColumn,
    pub minimum: RackColumn,
    /// The rack's own selection was too weak and has been dropped
    pub reverted: bool,
}

/// Pick the column: the selection if it is at least as strong as the
/// minimum, the minimum otherwise
pub fn choose_column(
    min_length: f64,
    min_thickness: f64,
    selection: Option<&str>,
    catalog: &dyn Catalog,
    warnings: &mut Vec<LayoutWarning>,
) -> Result<ColumnChoice, LayoutError> {
    let minimum = catalog.find_column(min_length, min_thickness).ok_or_else(|| {
        LayoutError::catalog(
            "column",
            format!("length >= {} and thickness >= {}", min_length, min_thickness),
        )
    })?;
    let Some(requested) = selection else {
        return Ok(ColumnChoice {
            column: minimum.clone(),
            minimum,
            reverted: false,
        });
    };
    match catalog.column_by_name(requested) {
        Some(column) if column.dominates(&minimum) => Ok(ColumnChoice {
            column,
            minimum,
            reverted: false,
        }),
        _ => {
            warnings.push(LayoutWarning::ColumnReverted {
                requested: requested.to_string(),
                used: minimum.name.clone(),
            });
            Ok(ColumnChoice {
                column: minimum.clone(),
                minimum,
                reverted: true,
            })
        }
    }
}

fn check_band(stage: CascadeStage, value: f64, band: (f64, f64)) -> Result<(), LayoutError> {
    if value < band.0 || value > band.1 {
        return Err(LayoutError::cascade(
            stage,
            format!("{} is outside [{}, {}]", value, band.0, band.1),
        ));
    }
    Ok(())
}

/// Write derived sizes and components into `rect`
fn apply_sizing(
    rect: &mut Rectangle,
    reqs: &Requirements,
    choice: ColumnChoice,
    first_in_row: bool,
    ctx: &EditContext<'_>,
) -> Result<(), LayoutError> {
    let rules = &ctx.config.rack;
    let uprights = if first_in_row { 2.0 } else { 1.0 };
    let length = reqs.clear_length + uprights * choice.column.length;

    check_band(CascadeStage::Length, length, rules.length_range)?;
    check_band(CascadeStage::Depth, reqs.depth, rules.depth_range)?;
    if reqs.column_height > choice.column.max_height {
        return Err(LayoutError::cascade(
            CascadeStage::Column,
            format!(
                "column '{}' is at most {} tall, {} needed",
                choice.column.name, choice.column.max_height, reqs.column_height
            ),
        ));
    }
    check_band(CascadeStage::Height, reqs.height, rules.height_range)?;
    if let Some(roof) = ctx.sheet.roof_clearance() {
        if reqs.height > roof {
            return Err(LayoutError::cascade(
                CascadeStage::Height,
                format!("{} does not fit under the roof at {}", reqs.height, roof),
            ));
        }
    }

    let length_axis = rect.length_axis();
    rect.set_length_along(length_axis, length);
    rect.set_length_along(length_axis.other(), reqs.depth);
    rect.set_length_along(Axis::Z, reqs.height);

    let Some(rack) = rect.rack_mut() else {
        return Ok(());
    };
    for (level, (height, beam)) in rack
        .levels_mut()
        .iter_mut()
        .zip(reqs.level_heights.iter().zip(&reqs.beams))
    {
        level.set_derived(*height, beam.clone());
    }
    if choice.reverted {
        rack.clear_column_selection();
    }
    rack.set_column(choice.column, choice.minimum);
    rack.set_first_in_row(first_in_row);
    rack.set_derived(reqs.clear_length, reqs.column_height);
    Ok(())
}

/// Requirements of a rack on the sheet, configurations resolved
fn sheet_requirements(rect: &Rectangle, ctx: &EditContext<'_>) -> Result<Requirements, LayoutError> {
    let Some(rack) = rect.rack() else {
        return Err(LayoutError::invalid("rack", format!("{} is not a rack", rect.id())));
    };
    let mut rack = rack.clone();
    resolve_configurations(&mut rack, ctx.sheet)?;
    requirements(&rack, &ctx.config.rack, ctx.catalog)
}

/// Strongest column requirement over a set of requirements
fn row_minimum<'r>(reqs: impl Iterator<Item = &'r Requirements>) -> (f64, f64) {
    reqs.fold((0.0, 0.0), |(length, thickness), r| {
        (length.max(r.min_column_length), thickness.max(r.min_thickness))
    })
}

/// Re-derive one rack from its pallets, taking its row on the sheet into
/// account. Non-racks are left alone.
pub fn recompute(
    rect: &mut Rectangle,
    ctx: &EditContext<'_>,
    warnings: &mut Vec<LayoutWarning>,
) -> Result<(), LayoutError> {
    let Some(rack) = rect.rack_mut() else {
        return Ok(());
    };
    resolve_configurations(rack, ctx.sheet)?;
    let own = requirements(rack, &ctx.config.rack, ctx.catalog)?;
    let selection = rack.selected_column().map(str::to_string);

    let row = ctx.sheet.rack_group(rect);
    let mut row_reqs = vec![own.clone()];
    for id in row.iter().filter(|id| **id != rect.id()) {
        if let Some(member) = ctx.sheet.get(*id) {
            row_reqs.push(sheet_requirements(member, ctx)?);
        }
    }
    let (min_length, min_thickness) = row_minimum(row_reqs.iter());
    let choice = choose_column(
        min_length,
        min_thickness,
        selection.as_deref(),
        ctx.catalog,
        warnings,
    )?;
    let first_in_row = row.first().map_or(true, |first| *first == rect.id());
    apply_sizing(rect, &own, choice, first_in_row, ctx)?;
    debug!(
        "{} sized to {} x {} x {}",
        rect.id(),
        rect.length_x(),
        rect.length_y(),
        rect.length_z()
    );
    Ok(())
}

/// Derived geometry and rack data for one row member
#[derive(Debug, Clone, PartialEq)]
pub struct RackPatch {
    pub id: RectId,
    pub top_left: Point,
    pub length_x: f64,
    pub length_y: f64,
    pub length_z: f64,
    pub rack: Rack,
}

impl RackPatch {
    fn from_rect(rect: &Rectangle) -> Option<Self> {
        Some(Self {
            id: rect.id(),
            top_left: rect.top_left(),
            length_x: rect.length_x(),
            length_y: rect.length_y(),
            length_z: rect.length_z(),
            rack: rect.rack()?.clone(),
        })
    }

    /// Whether applying the patch would change `rect`
    pub fn differs_from(&self, rect: &Rectangle) -> bool {
        RackPatch::from_rect(rect).as_ref() != Some(self)
    }

    pub fn apply_to(&self, rect: &mut Rectangle) {
        rect.set_top_left(self.top_left);
        rect.set_length_along(Axis::X, self.length_x);
        rect.set_length_along(Axis::Y, self.length_y);
        rect.set_length_along(Axis::Z, self.length_z);
        if let Some(rack) = rect.rack_mut() {
            rack.clone_from(&self.rack);
        }
    }
}

/// Re-derive every rack of a row and lay them out end to end from the
/// first member. Returns one patch per member in row order.
pub fn recompute_group(
    row: &[RectId],
    ctx: &EditContext<'_>,
    warnings: &mut Vec<LayoutWarning>,
) -> Result<Vec<RackPatch>, LayoutError> {
    let mut members: Vec<Rectangle> = row
        .iter()
        .filter_map(|id| ctx.sheet.get(*id))
        .filter(|r| r.is_rack())
        .cloned()
        .collect();
    let Some(first) = members.first() else {
        return Ok(Vec::new());
    };
    let axis = first.length_axis();
    let mut cursor = first.top_left().along(axis);

    let mut reqs = Vec::with_capacity(members.len());
    for member in &mut members {
        if let Some(rack) = member.rack_mut() {
            resolve_configurations(rack, ctx.sheet)?;
            reqs.push(requirements(rack, &ctx.config.rack, ctx.catalog)?);
        }
    }
    let (min_length, min_thickness) = row_minimum(reqs.iter());

    for (index, (member, own)) in members.iter_mut().zip(&reqs).enumerate() {
        let selection = member
            .rack()
            .and_then(|rack| rack.selected_column())
            .map(str::to_string);
        let choice = choose_column(
            min_length,
            min_thickness,
            selection.as_deref(),
            ctx.catalog,
            warnings,
        )?;
        apply_sizing(member, own, choice, index == 0, ctx)?;
        let top_left = member.top_left().with_along(axis, cursor);
        member.set_top_left(top_left);
        cursor += member.length_along(axis);
    }
    Ok(members.iter().filter_map(RackPatch::from_rect).collect())
}
