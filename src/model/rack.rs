//! Rack data: levels, pallets and the derived component selection
//!
//! Level 0 is the ground level. It never carries beams; whatever stands on
//! it (pallets on the floor or an underpass) only sets how high the first
//! beam level sits. Every level above it hangs on a pair of beams.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::catalog::{RackBeam, RackColumn};
use crate::edit::EditContext;
use crate::layout::error::{CascadeStage, LayoutError, LayoutWarning};
use crate::layout::types::whole;
use crate::property::{LevelKey, PropertyKey, Value};

use super::SizeRange;

/// Frame bracing pattern; stronger patterns spread the load across the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bracing {
    #[default]
    Normal,
    X,
    NormalWithStiffener,
    XWithStiffener,
}

impl Bracing {
    /// Divisor applied to the frame load before choosing the column thickness
    pub fn load_factor(self) -> f64 {
        match self {
            Bracing::Normal => 1.0,
            Bracing::X => 1.15,
            Bracing::NormalWithStiffener => 1.1,
            Bracing::XWithStiffener => 1.25,
        }
    }
}

impl FromStr for Bracing {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(Bracing::Normal),
            "X" => Ok(Bracing::X),
            "NormalWithStiffener" => Ok(Bracing::NormalWithStiffener),
            "XWithStiffener" => Ok(Bracing::XWithStiffener),
            _ => Err(LayoutError::invalid(
                PropertyKey::RackBracing.to_string(),
                format!("unknown bracing '{}'", s),
            )),
        }
    }
}

impl fmt::Display for Bracing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bracing::Normal => write!(f, "Normal"),
            Bracing::X => write!(f, "X"),
            Bracing::NormalWithStiffener => write!(f, "NormalWithStiffener"),
            Bracing::XWithStiffener => write!(f, "XWithStiffener"),
        }
    }
}

/// Named pallet size defined on the document
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PalletConfiguration {
    pub name: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

/// One pallet slot on a level
#[derive(Debug, Clone, PartialEq)]
pub struct Pallet {
    /// Along the beams
    pub length: f64,
    /// Across the beams
    pub width: f64,
    pub height: f64,
    pub load: f64,
    configuration: Option<String>,
}

impl Pallet {
    pub fn new(length: f64, width: f64, height: f64, load: f64) -> Self {
        Self {
            length: whole(length),
            width: whole(width),
            height: whole(height),
            load,
            configuration: None,
        }
    }

    /// A pallet whose sizes are fixed by a configuration
    pub fn configured(configuration: &PalletConfiguration, load: f64) -> Self {
        let mut pallet = Self::new(0.0, 0.0, 0.0, load);
        pallet.bind(configuration);
        pallet
    }

    /// Name of the bound configuration, if any
    pub fn configuration(&self) -> Option<&str> {
        self.configuration.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.configuration.is_some()
    }

    fn bind(&mut self, configuration: &PalletConfiguration) {
        self.length = whole(configuration.length);
        self.width = whole(configuration.width);
        self.height = whole(configuration.height);
        self.configuration = Some(configuration.name.clone());
    }

    /// Refresh sizes from the current definition of the bound configuration
    pub(crate) fn resolve(&mut self, configuration: &PalletConfiguration) {
        self.bind(configuration);
    }
}

impl Default for Pallet {
    fn default() -> Self {
        Self::new(1200.0, 800.0, 1000.0, 500.0)
    }
}

/// A storage level
#[derive(Debug, Clone, PartialEq)]
pub struct RackLevel {
    index: usize,
    height: f64,
    beam: Option<RackBeam>,
    pub accessories: Vec<String>,
    pub pallets: Vec<Pallet>,
}

impl RackLevel {
    pub fn new(index: usize, pallets: Vec<Pallet>) -> Self {
        Self {
            index,
            height: 0.0,
            beam: None,
            accessories: Vec::new(),
            pallets,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Free height of the level, derived by the cascade
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Beam pair carrying the level; `None` on the ground level
    pub fn beam(&self) -> Option<&RackBeam> {
        self.beam.as_ref()
    }

    pub fn load(&self) -> f64 {
        self.pallets.iter().map(|p| p.load).sum()
    }

    pub fn max_pallet_height(&self) -> f64 {
        self.pallets.iter().map(|p| p.height).fold(0.0, f64::max)
    }

    pub fn max_pallet_width(&self) -> f64 {
        self.pallets.iter().map(|p| p.width).fold(0.0, f64::max)
    }

    /// Pallet lengths plus the gaps between and around them
    pub fn occupied_length(&self, gap: f64) -> f64 {
        let pallets: f64 = self.pallets.iter().map(|p| p.length).sum();
        pallets + (self.pallets.len() + 1) as f64 * gap
    }

    pub(crate) fn set_derived(&mut self, height: f64, beam: Option<RackBeam>) {
        self.height = height;
        self.beam = beam;
    }

    fn pallet_mut(&mut self, slot: usize, key: &str) -> Result<&mut Pallet, LayoutError> {
        let index = self.index;
        self.pallets.get_mut(slot).ok_or_else(|| {
            LayoutError::invalid(key, format!("level {} has no pallet {}", index, slot))
        })
    }

    fn apply(
        &mut self,
        field: &LevelKey,
        value: &Value,
        key: &str,
        ctx: &EditContext<'_>,
    ) -> Result<(), LayoutError> {
        let max_dimension = ctx.config.rack.max_pallet_dimension;
        match field {
            LevelKey::PalletLength(slot)
            | LevelKey::PalletWidth(slot)
            | LevelKey::PalletHeight(slot) => {
                let v = value.as_number(key)?;
                if v <= 0.0 || v > max_dimension {
                    return Err(LayoutError::out_of_range(key, v, 1.0, max_dimension));
                }
                let pallet = self.pallet_mut(*slot, key)?;
                if let Some(name) = pallet.configuration() {
                    return Err(LayoutError::invalid(
                        key,
                        format!("pallet size is fixed by configuration '{}'", name),
                    ));
                }
                let v = whole(v);
                match field {
                    LevelKey::PalletLength(_) => pallet.length = v,
                    LevelKey::PalletWidth(_) => pallet.width = v,
                    _ => pallet.height = v,
                }
            }
            LevelKey::PalletLoad(slot) => {
                let v = value.as_number(key)?;
                if v < 0.0 {
                    return Err(LayoutError::invalid(key, "load cannot be negative"));
                }
                self.pallet_mut(*slot, key)?.load = v;
            }
            LevelKey::PalletConfiguration(slot) => {
                let name = value.as_text(key)?;
                if name.is_empty() {
                    self.pallet_mut(*slot, key)?.configuration = None;
                } else {
                    let configuration = ctx.sheet.pallet_configuration(name).ok_or_else(|| {
                        LayoutError::invalid(key, format!("unknown pallet configuration '{}'", name))
                    })?;
                    self.pallet_mut(*slot, key)?.bind(&configuration);
                }
            }
            LevelKey::PalletsCount => {
                let count = value.as_count(key)?;
                let max = ctx.config.rack.max_pallets_per_level;
                if count > max {
                    return Err(LayoutError::out_of_range(key, count as f64, 0.0, max as f64));
                }
                let template = self.pallets.last().cloned().unwrap_or_default();
                self.pallets.resize(count, template);
            }
            LevelKey::Accessories => {
                let list = value.as_text(key)?;
                self.accessories = list
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
        }
        Ok(())
    }
}

/// Rack-specific data
#[derive(Debug, Clone, PartialEq)]
pub struct Rack {
    levels: Vec<RackLevel>,
    column: Option<RackColumn>,
    min_column: Option<RackColumn>,
    selected_column: Option<String>,
    is_first_in_row_column: bool,
    bracing: Bracing,
    size_index: u32,
    is_underpass_available: bool,
    underpass: f64,
    is_material_on_ground: bool,
    show_pallet: bool,
    are_levels_the_same: bool,
    clear_length: f64,
    column_height: f64,
}

impl Rack {
    /// A rack from per-level pallets; the first entry is the ground level
    pub fn new(levels: Vec<Vec<Pallet>>) -> Self {
        let levels = levels
            .into_iter()
            .enumerate()
            .map(|(index, pallets)| RackLevel::new(index, pallets))
            .collect();
        Self {
            levels,
            column: None,
            min_column: None,
            selected_column: None,
            is_first_in_row_column: true,
            bracing: Bracing::Normal,
            size_index: 0,
            is_underpass_available: false,
            underpass: 0.0,
            is_material_on_ground: true,
            show_pallet: true,
            are_levels_the_same: false,
            clear_length: 0.0,
            column_height: 0.0,
        }
    }

    /// `level_count` levels carrying `pallets_per_level` copies of `pallet`
    pub fn uniform(level_count: usize, pallets_per_level: usize, pallet: Pallet) -> Self {
        Self::new(vec![vec![pallet; pallets_per_level]; level_count])
    }

    pub fn with_bracing(mut self, bracing: Bracing) -> Self {
        self.bracing = bracing;
        self
    }

    pub fn with_size_index(mut self, size_index: u32) -> Self {
        self.size_index = size_index;
        self
    }

    /// Prefer the named column over the minimum one
    pub fn with_column(mut self, name: impl Into<String>) -> Self {
        self.selected_column = Some(name.into());
        self
    }

    /// Leave `height` free under the first beam level for traffic
    pub fn with_underpass(mut self, height: f64) -> Self {
        self.is_underpass_available = true;
        self.underpass = whole(height);
        self
    }

    pub fn with_material_on_ground(mut self, on_ground: bool) -> Self {
        self.is_material_on_ground = on_ground;
        self
    }

    pub fn with_levels_the_same(mut self, same: bool) -> Self {
        self.are_levels_the_same = same;
        self
    }

    pub fn levels(&self) -> &[RackLevel] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&RackLevel> {
        self.levels.get(index)
    }

    pub(crate) fn levels_mut(&mut self) -> &mut [RackLevel] {
        &mut self.levels
    }

    /// Column in use
    pub fn column(&self) -> Option<&RackColumn> {
        self.column.as_ref()
    }

    /// Weakest column the requirements allow
    pub fn min_column(&self) -> Option<&RackColumn> {
        self.min_column.as_ref()
    }

    pub fn selected_column(&self) -> Option<&str> {
        self.selected_column.as_deref()
    }

    /// The rack owns both uprights; later racks in a row share the previous one
    pub fn is_first_in_row_column(&self) -> bool {
        self.is_first_in_row_column
    }

    pub fn bracing(&self) -> Bracing {
        self.bracing
    }

    /// Racks with the same non-zero index share their size configuration
    pub fn size_index(&self) -> u32 {
        self.size_index
    }

    pub fn is_underpass_available(&self) -> bool {
        self.is_underpass_available
    }

    pub fn underpass(&self) -> f64 {
        self.underpass
    }

    /// An underpass is configured and in use
    pub fn has_underpass(&self) -> bool {
        self.is_underpass_available && self.underpass > 0.0
    }

    pub fn is_material_on_ground(&self) -> bool {
        self.is_material_on_ground
    }

    pub fn show_pallet(&self) -> bool {
        self.show_pallet
    }

    pub fn are_levels_the_same(&self) -> bool {
        self.are_levels_the_same
    }

    /// Distance between the uprights, derived by the cascade
    pub fn clear_length(&self) -> f64 {
        self.clear_length
    }

    /// Upright height, derived by the cascade
    pub fn column_height(&self) -> f64 {
        self.column_height
    }

    /// Whether the pallets on `index` take part in length and depth sizing
    pub fn counts_level(&self, index: usize) -> bool {
        index > 0 || (self.is_material_on_ground && !self.has_underpass())
    }

    /// Levels whose pallets take part in length and depth sizing
    pub fn counted_levels(&self) -> impl Iterator<Item = &RackLevel> {
        self.levels
            .iter()
            .filter(move |level| self.counts_level(level.index))
    }

    /// Load carried by the beam levels
    pub fn beam_load(&self) -> f64 {
        self.levels.iter().skip(1).map(RackLevel::load).sum()
    }

    pub fn max_pallet_width(&self) -> f64 {
        self.counted_levels()
            .map(RackLevel::max_pallet_width)
            .fold(0.0, f64::max)
    }

    pub(crate) fn set_column(&mut self, column: RackColumn, min_column: RackColumn) {
        self.column = Some(column);
        self.min_column = Some(min_column);
    }

    pub(crate) fn clear_column_selection(&mut self) {
        self.selected_column = None;
    }

    pub(crate) fn set_first_in_row(&mut self, first: bool) {
        self.is_first_in_row_column = first;
    }

    pub(crate) fn set_size_index(&mut self, size_index: u32) {
        self.size_index = size_index;
    }

    pub(crate) fn set_derived(&mut self, clear_length: f64, column_height: f64) {
        self.clear_length = clear_length;
        self.column_height = column_height;
    }

    /// Spread `clear_length` evenly over the pallets of every counted level
    pub(crate) fn fit_clear_length(
        &mut self,
        clear_length: f64,
        gap: f64,
    ) -> Result<(), LayoutError> {
        let counted: Vec<usize> = self
            .counted_levels()
            .filter(|level| !level.pallets.is_empty())
            .map(RackLevel::index)
            .collect();
        for index in counted {
            let level = &mut self.levels[index];
            if let Some(pallet) = level.pallets.iter().find(|p| p.is_bound()) {
                return Err(LayoutError::cascade(
                    CascadeStage::Pallet,
                    format!(
                        "pallet length on level {} is fixed by configuration '{}'",
                        index,
                        pallet.configuration().unwrap_or_default()
                    ),
                ));
            }
            let count = level.pallets.len() as f64;
            let per_pallet = whole((clear_length - (count + 1.0) * gap) / count);
            if per_pallet < 1.0 {
                return Err(LayoutError::bounds(
                    "rack length",
                    format!("no room for {} pallets on level {}", count, index),
                ));
            }
            for pallet in &mut level.pallets {
                pallet.length = per_pallet;
            }
        }
        Ok(())
    }

    /// Give every counted pallet the same `width`
    pub(crate) fn fit_pallet_width(&mut self, width: f64) -> Result<(), LayoutError> {
        let counted: Vec<usize> = self.counted_levels().map(RackLevel::index).collect();
        for index in counted {
            for pallet in &mut self.levels[index].pallets {
                if let Some(name) = pallet.configuration() {
                    return Err(LayoutError::cascade(
                        CascadeStage::Pallet,
                        format!(
                            "pallet width on level {} is fixed by configuration '{}'",
                            index, name
                        ),
                    ));
                }
                pallet.width = whole(width);
            }
        }
        Ok(())
    }

    /// Apply a rack-scoped key. Sizes are re-derived by the caller.
    pub(crate) fn apply(
        &mut self,
        key: &PropertyKey,
        value: &Value,
        ctx: &EditContext<'_>,
        warnings: &mut Vec<LayoutWarning>,
    ) -> Result<(), LayoutError> {
        let name = key.to_string();
        let rules = &ctx.config.rack;
        match key {
            PropertyKey::RackColumn => {
                let column = value.as_text(&name)?;
                if column.is_empty() {
                    self.selected_column = None;
                } else {
                    ctx.catalog
                        .column_by_name(column)
                        .ok_or_else(|| LayoutError::catalog("column", format!("name '{}'", column)))?;
                    self.selected_column = Some(column.to_string());
                }
            }
            PropertyKey::RackBracing => {
                self.bracing = value.as_text(&name)?.parse()?;
            }
            PropertyKey::RackUnderpassAvailable => {
                self.is_underpass_available = value.as_bool(&name)?;
                if !self.is_underpass_available {
                    self.underpass = 0.0;
                }
            }
            PropertyKey::RackUnderpass => {
                let height = value.as_number(&name)?;
                if height == 0.0 {
                    self.underpass = 0.0;
                } else {
                    if !self.is_underpass_available {
                        return Err(LayoutError::invalid(&name, "underpass is not available"));
                    }
                    let band = SizeRange::new(rules.underpass.0, rules.underpass.1, rules.underpass_step);
                    let (height, warning) = band.validate(&name, height)?;
                    warnings.extend(warning);
                    self.underpass = height;
                }
            }
            PropertyKey::RackMaterialOnGround => {
                self.is_material_on_ground = value.as_bool(&name)?;
            }
            PropertyKey::RackShowPallet => {
                self.show_pallet = value.as_bool(&name)?;
            }
            PropertyKey::RackLevelsTheSame => {
                self.are_levels_the_same = value.as_bool(&name)?;
                if self.are_levels_the_same {
                    self.copy_first_beam_level();
                }
            }
            PropertyKey::RackLevelsCount => {
                let count = value.as_count(&name)?;
                if count < rules.min_levels || count > rules.max_levels {
                    return Err(LayoutError::out_of_range(
                        &name,
                        count as f64,
                        rules.min_levels as f64,
                        rules.max_levels as f64,
                    ));
                }
                self.resize_levels(count);
            }
            PropertyKey::RackLevel(index, field) => {
                if *index >= self.levels.len() {
                    return Err(LayoutError::invalid(
                        &name,
                        format!("rack has no level {}", index),
                    ));
                }
                let targets = if self.are_levels_the_same && *index > 0 {
                    1..self.levels.len()
                } else {
                    *index..*index + 1
                };
                for target in targets {
                    self.levels[target].apply(field, value, &name, ctx)?;
                }
            }
            _ => {
                return Err(LayoutError::UnsupportedProperty {
                    key: name,
                    kind: super::Kind::Rack,
                })
            }
        }
        Ok(())
    }

    /// New levels copy the current top level
    fn resize_levels(&mut self, count: usize) {
        while self.levels.len() > count {
            self.levels.pop();
        }
        while self.levels.len() < count {
            let index = self.levels.len();
            let (pallets, accessories) = self
                .levels
                .last()
                .map(|top| (top.pallets.clone(), top.accessories.clone()))
                .unwrap_or_default();
            let mut level = RackLevel::new(index, pallets);
            level.accessories = accessories;
            self.levels.push(level);
        }
    }

    fn copy_first_beam_level(&mut self) {
        let Some(first) = self.levels.get(1).cloned() else {
            return;
        };
        for level in self.levels.iter_mut().skip(2) {
            level.pallets.clone_from(&first.pallets);
            level.accessories.clone_from(&first.accessories);
        }
    }
}
