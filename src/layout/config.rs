//! Configuration for the layout engine
//!
//! Every section has defaults; a TOML document only needs to list the values
//! it changes.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::types::Anchor;

/// Errors that can occur when loading an engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse configuration TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Pairwise margin constants
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarginRules {
    /// Gap required between a rack and a block, on both axes
    pub rack_to_block: f64,
    /// Gap required between a rack and a wall, on both axes
    pub rack_to_wall: f64,
    /// Gap between the backs of two racks with the same orientation
    pub rack_back_to_back: f64,
    /// Document-level switch: pallets overhang the rack frame
    pub pallet_overhang: bool,
}

impl Default for MarginRules {
    fn default() -> Self {
        Self {
            rack_to_block: 50.0,
            rack_to_wall: 100.0,
            rack_back_to_back: 100.0,
            pallet_overhang: false,
        }
    }
}

impl MarginRules {
    pub fn with_rack_back_to_back(mut self, gap: f64) -> Self {
        self.rack_back_to_back = gap;
        self
    }

    pub fn with_rack_to_wall(mut self, gap: f64) -> Self {
        self.rack_to_wall = gap;
        self
    }

    pub fn with_rack_to_block(mut self, gap: f64) -> Self {
        self.rack_to_block = gap;
        self
    }

    pub fn with_pallet_overhang(mut self, enabled: bool) -> Self {
        self.pallet_overhang = enabled;
        self
    }
}

/// Engineering constants for the rack cascade
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RackRules {
    /// Free height between the top of a pallet and the next beam
    pub level_clearance: f64,
    /// Level-to-level distances are multiples of this
    pub level_pitch_step: f64,
    /// Band for the upright part above the highest beam
    pub top_extension: (f64, f64),
    /// Upright heights (rack height without pallets) are multiples of this
    pub column_height_step: f64,
    /// Base plate offset below the ground level
    pub ground_offset: f64,
    /// Ground level height when nothing is stored on the floor
    pub min_ground_height: f64,
    /// Gap between pallets, and between pallets and uprights
    pub pallet_gap: f64,
    /// Clear length between uprights is rounded up to this
    pub clear_length_step: f64,
    /// Connector allowance subtracted from the clear length to get the beam span
    pub beam_gap: f64,
    /// Frame depth = widest pallet minus this
    pub frame_depth_reduction: f64,
    /// Largest accepted pallet length, width or height
    pub max_pallet_dimension: f64,
    pub min_levels: usize,
    pub max_levels: usize,
    /// Most pallets a single level can carry
    pub max_pallets_per_level: usize,
    /// Allowed underpass heights
    pub underpass: (f64, f64),
    /// Underpass heights are multiples of this
    pub underpass_step: f64,
    /// Length range along the beams
    pub length_range: (f64, f64),
    /// Depth range across the beams
    pub depth_range: (f64, f64),
    /// Height range including the top pallets
    pub height_range: (f64, f64),
}

impl Default for RackRules {
    fn default() -> Self {
        Self {
            level_clearance: 100.0,
            level_pitch_step: 50.0,
            top_extension: (250.0, 350.0),
            column_height_step: 100.0,
            ground_offset: 0.0,
            min_ground_height: 150.0,
            pallet_gap: 75.0,
            clear_length_step: 50.0,
            beam_gap: 10.0,
            frame_depth_reduction: 100.0,
            max_pallet_dimension: 3000.0,
            min_levels: 2,
            max_levels: 12,
            max_pallets_per_level: 8,
            underpass: (1800.0, 4000.0),
            underpass_step: 50.0,
            length_range: (500.0, 30000.0),
            depth_range: (300.0, 2000.0),
            height_range: (500.0, 20000.0),
        }
    }
}

impl RackRules {
    pub fn with_level_clearance(mut self, clearance: f64) -> Self {
        self.level_clearance = clearance;
        self
    }

    pub fn with_pallet_gap(mut self, gap: f64) -> Self {
        self.pallet_gap = gap;
        self
    }

    pub fn with_level_limits(mut self, min: usize, max: usize) -> Self {
        self.min_levels = min;
        self.max_levels = max;
        self
    }

    pub fn with_max_pallets_per_level(mut self, max: usize) -> Self {
        self.max_pallets_per_level = max;
        self
    }
}

/// Auto-reposition solver settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Hard cap on reposition iterations
    pub max_iterations: usize,
    /// Try to move or shrink a conflicting candidate instead of rejecting it
    pub auto_reposition: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            auto_reposition: false,
        }
    }
}

/// Configuration options for the editing engine
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub margins: MarginRules,
    pub rack: RackRules,
    pub solver: SolverConfig,
    /// Point kept fixed by `rotate`
    pub rotation_anchor: Anchor,
    /// Point kept fixed by `DIMENSION_X` / `DIMENSION_Y`
    pub resize_anchor: Anchor,
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the margin constants
    pub fn with_margins(mut self, margins: MarginRules) -> Self {
        self.margins = margins;
        self
    }

    /// Set the rack engineering rules
    pub fn with_rack_rules(mut self, rules: RackRules) -> Self {
        self.rack = rules;
        self
    }

    /// Enable or disable auto-reposition
    pub fn with_auto_reposition(mut self, enabled: bool) -> Self {
        self.solver.auto_reposition = enabled;
        self
    }

    /// Set the solver iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.solver.max_iterations = max_iterations;
        self
    }

    /// Set the rotation anchor
    pub fn with_rotation_anchor(mut self, anchor: Anchor) -> Self {
        self.rotation_anchor = anchor;
        self
    }

    /// Set the resize anchor
    pub fn with_resize_anchor(mut self, anchor: Anchor) -> Self {
        self.resize_anchor = anchor;
        self
    }
}
