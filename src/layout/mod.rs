//! Geometry, margins and the overlap solver
//!
//! Everything here works on plain rectangles and boxes; the rack
//! knowledge lives in `model` and `cascade`.

pub mod config;
pub mod error;
pub mod lint;
pub mod margin;
pub mod solver;
pub mod types;

pub use config::{ConfigError, EngineConfig, MarginRules, RackRules, SolverConfig};
pub use error::{CascadeStage, LayoutError, LayoutWarning};
pub use types::*;
