//! Rack Layout - a constraint-aware layout engine for warehouse floor plans
//!
//! Rectangles (racks, columns, blocks, walls, shutters, aisle spaces) live on
//! a [`Sheet`]. Every property edit goes through an [`Editor`], which derives
//! rack dimensions from the pallets they carry, keeps rows of racks
//! consistent and refuses any state that overlaps or leaves the sheet.
//!
//! # Example
//!
//! ```rust
//! use rack_layout::{Drawing, Editor, EngineConfig, FixedDecision, GroupAnswer, Rectangle, TableCatalog};
//!
//! let config = EngineConfig::default();
//! let catalog = TableCatalog::default();
//! let editor = Editor::new(&config, &catalog);
//! let mut drawing = Drawing::from_config(20000.0, 10000.0, &config);
//! let mut decision = FixedDecision(GroupAnswer::No);
//!
//! let id = drawing.next_id();
//! let block = Rectangle::block(id).at(1000.0, 1000.0).with_size(2000.0, 500.0);
//! editor.insert(&mut drawing, block, true).unwrap();
//! editor
//!     .set_property(&mut drawing, &mut decision, id, "DIMENSION_X", 3000.0, true)
//!     .unwrap();
//! ```

pub mod cascade;
pub mod catalog;
pub mod decision;
pub mod edit;
pub mod layout;
pub mod model;
pub mod property;
pub mod sheet;

pub use catalog::{Catalog, TableCatalog};
pub use decision::{Decision, FixedDecision, GroupAnswer};
pub use edit::{EditContext, EditReport, Editor, Transaction};
pub use layout::{Anchor, EngineConfig, LayoutError, LayoutWarning, Point};
pub use model::{Kind, Pallet, Rack, RectId, Rectangle};
pub use property::{PropertyKey, Value};
pub use sheet::{Drawing, LayoutCheck, Sheet};
