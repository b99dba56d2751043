//! Error types for the layout engine

use std::fmt;

use thiserror::Error;

use crate::model::{Kind, RectId};

/// Cascade stage that rejected a derived value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStage {
    Pallet,
    Level,
    Beam,
    Column,
    Length,
    Depth,
    Height,
}

impl fmt::Display for CascadeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeStage::Pallet => write!(f, "pallet"),
            CascadeStage::Level => write!(f, "level"),
            CascadeStage::Beam => write!(f, "beam"),
            CascadeStage::Column => write!(f, "column"),
            CascadeStage::Length => write!(f, "length"),
            CascadeStage::Depth => write!(f, "depth"),
            CascadeStage::Height => write!(f, "height"),
        }
    }
}

/// Errors returned by a rejected edit. The edited model is left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// Value outside its min/max, or rectangle outside the sheet with margin
    #[error("{subject}: {reason}")]
    BoundsViolation { subject: String, reason: String },

    /// Placement overlaps other rectangles and could not be repositioned
    #[error("{subject} overlaps {}", format_ids(.conflicts))]
    LayoutConflict {
        subject: RectId,
        conflicts: Vec<RectId>,
        iterations: usize,
    },

    /// No catalog entry satisfies the requirement
    #[error("no catalog {item} satisfies {requirement}")]
    CatalogLookupFailure { item: String, requirement: String },

    /// A derived rack value fell outside its permissible band
    #[error("rack {stage} cascade failed: {reason}")]
    CascadeFailure { stage: CascadeStage, reason: String },

    #[error("unknown property '{key}'")]
    UnknownProperty { key: String },

    #[error("property '{key}' does not apply to {kind}")]
    UnsupportedProperty { key: String, kind: Kind },

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("rectangle {id} not found")]
    NotFound { id: RectId },

    /// The user cancelled a group-propagation prompt
    #[error("edit cancelled")]
    Cancelled,
}

fn format_ids(ids: &[RectId]) -> String {
    if ids.is_empty() {
        return "the sheet boundary".to_string();
    }
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl LayoutError {
    /// Create a bounds violation for a value outside `[min, max]`
    pub fn out_of_range(subject: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        Self::BoundsViolation {
            subject: subject.into(),
            reason: format!("value {} is outside [{}, {}]", value, min, max),
        }
    }

    /// Create a bounds violation with a free-form reason
    pub fn bounds(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BoundsViolation {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Create a layout conflict error
    pub fn conflict(subject: RectId, conflicts: Vec<RectId>, iterations: usize) -> Self {
        Self::LayoutConflict {
            subject,
            conflicts,
            iterations,
        }
    }

    /// Create a catalog lookup failure
    pub fn catalog(item: impl Into<String>, requirement: impl Into<String>) -> Self {
        Self::CatalogLookupFailure {
            item: item.into(),
            requirement: requirement.into(),
        }
    }

    /// Create a cascade failure for a stage
    pub fn cascade(stage: CascadeStage, reason: impl Into<String>) -> Self {
        Self::CascadeFailure {
            stage,
            reason: reason.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Ids of rectangles involved in a layout conflict
    pub fn conflicts(&self) -> Option<&[RectId]> {
        match self {
            Self::LayoutConflict { conflicts, .. } => Some(conflicts),
            _ => None,
        }
    }
}

/// Non-fatal findings reported alongside a committed edit
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutWarning {
    /// Value was not on its step grid and has been snapped
    StepViolation {
        subject: String,
        value: f64,
        step: f64,
        corrected: f64,
    },
    /// A user-selected column is weaker than the group needs
    ColumnReverted { requested: String, used: String },
}

impl fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutWarning::StepViolation {
                subject,
                value,
                step,
                corrected,
            } => write!(
                f,
                "{}: {} is not a multiple of {}, corrected to {}",
                subject, value, step, corrected
            ),
            LayoutWarning::ColumnReverted { requested, used } => write!(
                f,
                "column '{}' is too weak for the group, using '{}'",
                requested, used
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_display() {
        let err = LayoutError::out_of_range("DIMENSION_X", 12.0, 100.0, 2000.0);
        assert_eq!(err.to_string(), "DIMENSION_X: value 12 is outside [100, 2000]");
    }

    #[test]
    fn test_conflict_display_lists_ids() {
        let err = LayoutError::conflict(RectId(2), vec![RectId(1), RectId(3)], 0);
        insta::assert_snapshot!(err.to_string(), @"#2 overlaps #1, #3");
    }

    #[test]
    fn test_conflict_without_neighbours_mentions_boundary() {
        let err = LayoutError::conflict(RectId(4), Vec::new(), 100);
        assert!(err.to_string().contains("sheet boundary"));
    }

    #[test]
    fn test_cascade_display() {
        let err = LayoutError::cascade(CascadeStage::Height, "too tall");
        assert_eq!(err.to_string(), "rack height cascade failed: too tall");
    }

    #[test]
    fn test_step_warning_display() {
        let warning = LayoutWarning::StepViolation {
            subject: "DIMENSION_X".to_string(),
            value: 1234.0,
            step: 10.0,
            corrected: 1230.0,
        };
        assert_eq!(
            warning.to_string(),
            "DIMENSION_X: 1234 is not a multiple of 10, corrected to 1230"
        );
    }
}
