//! Host prompt for size-group propagation

use crate::model::{RectId, Rectangle};

/// Answer to "apply this change to the other racks of the same size?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAnswer {
    Yes,
    No,
    Cancel,
}

pub trait Decision {
    /// `rack` is about to change size; `siblings` share its size index
    fn ask_apply_to_group(&mut self, rack: &Rectangle, siblings: &[RectId]) -> GroupAnswer;
}

/// Always gives the same answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDecision(pub GroupAnswer);

impl Decision for FixedDecision {
    fn ask_apply_to_group(&mut self, _rack: &Rectangle, _siblings: &[RectId]) -> GroupAnswer {
        self.0
    }
}

impl<F> Decision for F
where
    F: FnMut(&Rectangle, &[RectId]) -> GroupAnswer,
{
    fn ask_apply_to_group(&mut self, rack: &Rectangle, siblings: &[RectId]) -> GroupAnswer {
        self(rack, siblings)
    }
}
