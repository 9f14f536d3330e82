// src/dag/step.rs

//! Result type for a single `finish` call on the queue.

use crate::types::{NodeId, NodeStatus};

/// Structured result of recording a task's outcome.
///
/// Tests use this to assert on what a single completion changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStep {
    /// Terminal status recorded for the finished unit, or `None` if the
    /// call was ignored (unknown unit, or unit not running).
    pub unit_status: Option<NodeStatus>,
    /// Units newly marked `Skipped` because of this completion.
    pub newly_skipped: Vec<NodeId>,
    /// Whether every unit is now terminal.
    pub done: bool,
}

impl QueueStep {
    pub(crate) fn ignored(done: bool) -> Self {
        Self {
            unit_status: None,
            newly_skipped: Vec::new(),
            done,
        }
    }
}
