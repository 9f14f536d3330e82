// src/dag/report.rs

use std::collections::BTreeMap;

use crate::types::{NodeId, NodeStatus};

/// Final outcome of a run: one status per declared node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub statuses: BTreeMap<NodeId, NodeStatus>,
    /// `(run_index, unit_id)` in dispatch order.
    pub dispatched: Vec<(u64, NodeId)>,
    /// Highest number of tasks that were in flight at once.
    pub peak_concurrency: usize,
}

impl RunReport {
    /// True when every node ended `Success`.
    pub fn all_succeeded(&self) -> bool {
        self.statuses.values().all(|s| *s == NodeStatus::Success)
    }

    pub fn status_of(&self, node: &str) -> Option<NodeStatus> {
        self.statuses.get(node).copied()
    }

    pub fn failed(&self) -> Vec<&str> {
        self.with_status(NodeStatus::Failure)
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.with_status(NodeStatus::Skipped)
    }

    fn with_status(&self, status: NodeStatus) -> Vec<&str> {
        self.statuses
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Position of `unit` in dispatch order.
    pub fn dispatch_position(&self, unit: &str) -> Option<usize> {
        self.dispatched.iter().position(|(_, id)| id == unit)
    }
}
