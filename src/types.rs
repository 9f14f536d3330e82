use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// Canonical node identifier used throughout the planner.
pub type NodeId = String;

/// Per-node outcomes reported for one task.
pub type BatchOutcome = BTreeMap<NodeId, TaskOutcome>;

/// Where a bound script runs relative to its transform node.
///
/// - `Before`: the script must finish before the transform starts.
/// - `After`: the script starts only once the transform has succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Before,
    After,
}

impl Default for Placement {
    fn default() -> Self {
        Placement::After
    }
}

/// Logical result reported by a collaborator for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failure,
}

impl TaskOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Scheduling status of a node (or planned unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    Pending,
    Running,
    Success,
    Failure,
    Skipped,
}

impl NodeStatus {
    /// `Success`, `Failure` and `Skipped` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeStatus::Success | NodeStatus::Failure | NodeStatus::Skipped
        )
    }

    /// Whether a dependent of a node in this status can never run.
    pub fn blocks_dependents(self) -> bool {
        matches!(self, NodeStatus::Failure | NodeStatus::Skipped)
    }
}

impl From<TaskOutcome> for NodeStatus {
    fn from(outcome: TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Success => NodeStatus::Success,
            TaskOutcome::Failure => NodeStatus::Failure,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Success => "success",
            NodeStatus::Failure => "failure",
            NodeStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}
