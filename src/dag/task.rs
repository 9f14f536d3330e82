// src/dag/task.rs

//! Units of work handed to an executor.

use crate::types::NodeId;

/// What a [`Task`] runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// One or more transform nodes submitted in a single `run_batch` call,
    /// in this order.
    Transforms(Vec<NodeId>),
    /// A single script node.
    Script(NodeId),
}

/// Description of a unit the queue wants an executor to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Id of the planned unit (a batch id, or the node id itself).
    pub unit_id: NodeId,
    pub kind: TaskKind,
    /// Monotonically increasing assignment index. Diagnostics only.
    pub run_index: u64,
}

impl Task {
    /// Declared node ids covered by this task.
    pub fn node_ids(&self) -> &[NodeId] {
        match &self.kind {
            TaskKind::Transforms(ids) => ids,
            TaskKind::Script(id) => std::slice::from_ref(id),
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self.kind, TaskKind::Script(_))
    }
}
