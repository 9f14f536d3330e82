// src/dag/queue.rs

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::dag::graph::{DependencyGraph, NodeKind, PlanUnit};
use crate::dag::report::RunReport;
use crate::dag::step::QueueStep;
use crate::dag::task::{Task, TaskKind};
use crate::errors::Result;
use crate::types::{BatchOutcome, NodeId, NodeStatus, TaskOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    /// Every upstream unit succeeded.
    Ready,
    /// Some upstream unit failed or was skipped.
    Blocked,
    /// Some upstream unit has not finished yet.
    Waiting,
}

/// TaskQueue owns the planned graph plus all mutable scheduling state.
///
/// It is responsible for:
/// - deciding which units are ready (every upstream unit succeeded)
/// - handing out [`Task`]s and stamping them with a run index
/// - recording terminal outcomes per unit and per declared node
/// - eagerly skipping the downstream closure of a failed unit
///
/// It never runs anything itself; executors drive it.
#[derive(Debug)]
pub struct TaskQueue {
    graph: DependencyGraph,
    /// Unit ids in topological order.
    order: Vec<NodeId>,
    units: HashMap<NodeId, NodeStatus>,
    /// Status per declared node (batch members individually).
    nodes: BTreeMap<NodeId, NodeStatus>,
    run_counter: u64,
    dispatched: Vec<(u64, NodeId)>,
}

impl TaskQueue {
    /// Wrap a planned graph. Every unit starts `Pending`.
    pub fn new(graph: DependencyGraph) -> Result<Self> {
        let order: Vec<NodeId> = graph
            .topological_order()?
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut units = HashMap::new();
        let mut nodes = BTreeMap::new();
        for unit in graph.units() {
            units.insert(unit.id().to_string(), NodeStatus::Pending);
            for member in unit.members() {
                nodes.insert(member.clone(), NodeStatus::Pending);
            }
        }

        Ok(Self {
            graph,
            order,
            units,
            nodes,
            run_counter: 0,
            dispatched: Vec::new(),
        })
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Status of a planned unit.
    pub fn status_of(&self, unit: &str) -> Option<NodeStatus> {
        self.units.get(unit).copied()
    }

    /// Status of a declared node.
    pub fn node_status(&self, node: &str) -> Option<NodeStatus> {
        self.nodes.get(node).copied()
    }

    pub fn running_count(&self) -> usize {
        self.units
            .values()
            .filter(|s| **s == NodeStatus::Running)
            .count()
    }

    /// Whether every upstream unit of `unit` has succeeded.
    ///
    /// Returns `None` if the unit is unknown.
    pub fn deps_satisfied(&self, unit: &str) -> Option<bool> {
        self.units.get(unit)?;
        Some(self.readiness(unit) == Readiness::Ready)
    }

    /// True once every unit is `Success`, `Failure` or `Skipped`.
    pub fn is_done(&self) -> bool {
        self.units.values().all(|s| s.is_terminal())
    }

    /// Pending units whose upstream units all succeeded, in topological
    /// order.
    ///
    /// Pending units with a failed or skipped upstream unit are marked
    /// `Skipped` here instead of being returned.
    pub fn ready_tasks(&mut self) -> Vec<NodeId> {
        let mut ready = Vec::new();

        for pos in 0..self.order.len() {
            let id = self.order[pos].clone();
            if self.units.get(&id) != Some(&NodeStatus::Pending) {
                continue;
            }

            match self.readiness(&id) {
                Readiness::Ready => ready.push(id),
                Readiness::Blocked => {
                    self.mark_unit(&id, NodeStatus::Skipped);
                    debug!(unit = %id, "upstream unit did not succeed; marking Skipped");
                    self.skip_dependents(&id);
                }
                Readiness::Waiting => {}
            }
        }

        ready
    }

    /// Mark a ready unit `Running` and describe it as a [`Task`].
    ///
    /// Returns `None` for unknown units and for units that are not
    /// `Pending` or not ready, so assigning twice is harmless.
    pub fn assign(&mut self, unit: &str) -> Option<Task> {
        match self.units.get(unit) {
            Some(NodeStatus::Pending) => {}
            Some(status) => {
                debug!(unit = %unit, %status, "assign ignored; unit is not pending");
                return None;
            }
            None => {
                warn!(unit = %unit, "assign for unknown unit; ignoring");
                return None;
            }
        }

        if self.readiness(unit) != Readiness::Ready {
            debug!(unit = %unit, "assign ignored; dependencies not satisfied");
            return None;
        }

        let kind = match self.graph.unit(unit)? {
            PlanUnit::Batch(batch) => TaskKind::Transforms(batch.members.clone()),
            PlanUnit::Node(node) => match node.kind {
                NodeKind::Transform { .. } => TaskKind::Transforms(vec![node.id.clone()]),
                NodeKind::Script { .. } => TaskKind::Script(node.id.clone()),
            },
        };

        self.run_counter += 1;
        let run_index = self.run_counter;
        self.mark_unit(unit, NodeStatus::Running);
        self.dispatched.push((run_index, unit.to_string()));

        let task = Task {
            unit_id: unit.to_string(),
            kind,
            run_index,
        };

        info!(
            unit = %unit,
            run_index,
            nodes = ?task.node_ids(),
            "dispatching task"
        );

        Some(task)
    }

    /// Record the same outcome for every node of a running unit.
    pub fn finish(&mut self, unit: &str, outcome: TaskOutcome) -> QueueStep {
        let outcomes: BatchOutcome = match self.graph.unit(unit) {
            Some(u) => u.members().iter().map(|m| (m.clone(), outcome)).collect(),
            None => BatchOutcome::new(),
        };
        self.finish_with(unit, &outcomes)
    }

    /// Record per-node outcomes for a running unit.
    ///
    /// The unit succeeds only if every member resolves to `Success`. A
    /// failed unit eagerly skips its whole downstream closure.
    pub fn finish_with(&mut self, unit: &str, outcomes: &BatchOutcome) -> QueueStep {
        match self.units.get(unit) {
            Some(NodeStatus::Running) => {}
            Some(status) => {
                warn!(unit = %unit, %status, "completion for unit that is not running; ignoring");
                return QueueStep::ignored(self.is_done());
            }
            None => {
                warn!(unit = %unit, "completion for unknown unit; ignoring");
                return QueueStep::ignored(self.is_done());
            }
        }

        let resolved = match self.graph.unit(unit) {
            Some(u) => resolve_members(u, outcomes),
            None => Vec::new(),
        };

        let unit_status = if resolved.iter().all(|(_, s)| *s == NodeStatus::Success) {
            NodeStatus::Success
        } else {
            NodeStatus::Failure
        };

        self.units.insert(unit.to_string(), unit_status);
        for (member, status) in resolved {
            self.nodes.insert(member, status);
        }

        let newly_skipped = match unit_status {
            NodeStatus::Success => {
                debug!(unit = %unit, "unit completed successfully");
                Vec::new()
            }
            _ => {
                let skipped = self.skip_dependents(unit);
                warn!(
                    unit = %unit,
                    skipped = skipped.len(),
                    "unit failed; skipping dependents"
                );
                skipped
            }
        };

        QueueStep {
            unit_status: Some(unit_status),
            newly_skipped,
            done: self.is_done(),
        }
    }

    /// Snapshot of per-node statuses and dispatch order.
    pub fn report(&self) -> RunReport {
        RunReport {
            statuses: self.nodes.clone(),
            dispatched: self.dispatched.clone(),
            peak_concurrency: 0,
        }
    }

    fn readiness(&self, unit: &str) -> Readiness {
        let mut waiting = false;
        for dep in self.graph.dependencies_of(unit) {
            match self.units.get(dep) {
                Some(NodeStatus::Success) => {}
                Some(s) if s.blocks_dependents() => return Readiness::Blocked,
                _ => waiting = true,
            }
        }
        if waiting {
            Readiness::Waiting
        } else {
            Readiness::Ready
        }
    }

    fn mark_unit(&mut self, unit: &str, status: NodeStatus) {
        self.units.insert(unit.to_string(), status);
        if let Some(u) = self.graph.unit(unit) {
            for member in u.members() {
                self.nodes.insert(member.clone(), status);
            }
        }
    }

    /// Mark every pending unit downstream of `root` as `Skipped`.
    ///
    /// Returns the newly skipped units (excluding `root`).
    fn skip_dependents(&mut self, root: &str) -> Vec<NodeId> {
        let mut stack: Vec<NodeId> = self
            .graph
            .dependents_of(root)
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut newly_skipped = Vec::new();

        while let Some(id) = stack.pop() {
            if self.units.get(&id) != Some(&NodeStatus::Pending) {
                continue;
            }
            self.mark_unit(&id, NodeStatus::Skipped);
            debug!(unit = %id, upstream = %root, "skipping unit due to upstream failure");
            stack.extend(self.graph.dependents_of(&id).into_iter().map(str::to_string));
            newly_skipped.push(id);
        }

        newly_skipped
    }
}

/// Resolve member statuses of a finished unit, in member order.
///
/// Inside a batch, a member whose in-batch upstream did not succeed cannot
/// count as a success, whatever the runner reported.
fn resolve_members(unit: &PlanUnit, outcomes: &BatchOutcome) -> Vec<(NodeId, NodeStatus)> {
    let internal: &[(NodeId, NodeId)] = match unit {
        PlanUnit::Batch(batch) => &batch.internal_edges,
        PlanUnit::Node(_) => &[],
    };

    let mut resolved: BTreeMap<&str, NodeStatus> = BTreeMap::new();
    let mut out = Vec::with_capacity(unit.members().len());

    for member in unit.members() {
        let upstream_ok = internal
            .iter()
            .filter(|(_, to)| to == member)
            .all(|(from, _)| resolved.get(from.as_str()) == Some(&NodeStatus::Success));

        let status = match (outcomes.get(member), upstream_ok) {
            (Some(outcome), true) => NodeStatus::from(*outcome),
            (Some(TaskOutcome::Failure), false) => NodeStatus::Failure,
            (Some(TaskOutcome::Success), false) => {
                warn!(
                    node = %member,
                    unit = %unit.id(),
                    "runner reported success downstream of a failed batch member; recording Skipped"
                );
                NodeStatus::Skipped
            }
            (None, false) => NodeStatus::Skipped,
            (None, true) => {
                warn!(node = %member, unit = %unit.id(), "runner reported no status; recording Failure");
                NodeStatus::Failure
            }
        };

        resolved.insert(member.as_str(), status);
        out.push((member.clone(), status));
    }

    out
}
