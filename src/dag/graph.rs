// src/dag/graph.rs

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use petgraph::Direction;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use crate::errors::{BatchdagError, Result};
use crate::types::{NodeId, Placement};

/// Attachment of a script to a transform node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBinding {
    pub target: NodeId,
    pub placement: Placement,
    pub is_post_hook: bool,
}

/// What a declared node is. Fixed at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Declarative transformation executed by the external engine.
    ///
    /// `has_post_hook` is set when at least one post-hook script is bound to
    /// this node; the partitioner closes a batch right after such a node.
    Transform { has_post_hook: bool },
    /// Imperative step, optionally bound to a transform node.
    Script { binding: Option<ScriptBinding> },
}

/// A declared node of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Declaration index; breaks ties in every topological scan.
    pub rank: usize,
}

impl Node {
    pub fn is_script(&self) -> bool {
        matches!(self.kind, NodeKind::Script { .. })
    }

    pub fn has_post_hook(&self) -> bool {
        matches!(self.kind, NodeKind::Transform { has_post_hook: true })
    }
}

/// Composite unit of two or more transform nodes submitted in one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub id: NodeId,
    /// Members in submission order.
    pub members: Vec<NodeId>,
    /// Member-to-member edges dropped from the planned graph.
    pub internal_edges: Vec<(NodeId, NodeId)>,
    pub rank: usize,
}

/// A vertex of a (possibly planned) dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanUnit {
    Node(Node),
    Batch(Batch),
}

impl PlanUnit {
    pub fn id(&self) -> &str {
        match self {
            PlanUnit::Node(node) => &node.id,
            PlanUnit::Batch(batch) => &batch.id,
        }
    }

    pub fn rank(&self) -> usize {
        match self {
            PlanUnit::Node(node) => node.rank,
            PlanUnit::Batch(batch) => batch.rank,
        }
    }

    /// Declared node ids covered by this unit, in execution order.
    pub fn members(&self) -> &[NodeId] {
        match self {
            PlanUnit::Node(node) => std::slice::from_ref(&node.id),
            PlanUnit::Batch(batch) => &batch.members,
        }
    }

    pub fn is_script(&self) -> bool {
        match self {
            PlanUnit::Node(node) => node.is_script(),
            PlanUnit::Batch(_) => false,
        }
    }

    pub fn as_batch(&self) -> Option<&Batch> {
        match self {
            PlanUnit::Batch(batch) => Some(batch),
            PlanUnit::Node(_) => None,
        }
    }
}

/// Directed acyclic graph of plan units keyed by id.
///
/// Edge `u -> v` means "v depends on u". The graph is only mutated by
/// [`GraphBuilder`](crate::dag::GraphBuilder) and
/// [`BatchPartitioner`](crate::dag::BatchPartitioner); everything else gets
/// a shared reference.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: StableDiGraph<PlanUnit, ()>,
    index: HashMap<NodeId, NodeIndex>,
}

impl DependencyGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_unit(&mut self, unit: PlanUnit) -> Result<()> {
        if self.index.contains_key(unit.id()) {
            return Err(BatchdagError::DuplicateNode(unit.id().to_string()));
        }
        let id = unit.id().to_string();
        let idx = self.graph.add_node(unit);
        self.index.insert(id, idx);
        Ok(())
    }

    /// Add `from -> to`. Parallel edges collapse into one.
    pub(crate) fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        let source = self.idx(from).ok_or_else(|| BatchdagError::UnknownNode {
            missing: from.to_string(),
            referenced_by: to.to_string(),
        })?;
        let target = self.idx(to).ok_or_else(|| BatchdagError::UnknownNode {
            missing: to.to_string(),
            referenced_by: from.to_string(),
        })?;
        self.graph.update_edge(source, target, ());
        Ok(())
    }

    pub(crate) fn remove_unit(&mut self, id: &str) -> Option<PlanUnit> {
        let idx = self.index.remove(id)?;
        self.graph.remove_node(idx)
    }

    fn idx(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn unit(&self, id: &str) -> Option<&PlanUnit> {
        self.idx(id).and_then(|idx| self.graph.node_weight(idx))
    }

    /// All units, in rank order.
    pub fn units(&self) -> Vec<&PlanUnit> {
        let mut units: Vec<&PlanUnit> = self
            .graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect();
        units.sort_by_key(|u| u.rank());
        units
    }

    /// All batches, in rank order.
    pub fn batches(&self) -> Vec<&Batch> {
        self.units()
            .into_iter()
            .filter_map(PlanUnit::as_batch)
            .collect()
    }

    /// Immediate upstream units of `id`, in rank order.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Immediate downstream units of `id`, in rank order.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: &str, dir: Direction) -> Vec<&str> {
        let Some(idx) = self.idx(id) else {
            return Vec::new();
        };
        let mut units: Vec<&PlanUnit> = self
            .graph
            .neighbors_directed(idx, dir)
            .filter_map(|n| self.graph.node_weight(n))
            .collect();
        units.sort_by_key(|u| u.rank());
        units.into_iter().map(PlanUnit::id).collect()
    }

    /// Every edge as `(upstream, downstream)`.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.graph
            .edge_references()
            .filter_map(|e| {
                let from = self.graph.node_weight(e.source())?;
                let to = self.graph.node_weight(e.target())?;
                Some((from.id(), to.id()))
            })
            .collect()
    }

    /// Transitive upstream closure of `id` (excluding `id` itself).
    pub fn ancestors_of(&self, id: &str) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = self.dependencies_of(id);

        while let Some(name) = stack.pop() {
            if seen.insert(name.to_string()) {
                stack.extend(self.dependencies_of(name));
            }
        }

        seen
    }

    /// Kahn's algorithm with ties broken by rank, so the order only depends
    /// on declaration order and edges.
    pub fn topological_order(&self) -> Result<Vec<&str>> {
        let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
        let mut heap = BinaryHeap::new();

        for idx in self.graph.node_indices() {
            let degree = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .count();
            in_degree.insert(idx, degree);
            if degree == 0 {
                heap.push(Reverse((self.graph[idx].rank(), idx)));
            }
        }

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((_, idx))) = heap.pop() {
            order.push(self.graph[idx].id());
            for next in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        heap.push(Reverse((self.graph[next].rank(), next)));
                    }
                }
            }
        }

        if order.len() != self.graph.node_count() {
            self.ensure_acyclic()?;
            return Err(BatchdagError::PlanInvariant(
                "topological scan did not visit every node".to_string(),
            ));
        }

        Ok(order)
    }

    /// Fail with [`BatchdagError::DagCycle`] naming the nodes of one cycle.
    pub fn ensure_acyclic(&self) -> Result<()> {
        match toposort(&self.graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => {
                let offending = cycle.node_id();
                let cyclic: Vec<Vec<NodeIndex>> = tarjan_scc(&self.graph)
                    .into_iter()
                    .filter(|scc| {
                        scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
                    })
                    .collect();
                let component = cyclic
                    .iter()
                    .find(|scc| scc.contains(&offending))
                    .or_else(|| cyclic.first())
                    .cloned()
                    .unwrap_or_else(|| vec![offending]);

                let mut ids: Vec<NodeId> = component
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx))
                    .map(|u| u.id().to_string())
                    .collect();
                ids.sort();
                Err(BatchdagError::DagCycle(ids))
            }
        }
    }
}
