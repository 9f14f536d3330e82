// src/dag/partition.rs

//! Collapse runs of ancestor-compatible transform nodes into batches.
//!
//! The pass walks the graph in topological order and keeps a stack of
//! transform nodes for the batch being built, together with the set of ids
//! the stack is allowed to depend on. A node joins the stack only if all of
//! its ancestors are already allowed; anything else closes the stack first.
//! Scripts and existing batches always close the stack and are never merged.
//! A transform with a post-hook closes the stack right after joining it.
//! Scans repeat on the rewritten graph until one of them merges nothing.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, error, info};

use crate::dag::graph::{Batch, DependencyGraph, NodeKind, PlanUnit};
use crate::errors::{BatchdagError, Result};
use crate::types::NodeId;

/// Rewrites a [`DependencyGraph`] into a planned graph of scripts, lone
/// transforms and [`Batch`]es.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchPartitioner;

impl BatchPartitioner {
    pub fn new() -> Self {
        Self
    }

    /// Consume `graph` and return the planned graph.
    ///
    /// Collapsing a batch can make nodes that were split apart share the
    /// same ancestors in the rewritten graph, so scans repeat until one
    /// emits no batch. The result is a fixpoint: partitioning it again
    /// changes nothing.
    pub fn partition(&self, mut graph: DependencyGraph) -> Result<DependencyGraph> {
        let mut next_batch = 0usize;
        let mut passes = 0usize;

        loop {
            let ancestors = ancestor_sets(&graph)?;
            let chunks = self.chunk(&graph, &ancestors)?;
            if chunks.is_empty() {
                break;
            }
            passes += 1;
            debug!(pass = passes, batches = chunks.len(), "partition pass");

            for members in chunks {
                verify_chunk(&graph, &members, &ancestors)?;
                let id = fresh_batch_id(&graph, &mut next_batch);
                collapse(&mut graph, id, members)?;
            }

            if let Err(err) = graph.ensure_acyclic() {
                error!(error = %err, "partitioning produced a cyclic plan");
                return Err(BatchdagError::PlanInvariant(format!(
                    "planned graph is cyclic: {err}"
                )));
            }
        }

        info!(
            units = graph.len(),
            batches = graph.batches().len(),
            passes,
            "execution plan ready"
        );

        Ok(graph)
    }

    /// The stack-based scan. Returns the member lists of batches to emit.
    fn chunk(
        &self,
        graph: &DependencyGraph,
        ancestors: &HashMap<NodeId, BTreeSet<NodeId>>,
    ) -> Result<Vec<Vec<NodeId>>> {
        let mut chunks = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut allowed: HashSet<NodeId> = HashSet::new();

        for id in graph.topological_order()? {
            let Some(unit) = graph.unit(id) else {
                continue;
            };

            let node = match unit {
                PlanUnit::Batch(_) => {
                    flush(&mut stack, &mut chunks);
                    continue;
                }
                PlanUnit::Node(node) => node,
            };

            let has_post_hook = match node.kind {
                NodeKind::Script { .. } => {
                    flush(&mut stack, &mut chunks);
                    continue;
                }
                NodeKind::Transform { has_post_hook } => has_post_hook,
            };

            let own_ancestors = &ancestors[id];

            if !stack.is_empty() && !own_ancestors.iter().all(|a| allowed.contains(a)) {
                debug!(node = %id, "ancestors differ from current batch; closing it");
                flush(&mut stack, &mut chunks);
            }

            if stack.is_empty() {
                allowed = own_ancestors.iter().cloned().collect();
            }

            stack.push(id.to_string());
            allowed.insert(id.to_string());
            allowed.extend(own_ancestors.iter().cloned());

            if has_post_hook {
                flush(&mut stack, &mut chunks);
            }
        }

        flush(&mut stack, &mut chunks);
        Ok(chunks)
    }
}

/// Emit the stack as a batch if it has at least two members; a single
/// transform stays a plain node.
fn flush(stack: &mut Vec<NodeId>, chunks: &mut Vec<Vec<NodeId>>) {
    if stack.len() > 1 {
        chunks.push(std::mem::take(stack));
    } else {
        stack.clear();
    }
}

/// Ancestor set of every unit, computed in one topological sweep.
fn ancestor_sets(graph: &DependencyGraph) -> Result<HashMap<NodeId, BTreeSet<NodeId>>> {
    let mut sets: HashMap<NodeId, BTreeSet<NodeId>> = HashMap::new();

    for id in graph.topological_order()? {
        let mut own = BTreeSet::new();
        for dep in graph.dependencies_of(id) {
            own.insert(dep.to_string());
            if let Some(upstream) = sets.get(dep) {
                own.extend(upstream.iter().cloned());
            }
        }
        sets.insert(id.to_string(), own);
    }

    Ok(sets)
}

fn verify_chunk(
    graph: &DependencyGraph,
    members: &[NodeId],
    ancestors: &HashMap<NodeId, BTreeSet<NodeId>>,
) -> Result<()> {
    let mut allowed: BTreeSet<NodeId> = BTreeSet::new();

    for (pos, member) in members.iter().enumerate() {
        let transform = matches!(
            graph.unit(member),
            Some(PlanUnit::Node(node)) if !node.is_script()
        );
        if !transform {
            error!(node = %member, "batch member is not a transform node");
            return Err(BatchdagError::PlanInvariant(format!(
                "batch member '{member}' is not a transform node"
            )));
        }

        let own = &ancestors[member];
        if pos == 0 {
            allowed.extend(own.iter().cloned());
        } else if !own.is_subset(&allowed) {
            error!(node = %member, "batch member depends outside the batch's ancestry");
            return Err(BatchdagError::PlanInvariant(format!(
                "batch member '{member}' has ancestors outside the batch's ancestry"
            )));
        }
        allowed.insert(member.clone());
        allowed.extend(own.iter().cloned());
    }

    Ok(())
}

fn fresh_batch_id(graph: &DependencyGraph, next: &mut usize) -> NodeId {
    loop {
        let candidate = format!("batch#{}", *next);
        *next += 1;
        if !graph.contains(&candidate) {
            return candidate;
        }
    }
}

/// Replace `members` by one batch unit, inheriting their external edges.
fn collapse(graph: &mut DependencyGraph, id: NodeId, members: Vec<NodeId>) -> Result<()> {
    let member_set: HashSet<&str> = members.iter().map(String::as_str).collect();

    let mut incoming: Vec<NodeId> = Vec::new();
    let mut outgoing: Vec<NodeId> = Vec::new();
    let mut internal_edges: Vec<(NodeId, NodeId)> = Vec::new();
    let mut rank = usize::MAX;

    for member in &members {
        if let Some(unit) = graph.unit(member) {
            rank = rank.min(unit.rank());
        }
        for dep in graph.dependencies_of(member) {
            if member_set.contains(dep) {
                internal_edges.push((dep.to_string(), member.clone()));
            } else {
                incoming.push(dep.to_string());
            }
        }
        for dependent in graph.dependents_of(member) {
            if !member_set.contains(dependent) {
                outgoing.push(dependent.to_string());
            }
        }
    }

    for member in &members {
        graph.remove_unit(member);
    }

    debug!(batch = %id, members = ?members, "collapsing transform nodes into batch");

    graph.add_unit(PlanUnit::Batch(Batch {
        id: id.clone(),
        members,
        internal_edges,
        rank,
    }))?;

    for upstream in incoming {
        graph.add_edge(&upstream, &id)?;
    }
    for downstream in outgoing {
        graph.add_edge(&id, &downstream)?;
    }

    Ok(())
}
