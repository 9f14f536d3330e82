// src/dag/builder.rs

//! Assemble a [`DependencyGraph`] from transform and script descriptors.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::dag::graph::{DependencyGraph, Node, NodeKind, PlanUnit, ScriptBinding};
use crate::errors::{BatchdagError, Result};
use crate::types::{NodeId, Placement};

/// A transform node and the ids it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSpec {
    pub id: NodeId,
    pub upstream: Vec<NodeId>,
}

impl TransformSpec {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            upstream: Vec::new(),
        }
    }

    pub fn after(mut self, upstream: impl Into<NodeId>) -> Self {
        self.upstream.push(upstream.into());
        self
    }
}

/// A script node, optionally bound to a transform node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSpec {
    pub id: NodeId,
    pub bound_to: Option<NodeId>,
    pub placement: Placement,
    pub is_post_hook: bool,
    /// Explicit extra upstream ids.
    pub after: Vec<NodeId>,
}

impl ScriptSpec {
    /// A free-standing script with no implicit ordering.
    pub fn free(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            bound_to: None,
            placement: Placement::After,
            is_post_hook: false,
            after: Vec::new(),
        }
    }

    pub fn bound(id: impl Into<NodeId>, target: impl Into<NodeId>, placement: Placement) -> Self {
        Self {
            bound_to: Some(target.into()),
            placement,
            ..Self::free(id)
        }
    }

    /// An `after` script that must also run after every non-post-hook
    /// script of `target`.
    pub fn post_hook(id: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            is_post_hook: true,
            ..Self::bound(id, target, Placement::After)
        }
    }

    pub fn after(mut self, upstream: impl Into<NodeId>) -> Self {
        self.after.push(upstream.into());
        self
    }
}

/// Everything the planner consumes for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanInput {
    pub transforms: Vec<TransformSpec>,
    pub scripts: Vec<ScriptSpec>,
}

/// Builds a [`DependencyGraph`] from [`PlanInput`].
///
/// Rules:
/// - `upstream -> transform` for every declared upstream id
/// - `before` script: `script -> target`
/// - `after` script: `target -> script`
/// - post-hooks of one target run in declaration order, after every
///   non-post-hook `after` script of that target
/// - explicit `after` ids on a script add `upstream -> script`
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    input: PlanInput,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_input(input: PlanInput) -> Self {
        Self { input }
    }

    pub fn transform(mut self, spec: TransformSpec) -> Self {
        self.input.transforms.push(spec);
        self
    }

    pub fn script(mut self, spec: ScriptSpec) -> Self {
        self.input.scripts.push(spec);
        self
    }

    pub fn build(self) -> Result<DependencyGraph> {
        let PlanInput {
            transforms,
            scripts,
        } = self.input;

        let transform_ids: HashSet<&str> = transforms.iter().map(|t| t.id.as_str()).collect();
        let script_ids: HashSet<&str> = scripts.iter().map(|s| s.id.as_str()).collect();

        let post_hooked: HashSet<&str> = scripts
            .iter()
            .filter(|s| s.is_post_hook)
            .filter_map(|s| s.bound_to.as_deref())
            .collect();

        let mut graph = DependencyGraph::new();
        let mut rank = 0;

        for spec in &transforms {
            graph.add_unit(PlanUnit::Node(Node {
                id: spec.id.clone(),
                kind: NodeKind::Transform {
                    has_post_hook: post_hooked.contains(spec.id.as_str()),
                },
                rank,
            }))?;
            rank += 1;
        }

        for spec in &scripts {
            let binding = spec.bound_to.as_ref().map(|target| ScriptBinding {
                target: target.clone(),
                placement: spec.placement,
                is_post_hook: spec.is_post_hook,
            });
            graph.add_unit(PlanUnit::Node(Node {
                id: spec.id.clone(),
                kind: NodeKind::Script { binding },
                rank,
            }))?;
            rank += 1;
        }

        validate_bindings(&scripts, &transform_ids, &script_ids)?;

        for spec in &transforms {
            for upstream in &spec.upstream {
                graph.add_edge(upstream, &spec.id)?;
            }
        }

        // After-scripts per target, in declaration order.
        let mut after_scripts: BTreeMap<&str, Vec<&ScriptSpec>> = BTreeMap::new();

        for spec in &scripts {
            if let Some(target) = spec.bound_to.as_deref() {
                match spec.placement {
                    Placement::Before => graph.add_edge(&spec.id, target)?,
                    Placement::After => {
                        graph.add_edge(target, &spec.id)?;
                        after_scripts.entry(target).or_default().push(spec);
                    }
                }
            }
            for upstream in &spec.after {
                graph.add_edge(upstream, &spec.id)?;
            }
        }

        for (target, attached) in after_scripts {
            order_post_hooks(&mut graph, target, &attached)?;
        }

        graph.ensure_acyclic()?;

        debug!(
            transforms = transforms.len(),
            scripts = scripts.len(),
            edges = graph.edges().len(),
            "dependency graph built"
        );

        Ok(graph)
    }
}

fn validate_bindings(
    scripts: &[ScriptSpec],
    transform_ids: &HashSet<&str>,
    script_ids: &HashSet<&str>,
) -> Result<()> {
    for spec in scripts {
        match spec.bound_to.as_deref() {
            Some(target) if script_ids.contains(target) => {
                return Err(BatchdagError::InvalidBinding {
                    script: spec.id.clone(),
                    reason: format!("'{target}' is a script, not a transform node"),
                });
            }
            Some(target) if spec.is_post_hook && spec.placement == Placement::Before => {
                return Err(BatchdagError::InvalidBinding {
                    script: spec.id.clone(),
                    reason: format!("post-hook on '{target}' must use placement 'after'"),
                });
            }
            Some(target) if !transform_ids.contains(target) => {
                return Err(BatchdagError::UnknownNode {
                    missing: target.to_string(),
                    referenced_by: spec.id.clone(),
                });
            }
            Some(_) => {}
            None if spec.is_post_hook => {
                return Err(BatchdagError::InvalidBinding {
                    script: spec.id.clone(),
                    reason: "post-hook scripts must be bound to a transform node".to_string(),
                });
            }
            None => {}
        }
    }
    Ok(())
}

/// Chain the post-hooks of `target` in declaration order and put them after
/// every plain `after` script of the same target.
fn order_post_hooks(
    graph: &mut DependencyGraph,
    target: &str,
    attached: &[&ScriptSpec],
) -> Result<()> {
    let hooks: Vec<&str> = attached
        .iter()
        .filter(|s| s.is_post_hook)
        .map(|s| s.id.as_str())
        .collect();

    let Some(first_hook) = hooks.first() else {
        return Ok(());
    };

    for plain in attached.iter().filter(|s| !s.is_post_hook) {
        graph.add_edge(&plain.id, first_hook)?;
    }

    for pair in hooks.windows(2) {
        graph.add_edge(pair[0], pair[1])?;
    }

    debug!(target = %target, hooks = ?hooks, "post-hooks ordered");
    Ok(())
}
