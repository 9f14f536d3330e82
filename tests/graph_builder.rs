// tests/graph_builder.rs

use batchdag::dag::{GraphBuilder, NodeKind, PlanUnit, ScriptSpec, TransformSpec};
use batchdag::errors::BatchdagError;
use batchdag::types::Placement;
use batchdag_test_utils::builders::PlanInputBuilder;

fn has_edge(graph: &batchdag::dag::DependencyGraph, from: &str, to: &str) -> bool {
    graph.edges().contains(&(from, to))
}

#[test]
fn transforms_get_edges_from_their_upstream_ids() {
    let input = PlanInputBuilder::new()
        .transform("A", &[])
        .transform("B", &["A"])
        .transform("C", &["A", "B"])
        .build();

    let graph = GraphBuilder::from_input(input).build().unwrap();

    assert_eq!(graph.len(), 3);
    assert!(has_edge(&graph, "A", "B"));
    assert!(has_edge(&graph, "A", "C"));
    assert!(has_edge(&graph, "B", "C"));
    assert_eq!(graph.edges().len(), 3);
    assert_eq!(graph.dependencies_of("C"), vec!["A", "B"]);
    assert_eq!(graph.dependents_of("A"), vec!["B", "C"]);
}

#[test]
fn before_and_after_scripts_attach_to_their_target() {
    let input = PlanInputBuilder::new()
        .transform("A", &[])
        .before("prep", "A")
        .after("report", "A")
        .build();

    let graph = GraphBuilder::from_input(input).build().unwrap();

    assert!(has_edge(&graph, "prep", "A"));
    assert!(has_edge(&graph, "A", "report"));
    assert_eq!(graph.edges().len(), 2);

    match graph.unit("prep") {
        Some(PlanUnit::Node(node)) => match &node.kind {
            NodeKind::Script {
                binding: Some(binding),
            } => {
                assert_eq!(binding.target, "A");
                assert_eq!(binding.placement, Placement::Before);
                assert!(!binding.is_post_hook);
            }
            other => panic!("expected bound script, got {other:?}"),
        },
        other => panic!("expected node, got {other:?}"),
    }
}

#[test]
fn post_hooks_run_after_plain_after_scripts_in_declaration_order() {
    let input = PlanInputBuilder::new()
        .transform("T", &[])
        .after("plain_1", "T")
        .post_hook("hook_1", "T")
        .after("plain_2", "T")
        .post_hook("hook_2", "T")
        .build();

    let graph = GraphBuilder::from_input(input).build().unwrap();

    for script in ["plain_1", "plain_2", "hook_1", "hook_2"] {
        assert!(has_edge(&graph, "T", script), "T -> {script} missing");
    }
    assert!(has_edge(&graph, "plain_1", "hook_1"));
    assert!(has_edge(&graph, "plain_2", "hook_1"));
    assert!(has_edge(&graph, "hook_1", "hook_2"));
    assert!(!has_edge(&graph, "plain_1", "plain_2"));

    let order = graph.topological_order().unwrap();
    let pos = |id: &str| order.iter().position(|n| *n == id).unwrap();
    assert!(pos("plain_2") < pos("hook_1"));
    assert!(pos("hook_1") < pos("hook_2"));

    match graph.unit("T") {
        Some(PlanUnit::Node(node)) => assert!(node.has_post_hook()),
        other => panic!("expected node, got {other:?}"),
    }
}

#[test]
fn plain_after_scripts_without_post_hooks_stay_unordered() {
    let input = PlanInputBuilder::new()
        .transform("T", &[])
        .after("a", "T")
        .after("b", "T")
        .build();

    let graph = GraphBuilder::from_input(input).build().unwrap();

    assert!(!has_edge(&graph, "a", "b"));
    assert!(!has_edge(&graph, "b", "a"));
    match graph.unit("T") {
        Some(PlanUnit::Node(node)) => assert!(!node.has_post_hook()),
        other => panic!("expected node, got {other:?}"),
    }
}

#[test]
fn free_scripts_have_no_edges_unless_ordered_explicitly() {
    let input = PlanInputBuilder::new()
        .transform("A", &[])
        .free_script("cleanup", &[])
        .free_script("audit", &["A", "cleanup"])
        .build();

    let graph = GraphBuilder::from_input(input).build().unwrap();

    assert!(graph.dependencies_of("cleanup").is_empty());
    assert!(graph.dependents_of("cleanup").contains(&"audit"));
    assert_eq!(graph.dependencies_of("audit"), vec!["A", "cleanup"]);
}

#[test]
fn duplicate_ids_are_rejected() {
    let result = GraphBuilder::new()
        .transform(TransformSpec::new("A"))
        .script(ScriptSpec::free("A"))
        .build();

    match result {
        Err(BatchdagError::DuplicateNode(id)) => assert_eq!(id, "A"),
        other => panic!("expected DuplicateNode, got {other:?}"),
    }
}

#[test]
fn binding_to_a_missing_transform_is_rejected() {
    let input = PlanInputBuilder::new()
        .transform("A", &[])
        .after("report", "Missing")
        .build();

    match GraphBuilder::from_input(input).build() {
        Err(BatchdagError::UnknownNode {
            missing,
            referenced_by,
        }) => {
            assert_eq!(missing, "Missing");
            assert_eq!(referenced_by, "report");
        }
        other => panic!("expected UnknownNode, got {other:?}"),
    }
}

#[test]
fn binding_to_a_script_is_rejected() {
    let input = PlanInputBuilder::new()
        .free_script("setup", &[])
        .after("report", "setup")
        .build();

    match GraphBuilder::from_input(input).build() {
        Err(BatchdagError::InvalidBinding { script, .. }) => assert_eq!(script, "report"),
        other => panic!("expected InvalidBinding, got {other:?}"),
    }
}

#[test]
fn post_hook_before_its_target_is_rejected() {
    let spec = ScriptSpec {
        is_post_hook: true,
        ..ScriptSpec::bound("hook", "A", Placement::Before)
    };
    let input = PlanInputBuilder::new().transform("A", &[]).script(spec).build();

    assert!(matches!(
        GraphBuilder::from_input(input).build(),
        Err(BatchdagError::InvalidBinding { .. })
    ));
}

#[test]
fn unknown_upstream_is_rejected() {
    let input = PlanInputBuilder::new().transform("B", &["A"]).build();

    match GraphBuilder::from_input(input).build() {
        Err(BatchdagError::UnknownNode { missing, .. }) => assert_eq!(missing, "A"),
        other => panic!("expected UnknownNode, got {other:?}"),
    }
}

#[test]
fn cycles_report_the_nodes_involved() {
    let input = PlanInputBuilder::new()
        .transform("A", &["C"])
        .transform("B", &["A"])
        .transform("C", &["B"])
        .transform("D", &["C"])
        .build();

    match GraphBuilder::from_input(input).build() {
        Err(BatchdagError::DagCycle(ids)) => {
            assert_eq!(ids, vec!["A".to_string(), "B".to_string(), "C".to_string()]);
        }
        other => panic!("expected DagCycle, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_a_cycle() {
    let input = PlanInputBuilder::new().transform("A", &["A"]).build();

    match GraphBuilder::from_input(input).build() {
        Err(BatchdagError::DagCycle(ids)) => assert_eq!(ids, vec!["A".to_string()]),
        other => panic!("expected DagCycle, got {other:?}"),
    }
}

#[test]
fn cycle_through_a_before_script_is_detected() {
    // prep -> A, and prep is explicitly ordered after A.
    let spec = ScriptSpec::bound("prep", "A", Placement::Before).after("A");
    let input = PlanInputBuilder::new().transform("A", &[]).script(spec).build();

    match GraphBuilder::from_input(input).build() {
        Err(BatchdagError::DagCycle(ids)) => {
            assert_eq!(ids, vec!["A".to_string(), "prep".to_string()]);
        }
        other => panic!("expected DagCycle, got {other:?}"),
    }
}

#[test]
fn topological_order_breaks_ties_by_declaration_order() {
    let input = PlanInputBuilder::new()
        .transform("z", &[])
        .transform("a", &[])
        .transform("m", &["z"])
        .free_script("s", &[])
        .build();

    let graph = GraphBuilder::from_input(input).build().unwrap();

    assert_eq!(graph.topological_order().unwrap(), vec!["z", "a", "m", "s"]);
}

#[test]
fn ancestors_are_transitive() {
    let input = PlanInputBuilder::new()
        .chain(&["A", "B", "C"])
        .before("prep", "B")
        .build();

    let graph = GraphBuilder::from_input(input).build().unwrap();
    let ancestors: Vec<String> = graph.ancestors_of("C").into_iter().collect();

    assert_eq!(ancestors, vec!["A", "B", "prep"]);
}
