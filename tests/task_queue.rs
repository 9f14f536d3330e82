// tests/task_queue.rs

use batchdag::dag::{PlanInput, TaskKind, TaskQueue};
use batchdag::plan;
use batchdag::types::{BatchOutcome, NodeStatus, TaskOutcome};
use batchdag_test_utils::builders::PlanInputBuilder;

fn queue_for(input: PlanInput) -> TaskQueue {
    TaskQueue::new(plan(input).unwrap()).unwrap()
}

/// A -> {S1, S2} -> B, where S1 and S2 are scripts.
fn split_input() -> PlanInput {
    PlanInputBuilder::new()
        .transform("A", &[])
        .transform("B", &["S1", "S2"])
        .free_script("S1", &["A"])
        .free_script("S2", &["A"])
        .build()
}

/// Diamond A -> {B, C} -> D with scripts in the middle so nothing batches.
fn diamond_input() -> PlanInput {
    PlanInputBuilder::new()
        .free_script("A", &[])
        .free_script("B", &["A"])
        .free_script("C", &["A"])
        .free_script("D", &["B", "C"])
        .build()
}

#[test]
fn roots_are_ready_and_everything_starts_pending() {
    let mut queue = queue_for(split_input());

    for id in ["A", "S1", "S2", "B"] {
        assert_eq!(queue.status_of(id), Some(NodeStatus::Pending));
        assert_eq!(queue.node_status(id), Some(NodeStatus::Pending));
    }
    assert_eq!(queue.ready_tasks(), vec!["A"]);
    assert_eq!(queue.deps_satisfied("A"), Some(true));
    assert_eq!(queue.deps_satisfied("B"), Some(false));
    assert_eq!(queue.deps_satisfied("nope"), None);
    assert!(!queue.is_done());
}

#[test]
fn assign_describes_the_unit_and_is_idempotent() {
    let mut queue = queue_for(split_input());

    let task = queue.assign("A").expect("A is ready");
    assert_eq!(task.unit_id, "A");
    assert_eq!(task.kind, TaskKind::Transforms(vec!["A".to_string()]));
    assert_eq!(task.run_index, 1);
    assert_eq!(queue.status_of("A"), Some(NodeStatus::Running));
    assert_eq!(queue.running_count(), 1);

    assert!(queue.assign("A").is_none());
    assert!(queue.assign("B").is_none(), "B is not ready yet");
    assert!(queue.assign("unknown").is_none());
    assert!(queue.ready_tasks().is_empty());
}

#[test]
fn success_unlocks_dependents_in_topological_order() {
    let mut queue = queue_for(split_input());

    queue.assign("A").unwrap();
    let step = queue.finish("A", TaskOutcome::Success);
    assert_eq!(step.unit_status, Some(NodeStatus::Success));
    assert!(step.newly_skipped.is_empty());
    assert!(!step.done);

    assert_eq!(queue.ready_tasks(), vec!["S1", "S2"]);

    let s1 = queue.assign("S1").unwrap();
    assert!(s1.is_script());
    assert_eq!(s1.run_index, 2);
    queue.assign("S2").unwrap();
    assert_eq!(queue.running_count(), 2);

    queue.finish("S2", TaskOutcome::Success);
    assert!(queue.ready_tasks().is_empty(), "B still waits for S1");

    queue.finish("S1", TaskOutcome::Success);
    assert_eq!(queue.ready_tasks(), vec!["B"]);
    queue.assign("B").unwrap();
    let step = queue.finish("B", TaskOutcome::Success);
    assert!(step.done);

    let report = queue.report();
    assert!(report.all_succeeded());
    let order: Vec<&str> = report.dispatched.iter().map(|(_, id)| id.as_str()).collect();
    assert_eq!(order, vec!["A", "S1", "S2", "B"]);
}

#[test]
fn failure_skips_the_whole_downstream_closure() {
    let mut queue = queue_for(split_input());

    queue.assign("A").unwrap();
    let step = queue.finish("A", TaskOutcome::Failure);

    assert_eq!(step.unit_status, Some(NodeStatus::Failure));
    let mut skipped = step.newly_skipped.clone();
    skipped.sort();
    assert_eq!(skipped, vec!["B", "S1", "S2"]);
    assert!(step.done);
    assert!(queue.is_done());
    assert!(queue.ready_tasks().is_empty());

    let report = queue.report();
    assert_eq!(report.failed(), vec!["A"]);
    assert_eq!(report.skipped(), vec!["B", "S1", "S2"]);
}

#[test]
fn diamond_with_failed_branch_skips_the_join() {
    let mut queue = queue_for(diamond_input());

    queue.assign("A").unwrap();
    queue.finish("A", TaskOutcome::Success);
    assert_eq!(queue.ready_tasks(), vec!["B", "C"]);

    queue.assign("B").unwrap();
    queue.assign("C").unwrap();
    let step = queue.finish("B", TaskOutcome::Failure);
    assert_eq!(step.newly_skipped, vec!["D"]);
    assert!(!step.done, "C is still running");

    let step = queue.finish("C", TaskOutcome::Success);
    assert!(step.done);

    assert_eq!(queue.node_status("A"), Some(NodeStatus::Success));
    assert_eq!(queue.node_status("B"), Some(NodeStatus::Failure));
    assert_eq!(queue.node_status("C"), Some(NodeStatus::Success));
    assert_eq!(queue.node_status("D"), Some(NodeStatus::Skipped));
}

#[test]
fn finishing_a_unit_that_is_not_running_is_ignored() {
    let mut queue = queue_for(split_input());

    let step = queue.finish("A", TaskOutcome::Success);
    assert_eq!(step.unit_status, None);
    assert_eq!(queue.status_of("A"), Some(NodeStatus::Pending));

    queue.assign("A").unwrap();
    queue.finish("A", TaskOutcome::Success);
    let again = queue.finish("A", TaskOutcome::Failure);
    assert_eq!(again.unit_status, None);
    assert_eq!(queue.status_of("A"), Some(NodeStatus::Success));

    let unknown = queue.finish("ghost", TaskOutcome::Success);
    assert_eq!(unknown.unit_status, None);
}

#[test]
fn batch_members_get_individual_statuses() {
    let mut queue = queue_for(PlanInputBuilder::new().chain(&["A", "B", "C"]).build());

    let ready = queue.ready_tasks();
    assert_eq!(ready.len(), 1);
    let task = queue.assign(&ready[0]).unwrap();
    assert_eq!(
        task.kind,
        TaskKind::Transforms(vec!["A".to_string(), "B".to_string(), "C".to_string()])
    );
    assert_eq!(queue.node_status("B"), Some(NodeStatus::Running));

    let outcomes = BatchOutcome::from([
        ("A".to_string(), TaskOutcome::Success),
        ("B".to_string(), TaskOutcome::Failure),
        ("C".to_string(), TaskOutcome::Success),
    ]);
    let step = queue.finish_with(&task.unit_id, &outcomes);

    assert_eq!(step.unit_status, Some(NodeStatus::Failure));
    assert!(step.done);
    assert_eq!(queue.node_status("A"), Some(NodeStatus::Success));
    assert_eq!(queue.node_status("B"), Some(NodeStatus::Failure));
    assert_eq!(
        queue.node_status("C"),
        Some(NodeStatus::Skipped),
        "C sits downstream of the failed member"
    );
}

#[test]
fn missing_batch_member_outcomes_are_failures() {
    let mut queue = queue_for(
        PlanInputBuilder::new()
            .transform("A", &[])
            .transform("B", &[])
            .after("report", "B")
            .build(),
    );

    let ready = queue.ready_tasks();
    let task = queue.assign(&ready[0]).unwrap();
    assert_eq!(task.node_ids(), ["A".to_string(), "B".to_string()]);

    let outcomes = BatchOutcome::from([("A".to_string(), TaskOutcome::Success)]);
    let step = queue.finish_with(&task.unit_id, &outcomes);

    assert_eq!(step.unit_status, Some(NodeStatus::Failure));
    assert_eq!(step.newly_skipped, vec!["report"]);
    assert_eq!(queue.node_status("A"), Some(NodeStatus::Success));
    assert_eq!(queue.node_status("B"), Some(NodeStatus::Failure));
    assert_eq!(queue.node_status("report"), Some(NodeStatus::Skipped));
}

#[test]
fn successful_batch_marks_every_member() {
    let mut queue = queue_for(
        PlanInputBuilder::new()
            .chain(&["A", "B"])
            .after("report", "B")
            .build(),
    );

    let ready = queue.ready_tasks();
    let task = queue.assign(&ready[0]).unwrap();
    queue.finish(&task.unit_id, TaskOutcome::Success);

    assert_eq!(queue.node_status("A"), Some(NodeStatus::Success));
    assert_eq!(queue.node_status("B"), Some(NodeStatus::Success));
    assert_eq!(queue.ready_tasks(), vec!["report"]);
}
