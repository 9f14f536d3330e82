// tests/shell_runner.rs

#![cfg(unix)]

use std::collections::HashMap;
use std::sync::Arc;

use batchdag::exec::{NodeRunner, ShellRunner};
use batchdag::run_plan;
use batchdag::types::{NodeStatus, TaskOutcome};
use batchdag_test_utils::builders::{ConfigFileBuilder, PlanInputBuilder};
use batchdag_test_utils::{init_tracing, with_timeout};

fn scripts(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(id, cmd)| (id.to_string(), cmd.to_string()))
        .collect()
}

#[test]
fn batch_command_substitutes_node_ids() {
    let runner = ShellRunner::new("dbt run --select {nodes}", HashMap::new());
    let cmd = runner.batch_command(&["a".to_string(), "b".to_string()]);
    assert_eq!(cmd, "dbt run --select a b");
}

#[test]
fn from_config_picks_up_script_commands() {
    let cfg = ConfigFileBuilder::new()
        .batch_cmd("run {nodes}")
        .transform("A", &[])
        .script("load", "echo load", None)
        .build();

    let runner = ShellRunner::from_config(&cfg);
    assert_eq!(runner.batch_command(&["A".to_string()]), "run A");
}

#[tokio::test]
async fn exit_status_maps_to_outcome() {
    init_tracing();

    let runner = ShellRunner::new(
        "test {nodes} = 'a b'",
        scripts(&[("ok", "true"), ("bad", "exit 3")]),
    );

    assert_eq!(runner.run_script("ok").await.unwrap(), TaskOutcome::Success);
    assert_eq!(runner.run_script("bad").await.unwrap(), TaskOutcome::Failure);

    let nodes = vec!["a".to_string(), "b".to_string()];
    let outcome = runner.run_batch(&nodes).await.unwrap();
    assert_eq!(outcome.get("a"), Some(&TaskOutcome::Failure));

    let ok = ShellRunner::new("echo {nodes}", HashMap::new());
    let outcome = ok.run_batch(&nodes).await.unwrap();
    assert!(outcome.values().all(|o| o.is_success()));
    assert_eq!(outcome.len(), 2);
}

#[tokio::test]
async fn unknown_script_is_an_error() {
    let runner = ShellRunner::new("echo {nodes}", HashMap::new());
    assert!(runner.run_script("nowhere").await.is_err());
}

#[tokio::test]
async fn shell_runner_drives_a_whole_plan() {
    init_tracing();

    let input = PlanInputBuilder::new()
        .chain(&["A", "B"])
        .before("prep", "A")
        .after("check", "B")
        .build();
    let runner = Arc::new(ShellRunner::new(
        "echo {nodes}",
        scripts(&[("prep", "true"), ("check", "false")]),
    ));

    let report = with_timeout(run_plan(input, runner, 2)).await.unwrap();

    assert_eq!(report.status_of("prep"), Some(NodeStatus::Success));
    assert_eq!(report.status_of("A"), Some(NodeStatus::Success));
    assert_eq!(report.status_of("B"), Some(NodeStatus::Success));
    assert_eq!(report.status_of("check"), Some(NodeStatus::Failure));
    assert!(!report.all_succeeded());
}
