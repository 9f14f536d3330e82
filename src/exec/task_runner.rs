// src/exec/task_runner.rs

//! Run a single task against a [`NodeRunner`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::dag::{Task, TaskKind};
use crate::errors::Result;
use crate::exec::backend::NodeRunner;
use crate::types::{BatchOutcome, NodeId, TaskOutcome};

/// Run `task` on its own Tokio task and wait for its per-node outcomes.
///
/// This is the pool boundary: a runner error and a panicking worker both
/// come back as `Failure` for every node of the task, never as an error of
/// the executor itself.
pub async fn run_task<R>(runner: Arc<R>, task: Task) -> BatchOutcome
where
    R: NodeRunner + ?Sized,
{
    let unit = task.unit_id.clone();
    let run_index = task.run_index;
    let nodes = task.node_ids().to_vec();
    let started = Instant::now();

    let handle = tokio::spawn(async move { invoke(runner.as_ref(), &task).await });

    let outcome = match handle.await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            warn!(unit = %unit, run_index, error = %err, "runner returned an error");
            uniform(&nodes, TaskOutcome::Failure)
        }
        Err(join_err) => {
            error!(unit = %unit, run_index, error = %join_err, "worker crashed while running task");
            uniform(&nodes, TaskOutcome::Failure)
        }
    };

    info!(
        unit = %unit,
        run_index,
        elapsed_ms = started.elapsed().as_millis() as u64,
        success = outcome.values().all(|o| o.is_success()),
        "task finished"
    );

    outcome
}

async fn invoke<R>(runner: &R, task: &Task) -> Result<BatchOutcome>
where
    R: NodeRunner + ?Sized,
{
    match &task.kind {
        TaskKind::Transforms(ids) => runner.run_batch(ids).await,
        TaskKind::Script(id) => {
            let outcome = runner.run_script(id).await?;
            Ok(BatchOutcome::from([(id.clone(), outcome)]))
        }
    }
}

fn uniform(nodes: &[NodeId], outcome: TaskOutcome) -> BatchOutcome {
    nodes.iter().map(|n| (n.clone(), outcome)).collect()
}
