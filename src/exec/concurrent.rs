// src/exec/concurrent.rs

//! Bounded-width executor driven by a channel of completions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info};

use crate::dag::{RunReport, TaskQueue};
use crate::errors::{BatchdagError, Result};
use crate::exec::backend::NodeRunner;
use crate::exec::task_runner::run_task;
use crate::types::{BatchOutcome, NodeId};

/// Completion message sent by a finished worker.
#[derive(Debug)]
struct Completion {
    unit: NodeId,
    outcome: BatchOutcome,
}

/// Runs up to `width` tasks at once.
///
/// The loop is the only writer of the [`TaskQueue`]:
///
/// 1. fill free slots with ready units (in topological order)
/// 2. wait for the next completion on the channel
/// 3. record it with `finish_with`, which may unlock or skip dependents
///
/// Workers only send messages; they never touch the queue. They are also
/// tracked in a [`JoinSet`], so a worker that dies before sending still
/// completes its unit (as `Failure`) instead of stalling the loop.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrentExecutor {
    width: usize,
}

impl ConcurrentExecutor {
    /// `width` is clamped to at least 1.
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub async fn run<R>(&self, queue: &mut TaskQueue, runner: Arc<R>) -> Result<RunReport>
    where
        R: NodeRunner + ?Sized,
    {
        info!(width = self.width, "concurrent executor started");

        let (tx, mut rx) = mpsc::channel::<Completion>(self.width);
        let mut workers: JoinSet<()> = JoinSet::new();
        let mut worker_units: HashMap<task::Id, NodeId> = HashMap::new();
        let mut in_flight = 0usize;
        let mut peak = 0usize;

        loop {
            if in_flight < self.width {
                for unit in queue.ready_tasks() {
                    if in_flight >= self.width {
                        break;
                    }
                    let Some(task) = queue.assign(&unit) else {
                        continue;
                    };

                    in_flight += 1;
                    peak = peak.max(in_flight);

                    let runner = Arc::clone(&runner);
                    let tx = tx.clone();
                    let unit = task.unit_id.clone();
                    let handle = workers.spawn(async move {
                        let unit = task.unit_id.clone();
                        let outcome = run_task(runner, task).await;
                        if tx.send(Completion { unit, outcome }).await.is_err() {
                            debug!("executor loop gone; dropping completion");
                        }
                    });
                    worker_units.insert(handle.id(), unit);
                }
            }

            if in_flight == 0 {
                if queue.is_done() {
                    break;
                }
                error!("no runnable unit but the queue is not done");
                return Err(BatchdagError::PlanInvariant(
                    "concurrent executor stalled: nothing ready and nothing running".to_string(),
                ));
            }

            let completion = tokio::select! {
                Some(completion) = rx.recv() => completion,
                Some(joined) = workers.join_next_with_id() => match joined {
                    Ok((id, ())) => {
                        worker_units.remove(&id);
                        continue;
                    }
                    Err(join_err) => {
                        let Some(unit) = worker_units.remove(&join_err.id()) else {
                            continue;
                        };
                        error!(unit = %unit, error = %join_err, "worker died before reporting; recording Failure");
                        // No outcomes: every member resolves to Failure.
                        Completion {
                            unit,
                            outcome: BatchOutcome::new(),
                        }
                    }
                },
                else => {
                    return Err(BatchdagError::PlanInvariant(
                        "completion channel closed with tasks in flight".to_string(),
                    ));
                }
            };
            in_flight -= 1;

            let step = queue.finish_with(&completion.unit, &completion.outcome);
            debug!(unit = %completion.unit, in_flight, ?step, "completion recorded");
        }

        let mut report = queue.report();
        report.peak_concurrency = peak;

        info!(
            dispatched = report.dispatched.len(),
            peak_concurrency = peak,
            all_succeeded = report.all_succeeded(),
            "concurrent executor finished"
        );
        Ok(report)
    }
}
