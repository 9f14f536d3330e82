// src/exec/serial.rs

//! Single-threaded executor: one task at a time, in topological order.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::dag::{RunReport, TaskQueue};
use crate::errors::{BatchdagError, Result};
use crate::exec::backend::NodeRunner;
use crate::exec::task_runner::run_task;

/// Drives a [`TaskQueue`] by running the first ready unit, waiting for it,
/// and repeating until the queue is done.
///
/// Dispatch order is fully deterministic, which makes this the executor of
/// choice for debugging and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialExecutor;

impl SerialExecutor {
    pub fn new() -> Self {
        Self
    }

    pub async fn run<R>(&self, queue: &mut TaskQueue, runner: Arc<R>) -> Result<RunReport>
    where
        R: NodeRunner + ?Sized,
    {
        info!("serial executor started");

        while !queue.is_done() {
            let Some(task) = queue
                .ready_tasks()
                .into_iter()
                .find_map(|unit| queue.assign(&unit))
            else {
                if queue.is_done() {
                    break;
                }
                error!("no runnable unit but the queue is not done");
                return Err(BatchdagError::PlanInvariant(
                    "serial executor stalled: nothing ready and nothing running".to_string(),
                ));
            };

            let unit = task.unit_id.clone();
            let outcome = run_task(Arc::clone(&runner), task).await;
            let step = queue.finish_with(&unit, &outcome);
            debug!(unit = %unit, ?step, "serial step complete");
        }

        let mut report = queue.report();
        report.peak_concurrency = usize::from(!report.dispatched.is_empty());

        info!(
            dispatched = report.dispatched.len(),
            all_succeeded = report.all_succeeded(),
            "serial executor finished"
        );
        Ok(report)
    }
}
