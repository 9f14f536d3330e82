use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use batchdag::errors::BatchdagError;
use batchdag::exec::{NodeRunner, RunFuture};
use batchdag::types::{BatchOutcome, NodeId, TaskOutcome};

/// A fake runner that:
/// - records every call (batch members or script id) in dispatch order
/// - reports `Failure` for configured node ids and `Success` otherwise
/// - can return an error or panic for configured ids
/// - tracks how many calls were in flight at once
#[derive(Default)]
pub struct RecordingRunner {
    failing: HashSet<NodeId>,
    erroring: HashSet<NodeId>,
    panicking: HashSet<NodeId>,
    delay: Duration,
    calls: Mutex<Vec<Vec<NodeId>>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `Failure` for `id`.
    pub fn fail(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn fail_all<'a>(mut self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        self.failing.extend(ids.into_iter().map(str::to_string));
        self
    }

    /// Return an `Err` from any call covering `id`.
    pub fn error_on(mut self, id: &str) -> Self {
        self.erroring.insert(id.to_string());
        self
    }

    /// Panic inside any call covering `id`.
    pub fn panic_on(mut self, id: &str) -> Self {
        self.panicking.insert(id.to_string());
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Calls in the order they started.
    pub fn calls(&self) -> Vec<Vec<NodeId>> {
        self.calls.lock().unwrap().clone()
    }

    /// Flattened node ids in the order they were submitted.
    pub fn node_order(&self) -> Vec<NodeId> {
        self.calls().into_iter().flatten().collect()
    }

    /// Highest number of calls that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn call(&self, nodes: &[NodeId]) -> Result<BatchOutcome, BatchdagError> {
        self.calls.lock().unwrap().push(nodes.to_vec());
        let _guard = ActiveGuard::enter(&self.active, &self.peak);

        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(id) = nodes.iter().find(|n| self.panicking.contains(*n)) {
            panic!("fake runner panic for '{id}'");
        }
        if let Some(id) = nodes.iter().find(|n| self.erroring.contains(*n)) {
            return Err(BatchdagError::Other(anyhow::anyhow!(
                "fake runner error for '{id}'"
            )));
        }

        Ok(nodes
            .iter()
            .map(|n| {
                let outcome = if self.failing.contains(n) {
                    TaskOutcome::Failure
                } else {
                    TaskOutcome::Success
                };
                (n.clone(), outcome)
            })
            .collect())
    }
}

impl NodeRunner for RecordingRunner {
    fn run_batch<'a>(&'a self, nodes: &'a [NodeId]) -> RunFuture<'a, BatchOutcome> {
        Box::pin(self.call(nodes))
    }

    fn run_script<'a>(&'a self, node: &'a str) -> RunFuture<'a, TaskOutcome> {
        Box::pin(async move {
            let nodes = [node.to_string()];
            let outcome = self.call(&nodes).await?;
            Ok(outcome
                .get(node)
                .copied()
                .unwrap_or(TaskOutcome::Failure))
        })
    }
}

/// Counts a call as active until dropped, so panics are accounted for too.
struct ActiveGuard<'a> {
    active: &'a AtomicUsize,
}

impl<'a> ActiveGuard<'a> {
    fn enter(active: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { active }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
