// src/exec/backend.rs

//! Pluggable collaborator abstraction.
//!
//! Executors never know how a transform batch or a script is actually run.
//! They talk to a [`NodeRunner`] instead:
//!
//! - [`ShellRunner`](super::command::ShellRunner) is the production runner
//!   used by the `batchdag` binary. It shells out to configured commands.
//! - [`FnRunner`] adapts two plain (blocking) closures, which is what most
//!   library callers and tests want.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::{BatchdagError, Result};
use crate::types::{BatchOutcome, NodeId, TaskOutcome};

/// Boxed future returned by [`NodeRunner`] methods.
pub type RunFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Trait abstracting how planned work is executed.
///
/// An `Err` from either method is treated as a failure of every node the
/// call covered; retries and timeouts are the runner's business.
pub trait NodeRunner: Send + Sync + 'static {
    /// Run transform nodes together, in the given order, and report an
    /// outcome per id.
    fn run_batch<'a>(&'a self, nodes: &'a [NodeId]) -> RunFuture<'a, BatchOutcome>;

    /// Run a single script node.
    fn run_script<'a>(&'a self, node: &'a str) -> RunFuture<'a, TaskOutcome>;
}

/// [`NodeRunner`] built from two blocking closures.
///
/// Each call runs on Tokio's blocking pool so slow collaborators never
/// stall the scheduling loop.
pub struct FnRunner<B, S> {
    batch: Arc<B>,
    script: Arc<S>,
}

impl<B, S> FnRunner<B, S>
where
    B: Fn(&[NodeId]) -> Result<BatchOutcome> + Send + Sync + 'static,
    S: Fn(&str) -> Result<TaskOutcome> + Send + Sync + 'static,
{
    pub fn new(batch: B, script: S) -> Self {
        Self {
            batch: Arc::new(batch),
            script: Arc::new(script),
        }
    }
}

impl<B, S> NodeRunner for FnRunner<B, S>
where
    B: Fn(&[NodeId]) -> Result<BatchOutcome> + Send + Sync + 'static,
    S: Fn(&str) -> Result<TaskOutcome> + Send + Sync + 'static,
{
    fn run_batch<'a>(&'a self, nodes: &'a [NodeId]) -> RunFuture<'a, BatchOutcome> {
        let batch = Arc::clone(&self.batch);
        let nodes = nodes.to_vec();

        Box::pin(async move {
            tokio::task::spawn_blocking(move || batch(&nodes))
                .await
                .map_err(|e| BatchdagError::Other(e.into()))?
        })
    }

    fn run_script<'a>(&'a self, node: &'a str) -> RunFuture<'a, TaskOutcome> {
        let script = Arc::clone(&self.script);
        let node = node.to_string();

        Box::pin(async move {
            tokio::task::spawn_blocking(move || script(&node))
                .await
                .map_err(|e| BatchdagError::Other(e.into()))?
        })
    }
}
