// src/exec/mod.rs

//! Execution layer.
//!
//! - [`backend`] defines the [`NodeRunner`] collaborator trait and the
//!   closure-based [`FnRunner`].
//! - [`task_runner`] runs one task and turns errors and panics into
//!   `Failure` outcomes.
//! - [`serial`] and [`concurrent`] are the two interchangeable executors.
//! - [`command`] provides the shell-backed [`ShellRunner`] used by the binary.

pub mod backend;
pub mod command;
pub mod concurrent;
pub mod serial;
pub mod task_runner;

use std::sync::Arc;

pub use backend::{FnRunner, NodeRunner, RunFuture};
pub use command::ShellRunner;
pub use concurrent::ConcurrentExecutor;
pub use serial::SerialExecutor;

use crate::dag::{RunReport, TaskQueue};
use crate::errors::Result;

/// Concurrency width used when none is configured.
pub const DEFAULT_WIDTH: usize = 5;

/// Drain `queue` with the serial executor for `width <= 1`, otherwise with a
/// concurrent executor of that width.
pub async fn execute<R>(queue: &mut TaskQueue, runner: Arc<R>, width: usize) -> Result<RunReport>
where
    R: NodeRunner + ?Sized,
{
    if width <= 1 {
        SerialExecutor::new().run(queue, runner).await
    } else {
        ConcurrentExecutor::new(width).run(queue, runner).await
    }
}
