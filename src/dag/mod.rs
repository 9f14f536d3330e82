// src/dag/mod.rs

//! Dependency graph, planning and scheduling state.
//!
//! - [`graph`] holds the acyclic graph of nodes and planned units.
//! - [`builder`] turns transform/script descriptors into a graph.
//! - [`partition`] collapses ancestor-compatible transforms into batches.
//! - [`queue`] tracks readiness and statuses while a plan executes.
//! - [`task`] describes the units handed to executors.
//! - [`step`] defines the result type of a queue completion.
//! - [`report`] is the final per-node result of a run.

pub mod builder;
pub mod graph;
pub mod partition;
pub mod queue;
pub mod report;
pub mod step;
pub mod task;

pub use builder::{GraphBuilder, PlanInput, ScriptSpec, TransformSpec};
pub use graph::{Batch, DependencyGraph, Node, NodeKind, PlanUnit, ScriptBinding};
pub use partition::BatchPartitioner;
pub use queue::TaskQueue;
pub use report::RunReport;
pub use step::QueueStep;
pub use task::{Task, TaskKind};
