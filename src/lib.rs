// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{
    BatchPartitioner, DependencyGraph, GraphBuilder, NodeKind, PlanInput, PlanUnit, RunReport,
    TaskQueue,
};
use crate::errors::Result;
use crate::exec::{NodeRunner, ShellRunner};
use crate::types::Placement;

/// Build the dependency graph for `input` and partition it into a plan.
///
/// Fails before anything runs on duplicate ids, dangling references and
/// cycles.
pub fn plan(input: PlanInput) -> Result<DependencyGraph> {
    let graph = GraphBuilder::from_input(input).build()?;
    BatchPartitioner::new().partition(graph)
}

/// Plan `input` and execute it with `runner`.
///
/// `width <= 1` selects the serial executor. The report covers every
/// declared node even when some of them fail.
pub async fn run_plan<R>(input: PlanInput, runner: Arc<R>, width: usize) -> Result<RunReport>
where
    R: NodeRunner + ?Sized,
{
    let planned = plan(input)?;
    let mut queue = TaskQueue::new(planned)?;
    exec::execute(&mut queue, runner, width).await
}

/// High-level entry point used by `main.rs`.
///
/// Returns whether every node succeeded.
pub async fn run(args: CliArgs) -> anyhow::Result<bool> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        let planned = plan(cfg.to_plan_input())?;
        print_dry_run(&cfg, &planned)?;
        return Ok(true);
    }

    let width = args.threads.unwrap_or(cfg.config.threads);
    info!(config = %args.config.display(), width, "starting run");

    let runner = Arc::new(ShellRunner::from_config(&cfg));
    let report = run_plan(cfg.to_plan_input(), runner, width).await?;

    print_summary(&report);
    Ok(report.all_succeeded())
}

/// Print the planned units in topological order.
fn print_dry_run(cfg: &ConfigFile, planned: &DependencyGraph) -> Result<()> {
    println!("batchdag dry-run");
    println!("  config.threads = {}", cfg.config.threads);
    if let Some(ref cmd) = cfg.config.batch_cmd {
        println!("  config.batch_cmd = {cmd}");
    }
    println!();

    println!("units ({}):", planned.len());
    for id in planned.topological_order()? {
        let Some(unit) = planned.unit(id) else {
            continue;
        };
        match unit {
            PlanUnit::Batch(batch) => {
                println!("  - {} (batch)", batch.id);
                println!("      nodes: {:?}", batch.members);
            }
            PlanUnit::Node(node) => match &node.kind {
                NodeKind::Transform { .. } => println!("  - {} (transform)", node.id),
                NodeKind::Script { binding: None } => println!("  - {} (script)", node.id),
                NodeKind::Script {
                    binding: Some(binding),
                } => {
                    let placement = match binding.placement {
                        Placement::Before => "before",
                        Placement::After => "after",
                    };
                    let hook = if binding.is_post_hook { ", post-hook" } else { "" };
                    println!(
                        "  - {} (script, {placement} {}{hook})",
                        node.id, binding.target
                    );
                }
            },
        }
        let deps = planned.dependencies_of(id);
        if !deps.is_empty() {
            println!("      after: {deps:?}");
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!("batchdag run summary");
    for (node, status) in &report.statuses {
        println!("  {node}: {status}");
    }
    println!(
        "  dispatched {} task(s), peak concurrency {}",
        report.dispatched.len(),
        report.peak_concurrency
    );
}
