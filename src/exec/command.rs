// src/exec/command.rs

//! Production [`NodeRunner`] that shells out to configured commands.

use std::collections::HashMap;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::config::validate::NODES_PLACEHOLDER;
use crate::errors::BatchdagError;
use crate::exec::backend::{NodeRunner, RunFuture};
use crate::types::{BatchOutcome, NodeId, TaskOutcome};

/// Runs transform batches through one templated command and each script
/// through its own command.
///
/// Exit status 0 maps to `Success` for every node the command covered,
/// anything else to `Failure`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    batch_cmd: String,
    scripts: HashMap<NodeId, String>,
}

impl ShellRunner {
    pub fn new(batch_cmd: impl Into<String>, scripts: HashMap<NodeId, String>) -> Self {
        Self {
            batch_cmd: batch_cmd.into(),
            scripts,
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        let scripts = cfg
            .script
            .iter()
            .map(|s| (s.id.clone(), s.cmd.clone()))
            .collect();
        Self::new(cfg.config.batch_cmd.clone().unwrap_or_default(), scripts)
    }

    /// The batch command with `{nodes}` substituted.
    pub fn batch_command(&self, nodes: &[NodeId]) -> String {
        self.batch_cmd.replace(NODES_PLACEHOLDER, &nodes.join(" "))
    }
}

impl NodeRunner for ShellRunner {
    fn run_batch<'a>(&'a self, nodes: &'a [NodeId]) -> RunFuture<'a, BatchOutcome> {
        Box::pin(async move {
            let cmd = self.batch_command(nodes);
            let label = nodes.join(",");
            let outcome = run_shell(&label, &cmd).await?;
            Ok(nodes.iter().map(|n| (n.clone(), outcome)).collect())
        })
    }

    fn run_script<'a>(&'a self, node: &'a str) -> RunFuture<'a, TaskOutcome> {
        Box::pin(async move {
            let cmd = self.scripts.get(node).ok_or_else(|| {
                BatchdagError::ConfigError(format!("no command configured for script '{node}'"))
            })?;
            let outcome = run_shell(node, cmd).await?;
            Ok(outcome)
        })
    }
}

/// Run `cmd` through the platform shell and map its exit status.
async fn run_shell(label: &str, cmd: &str) -> anyhow::Result<TaskOutcome> {
    info!(task = %label, cmd = %cmd, "starting process");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for '{label}'"))?;

    if let Some(stdout) = child.stdout.take() {
        let label = label.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(task = %label, "stdout: {}", line);
            }
        });
    }

    // Always consume stderr so buffers don't fill.
    if let Some(stderr) = child.stderr.take() {
        let label = label.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %label, "stderr: {}", line);
            }
        });
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of '{label}'"))?;

    let code = status.code().unwrap_or(-1);
    info!(
        task = %label,
        exit_code = code,
        success = status.success(),
        "process exited"
    );

    Ok(if status.success() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failure
    })
}
