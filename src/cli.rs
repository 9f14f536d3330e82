// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `batchdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "batchdag",
    version,
    about = "Plan and run transform batches and scripts over a dependency graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plan file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Maximum number of tasks in flight (0 or 1 runs serially).
    ///
    /// Overrides `[config].threads`.
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BATCHDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build and partition the plan, print it, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
