// tests/cli_args.rs

use std::path::PathBuf;

use batchdag::cli::{CliArgs, LogLevel};
use clap::Parser;

#[test]
fn config_path_defaults_to_batchdag_toml() {
    let args = CliArgs::try_parse_from(["batchdag"]).unwrap();

    assert_eq!(args.config, PathBuf::from("Batchdag.toml"));
    assert!(args.threads.is_none());
    assert!(args.log_level.is_none());
    assert!(!args.dry_run);
}

#[test]
fn flags_override_defaults() {
    let args = CliArgs::try_parse_from([
        "batchdag",
        "--config",
        "plans/nightly.toml",
        "--threads",
        "3",
        "--log-level",
        "debug",
        "--dry-run",
    ])
    .unwrap();

    assert_eq!(args.config, PathBuf::from("plans/nightly.toml"));
    assert_eq!(args.threads, Some(3));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert!(args.dry_run);
}

#[test]
fn unknown_log_level_is_rejected() {
    assert!(CliArgs::try_parse_from(["batchdag", "--log-level", "loud"]).is_err());
}
