// src/config/mod.rs

//! Plan file loading and validation for the `batchdag` binary.
//!
//! - [`model`] defines the TOML-backed data model.
//! - [`loader`] reads a plan file from disk.
//! - [`validate`] checks config-level invariants.
//!
//! The planner itself never reads files; it only sees
//! [`PlanInput`](crate::dag::PlanInput).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, ScriptConfig, TransformConfig};
