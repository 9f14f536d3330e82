// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Unknown node '{missing}' referenced by '{referenced_by}'")]
    UnknownNode {
        missing: String,
        referenced_by: String,
    },

    #[error("Invalid binding for script '{script}': {reason}")]
    InvalidBinding { script: String, reason: String },

    #[error("Cycle detected in DAG involving nodes: {}", .0.join(", "))]
    DagCycle(Vec<String>),

    #[error("Plan invariant violated: {0}")]
    PlanInvariant(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BatchdagError>;
