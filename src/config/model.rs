// src/config/model.rs

use serde::Deserialize;

use crate::dag::{PlanInput, ScriptSpec, TransformSpec};
use crate::types::{NodeId, Placement};

/// Plan file as read from TOML, before validation.
///
/// Nodes are arrays of tables so their declaration order survives parsing:
///
/// ```toml
/// [config]
/// threads = 4
/// batch_cmd = "dbt run --select {nodes}"
///
/// [[transform]]
/// id = "orders"
///
/// [[transform]]
/// id = "revenue"
/// after = ["orders"]
///
/// [[script]]
/// id = "notify"
/// cmd = "python notify.py"
/// bound_to = "revenue"
/// placement = "after"
/// post_hook = true
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub transform: Vec<TransformConfig>,

    #[serde(default)]
    pub script: Vec<ScriptConfig>,
}

/// Validated plan file. Only constructed via `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub transform: Vec<TransformConfig>,
    pub script: Vec<ScriptConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        transform: Vec<TransformConfig>,
        script: Vec<ScriptConfig>,
    ) -> Self {
        Self {
            config,
            transform,
            script,
        }
    }

    /// Descriptors for the planner, in declaration order.
    pub fn to_plan_input(&self) -> PlanInput {
        PlanInput {
            transforms: self
                .transform
                .iter()
                .map(|t| TransformSpec {
                    id: t.id.clone(),
                    upstream: t.after.clone(),
                })
                .collect(),
            scripts: self
                .script
                .iter()
                .map(|s| ScriptSpec {
                    id: s.id.clone(),
                    bound_to: s.bound_to.clone(),
                    placement: s.placement,
                    is_post_hook: s.post_hook,
                    after: s.after.clone(),
                })
                .collect(),
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of tasks in flight. `0` or `1` runs serially.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Command used to run transform nodes. `{nodes}` is replaced by the
    /// space-separated ids of the batch.
    #[serde(default)]
    pub batch_cmd: Option<String>,
}

pub const DEFAULT_THREADS: usize = 5;

fn default_threads() -> usize {
    DEFAULT_THREADS
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            batch_cmd: None,
        }
    }
}

/// `[[transform]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformConfig {
    pub id: NodeId,

    /// Upstream ids this transform waits for.
    #[serde(default)]
    pub after: Vec<NodeId>,
}

/// `[[script]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    pub id: NodeId,

    /// Shell command to run.
    pub cmd: String,

    /// Transform node this script is attached to; absent for free-standing
    /// scripts.
    #[serde(default)]
    pub bound_to: Option<NodeId>,

    /// `"before"` or `"after"` (default) the bound transform.
    #[serde(default)]
    pub placement: Placement,

    /// Run after every plain `after` script of the same transform.
    #[serde(default)]
    pub post_hook: bool,

    /// Explicit extra upstream ids.
    #[serde(default)]
    pub after: Vec<NodeId>,
}
