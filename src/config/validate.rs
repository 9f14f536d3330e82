// src/config/validate.rs

//! Config-level checks. Graph structure (unknown ids, cycles, bindings) is
//! validated by the graph builder.

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BatchdagError, Result};

pub const NODES_PLACEHOLDER: &str = "{nodes}";

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BatchdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.transform, raw.script))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_nodes(cfg)?;
    validate_batch_cmd(cfg)?;
    validate_scripts(cfg)?;
    Ok(())
}

fn ensure_has_nodes(cfg: &RawConfigFile) -> Result<()> {
    if cfg.transform.is_empty() && cfg.script.is_empty() {
        return Err(BatchdagError::ConfigError(
            "config must contain at least one [[transform]] or [[script]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_batch_cmd(cfg: &RawConfigFile) -> Result<()> {
    if cfg.transform.is_empty() {
        return Ok(());
    }

    match cfg.config.batch_cmd.as_deref().map(str::trim) {
        None | Some("") => Err(BatchdagError::ConfigError(
            "[config].batch_cmd is required when transforms are declared".to_string(),
        )),
        Some(cmd) if !cmd.contains(NODES_PLACEHOLDER) => Err(BatchdagError::ConfigError(
            format!("[config].batch_cmd must contain the {NODES_PLACEHOLDER} placeholder"),
        )),
        Some(_) => Ok(()),
    }
}

fn validate_scripts(cfg: &RawConfigFile) -> Result<()> {
    for script in &cfg.script {
        if script.cmd.trim().is_empty() {
            return Err(BatchdagError::ConfigError(format!(
                "script '{}' has an empty `cmd`",
                script.id
            )));
        }
    }
    Ok(())
}
