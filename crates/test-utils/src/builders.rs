#![allow(dead_code)]

use batchdag::config::{ConfigFile, ConfigSection, RawConfigFile, ScriptConfig, TransformConfig};
use batchdag::dag::{PlanInput, ScriptSpec, TransformSpec};
use batchdag::types::Placement;

/// Builder for [`PlanInput`] to keep test graphs short.
#[derive(Debug, Default)]
pub struct PlanInputBuilder {
    input: PlanInput,
}

impl PlanInputBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform `id` depending on `upstream`.
    pub fn transform(mut self, id: &str, upstream: &[&str]) -> Self {
        let spec = upstream
            .iter()
            .fold(TransformSpec::new(id), |spec, up| spec.after(*up));
        self.input.transforms.push(spec);
        self
    }

    /// Linear chain `ids[0] -> ids[1] -> ...`.
    pub fn chain(mut self, ids: &[&str]) -> Self {
        let mut previous: Option<&str> = None;
        for id in ids {
            let upstream: Vec<&str> = previous.into_iter().collect();
            self = self.transform(id, &upstream);
            previous = Some(*id);
        }
        self
    }

    pub fn before(mut self, id: &str, target: &str) -> Self {
        self.input
            .scripts
            .push(ScriptSpec::bound(id, target, Placement::Before));
        self
    }

    pub fn after(mut self, id: &str, target: &str) -> Self {
        self.input
            .scripts
            .push(ScriptSpec::bound(id, target, Placement::After));
        self
    }

    pub fn post_hook(mut self, id: &str, target: &str) -> Self {
        self.input.scripts.push(ScriptSpec::post_hook(id, target));
        self
    }

    /// Free-standing script, optionally ordered after `upstream`.
    pub fn free_script(mut self, id: &str, upstream: &[&str]) -> Self {
        let spec = upstream
            .iter()
            .fold(ScriptSpec::free(id), |spec, up| spec.after(*up));
        self.input.scripts.push(spec);
        self
    }

    pub fn script(mut self, spec: ScriptSpec) -> Self {
        self.input.scripts.push(spec);
        self
    }

    pub fn build(self) -> PlanInput {
        self.input
    }
}

/// Builder for [`ConfigFile`] to simplify config test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection {
                    batch_cmd: Some("echo {nodes}".to_string()),
                    ..ConfigSection::default()
                },
                transform: Vec::new(),
                script: Vec::new(),
            },
        }
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.config.config.threads = threads;
        self
    }

    pub fn batch_cmd(mut self, cmd: &str) -> Self {
        self.config.config.batch_cmd = Some(cmd.to_string());
        self
    }

    pub fn transform(mut self, id: &str, after: &[&str]) -> Self {
        self.config.transform.push(TransformConfig {
            id: id.to_string(),
            after: after.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn script(mut self, id: &str, cmd: &str, bound_to: Option<(&str, Placement)>) -> Self {
        let (bound_to, placement) = match bound_to {
            Some((target, placement)) => (Some(target.to_string()), placement),
            None => (None, Placement::After),
        };
        self.config.script.push(ScriptConfig {
            id: id.to_string(),
            cmd: cmd.to_string(),
            bound_to,
            placement,
            post_hook: false,
            after: Vec::new(),
        });
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
