use std::path::Path;

use anyhow::{Context, Result};
use kos_script::{CpuConfig, LoggerConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub cpu: CpuConfig,
    pub logger: LoggerConfig,
    /// Fly-by-wire channels the runner pretends to control.
    pub channels: Vec<String>,
}

impl RunnerConfig {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: RunnerConfig = toml::from_str(&config_str).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Defaults when no file is given. Environment overrides apply either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::new(path)?,
            None => Self::default(),
        };
        config.cpu = config.cpu.with_env_overrides();
        Ok(config)
    }
}
