//! Infrastructure implementation of the `ConfigSource` port.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ConfigSource;
use crate::domain::{StrataConfig, parse_config};

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "strata.yaml";

/// Production `ConfigSource` reading a YAML file on disk.
#[derive(Debug, Clone)]
pub struct YamlConfigFile {
    path: PathBuf,
}

impl YamlConfigFile {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for YamlConfigFile {
    fn load(&self) -> Result<StrataConfig> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("cannot read {}", self.path.display()))?;
        parse_config(&content).with_context(|| format!("in {}", self.path.display()))
    }
}
