//! `gopas.yml` project configuration.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dependency::Dependency;
use crate::error::{ProjectError, Result};

/// Name of the config file in the project root.
pub const CONFIG_FILE: &str = "gopas.yml";

/// Optional per-project settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Import path of the project; defaults to the directory name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Commands run in the build directory before compiling, as argv lists.
    #[serde(rename = "pre-build")]
    pub pre_build: Vec<Vec<String>>,

    /// Extra `name=version` dependencies, appended to the gopasfile list.
    pub dependencies: Vec<String>,
}

impl ProjectConfig {
    /// Loads `<dir>/gopas.yml`. A missing file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ProjectError::io("read", path, e)),
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| ProjectError::Config {
            path,
            message: e.to_string(),
        })
    }

    /// Dependencies declared in the config.
    pub fn dependencies(&self) -> Vec<Dependency> {
        self.dependencies
            .iter()
            .filter_map(|entry| Dependency::parse(entry))
            .collect()
    }
}
