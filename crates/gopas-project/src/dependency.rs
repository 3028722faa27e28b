//! Dependency declarations.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ProjectError, Result};

/// Name of the dependency file in the project root.
pub const GOPASFILE: &str = "gopasfile";

/// One declared dependency. Name and version are opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Import path, e.g. `github.com/lib/pq`.
    pub name: String,
    /// Version as written; empty when none was given.
    pub version: String,
}

impl Dependency {
    /// Creates a dependency.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parses `name = version`. A missing `=` yields an empty version.
    /// Returns `None` for blank input.
    pub fn parse(entry: &str) -> Option<Self> {
        let (name, version) = entry.split_once('=').unwrap_or((entry, ""));
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, version.trim()))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}@{}", self.name, self.version)
        }
    }
}

/// Parses the contents of a dependency file, one `name = version` per line.
pub fn parse_dependencies(text: &str) -> Vec<Dependency> {
    text.lines().filter_map(Dependency::parse).collect()
}

/// Reads `<dir>/gopasfile`. A missing file is an empty list.
pub fn read_dependency_file(dir: &Path) -> Result<Vec<Dependency>> {
    let path = dir.join(GOPASFILE);
    match fs::read_to_string(&path) {
        Ok(text) => Ok(parse_dependencies(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(ProjectError::io("read", path, e)),
    }
}
