//! GOPATH layout of a project.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ProjectError, Result};

const PRIVATE_GOPATH: &str = ".gopath";
const VENDOR_GOPATH: &str = "_vendor";

#[cfg(windows)]
const LIST_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const LIST_SEPARATOR: &str = ":";

/// Paths derived from the project root and name.
///
/// The first GOPATH entry, `<root>/.gopath`, is private to the tool and holds
/// the build copy of the project; `<root>/_vendor` holds fetched
/// dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoWorkspace {
    root: PathBuf,
    name: String,
}

impl GoWorkspace {
    /// Creates the layout for project `name` rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
        }
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Project import path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// GOPATH entries, private first.
    pub fn gopaths(&self) -> [PathBuf; 2] {
        [self.private_gopath(), self.root.join(VENDOR_GOPATH)]
    }

    /// `<root>/.gopath`.
    pub fn private_gopath(&self) -> PathBuf {
        self.root.join(PRIVATE_GOPATH)
    }

    /// `<root>/_vendor/src`.
    pub fn vendor_src(&self) -> PathBuf {
        self.root.join(VENDOR_GOPATH).join("src")
    }

    /// `<root>/.gopath/src/<name>`, where builds run.
    pub fn build_dir(&self) -> PathBuf {
        self.private_gopath().join("src").join(&self.name)
    }

    /// `<root>/.gopath/bin/<last segment of name>`.
    pub fn executable(&self) -> PathBuf {
        let base = Path::new(&self.name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone());
        self.private_gopath()
            .join("bin")
            .join(format!("{}{}", base, std::env::consts::EXE_SUFFIX))
    }

    /// Environment overrides for toolchain commands.
    pub fn env(&self) -> Vec<String> {
        let joined = self
            .gopaths()
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR);
        vec![format!("GOPATH={}", joined)]
    }

    /// Package directories under `_vendor/src`, as import paths.
    pub fn vendor_packages(&self) -> Result<Vec<String>> {
        find_packages(&self.vendor_src())
    }
}

/// Lists every directory below `base` that directly contains `.go` files.
///
/// `.git` directories are not entered. A missing `base` yields an empty list.
pub fn find_packages(base: &Path) -> Result<Vec<String>> {
    let mut packages = Vec::new();
    let mut pending = match sorted_subdirs(base) {
        Ok(dirs) => dirs,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(packages),
        Err(e) => return Err(ProjectError::io("read", base, e)),
    };
    pending.reverse();

    while let Some(dir) = pending.pop() {
        if has_go_files(&dir).map_err(|e| ProjectError::io("read", &dir, e))? {
            if let Ok(relative) = dir.strip_prefix(base) {
                let import = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                packages.push(import);
            }
        }

        let mut children = sorted_subdirs(&dir).map_err(|e| ProjectError::io("read", &dir, e))?;
        children.reverse();
        pending.extend(children);
    }

    Ok(packages)
}

fn sorted_subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() && entry.file_name() != ".git" {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn has_go_files(dir: &Path) -> io::Result<bool> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_go = Path::new(&entry.file_name())
            .extension()
            .is_some_and(|ext| ext == "go");
        if is_go && entry.file_type()?.is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}
