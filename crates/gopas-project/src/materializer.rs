//! Build-directory materialization.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::dependency::Dependency;
use crate::error::{ProjectError, Result};

/// Produces a directory ready for the build from a source tree.
pub trait WorkspaceMaterializer: Send + Sync {
    /// Replaces `target` with a build-ready copy of `source`.
    fn materialize(&self, source: &Path, target: &Path, dependencies: &[Dependency]) -> Result<()>;
}

/// Materializes by copying the project tree.
///
/// Directories whose name is in the skip list (`.gopath` by default) are not
/// copied. File permissions are kept; on unix symlinks are recreated rather
/// than followed.
#[derive(Debug, Clone)]
pub struct CopyMaterializer {
    skip: Vec<OsString>,
}

impl Default for CopyMaterializer {
    fn default() -> Self {
        Self {
            skip: vec![OsString::from(".gopath")],
        }
    }
}

impl CopyMaterializer {
    /// Creates a materializer skipping `.gopath`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also skips directories named `name`.
    pub fn with_skip(mut self, name: impl Into<OsString>) -> Self {
        self.skip.push(name.into());
        self
    }

    fn skips(&self, name: &OsStr) -> bool {
        self.skip.iter().any(|s| s.as_os_str() == name)
    }

    fn copy_dir(&self, source: &Path, target: &Path) -> Result<u64> {
        let metadata = fs::metadata(source).map_err(|e| ProjectError::io("read", source, e))?;
        fs::create_dir_all(target).map_err(|e| ProjectError::io("create", target, e))?;

        let entries = fs::read_dir(source).map_err(|e| ProjectError::io("read", source, e))?;
        let mut copied = 0;
        for entry in entries {
            let entry = entry.map_err(|e| ProjectError::io("read", source, e))?;
            let from = entry.path();
            let to = target.join(entry.file_name());
            let file_type = entry
                .file_type()
                .map_err(|e| ProjectError::io("read", &from, e))?;

            if file_type.is_dir() {
                if self.skips(&entry.file_name()) {
                    continue;
                }
                copied += self.copy_dir(&from, &to)?;
            } else if file_type.is_symlink() {
                copy_symlink(&from, &to).map_err(|e| ProjectError::io("copy", &from, e))?;
                copied += 1;
            } else {
                fs::copy(&from, &to).map_err(|e| ProjectError::io("copy", &from, e))?;
                copied += 1;
            }
        }

        // Applied last so read-only directories can still be filled.
        fs::set_permissions(target, metadata.permissions())
            .map_err(|e| ProjectError::io("chmod", target, e))?;
        Ok(copied)
    }
}

impl WorkspaceMaterializer for CopyMaterializer {
    fn materialize(&self, source: &Path, target: &Path, dependencies: &[Dependency]) -> Result<()> {
        match fs::remove_dir_all(target) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ProjectError::io("remove", target, e)),
        }

        let copied = self.copy_dir(source, target)?;
        debug!(
            source = %source.display(),
            target = %target.display(),
            files = copied,
            dependencies = dependencies.len(),
            "materialized build directory"
        );
        Ok(())
    }
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to).map(|_| ())
}
