//! Depth-first walk over the watched trees.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::trace;

use crate::error::{Result, WatchError};
use crate::watch_spec::WatchSpec;

/// A file with an accepted extension found during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFile {
    /// Path as produced by the walk.
    pub path: PathBuf,
    /// Last modification time.
    pub modified: SystemTime,
}

struct Pending {
    path: PathBuf,
    is_root: bool,
}

/// Lazy depth-first walk yielding accepted files in lexical order.
///
/// Symlinks are not followed. Ignored directories are never read. Entries
/// that disappear between listing and inspection are skipped; any other IO
/// failure, and any failure on a root, is a [`WatchError::Walk`].
pub struct TreeWalk<'a> {
    spec: &'a WatchSpec,
    pending: Vec<Pending>,
}

impl<'a> TreeWalk<'a> {
    /// Starts a walk over every root of `spec`.
    pub fn new(spec: &'a WatchSpec) -> Self {
        let pending = spec
            .roots()
            .iter()
            .rev()
            .map(|root| Pending {
                path: root.clone(),
                is_root: true,
            })
            .collect();
        Self { spec, pending }
    }

    fn descend(&mut self, dir: &Path) -> io::Result<()> {
        let mut names = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();

        for name in names.into_iter().rev() {
            let path = if dir == Path::new(".") {
                PathBuf::from(name)
            } else {
                dir.join(name)
            };
            self.pending.push(Pending {
                path,
                is_root: false,
            });
        }
        Ok(())
    }
}

impl Iterator for TreeWalk<'_> {
    type Item = Result<WatchedFile>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(Pending { path, is_root }) = self.pending.pop() {
            if self.spec.is_ignored(&path) {
                trace!(path = %path.display(), "skipping ignored path");
                continue;
            }

            let metadata = match fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) if !is_root && e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => return Some(Err(WatchError::Walk { path, source })),
            };

            if metadata.is_dir() {
                match self.descend(&path) {
                    Ok(()) => {}
                    Err(e) if !is_root && e.kind() == io::ErrorKind::NotFound => {}
                    Err(source) => return Some(Err(WatchError::Walk { path, source })),
                }
                continue;
            }

            if !metadata.is_file() || !self.spec.is_accepted(&path) {
                continue;
            }

            return Some(match metadata.modified() {
                Ok(modified) => Ok(WatchedFile { path, modified }),
                Err(source) => Err(WatchError::Walk { path, source }),
            });
        }
        None
    }
}
