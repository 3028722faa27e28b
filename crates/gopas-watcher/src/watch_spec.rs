//! What a watch session looks at.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::{Result, WatchError};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Roots, ignore patterns and accepted extensions of one watch session.
///
/// An ignore pattern is matched against the path as produced by the walk
/// (for the root `.` that is `src/main.go`, for the root `app` it is
/// `app/src/main.go`) and against the last path component. A match on a
/// directory prunes its whole subtree.
#[derive(Debug, Clone, Default)]
pub struct WatchSpec {
    roots: Vec<PathBuf>,
    ignores: Vec<Pattern>,
    extensions: Vec<String>,
}

impl WatchSpec {
    /// Creates an empty spec: no roots, no ignores, no extensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root directory.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Adds several root directories.
    pub fn with_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.roots.extend(roots.into_iter().map(Into::into));
        self
    }

    /// Adds a glob ignore pattern.
    pub fn with_ignore(mut self, pattern: &str) -> Result<Self> {
        let compiled = Pattern::new(pattern).map_err(|source| WatchError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.ignores.push(compiled);
        Ok(self)
    }

    /// Adds several glob ignore patterns.
    pub fn with_ignores<I, S>(self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns
            .into_iter()
            .try_fold(self, |spec, pattern| spec.with_ignore(pattern.as_ref()))
    }

    /// Adds extensions from a comma separated list such as `go, .tmpl`.
    pub fn with_extensions(mut self, list: &str) -> Self {
        self.extensions.extend(parse_extensions(list));
        self
    }

    /// Root directories, in walk order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Compiled ignore patterns.
    pub fn ignores(&self) -> &[Pattern] {
        &self.ignores
    }

    /// Accepted extensions, without leading dots.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Returns true if `path` matches an ignore pattern.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let full = path.to_string_lossy();
        let name = path.file_name().map(|n| n.to_string_lossy());

        self.ignores.iter().any(|pattern| {
            pattern.matches_with(&full, MATCH_OPTIONS)
                || name
                    .as_deref()
                    .is_some_and(|name| pattern.matches_with(name, MATCH_OPTIONS))
        })
    }

    /// Returns true if `path` ends with one of the accepted extensions.
    pub fn is_accepted(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy();

        self.extensions.iter().any(|ext| {
            name.len() > ext.len()
                && name.ends_with(ext.as_str())
                && name[..name.len() - ext.len()].ends_with('.')
        })
    }
}

/// Splits a comma separated extension list, trimming blanks and leading dots.
pub fn parse_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(|ext| ext.trim().trim_start_matches('.'))
        .filter(|ext| !ext.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> WatchSpec {
        WatchSpec::new()
            .with_root(".")
            .with_ignores([".git", ".gopath", "vendor/*"])
            .unwrap()
            .with_extensions("go")
    }

    #[test]
    fn test_parse_extensions() {
        assert_eq!(parse_extensions("go, .tmpl,,  yml "), ["go", "tmpl", "yml"]);
        assert!(parse_extensions("").is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = WatchSpec::new().with_ignore("[").unwrap_err();
        assert!(matches!(err, WatchError::Pattern { .. }));
    }

    #[test]
    fn test_ignore_matches_walk_path() {
        let spec = spec();
        assert!(spec.is_ignored(Path::new(".git")));
        assert!(spec.is_ignored(Path::new("vendor/lib")));
        assert!(!spec.is_ignored(Path::new("vendor")));
        assert!(!spec.is_ignored(Path::new("src")));
    }

    #[test]
    fn test_ignore_matches_last_component() {
        let spec = spec();
        assert!(spec.is_ignored(Path::new("app/.git")));
        assert!(spec.is_ignored(Path::new("app/.gopath")));
        assert!(!spec.is_ignored(Path::new("app/.github")));
    }

    #[test]
    fn test_star_does_not_cross_separator() {
        let spec = WatchSpec::new().with_ignore("*.tmp").unwrap();
        assert!(spec.is_ignored(Path::new("scratch.tmp")));
        // The last component still matches on its own.
        assert!(spec.is_ignored(Path::new("dir/scratch.tmp")));

        let spec = WatchSpec::new().with_ignore("build/*").unwrap();
        assert!(spec.is_ignored(Path::new("build/out")));
        assert!(!spec.is_ignored(Path::new("build/out/deep")));
    }

    #[test]
    fn test_accepted_extension() {
        let spec = spec();
        assert!(spec.is_accepted(Path::new("main.go")));
        assert!(spec.is_accepted(Path::new("pkg/util.go")));
        assert!(!spec.is_accepted(Path::new("main.goo")));
        assert!(!spec.is_accepted(Path::new("README.md")));
        assert!(!spec.is_accepted(Path::new("cargo")));
        assert!(!spec.is_accepted(Path::new("go")));
    }

    #[test]
    fn test_bare_extension_name_is_accepted() {
        let spec = spec();
        assert!(spec.is_accepted(Path::new(".go")));
        assert!(spec.is_accepted(Path::new("pkg/.go")));
    }

    #[test]
    fn test_multiple_extensions() {
        let spec = WatchSpec::new().with_extensions("go,tmpl");
        assert!(spec.is_accepted(Path::new("views/index.tmpl")));
        assert!(spec.is_accepted(Path::new("main.go")));
    }
}
