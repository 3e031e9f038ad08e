use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use derive_more::AsRef;
use derive_more::From;
use serde::Deserialize;
use serde::Serialize;

/// A path relative to the project root, with no leading `//` and no leading
/// or trailing slash. Never touches the filesystem on its own; joining with a
/// [`ProjectRoot`] is the only way to get something you can `open()`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, AsRef, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelPath(PathBuf);

impl RelPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RelPath(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn join(&self, segment: &str) -> RelPath {
        RelPath(self.0.join(segment))
    }

    pub fn parent(&self) -> Option<RelPath> {
        self.0.parent().map(|p| RelPath(p.to_path_buf()))
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A target's "base path": a [`RelPath`] displayed with the `//` prefix
/// target strings use. Stored without the prefix and added only on
/// `Display`, so equality and hashing never have to account for it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BasePath(RelPath);

impl BasePath {
    pub fn root() -> Self {
        BasePath(RelPath::new(""))
    }

    pub fn from_rel_path(path: RelPath) -> Self {
        BasePath(path)
    }

    pub fn as_rel_path(&self) -> &RelPath {
        &self.0
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}", self.0)
    }
}

/// Path (relative to the project root) of the build-definition file that
/// declares a given [`BasePath`]. One `BasePath` always maps to exactly one
/// `BuildFilePath` for a fixed `Config::build_rules_file_name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildFilePath(RelPath);

impl BuildFilePath {
    pub fn new(path: RelPath) -> Self {
        BuildFilePath(path)
    }

    pub fn as_rel_path(&self) -> &RelPath {
        &self.0
    }
}

impl fmt::Display for BuildFilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Absolute root of the monorepo being parsed. Every [`RelPath`] is relative
/// to this; nothing else in the crate stores an absolute path.
#[derive(Debug, Clone, PartialEq, Eq, AsRef)]
pub struct ProjectRoot(PathBuf);

impl ProjectRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ProjectRoot(path.into())
    }

    pub fn resolve(&self, rel: &RelPath) -> PathBuf {
        self.0.join(rel.as_path())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn base_path_display_adds_prefix() {
        let bp = BasePath::from_rel_path(RelPath::new("foo/bar"));
        assert_eq!(bp.to_string(), "//foo/bar");
    }

    #[test]
    fn root_base_path_display() {
        assert_eq!(BasePath::root().to_string(), "//");
    }

    #[test]
    fn project_root_resolve_joins() {
        let root = ProjectRoot::new("/repo");
        let rel = RelPath::new("foo/BUCK");
        assert_eq!(root.resolve(&rel), PathBuf::from("/repo/foo/BUCK"));
    }
}
