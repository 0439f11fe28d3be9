//! Working-tree status types.
//!
//! These are snapshots produced by the repository. ALK never derives a status
//! itself; it only caches and filters what the repository reports.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::RepoPath;

/// The repository's classification of a path's working-tree state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// No recorded change. Also the answer for paths with no entry.
    #[default]
    None,
    /// Present in the working tree but not tracked.
    Untracked,
    /// Matched by an ignore rule.
    Ignored,
    /// Tracked and changed since the last commit.
    Modified,
    /// Newly added to the index.
    Added,
    /// Tracked but removed from the working tree.
    Deleted,
    /// Renamed from another path.
    Renamed,
    /// Copied from another path.
    Copied,
    /// In a conflicted merge state.
    Unmerged,
}

impl FileStatus {
    /// Returns `true` for statuses where a lock protects nothing: the path
    /// is not under version control.
    pub fn is_unversioned(&self) -> bool {
        matches!(self, Self::Untracked | Self::Ignored)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Untracked => "untracked",
            Self::Ignored => "ignored",
            Self::Modified => "modified",
            Self::Added => "added",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
            Self::Copied => "copied",
            Self::Unmerged => "unmerged",
        };
        f.write_str(s)
    }
}

/// A single status entry for one repository path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Path relative to the repository root.
    pub path: RepoPath,
    /// The working-tree state.
    pub status: FileStatus,
}

impl StatusEntry {
    /// Create a new status entry.
    pub fn new(path: impl Into<RepoPath>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
        }
    }
}
