use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::RepoPath;

/// The identity holding a lock.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockOwner {
    pub name: String,
}

impl LockOwner {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for LockOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An exclusive-edit reservation on a repository path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// Locked path, relative to the repository root.
    pub path: RepoPath,
    /// Who holds the lock, if the server reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<LockOwner>,
    /// Server-assigned lock identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Milliseconds since the UNIX epoch at which the lock was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_at_ms: Option<u64>,
}

impl LockEntry {
    /// A lock record with only a path.
    pub fn new(path: impl Into<RepoPath>) -> Self {
        Self {
            path: path.into(),
            owner: None,
            id: None,
            locked_at_ms: None,
        }
    }

    /// Set the owner.
    pub fn with_owner(mut self, owner: LockOwner) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Returns `true` if `who` holds this lock.
    pub fn is_owned_by(&self, who: &LockOwner) -> bool {
        self.owner.as_ref() == Some(who)
    }
}
