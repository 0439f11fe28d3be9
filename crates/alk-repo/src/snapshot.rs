//! JSON form of a repository's state.

use std::path::Path;

use alk_types::{LockEntry, LockOwner, RemoteInfo, StatusEntry};
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

fn default_user() -> LockOwner {
    LockOwner::new("local")
}

/// Everything an [`InMemoryRepository`](crate::InMemoryRepository) holds,
/// in a form that can be written to and read from disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// The configured remote. Without one, lock operations fail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteInfo>,
    /// Identity used as the owner of locks taken through this repository.
    #[serde(default = "default_user")]
    pub user: LockOwner,
    #[serde(default)]
    pub changes: Vec<StatusEntry>,
    #[serde(default)]
    pub locks: Vec<LockEntry>,
}

impl Default for RepositorySnapshot {
    fn default() -> Self {
        Self {
            remote: None,
            user: default_user(),
            changes: Vec::new(),
            locks: Vec::new(),
        }
    }
}

impl RepositorySnapshot {
    pub fn from_json_str(s: &str) -> RepoResult<Self> {
        serde_json::from_str(s).map_err(|e| RepoError::Serialization(e.to_string()))
    }

    pub fn to_json_string(&self) -> RepoResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| RepoError::Serialization(e.to_string()))
    }

    /// Read a snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> RepoResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Write the snapshot as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> RepoResult<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alk_types::FileStatus;

    #[test]
    fn missing_fields_take_defaults() {
        let snap = RepositorySnapshot::from_json_str("{}").unwrap();
        assert_eq!(snap, RepositorySnapshot::default());
        assert_eq!(snap.user.name, "local");
    }

    #[test]
    fn parses_full_document() {
        let snap = RepositorySnapshot::from_json_str(
            r#"{
                "remote": {"name": "origin", "url": "https://example.com/game.git"},
                "user": {"name": "alice"},
                "changes": [{"path": "Assets/x.png", "status": "modified"}],
                "locks": [{"path": "Assets/y.png", "owner": {"name": "bob"}}]
            }"#,
        )
        .unwrap();
        assert_eq!(snap.remote.unwrap().name, "origin");
        assert_eq!(snap.user, LockOwner::new("alice"));
        assert_eq!(snap.changes[0].status, FileStatus::Modified);
        assert_eq!(snap.locks[0].owner, Some(LockOwner::new("bob")));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = RepositorySnapshot::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, RepoError::Serialization(_)));
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("repo.json");
        let mut snap = RepositorySnapshot::default();
        snap.changes.push(StatusEntry::new("Assets/a.mat", FileStatus::Added));
        snap.save(&file).unwrap();
        assert_eq!(RepositorySnapshot::load(&file).unwrap(), snap);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RepositorySnapshot::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, RepoError::Io(_)));
    }
}
