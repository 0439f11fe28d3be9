use alk_types::{LockOwner, RepoPath};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("no remote configured")]
    NoRemote,

    #[error("{path} is already locked by {owner}")]
    LockConflict { path: RepoPath, owner: LockOwner },

    #[error("{0} is not locked")]
    NotLocked(RepoPath),

    #[error("{path} is locked by {owner}; use force to release it")]
    NotOwner { path: RepoPath, owner: LockOwner },

    #[error("remote error: {0}")]
    Remote(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
