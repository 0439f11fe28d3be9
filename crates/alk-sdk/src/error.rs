use alk_gate::DenyReason;
use alk_types::RepoPath;
use thiserror::Error;

use crate::completion::LockOp;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} lock on {path}: {reason}")]
    Denied {
        action: LockOp,
        path: RepoPath,
        reason: DenyReason,
    },

    #[error("lock operation task failed: {0}")]
    TaskFailed(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("gate error: {0}")]
    Gate(#[from] alk_gate::GateError),

    #[error("repository error: {0}")]
    Repository(#[from] alk_repo::RepoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;
