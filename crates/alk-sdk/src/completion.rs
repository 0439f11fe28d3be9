//! Results of asynchronous lock operations, on their way back to the owner.

use std::fmt;

use alk_types::RepoPath;

use crate::error::SessionResult;

/// Which lock operation finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockOp {
    Request,
    Release,
}

impl fmt::Display for LockOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Release => f.write_str("release"),
        }
    }
}

/// Sent exactly once per spawned operation, whether it succeeded, failed,
/// or its task died.
#[derive(Debug)]
pub struct Completion {
    pub op: LockOp,
    pub path: RepoPath,
    pub result: SessionResult<()>,
}

impl Completion {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
