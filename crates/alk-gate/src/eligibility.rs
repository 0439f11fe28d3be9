//! Rules deciding whether a lock action is currently permitted.
//!
//! Everything here is a pure function of its arguments. The editor polls
//! these checks every time it builds a context menu, so they must not touch
//! state or do I/O.

use std::fmt;

use alk_cache::{LockCache, StatusCache};
use alk_types::{FileStatus, RepoPath};
use tracing::trace;

/// Why a lock action is not available.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    /// Another lock operation is in flight.
    Busy,
    /// No remote, so no lock server.
    NoRemote,
    /// The path already carries a lock.
    AlreadyLocked,
    /// The path is not under version control; a lock would protect nothing.
    Unversioned(FileStatus),
    /// No locks are known at all.
    NoLocks,
    /// The path carries no lock.
    NotLocked,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => f.write_str("another lock operation is in progress"),
            Self::NoRemote => f.write_str("no remote is configured"),
            Self::AlreadyLocked => f.write_str("already locked"),
            Self::Unversioned(status) => write!(f, "file is {status}"),
            Self::NoLocks => f.write_str("no locks are held"),
            Self::NotLocked => f.write_str("not locked"),
        }
    }
}

/// Outcome of an eligibility check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eligibility {
    Allowed,
    Denied(DenyReason),
}

impl Eligibility {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::Allowed => None,
            Self::Denied(reason) => Some(*reason),
        }
    }
}

fn deny(action: &str, path: &RepoPath, reason: DenyReason) -> Eligibility {
    trace!(action, %path, %reason, "lock action unavailable");
    Eligibility::Denied(reason)
}

/// Lock request/release rules.
pub struct LockEligibility;

impl LockEligibility {
    /// Whether a lock on `path` may be requested now.
    ///
    /// Checked in order: busy, remote configured, not already locked, status
    /// neither untracked nor ignored. A path without a status entry counts as
    /// [`FileStatus::None`] and may be locked.
    pub fn can_request_lock(
        path: &RepoPath,
        busy: bool,
        statuses: &StatusCache,
        locks: &LockCache,
        remote_configured: bool,
    ) -> Eligibility {
        if busy {
            return deny("request", path, DenyReason::Busy);
        }
        if !remote_configured {
            return deny("request", path, DenyReason::NoRemote);
        }
        if locks.is_locked(path) {
            return deny("request", path, DenyReason::AlreadyLocked);
        }
        let status = statuses.status_of(path);
        if status.is_unversioned() {
            return deny("request", path, DenyReason::Unversioned(status));
        }
        trace!(%path, %status, "lock request available");
        Eligibility::Allowed
    }

    /// Whether the lock on `path` may be released now.
    ///
    /// Needs neither a remote nor a status: a lock recorded locally should
    /// always be offered for release.
    pub fn can_release_lock(path: &RepoPath, busy: bool, locks: &LockCache) -> Eligibility {
        if busy {
            return deny("release", path, DenyReason::Busy);
        }
        if locks.is_empty() {
            return deny("release", path, DenyReason::NoLocks);
        }
        if !locks.is_locked(path) {
            return deny("release", path, DenyReason::NotLocked);
        }
        Eligibility::Allowed
    }
}
