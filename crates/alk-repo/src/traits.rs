use alk_types::{CacheUpdateEvent, LockEntry, RemoteInfo, RepoPath, StatusEntry};
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::RepoResult;

/// Change notification published by a repository whenever its cached view
/// of the working tree or the lock server is refreshed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepositoryEvent {
    /// `current_changes` now reflects the data as of this token.
    TrackingStatusChanged(CacheUpdateEvent),
    /// `current_locks` now reflects the data as of this token.
    LocksChanged(CacheUpdateEvent),
}

/// A version-control repository with file locking.
///
/// The snapshot getters are cheap reads of the repository's own cache. Lock
/// operations talk to the lock server and complete asynchronously; a
/// successful operation is followed by a [`RepositoryEvent::LocksChanged`]
/// notification.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Working-tree status entries as of the latest refresh.
    fn current_changes(&self) -> Vec<StatusEntry>;

    /// Lock records as of the latest refresh.
    fn current_locks(&self) -> Vec<LockEntry>;

    /// The configured remote, if any.
    fn current_remote(&self) -> Option<RemoteInfo>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent>;

    /// Re-publish a status notification if the current token differs from
    /// `last` (the token the caller last applied, if any).
    fn check_status_changed(&self, last: Option<CacheUpdateEvent>);

    /// Re-publish a locks notification if the current token differs from `last`.
    fn check_locks_changed(&self, last: Option<CacheUpdateEvent>);

    /// Ask the lock server for an exclusive lock on `path`.
    async fn request_lock(&self, path: &RepoPath) -> RepoResult<LockEntry>;

    /// Release the lock on `path`. With `force`, release it even when
    /// someone else holds it.
    async fn release_lock(&self, path: &RepoPath, force: bool) -> RepoResult<()>;
}
