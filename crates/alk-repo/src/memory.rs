//! In-memory repository for tests and the CLI.
//!
//! [`InMemoryRepository`] keeps its status entries, lock records and remote
//! behind a `RwLock` and publishes change notifications on a tokio broadcast
//! channel. Lock operations behave like a single-server lock service: one
//! holder per path, releases by other identities need `force`.

use std::collections::VecDeque;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use alk_types::{CacheUpdateEvent, LockEntry, LockOwner, RemoteInfo, RepoPath, StatusEntry};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{RepoError, RepoResult};
use crate::snapshot::RepositorySnapshot;
use crate::traits::{Repository, RepositoryEvent};

const EVENT_CAPACITY: usize = 64;

struct State {
    changes: Vec<StatusEntry>,
    locks: Vec<LockEntry>,
    remote: Option<RemoteInfo>,
    status_token: CacheUpdateEvent,
    locks_token: CacheUpdateEvent,
    sequence: u64,
    injected_failures: VecDeque<String>,
}

impl State {
    fn next_token(&mut self) -> CacheUpdateEvent {
        self.sequence += 1;
        CacheUpdateEvent::now(self.sequence)
    }
}

/// An in-memory implementation of [`Repository`].
pub struct InMemoryRepository {
    user: LockOwner,
    state: RwLock<State>,
    events: broadcast::Sender<RepositoryEvent>,
}

impl InMemoryRepository {
    /// Create an empty repository with no remote. Locks it takes are owned
    /// by `user`.
    pub fn new(user: LockOwner) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut state = State {
            changes: Vec::new(),
            locks: Vec::new(),
            remote: None,
            status_token: CacheUpdateEvent::new(0, 0),
            locks_token: CacheUpdateEvent::new(0, 0),
            sequence: 0,
            injected_failures: VecDeque::new(),
        };
        state.status_token = state.next_token();
        state.locks_token = state.next_token();
        Self {
            user,
            state: RwLock::new(state),
            events,
        }
    }

    /// Create a repository holding the contents of `snapshot`.
    pub fn from_snapshot(snapshot: RepositorySnapshot) -> Self {
        let repo = Self::new(snapshot.user);
        {
            let mut state = repo.write_state();
            state.changes = snapshot.changes;
            state.locks = snapshot.locks;
            state.remote = snapshot.remote;
        }
        repo
    }

    /// The current contents as a snapshot.
    pub fn to_snapshot(&self) -> RepositorySnapshot {
        let state = self.read_state();
        RepositorySnapshot {
            remote: state.remote.clone(),
            user: self.user.clone(),
            changes: state.changes.clone(),
            locks: state.locks.clone(),
        }
    }

    /// The identity locks are taken under.
    pub fn user(&self) -> &LockOwner {
        &self.user
    }

    /// Replace the status entries and publish a notification.
    pub fn set_changes(&self, changes: Vec<StatusEntry>) {
        let token = {
            let mut state = self.write_state();
            state.changes = changes;
            state.status_token = state.next_token();
            state.status_token
        };
        self.publish(RepositoryEvent::TrackingStatusChanged(token));
    }

    /// Replace the lock records (as a lock-server refresh would) and publish
    /// a notification.
    pub fn set_locks(&self, locks: Vec<LockEntry>) {
        let token = {
            let mut state = self.write_state();
            state.locks = locks;
            state.locks_token = state.next_token();
            state.locks_token
        };
        self.publish(RepositoryEvent::LocksChanged(token));
    }

    pub fn set_remote(&self, remote: Option<RemoteInfo>) {
        self.write_state().remote = remote;
    }

    /// Make the next lock operation fail with a remote error.
    pub fn fail_next_operation(&self, message: impl Into<String>) {
        self.write_state().injected_failures.push_back(message.into());
    }

    /// Token of the latest status refresh.
    pub fn status_token(&self) -> CacheUpdateEvent {
        self.read_state().status_token
    }

    /// Token of the latest lock refresh.
    pub fn locks_token(&self) -> CacheUpdateEvent {
        self.read_state().locks_token
    }

    fn publish(&self, event: RepositoryEvent) {
        debug!(?event, "publishing repository event");
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Common preconditions of lock operations.
    fn precheck(state: &mut State) -> RepoResult<()> {
        if state.remote.is_none() {
            return Err(RepoError::NoRemote);
        }
        if let Some(message) = state.injected_failures.pop_front() {
            return Err(RepoError::Remote(message));
        }
        Ok(())
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::from_snapshot(RepositorySnapshot::default())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[async_trait]
impl Repository for InMemoryRepository {
    fn current_changes(&self) -> Vec<StatusEntry> {
        self.read_state().changes.clone()
    }

    fn current_locks(&self) -> Vec<LockEntry> {
        self.read_state().locks.clone()
    }

    fn current_remote(&self) -> Option<RemoteInfo> {
        self.read_state().remote.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent> {
        self.events.subscribe()
    }

    fn check_status_changed(&self, last: Option<CacheUpdateEvent>) {
        let current = self.status_token();
        if last != Some(current) {
            self.publish(RepositoryEvent::TrackingStatusChanged(current));
        }
    }

    fn check_locks_changed(&self, last: Option<CacheUpdateEvent>) {
        let current = self.locks_token();
        if last != Some(current) {
            self.publish(RepositoryEvent::LocksChanged(current));
        }
    }

    async fn request_lock(&self, path: &RepoPath) -> RepoResult<LockEntry> {
        tokio::task::yield_now().await;

        let (entry, token) = {
            let mut state = self.write_state();
            Self::precheck(&mut state)?;
            if let Some(existing) = state.locks.iter().find(|l| &l.path == path) {
                return Err(RepoError::LockConflict {
                    path: path.clone(),
                    owner: existing
                        .owner
                        .clone()
                        .unwrap_or_else(|| LockOwner::new("unknown")),
                });
            }
            let entry = LockEntry {
                path: path.clone(),
                owner: Some(self.user.clone()),
                id: Some(uuid::Uuid::now_v7().to_string()),
                locked_at_ms: Some(now_ms()),
            };
            state.locks.push(entry.clone());
            state.locks_token = state.next_token();
            (entry, state.locks_token)
        };

        debug!(%path, owner = %self.user, "lock granted");
        self.publish(RepositoryEvent::LocksChanged(token));
        Ok(entry)
    }

    async fn release_lock(&self, path: &RepoPath, force: bool) -> RepoResult<()> {
        tokio::task::yield_now().await;

        let token = {
            let mut state = self.write_state();
            Self::precheck(&mut state)?;
            let index = state
                .locks
                .iter()
                .position(|l| &l.path == path)
                .ok_or_else(|| RepoError::NotLocked(path.clone()))?;
            if let Some(owner) = &state.locks[index].owner {
                if owner != &self.user && !force {
                    return Err(RepoError::NotOwner {
                        path: path.clone(),
                        owner: owner.clone(),
                    });
                }
            }
            state.locks.remove(index);
            state.locks_token = state.next_token();
            state.locks_token
        };

        debug!(%path, force, "lock released");
        self.publish(RepositoryEvent::LocksChanged(token));
        Ok(())
    }
}
