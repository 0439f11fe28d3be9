use alk_types::{CacheUpdateEvent, FileStatus, LockEntry, RepoPath, StatusEntry};
use tracing::debug;

/// The latest snapshot of a repository list, tagged with the token it was
/// applied under.
///
/// Contents are only ever replaced wholesale by [`apply`](Self::apply).
#[derive(Clone, Debug)]
pub struct VersionedCache<T> {
    entries: Vec<T>,
    last_event: Option<CacheUpdateEvent>,
    generation: u64,
}

/// Working-tree status entries.
pub type StatusCache = VersionedCache<StatusEntry>;

/// Lock records.
pub type LockCache = VersionedCache<LockEntry>;

impl<T> VersionedCache<T> {
    /// An empty cache that has applied nothing.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            last_event: None,
            generation: 0,
        }
    }

    /// Replace the contents with `entries` unless `event` equals the last
    /// applied token.
    ///
    /// Returns `true` if the update was accepted, so the caller knows to
    /// recompute anything derived from this cache. An empty `entries` is a
    /// real update (no changes, no locks) and overwrites like any other.
    pub fn apply(&mut self, event: CacheUpdateEvent, entries: Vec<T>) -> bool {
        if self.last_event == Some(event) {
            debug!(%event, "ignoring stale cache update");
            return false;
        }
        debug!(%event, count = entries.len(), "applying cache update");
        self.entries = entries;
        self.last_event = Some(event);
        self.generation += 1;
        true
    }

    /// Entries from the last accepted update.
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// The token of the last accepted update.
    pub fn last_event(&self) -> Option<CacheUpdateEvent> {
        self.last_event
    }

    /// Number of accepted updates.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the last accepted update carried no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for VersionedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionedCache<StatusEntry> {
    /// Status of `path` by exact match. Paths without an entry are `None`.
    pub fn status_of(&self, path: &RepoPath) -> FileStatus {
        self.entries
            .iter()
            .find(|e| &e.path == path)
            .map(|e| e.status)
            .unwrap_or_default()
    }
}

impl VersionedCache<LockEntry> {
    /// The lock on `path`, if any.
    pub fn lock_for(&self, path: &RepoPath) -> Option<&LockEntry> {
        self.entries.iter().find(|l| &l.path == path)
    }

    /// Whether any lock is recorded for `path`.
    pub fn is_locked(&self, path: &RepoPath) -> bool {
        self.lock_for(path).is_some()
    }
}
