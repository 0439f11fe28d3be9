//! Projections from repository snapshots to decorated editor assets.
//!
//! Both projections are recomputed from scratch on every accepted cache
//! update; nothing here is patched incrementally.

use std::collections::BTreeMap;

use alk_repo::PathMapper;
use alk_types::{AssetGuid, AssetPath, FileStatus, LockEntry, StatusEntry};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Which status entries are worth decorating.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionRules {
    /// Only assets under this directory are decorated.
    pub asset_root: String,
    /// Sidecar metadata files end with this suffix and are never decorated.
    pub meta_suffix: String,
}

impl Default for ProjectionRules {
    fn default() -> Self {
        Self {
            asset_root: "Assets".into(),
            meta_suffix: ".meta".into(),
        }
    }
}

impl ProjectionRules {
    /// Returns `true` if an asset with this path and status gets a status
    /// decoration.
    pub fn is_decorable(&self, asset: &AssetPath, status: FileStatus) -> bool {
        status != FileStatus::Ignored
            && asset.is_under(&self.asset_root)
            && !asset.has_suffix(&self.meta_suffix)
    }
}

/// A status entry resolved into the editor's asset space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoratedStatus {
    pub asset_path: AssetPath,
    pub entry: StatusEntry,
}

/// A lock record resolved into the editor's asset space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoratedLock {
    pub asset_path: AssetPath,
    pub lock: LockEntry,
}

/// Everything known about one decorated asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoration {
    pub guid: AssetGuid,
    pub asset_path: AssetPath,
    /// [`FileStatus::None`] when only a lock is known for the asset.
    pub status: FileStatus,
    pub lock: Option<LockEntry>,
}

impl Decoration {
    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }
}

/// Project status entries onto decorable assets, keyed by GUID.
///
/// Dropped: ignored entries, paths the mapper places outside the project or
/// cannot identify, paths outside the asset root, and metadata sidecars.
pub fn project_statuses(
    entries: &[StatusEntry],
    mapper: &dyn PathMapper,
    rules: &ProjectionRules,
) -> BTreeMap<AssetGuid, DecoratedStatus> {
    let mut out = BTreeMap::new();
    for entry in entries {
        let Some(asset_path) = mapper.asset_path_for(&entry.path) else {
            continue;
        };
        if !rules.is_decorable(&asset_path, entry.status) {
            continue;
        }
        let Some(guid) = mapper.guid_for(&asset_path) else {
            trace!(%asset_path, "no guid for asset, skipping status");
            continue;
        };
        out.insert(
            guid,
            DecoratedStatus {
                asset_path,
                entry: entry.clone(),
            },
        );
    }
    out
}

/// Project lock records onto assets, keyed by GUID. Only what the mapper
/// cannot resolve is dropped.
pub fn project_locks(
    locks: &[LockEntry],
    mapper: &dyn PathMapper,
) -> BTreeMap<AssetGuid, DecoratedLock> {
    let mut out = BTreeMap::new();
    for lock in locks {
        let Some(asset_path) = mapper.asset_path_for(&lock.path) else {
            continue;
        };
        let Some(guid) = mapper.guid_for(&asset_path) else {
            trace!(%asset_path, "no guid for asset, skipping lock");
            continue;
        };
        out.insert(
            guid,
            DecoratedLock {
                asset_path,
                lock: lock.clone(),
            },
        );
    }
    out
}

/// The derived sets the presentation layer reads: decorated statuses and
/// decorated locks, each rebuilt wholesale from its cache.
#[derive(Clone, Debug, Default)]
pub struct DecoratedSet {
    statuses: BTreeMap<AssetGuid, DecoratedStatus>,
    locks: BTreeMap<AssetGuid, DecoratedLock>,
    status_projections: u64,
    lock_projections: u64,
}

impl DecoratedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the status projection.
    pub fn rebuild_statuses(
        &mut self,
        entries: &[StatusEntry],
        mapper: &dyn PathMapper,
        rules: &ProjectionRules,
    ) {
        self.statuses = project_statuses(entries, mapper, rules);
        self.status_projections += 1;
    }

    /// Replace the lock projection.
    pub fn rebuild_locks(&mut self, locks: &[LockEntry], mapper: &dyn PathMapper) {
        self.locks = project_locks(locks, mapper);
        self.lock_projections += 1;
    }

    /// Combined decoration for one asset, or `None` if the asset has
    /// neither a decorable status nor a lock.
    pub fn decoration(&self, guid: &AssetGuid) -> Option<Decoration> {
        let status = self.statuses.get(guid);
        let lock = self.locks.get(guid);
        let asset_path = status
            .map(|s| s.asset_path.clone())
            .or_else(|| lock.map(|l| l.asset_path.clone()))?;
        Some(Decoration {
            guid: *guid,
            asset_path,
            status: status.map(|s| s.entry.status).unwrap_or_default(),
            lock: lock.map(|l| l.lock.clone()),
        })
    }

    /// All decorated assets, ordered by asset path.
    pub fn decorations(&self) -> Vec<Decoration> {
        let mut guids: Vec<&AssetGuid> = self.statuses.keys().chain(self.locks.keys()).collect();
        guids.sort();
        guids.dedup();
        let mut out: Vec<Decoration> = guids.into_iter().filter_map(|g| self.decoration(g)).collect();
        out.sort_by(|a, b| a.asset_path.cmp(&b.asset_path));
        out
    }

    /// Assets with a decorable status.
    pub fn status_guids(&self) -> impl Iterator<Item = &AssetGuid> {
        self.statuses.keys()
    }

    /// Assets with a recorded lock.
    pub fn lock_guids(&self) -> impl Iterator<Item = &AssetGuid> {
        self.locks.keys()
    }

    /// How many times the status projection has been rebuilt.
    pub fn status_projections(&self) -> u64 {
        self.status_projections
    }

    /// How many times the lock projection has been rebuilt.
    pub fn lock_projections(&self) -> u64 {
        self.lock_projections
    }
}
