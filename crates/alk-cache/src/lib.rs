//! Status and lock caches for the Asset Lock Kit.
//!
//! The repository is the single source of truth; this crate only keeps its
//! latest snapshot. Each cache remembers the [`CacheUpdateEvent`] it last
//! applied and refuses a repeat, so duplicate notifications cost nothing.
//!
//! - [`VersionedCache`]: a token-gated, wholesale-replaced entry list
//! - [`StatusCache`] / [`LockCache`]: its two instantiations
//! - [`DecoratedSet`]: asset-keyed projections the presentation layer reads
//!
//! [`CacheUpdateEvent`]: alk_types::CacheUpdateEvent

pub mod cache;
pub mod projection;

pub use cache::{LockCache, StatusCache, VersionedCache};
pub use projection::{
    project_locks, project_statuses, DecoratedLock, DecoratedSet, DecoratedStatus, Decoration,
    ProjectionRules,
};
