//! Foundation types for the Asset Lock Kit (ALK).
//!
//! This crate provides the path, status, lock, and versioning types shared by
//! every other ALK crate. It performs no I/O.
//!
//! # Key Types
//!
//! - [`RepoPath`] / [`AssetPath`]: Normalized paths in the repository and editor spaces
//! - [`AssetGuid`]: Editor-side asset identifier
//! - [`FileStatus`] / [`StatusEntry`]: Working-tree classification of a path
//! - [`LockEntry`] / [`LockOwner`]: A lock record reported by the lock server
//! - [`CacheUpdateEvent`]: Comparable token marking a repository data version
//! - [`RemoteInfo`]: The configured remote, if any
//! - [`Clock`]: Time source, swappable in tests

pub mod clock;
pub mod error;
pub mod event;
pub mod lock;
pub mod path;
pub mod remote;
pub mod status;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::TypeError;
pub use event::CacheUpdateEvent;
pub use lock::{LockEntry, LockOwner};
pub use path::{AssetGuid, AssetPath, RepoPath};
pub use remote::RemoteInfo;
pub use status::{FileStatus, StatusEntry};
