//! High-level SDK for the Asset Lock Kit.
//!
//! [`LockSession`] is the entry point for an editor integration: it owns the
//! status and lock caches, the busy gate, and the queue through which
//! asynchronous lock operations report back. The host calls
//! [`LockSession::pump`] from its main thread (once per frame, or whenever it
//! repaints) and queries the session before enabling lock actions.
//!
//! [`EditGuard`] covers the other half of the integration: refusing to save
//! files that are checked out read-only.

pub mod completion;
pub mod config;
pub mod error;
pub mod guard;
pub mod presentation;
pub mod session;

pub use completion::{Completion, LockOp};
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use guard::{EditGuard, FileAccess, FsAccess, SaveFilter};
pub use presentation::IconResolver;
pub use session::{LockSession, PumpReport};

// Re-export key types
pub use alk_cache::Decoration;
pub use alk_gate::{DenyReason, Eligibility};
pub use alk_repo::{InMemoryRepository, PathMapper, ProjectPathMapper, Repository, RepositorySnapshot};
pub use alk_types::{
    AssetGuid, AssetPath, FileStatus, LockEntry, LockOwner, RemoteInfo, RepoPath, StatusEntry,
};
