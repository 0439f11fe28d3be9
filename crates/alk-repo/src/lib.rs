//! Repository collaborators for the Asset Lock Kit.
//!
//! ALK caches what a version-control repository reports; it never computes
//! status or talks to a lock server itself. This crate defines the seams:
//!
//! - [`Repository`]: status/lock snapshots, change notifications, and the
//!   asynchronous lock operations
//! - [`PathMapper`]: translation between the editor's asset paths and the
//!   repository's paths
//!
//! plus [`InMemoryRepository`], a complete in-process implementation used by
//! tests and the `alk` CLI, and [`RepositorySnapshot`], its JSON form.

pub mod error;
pub mod mapper;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{RepoError, RepoResult};
pub use mapper::{PathMapper, ProjectPathMapper};
pub use memory::InMemoryRepository;
pub use snapshot::RepositorySnapshot;
pub use traits::{Repository, RepositoryEvent};
