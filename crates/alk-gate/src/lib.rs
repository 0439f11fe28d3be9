//! Lock action gating for the Asset Lock Kit.
//!
//! Before the editor enables "Request Lock" or "Release Lock" for an asset,
//! it asks this crate. Two pieces answer:
//!
//! - [`BusyGate`]: at most one lock operation in flight, with a watchdog
//!   that force-clears a gate left busy by an operation that never finished
//! - [`LockEligibility`]: pure rules over the cached status and lock
//!   snapshots
//!
//! Both are driven from a single owner thread; nothing here locks.

pub mod busy;
pub mod config;
pub mod eligibility;
pub mod error;

pub use busy::{BusyGate, BusyState};
pub use config::GateConfig;
pub use eligibility::{DenyReason, Eligibility, LockEligibility};
pub use error::GateError;
