//! Persistence layer over the users root.
//!
//! # Responsibility
//! - Define data access contracts for snapshots and identities.
//! - Keep file layout and encoding out of the service layer.
//!
//! # Invariants
//! - Layout is `<users_root>/<user_id>/{identity.json,<timestamp>.snapshot}`.
//! - Repository APIs return semantic errors (`CorruptSnapshot`) alongside
//!   storage errors.

pub mod snapshot_repo;
pub mod user_repo;
