//! Counting domain model.
//!
//! # Responsibility
//! - Define the catalog, counters, identities and snapshot wire format.
//!
//! # Invariants
//! - Every counter set is bound to one catalog and follows its order.
//! - Category lookups are fallible; unknown names are never ignored.

pub mod catalog;
pub mod counter;
pub mod identity;
pub mod snapshot;
