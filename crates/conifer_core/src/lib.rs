//! Core counting logic for Conifer Counter.
//! This crate owns the counting, persistence and leaderboard invariants; the
//! presentation layer only calls into [`api`].

pub mod api;
pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;

pub use api::ActionResponse;
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::catalog::{CatalogError, TreeCatalog, TreeCategory};
pub use model::counter::{CounterError, CounterSet, TreeCounter};
pub use model::identity::{display_name_from_email, Identity, IdentityError, IdentityProfile};
pub use model::snapshot::{SnapshotCodecError, SnapshotDocument, SNAPSHOT_SCHEMA_VERSION};
pub use repo::snapshot_repo::{
    CorruptSnapshot, FsSnapshotRepository, RepoError, RepoResult, SnapshotListing,
    SnapshotRepository, StoredSnapshot,
};
pub use repo::user_repo::{SharedCounts, UserDirectory, UserEntry};
pub use service::dashboard_service::Dashboard;
pub use service::leaderboard_service::{
    build_table, LeaderboardColumn, LeaderboardError, LeaderboardReport, LeaderboardRow,
    LeaderboardService, LeaderboardTable, SortOrder,
};
pub use service::session_service::{
    CategoryCounts, CountsView, SavedSession, SessionId, SessionStore, SightingCounts,
};
pub use storage::{StorageAction, StorageError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
