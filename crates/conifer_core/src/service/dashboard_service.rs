//! Application-scope context.
//!
//! # Responsibility
//! - Bring up process-wide state: catalog, users root, identity registry and
//!   application-scope counters.
//! - Open sessions for authenticated subjects.
//!
//! # Invariants
//! - There is one `Dashboard` per running process; it is passed explicitly,
//!   never stored in a global.
//! - Every counter set it hands out is bound to the same catalog.

use crate::config::CoreConfig;
use crate::model::catalog::TreeCatalog;
use crate::model::counter::CounterSet;
use crate::model::identity::IdentityError;
use crate::repo::snapshot_repo::{FsSnapshotRepository, RepoError, SnapshotRepository};
use crate::repo::user_repo::{lock_recover, SharedCounts, UserDirectory};
use crate::service::leaderboard_service::{LeaderboardError, LeaderboardReport, LeaderboardService};
use crate::service::session_service::SessionStore;
use crate::storage::StorageError;
use log::info;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Process-wide dashboard state.
pub struct Dashboard<R: SnapshotRepository + Clone = FsSnapshotRepository> {
    catalog: Arc<TreeCatalog>,
    users: UserDirectory,
    app_counts: SharedCounts,
    repo: R,
}

impl Dashboard {
    /// Starts the dashboard with the conifer catalog and file snapshots.
    pub fn start(config: &CoreConfig) -> Result<Self, StorageError> {
        Self::with_parts(
            config.users_root(),
            Arc::new(TreeCatalog::conifers()),
            FsSnapshotRepository::new(),
        )
    }
}

impl<R: SnapshotRepository + Clone> Dashboard<R> {
    /// Starts the dashboard over `users_root`, creating it if needed.
    pub fn with_parts(
        users_root: &Path,
        catalog: Arc<TreeCatalog>,
        repo: R,
    ) -> Result<Self, StorageError> {
        let users = UserDirectory::open(users_root, catalog.clone())?;
        let app_counts = Arc::new(Mutex::new(CounterSet::new(catalog.clone())));
        info!(
            "event=dashboard_start module=service status=ok categories={}",
            catalog.len()
        );
        Ok(Self {
            catalog,
            users,
            app_counts,
            repo,
        })
    }

    pub fn catalog(&self) -> &Arc<TreeCatalog> {
        &self.catalog
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    /// Copy of the application-scope counters.
    pub fn app_counts(&self) -> CounterSet {
        lock_recover(&self.app_counts).clone()
    }

    /// Opens a fresh session for an authenticated subject.
    ///
    /// The identity is resolved (and its home directory created) on the
    /// subject's first connection and reused afterwards.
    pub fn connect(&self, subject_id: &str, email: &str) -> Result<SessionStore<R>, IdentityError> {
        let user = self.users.resolve_identity(subject_id, email)?;
        Ok(SessionStore::new(
            self.catalog.clone(),
            user,
            self.app_counts.clone(),
            self.repo.clone(),
        ))
    }

    /// Leaderboard with one row per stored identity.
    pub fn leaderboard(&self) -> Result<LeaderboardReport, LeaderboardError> {
        let identities = self
            .users
            .stored_identities()
            .map_err(RepoError::from)?;
        LeaderboardService::new(&self.repo, self.catalog.clone()).all_identities_report(&identities)
    }
}
