//! Per-connection session store.
//!
//! # Responsibility
//! - Own the session-scoped counter set of one UI connection.
//! - Apply each sighting to the session, identity and application scopes in
//!   lockstep.
//! - Save the session as a snapshot when it ends.
//!
//! # Invariants
//! - A sighting for an unknown category mutates no scope.
//! - Shared scopes are locked identity first, then application.
//! - A failed save keeps the session counts so the action can be retried.

use crate::logging::sanitize_message;
use crate::model::catalog::{TreeCatalog, TreeCategory};
use crate::model::counter::{CounterError, CounterSet};
use crate::model::identity::Identity;
use crate::repo::snapshot_repo::{FsSnapshotRepository, RepoError, SnapshotRepository};
use crate::repo::user_repo::{lock_recover, SharedCounts, UserEntry};
use crate::service::leaderboard_service::{LeaderboardError, LeaderboardReport, LeaderboardService};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

const MAX_LOGGED_NAME_CHARS: usize = 64;

/// Identifier of one UI connection's session.
pub type SessionId = Uuid;

/// Counts after one recorded sighting, for refreshing the affected widgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SightingCounts {
    pub common_name: String,
    pub session: u64,
    pub user: u64,
    pub app: u64,
    pub session_total: u64,
    pub user_total: u64,
    pub app_total: u64,
}

/// One category's count in each scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCounts {
    pub category: TreeCategory,
    pub session: u64,
    pub user: u64,
    pub app: u64,
}

/// Full read of every scope, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountsView {
    pub rows: Vec<CategoryCounts>,
    pub session_total: u64,
    pub user_total: u64,
    pub app_total: u64,
}

/// Outcome of ending a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSession {
    pub session_id: SessionId,
    pub path: PathBuf,
    pub total: u64,
}

/// Counting state of one UI connection.
pub struct SessionStore<R: SnapshotRepository = FsSnapshotRepository> {
    session_id: SessionId,
    catalog: Arc<TreeCatalog>,
    user: Arc<UserEntry>,
    app: SharedCounts,
    session: CounterSet,
    repo: R,
}

impl<R: SnapshotRepository> SessionStore<R> {
    /// Starts a fresh session for `user`.
    pub fn new(catalog: Arc<TreeCatalog>, user: Arc<UserEntry>, app: SharedCounts, repo: R) -> Self {
        let session = CounterSet::new(catalog.clone());
        let store = Self {
            session_id: Uuid::new_v4(),
            catalog,
            user,
            app,
            session,
            repo,
        };
        info!(
            "event=session_start module=service status=ok session_id={} user_id={}",
            store.session_id,
            store.identity().user_id()
        );
        store
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn identity(&self) -> &Identity {
        self.user.identity()
    }

    pub fn catalog(&self) -> &Arc<TreeCatalog> {
        &self.catalog
    }

    /// Session-scoped counters.
    pub fn session_counts(&self) -> &CounterSet {
        &self.session
    }

    /// Records one sighting of `common_name` in every scope.
    ///
    /// The name is resolved in all three sets before any of them changes.
    pub fn record_sighting(&mut self, common_name: &str) -> Result<SightingCounts, CounterError> {
        let mut user = lock_recover(self.user.counts());
        let mut app = lock_recover(&self.app);

        let positions = resolve_positions(common_name, [&self.session, &*user, &*app]);
        let [session_at, user_at, app_at] = match positions {
            Ok(positions) => positions,
            Err(err) => {
                warn!(
                    "event=sighting_record module=service status=error session_id={} error_code=unknown_category name={}",
                    self.session_id,
                    sanitize_message(common_name, MAX_LOGGED_NAME_CHARS)
                );
                return Err(err);
            }
        };

        let counts = SightingCounts {
            common_name: common_name.to_string(),
            session: self.session.increment_at(session_at),
            user: user.increment_at(user_at),
            app: app.increment_at(app_at),
            session_total: self.session.total(),
            user_total: user.total(),
            app_total: app.total(),
        };
        debug!(
            "event=sighting_record module=service status=ok session_id={} user_id={} category={} session={} user={} app={}",
            self.session_id,
            self.user.identity().user_id(),
            common_name,
            counts.session,
            counts.user,
            counts.app
        );
        Ok(counts)
    }

    /// Reads every scope for a full re-render.
    pub fn refresh_counts(&self) -> CountsView {
        let user = lock_recover(self.user.counts());
        let app = lock_recover(&self.app);

        let rows = self
            .session
            .counters()
            .iter()
            .map(|counter| {
                let name = counter.category().common_name.as_str();
                CategoryCounts {
                    category: counter.category().clone(),
                    session: counter.count(),
                    user: user.count(name).unwrap_or(0),
                    app: app.count(name).unwrap_or(0),
                }
            })
            .collect();

        CountsView {
            rows,
            session_total: self.session.total(),
            user_total: user.total(),
            app_total: app.total(),
        }
    }

    /// Saves the session as a snapshot and starts a fresh one.
    ///
    /// Identity and application counts are untouched.
    pub fn end_session(&mut self) -> Result<SavedSession, RepoError> {
        let path = match self.repo.save_snapshot(&self.session, self.user.identity()) {
            Ok(path) => path,
            Err(err) => {
                warn!(
                    "event=session_end module=service status=error session_id={} user_id={} error={}",
                    self.session_id,
                    self.user.identity().user_id(),
                    err
                );
                return Err(err);
            }
        };

        let saved = SavedSession {
            session_id: self.session_id,
            path,
            total: self.session.total(),
        };
        self.session = CounterSet::new(self.catalog.clone());
        self.session_id = Uuid::new_v4();
        info!(
            "event=session_end module=service status=ok session_id={} next_session_id={} total={}",
            saved.session_id, self.session_id, saved.total
        );
        Ok(saved)
    }

    /// Leaderboard of this identity's saved sessions.
    pub fn view_history(&self) -> Result<LeaderboardReport, LeaderboardError> {
        LeaderboardService::new(&self.repo, self.catalog.clone()).identity_report(self.user.identity())
    }
}

fn resolve_positions(
    common_name: &str,
    sets: [&CounterSet; 3],
) -> Result<[usize; 3], CounterError> {
    let mut positions = [0; 3];
    for (slot, set) in positions.iter_mut().zip(sets) {
        *slot = set.position(common_name)?;
    }
    Ok(positions)
}
