//! Action surface for the presentation layer.
//!
//! # Responsibility
//! - Map each named UI action to one session operation.
//! - Turn errors into user-visible messages so one user's failure never
//!   escapes into the UI host.
//!
//! # Invariants
//! - Action functions never panic and never return `Err`.
//! - `ok == false` implies `data == None` and a non-empty `message`.

use crate::repo::snapshot_repo::SnapshotRepository;
use crate::service::dashboard_service::Dashboard;
use crate::service::leaderboard_service::{LeaderboardReport, LeaderboardTable};
use crate::service::session_service::{CountsView, SavedSession, SessionStore, SightingCounts};

/// Envelope returned by every action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse<T> {
    /// Whether the action succeeded.
    pub ok: bool,
    /// Payload for re-rendering; `None` on failure.
    pub data: Option<T>,
    /// Human-readable status line.
    pub message: String,
}

impl<T> ActionResponse<T> {
    fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            message: message.into(),
        }
    }
}

/// `record_sighting(category)`: the "Tree spotted!" button.
pub fn record_sighting<R: SnapshotRepository>(
    session: &mut SessionStore<R>,
    common_name: &str,
) -> ActionResponse<SightingCounts> {
    match session.record_sighting(common_name) {
        Ok(counts) => ActionResponse::success(
            format!("Sightings this session: {}", counts.session),
            counts,
        ),
        Err(err) => ActionResponse::failure(format!("record_sighting failed: {err}")),
    }
}

/// `refresh_counts()`: re-reads every scope.
pub fn refresh_counts<R: SnapshotRepository>(
    session: &SessionStore<R>,
) -> ActionResponse<CountsView> {
    let view = session.refresh_counts();
    ActionResponse::success(
        format!("Total trees this session: {}", view.session_total),
        view,
    )
}

/// `view_history()`: this identity's past sessions.
pub fn view_history<R: SnapshotRepository>(
    session: &SessionStore<R>,
) -> ActionResponse<LeaderboardTable> {
    match session.view_history() {
        Ok(report) => report_response(report),
        Err(err) => ActionResponse::failure(format!("view_history failed: {err}")),
    }
}

/// `end_session()`: saves this session's counts and resets them to zero.
pub fn end_session<R: SnapshotRepository>(
    session: &mut SessionStore<R>,
) -> ActionResponse<SavedSession> {
    match session.end_session() {
        Ok(saved) => ActionResponse::success(
            format!("Session saved with {} sighting(s).", saved.total),
            saved,
        ),
        Err(err) => ActionResponse::failure(format!("end_session failed: {err}")),
    }
}

/// Leaderboard across every stored identity.
pub fn view_leaderboard<R: SnapshotRepository + Clone>(
    dashboard: &Dashboard<R>,
) -> ActionResponse<LeaderboardTable> {
    match dashboard.leaderboard() {
        Ok(report) => report_response(report),
        Err(err) => ActionResponse::failure(format!("view_leaderboard failed: {err}")),
    }
}

fn report_response(report: LeaderboardReport) -> ActionResponse<LeaderboardTable> {
    let mut message = format!("{} row(s)", report.table.rows().len());
    if !report.skipped.is_empty() {
        message.push_str(&format!(
            "; {} unreadable snapshot(s) skipped",
            report.skipped.len()
        ));
    }
    if !report.unlisted.is_empty() {
        message.push_str(&format!(
            "; {} user(s) could not be read",
            report.unlisted.len()
        ));
    }
    message.push('.');
    ActionResponse::success(message, report.table)
}

#[cfg(test)]
mod tests {
    use super::report_response;
    use crate::model::catalog::TreeCatalog;
    use crate::service::leaderboard_service::{build_table, LeaderboardReport};

    #[test]
    fn report_message_counts_users_left_out() {
        let catalog = TreeCatalog::conifers();
        let report = LeaderboardReport {
            table: build_table(&catalog, Vec::new()).unwrap(),
            skipped: Vec::new(),
            unlisted: vec!["cher-sub".to_string()],
        };

        let response = report_response(report);
        assert!(response.ok);
        assert_eq!(response.message, "0 row(s); 1 user(s) could not be read.");
    }
}
