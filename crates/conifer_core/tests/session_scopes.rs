use conifer_core::api;
use conifer_core::{
    CounterError, CounterSet, CoreConfig, Dashboard, FsSnapshotRepository, Identity, RepoError,
    RepoResult, SnapshotListing, SnapshotRepository, StorageAction, StorageError, TreeCatalog,
};
use std::cell::Cell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

fn start(dir: &tempfile::TempDir) -> Dashboard {
    let config = CoreConfig::new(dir.path().join("app-data").join("users")).unwrap();
    Dashboard::start(&config).unwrap()
}

#[test]
fn sighting_updates_session_user_and_app_in_lockstep() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = start(&dir);
    let mut session = dashboard.connect("jane-sub", "jane.doe@x.com").unwrap();

    session.record_sighting("pine").unwrap();
    let counts = session.record_sighting("pine").unwrap();

    assert_eq!(counts.common_name, "pine");
    assert_eq!((counts.session, counts.user, counts.app), (2, 2, 2));
    assert_eq!(
        (counts.session_total, counts.user_total, counts.app_total),
        (2, 2, 2)
    );
    assert_eq!(dashboard.app_counts().count("pine").unwrap(), 2);
}

#[test]
fn unknown_category_leaves_every_scope_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = start(&dir);
    let mut session = dashboard.connect("jane-sub", "jane.doe@x.com").unwrap();
    session.record_sighting("yew").unwrap();
    let before = session.refresh_counts();

    let err = session.record_sighting("oak").unwrap_err();

    assert_eq!(err, CounterError::NotFound("oak".to_string()));
    assert_eq!(session.refresh_counts(), before);
}

#[test]
fn sessions_of_one_identity_share_user_counts_but_not_session_counts() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = start(&dir);
    let mut phone = dashboard.connect("jane-sub", "jane.doe@x.com").unwrap();
    let mut laptop = dashboard.connect("jane-sub", "jane.doe@x.com").unwrap();
    let mut other = dashboard.connect("cher-sub", "cher@x.com").unwrap();

    phone.record_sighting("cypress").unwrap();
    let laptop_counts = laptop.record_sighting("cypress").unwrap();
    let other_counts = other.record_sighting("cypress").unwrap();

    assert_ne!(phone.session_id(), laptop.session_id());
    assert_eq!(laptop_counts.session, 1);
    assert_eq!(laptop_counts.user, 2);
    assert_eq!(other_counts.user, 1);
    assert_eq!(other_counts.app, 3);
    assert_eq!(dashboard.users().len(), 2);
}

#[test]
fn concurrent_sessions_do_not_lose_increments() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = Arc::new(start(&dir));

    let handles = (0..4)
        .map(|_| {
            let dashboard = dashboard.clone();
            std::thread::spawn(move || {
                let mut session = dashboard.connect("jane-sub", "jane.doe@x.com").unwrap();
                for _ in 0..250 {
                    session.record_sighting("umbrella-pine").unwrap();
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    let session = dashboard.connect("jane-sub", "jane.doe@x.com").unwrap();
    let view = session.refresh_counts();
    assert_eq!(view.user_total, 1000);
    assert_eq!(view.app_total, 1000);
    assert_eq!(view.session_total, 0);
}

#[test]
fn refresh_counts_lists_every_category_in_catalog_order() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = start(&dir);
    let mut session = dashboard.connect("jane-sub", "jane.doe@x.com").unwrap();
    session.record_sighting("yellow-wood").unwrap();

    let view = session.refresh_counts();
    let names = view
        .rows
        .iter()
        .map(|row| row.category.common_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec!["araucaria", "cypress", "pine", "yellow-wood", "umbrella-pine", "yew"]
    );
    assert_eq!(view.rows[3].session, 1);
    assert_eq!(view.rows[3].category.family, "Podocarpaceae");
}

#[test]
fn end_session_saves_snapshot_and_resets_only_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = start(&dir);
    let mut session = dashboard.connect("jane-sub", "jane.doe@x.com").unwrap();
    session.record_sighting("pine").unwrap();
    session.record_sighting("yew").unwrap();
    let ended_id = session.session_id();

    let saved = session.end_session().unwrap();

    assert_eq!(saved.session_id, ended_id);
    assert_eq!(saved.total, 2);
    assert!(saved.path.is_file());
    assert_ne!(session.session_id(), ended_id);
    let view = session.refresh_counts();
    assert_eq!((view.session_total, view.user_total, view.app_total), (0, 2, 2));

    let history = session.view_history().unwrap();
    assert_eq!(history.table.rows().len(), 1);
    assert_eq!(history.table.rows()[0].total, 2);
}

#[derive(Clone)]
struct FlakyRepository {
    failures_left: Rc<Cell<u32>>,
}

impl SnapshotRepository for FlakyRepository {
    fn save_snapshot(&self, counts: &CounterSet, identity: &Identity) -> RepoResult<PathBuf> {
        if self.failures_left.get() > 0 {
            self.failures_left.set(self.failures_left.get() - 1);
            return Err(RepoError::Storage(StorageError::new(
                StorageAction::WriteFile,
                identity.home_directory(),
                io::Error::new(io::ErrorKind::Other, "disk full"),
            )));
        }
        FsSnapshotRepository::new().save_snapshot(counts, identity)
    }

    fn list_snapshots(
        &self,
        catalog: &Arc<TreeCatalog>,
        identity: &Identity,
    ) -> RepoResult<SnapshotListing> {
        FsSnapshotRepository::new().list_snapshots(catalog, identity)
    }
}

#[test]
fn failed_save_keeps_session_counts_for_retry() {
    let dir = tempfile::tempdir().unwrap();
    let repo = FlakyRepository {
        failures_left: Rc::new(Cell::new(1)),
    };
    let dashboard = Dashboard::with_parts(
        &dir.path().join("users"),
        Arc::new(TreeCatalog::conifers()),
        repo,
    )
    .unwrap();
    let mut session = dashboard.connect("jane-sub", "jane.doe@x.com").unwrap();
    session.record_sighting("araucaria").unwrap();
    let session_id = session.session_id();

    let failed = api::end_session(&mut session);
    assert!(!failed.ok);
    assert!(failed.data.is_none());
    assert!(failed.message.contains("disk full"), "{}", failed.message);
    assert_eq!(session.session_counts().total(), 1);
    assert_eq!(session.session_id(), session_id);

    let retried = api::end_session(&mut session);
    assert!(retried.ok, "{}", retried.message);
    assert_eq!(retried.data.unwrap().total, 1);
    assert_eq!(session.session_counts().total(), 0);
}

#[test]
fn action_envelopes_carry_messages_instead_of_errors() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = start(&dir);
    let mut session = dashboard.connect("jane-sub", "jane.doe@x.com").unwrap();

    let spotted = api::record_sighting(&mut session, "pine");
    assert!(spotted.ok);
    assert_eq!(spotted.message, "Sightings this session: 1");

    let unknown = api::record_sighting(&mut session, "oak");
    assert!(!unknown.ok);
    assert!(unknown.data.is_none());
    assert!(unknown.message.contains("oak"));

    let refreshed = api::refresh_counts(&session);
    assert_eq!(refreshed.message, "Total trees this session: 1");

    let ended = api::end_session(&mut session);
    assert!(ended.ok, "{}", ended.message);

    let history = api::view_history(&session);
    assert!(history.ok);
    assert_eq!(history.data.unwrap().rows().len(), 1);

    let leaderboard = api::view_leaderboard(&dashboard);
    assert!(leaderboard.ok);
    let table = leaderboard.data.unwrap();
    assert_eq!(table.rows()[0].identity, "Jane Doe");
    assert_eq!(table.to_csv().lines().next().unwrap(), "identity,total,araucaria,cypress,pine,yellow-wood,umbrella-pine,yew");
}

#[test]
fn history_reports_skipped_snapshots_in_message() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = start(&dir);
    let mut session = dashboard.connect("jane-sub", "jane.doe@x.com").unwrap();
    session.record_sighting("pine").unwrap();
    session.end_session().unwrap();
    std::fs::write(
        session.identity().home_directory().join("broken.snapshot"),
        b"{}",
    )
    .unwrap();

    let history = api::view_history(&session);
    assert!(history.ok);
    assert_eq!(history.message, "1 row(s); 1 unreadable snapshot(s) skipped.");
}

#[test]
fn failed_save_leaves_history_clean_for_the_retry() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = start(&dir);
    let mut session = dashboard.connect("jane-sub", "jane.doe@x.com").unwrap();
    session.record_sighting("pine").unwrap();
    let home = session.identity().home_directory().to_path_buf();

    // Swap the home directory for a plain file so the write fails.
    std::fs::remove_dir_all(&home).unwrap();
    std::fs::write(&home, b"").unwrap();
    let failed = api::end_session(&mut session);
    assert!(!failed.ok);
    assert_eq!(session.session_counts().total(), 1);

    std::fs::remove_file(&home).unwrap();
    std::fs::create_dir(&home).unwrap();
    let retried = api::end_session(&mut session);
    assert!(retried.ok, "{}", retried.message);

    let names = std::fs::read_dir(&home)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    assert_eq!(names.len(), 1, "{names:?}");
    assert!(names[0].ends_with(".snapshot"));

    let history = api::view_history(&session);
    assert_eq!(history.message, "1 row(s).");
}
