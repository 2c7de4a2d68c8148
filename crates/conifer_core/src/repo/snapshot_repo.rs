//! Snapshot repository contracts and flat-file implementation.
//!
//! # Responsibility
//! - Persist session counter sets under an identity's home directory.
//! - Enumerate and decode an identity's history.
//!
//! # Invariants
//! - Each save creates a new `<timestamp>.snapshot` file; nothing is
//!   overwritten. Timestamps have nanosecond resolution, and a collision is
//!   reported as a storage error.
//! - One unreadable or malformed file never aborts enumeration.
//! - Listings are sorted by file name, which is chronological.

use crate::model::catalog::TreeCatalog;
use crate::model::counter::CounterSet;
use crate::model::identity::Identity;
use crate::model::snapshot::{SnapshotCodecError, SnapshotDocument};
use crate::storage::{list_dir, read_file, write_new_file, StorageError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// File extension of snapshot files.
pub const SNAPSHOT_EXTENSION: &str = "snapshot";

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Storage(StorageError),
    Codec(SnapshotCodecError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Codec(err) => Some(err),
        }
    }
}

impl From<StorageError> for RepoError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<SnapshotCodecError> for RepoError {
    fn from(value: SnapshotCodecError) -> Self {
        Self::Codec(value)
    }
}

/// One snapshot file that could not be read or decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptSnapshot {
    pub path: PathBuf,
    pub reason: String,
}

impl Display for CorruptSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "corrupt snapshot `{}`: {}", self.path.display(), self.reason)
    }
}

impl Error for CorruptSnapshot {}

/// A decoded snapshot and the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSnapshot {
    pub path: PathBuf,
    pub counts: CounterSet,
}

/// Result of enumerating an identity's snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotListing {
    pub snapshots: Vec<StoredSnapshot>,
    pub errors: Vec<CorruptSnapshot>,
}

impl SnapshotListing {
    pub fn counter_sets(&self) -> impl Iterator<Item = &CounterSet> {
        self.snapshots.iter().map(|snapshot| &snapshot.counts)
    }
}

/// Repository interface for snapshot persistence.
pub trait SnapshotRepository {
    /// Writes `counts` as a new snapshot and returns its path.
    fn save_snapshot(&self, counts: &CounterSet, identity: &Identity) -> RepoResult<PathBuf>;
    /// Decodes every snapshot of `identity` against `catalog`.
    fn list_snapshots(
        &self,
        catalog: &Arc<TreeCatalog>,
        identity: &Identity,
    ) -> RepoResult<SnapshotListing>;
}

impl<R: SnapshotRepository + ?Sized> SnapshotRepository for &R {
    fn save_snapshot(&self, counts: &CounterSet, identity: &Identity) -> RepoResult<PathBuf> {
        (**self).save_snapshot(counts, identity)
    }

    fn list_snapshots(
        &self,
        catalog: &Arc<TreeCatalog>,
        identity: &Identity,
    ) -> RepoResult<SnapshotListing> {
        (**self).list_snapshots(catalog, identity)
    }
}

/// Snapshot repository writing JSON files into identity home directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSnapshotRepository;

impl FsSnapshotRepository {
    pub fn new() -> Self {
        Self
    }

    /// Saves `counts` with an explicit timestamp.
    pub fn save_snapshot_at(
        &self,
        counts: &CounterSet,
        identity: &Identity,
        at: OffsetDateTime,
    ) -> RepoResult<PathBuf> {
        let path = identity.home_directory().join(snapshot_file_name(at));
        let document = SnapshotDocument::from_counter_set(counts, at.format(&Rfc3339).ok());
        write_new_file(&path, &document.to_bytes()?)?;
        info!(
            "event=snapshot_save module=repo status=ok user_id={} file={} total={}",
            identity.user_id(),
            file_label(&path),
            counts.total()
        );
        Ok(path)
    }
}

impl SnapshotRepository for FsSnapshotRepository {
    fn save_snapshot(&self, counts: &CounterSet, identity: &Identity) -> RepoResult<PathBuf> {
        self.save_snapshot_at(counts, identity, OffsetDateTime::now_utc())
    }

    fn list_snapshots(
        &self,
        catalog: &Arc<TreeCatalog>,
        identity: &Identity,
    ) -> RepoResult<SnapshotListing> {
        let mut listing = SnapshotListing::default();
        for path in list_dir(identity.home_directory())? {
            if !is_snapshot_file(&path) {
                continue;
            }
            match load_snapshot(catalog, &path) {
                Ok(counts) => listing.snapshots.push(StoredSnapshot { path, counts }),
                Err(reason) => {
                    warn!(
                        "event=snapshot_load module=repo status=error user_id={} file={} error={}",
                        identity.user_id(),
                        file_label(&path),
                        reason
                    );
                    listing.errors.push(CorruptSnapshot { path, reason });
                }
            }
        }
        Ok(listing)
    }
}

/// `YYYYMMDDTHHMMSS.nnnnnnnnnZ.snapshot`, UTC. Sorts chronologically.
pub fn snapshot_file_name(at: OffsetDateTime) -> String {
    let at = at.to_offset(time::UtcOffset::UTC);
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}.{:09}Z.{SNAPSHOT_EXTENSION}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        at.nanosecond()
    )
}

fn is_snapshot_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|extension| extension == SNAPSHOT_EXTENSION)
}

fn load_snapshot(catalog: &Arc<TreeCatalog>, path: &Path) -> Result<CounterSet, String> {
    let bytes = read_file(path).map_err(|err| err.to_string())?;
    CounterSet::deserialize(catalog.clone(), &bytes).map_err(|err| err.to_string())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
