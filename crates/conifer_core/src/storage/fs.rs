//! Logged filesystem helpers.
//!
//! # Invariants
//! - `ensure_dir` is idempotent.
//! - `write_new_file` uses create-new semantics and fails on collision.
//! - A failed write leaves neither the target nor its staging file behind.

use super::{StorageAction, StorageError, StorageResult};
use log::{debug, error, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

/// Creates `path` and any missing parents. Existing directories are fine.
pub fn ensure_dir(path: &Path) -> StorageResult<()> {
    fs::create_dir_all(path).map_err(|err| {
        error!(
            "event=dir_create module=storage status=error path={} error={}",
            path.display(),
            err
        );
        StorageError::new(StorageAction::CreateDir, path, err)
    })
}

/// Writes `bytes` to a file that must not exist yet.
///
/// The content is staged in a hidden `.tmp` sibling, synced, then linked
/// into place, so `path` either holds the full content or does not exist.
pub fn write_new_file(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    write_new_file_with(path, bytes.len(), |file| file.write_all(bytes))
}

fn write_new_file_with(
    path: &Path,
    len: usize,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> StorageResult<()> {
    let started_at = Instant::now();
    let staging = staging_path(path);
    let result = stage_and_link(&staging, path, write);
    remove_staging(&staging);

    match result {
        Ok(()) => {
            debug!(
                "event=file_write module=storage status=ok path={} bytes={} duration_ms={}",
                path.display(),
                len,
                started_at.elapsed().as_millis()
            );
            Ok(())
        }
        Err(err) => {
            error!(
                "event=file_write module=storage status=error path={} duration_ms={} error={}",
                path.display(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(StorageError::new(StorageAction::WriteFile, path, err))
        }
    }
}

fn stage_and_link(
    staging: &Path,
    path: &Path,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(staging)?;
    write(&mut file)?;
    file.sync_all()?;
    drop(file);
    // Fails with `AlreadyExists` instead of replacing `path`.
    fs::hard_link(staging, path)
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
}

fn remove_staging(staging: &Path) {
    match fs::remove_file(staging) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            "event=file_cleanup module=storage status=error path={} error={}",
            staging.display(),
            err
        ),
    }
}

pub fn read_file(path: &Path) -> StorageResult<Vec<u8>> {
    fs::read(path).map_err(|err| StorageError::new(StorageAction::ReadFile, path, err))
}

/// Entries of `dir` sorted by file name.
pub fn list_dir(dir: &Path) -> StorageResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|err| {
        error!(
            "event=dir_list module=storage status=error path={} error={}",
            dir.display(),
            err
        );
        StorageError::new(StorageAction::ListDir, dir, err)
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| StorageError::new(StorageAction::ListDir, dir, err))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::{ensure_dir, list_dir, read_file, write_new_file, write_new_file_with};
    use crate::storage::StorageAction;
    use std::io::{self, Write};

    #[test]
    fn ensure_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("users").join("sub-1");
        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn write_new_file_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.snapshot");
        write_new_file(&path, b"first").unwrap();

        let err = write_new_file(&path, b"second").unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(err.action, StorageAction::WriteFile);
        assert_eq!(read_file(&path).unwrap(), b"first");
        assert_eq!(list_dir(dir.path()).unwrap(), vec![path]);
    }

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.snapshot");

        let err = write_new_file_with(&path, 8, |file| {
            file.write_all(b"half")?;
            Err(io::Error::new(io::ErrorKind::Other, "File too large"))
        })
        .unwrap_err();

        assert_eq!(err.action, StorageAction::WriteFile);
        assert_eq!(err.path, path);
        assert!(list_dir(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn list_dir_sorts_by_name_and_reports_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        write_new_file(&dir.path().join("b"), b"").unwrap();
        write_new_file(&dir.path().join("a"), b"").unwrap();

        let names = list_dir(dir.path())
            .unwrap()
            .into_iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a", "b"]);

        let err = list_dir(&dir.path().join("missing")).unwrap_err();
        assert_eq!(err.action, StorageAction::ListDir);
    }
}
