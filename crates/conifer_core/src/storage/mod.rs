//! Flat-file storage primitives.
//!
//! # Responsibility
//! - Create directories and files under the users root.
//! - Report every filesystem failure with the action and path involved.
//!
//! # Invariants
//! - Writes of new records never replace an existing file.
//! - No failure is swallowed; callers always receive a `StorageError`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

mod fs;

pub use fs::{ensure_dir, list_dir, read_file, write_new_file};

pub type StorageResult<T> = Result<T, StorageError>;

/// Filesystem operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageAction {
    CreateDir,
    ListDir,
    ReadFile,
    WriteFile,
}

impl StorageAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateDir => "create_dir",
            Self::ListDir => "list_dir",
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
        }
    }
}

#[derive(Debug)]
pub struct StorageError {
    pub action: StorageAction,
    pub path: PathBuf,
    pub source: io::Error,
}

impl StorageError {
    pub fn new(action: StorageAction, path: impl AsRef<Path>, source: io::Error) -> Self {
        Self {
            action,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// True when a create-new write hit an existing file.
    pub fn is_already_exists(&self) -> bool {
        self.source.kind() == io::ErrorKind::AlreadyExists
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "storage {} failed for `{}`: {}",
            self.action.as_str(),
            self.path.display(),
            self.source
        )
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}
