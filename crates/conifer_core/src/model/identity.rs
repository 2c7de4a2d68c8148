//! Authenticated identity model.
//!
//! # Responsibility
//! - Carry the external subject id and the display name derived from email.
//! - Map a subject to its private home directory under the users root.
//!
//! # Invariants
//! - `user_id` is used verbatim as one directory component: never empty,
//!   `.` or `..`, and free of `/`, `\` and NUL.
//! - `home_directory` is always `<users_root>/<user_id>`.
//! - Display names are derived, never user-supplied.

use crate::model::catalog::title_case;
use crate::storage::StorageError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Longest file name most filesystems accept, in bytes.
const MAX_USER_ID_BYTES: usize = 255;

static PATH_SEPARATOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[/\\\x00]").expect("path separator pattern is a valid regex")
});

#[derive(Debug)]
pub enum IdentityError {
    /// Subject id cannot be used as a directory name.
    InvalidUserId(String),
    /// Home directory or profile could not be written/read.
    Storage(StorageError),
    /// `identity.json` could not be encoded or decoded.
    Profile(serde_json::Error),
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUserId(value) => write!(f, "invalid user id `{value}`"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Profile(err) => write!(f, "invalid identity profile: {err}"),
        }
    }
}

impl Error for IdentityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidUserId(_) => None,
            Self::Storage(err) => Some(err),
            Self::Profile(err) => Some(err),
        }
    }
}

impl From<StorageError> for IdentityError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<serde_json::Error> for IdentityError {
    fn from(value: serde_json::Error) -> Self {
        Self::Profile(value)
    }
}

/// A resolved, authenticated subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: String,
    /// `None` for identities restored from an on-disk profile.
    email: Option<String>,
    display_name: String,
    home_directory: PathBuf,
}

impl Identity {
    /// Derives an identity for `user_id` without touching the filesystem.
    pub fn derive(
        user_id: &str,
        email: &str,
        users_root: &Path,
    ) -> Result<Self, IdentityError> {
        validate_user_id(user_id)?;
        Ok(Self {
            user_id: user_id.to_string(),
            email: Some(email.to_string()),
            display_name: display_name_from_email(email),
            home_directory: users_root.join(user_id),
        })
    }

    /// Rebuilds an identity from a stored profile.
    pub fn from_profile(profile: IdentityProfile, users_root: &Path) -> Result<Self, IdentityError> {
        validate_user_id(&profile.user_id)?;
        Ok(Self {
            home_directory: users_root.join(&profile.user_id),
            user_id: profile.user_id,
            email: None,
            display_name: profile.display_name,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn home_directory(&self) -> &Path {
        &self.home_directory
    }

    pub fn profile(&self) -> IdentityProfile {
        IdentityProfile {
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Persisted `identity.json` contents. Email is not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub user_id: String,
    pub display_name: String,
}

/// Derives `"First Last"` from the local part of an email address.
///
/// Only the first and last dot-separated tokens are used; middle tokens are
/// dropped. A single token yields just the first name.
pub fn display_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let tokens = local.split('.').collect::<Vec<_>>();
    let (first, last) = match tokens.as_slice() {
        [first, .., last] => (*first, *last),
        [only] => (*only, ""),
        [] => ("", ""),
    };
    title_case(format!("{first} {last}").trim())
}

/// Subject ids are opaque; only what would break the single directory
/// component `<users_root>/<user_id>` is rejected.
pub(crate) fn validate_user_id(user_id: &str) -> Result<(), IdentityError> {
    let valid = !user_id.is_empty()
        && user_id.len() <= MAX_USER_ID_BYTES
        && user_id != "."
        && user_id != ".."
        && !PATH_SEPARATOR_PATTERN.is_match(user_id);
    if valid {
        Ok(())
    } else {
        Err(IdentityError::InvalidUserId(user_id.to_string()))
    }
}
