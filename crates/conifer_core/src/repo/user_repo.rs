//! Identity registry and per-user home directories.
//!
//! # Responsibility
//! - Resolve authenticated subjects to identities, once per subject.
//! - Own each identity's shared, identity-scoped counter set.
//! - Enumerate identities stored under the users root.
//!
//! # Invariants
//! - `resolve_identity` is idempotent per subject id: later calls return the
//!   same entry (same home directory, display name and counters).
//! - Home directories are created on first resolution; existing ones are
//!   reused.
//! - The registry is owned by its caller; there is no process-global map.

use crate::model::catalog::TreeCatalog;
use crate::model::counter::CounterSet;
use crate::model::identity::{Identity, IdentityError, IdentityProfile};
use crate::storage::{ensure_dir, list_dir, read_file, write_new_file, StorageError};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// File name of the identity profile inside a home directory.
pub const PROFILE_FILE_NAME: &str = "identity.json";

/// Counter set shared by every connection of one scope.
pub type SharedCounts = Arc<Mutex<CounterSet>>;

/// Locks a mutex, recovering the data from a poisoned lock.
///
/// Counter sets only hold plain integers, so a panic while holding the lock
/// cannot leave them half-updated.
pub(crate) fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry entry for one resolved identity.
#[derive(Debug)]
pub struct UserEntry {
    identity: Identity,
    counts: SharedCounts,
}

impl UserEntry {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Identity-scoped counters, shared across this user's sessions.
    pub fn counts(&self) -> &SharedCounts {
        &self.counts
    }
}

/// Maps subjects to identities and their storage locations.
#[derive(Debug)]
pub struct UserDirectory {
    users_root: PathBuf,
    catalog: Arc<TreeCatalog>,
    users: Mutex<BTreeMap<String, Arc<UserEntry>>>,
}

impl UserDirectory {
    /// Opens the directory rooted at `users_root`, creating it if needed.
    pub fn open(users_root: impl Into<PathBuf>, catalog: Arc<TreeCatalog>) -> Result<Self, StorageError> {
        let users_root = users_root.into();
        ensure_dir(&users_root)?;
        info!(
            "event=users_root_open module=repo status=ok path={}",
            users_root.display()
        );
        Ok(Self {
            users_root,
            catalog,
            users: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn users_root(&self) -> &Path {
        &self.users_root
    }

    /// Resolves `subject_id`, creating its home directory on first use.
    ///
    /// A repeated call returns the cached entry; `email` is only read on the
    /// first call.
    pub fn resolve_identity(
        &self,
        subject_id: &str,
        email: &str,
    ) -> Result<Arc<UserEntry>, IdentityError> {
        let mut users = lock_recover(&self.users);
        if let Some(entry) = users.get(subject_id) {
            debug!(
                "event=identity_resolve module=repo status=ok cached=true user_id={subject_id}"
            );
            return Ok(entry.clone());
        }

        let identity = Identity::derive(subject_id, email, &self.users_root)?;
        ensure_dir(identity.home_directory())?;
        write_profile_if_absent(&identity)?;

        let entry = Arc::new(UserEntry {
            identity,
            counts: Arc::new(Mutex::new(CounterSet::new(self.catalog.clone()))),
        });
        users.insert(subject_id.to_string(), entry.clone());
        info!("event=identity_resolve module=repo status=ok cached=false user_id={subject_id}");
        Ok(entry)
    }

    pub fn get(&self, user_id: &str) -> Option<Arc<UserEntry>> {
        lock_recover(&self.users).get(user_id).cloned()
    }

    /// Number of identities resolved by this process.
    pub fn len(&self) -> usize {
        lock_recover(&self.users).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every identity with a home directory under the users root, sorted by
    /// user id.
    ///
    /// Identities resolved in this process come from the registry; others are
    /// rebuilt from `identity.json`, falling back to the user id as display
    /// name when the profile is missing or unreadable.
    pub fn stored_identities(&self) -> Result<Vec<Identity>, StorageError> {
        let mut identities = Vec::new();
        for path in list_dir(&self.users_root)? {
            if !path.is_dir() {
                continue;
            }
            let Some(user_id) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if let Some(entry) = self.get(user_id) {
                identities.push(entry.identity.clone());
                continue;
            }
            match self.load_identity(user_id) {
                Ok(identity) => identities.push(identity),
                Err(err) => warn!(
                    "event=identity_load module=repo status=error path={} error={}",
                    path.display(),
                    err
                ),
            }
        }
        Ok(identities)
    }

    fn load_identity(&self, user_id: &str) -> Result<Identity, IdentityError> {
        let profile_path = self.users_root.join(user_id).join(PROFILE_FILE_NAME);
        let profile = match read_profile(&profile_path) {
            Ok(profile) if profile.user_id == user_id => profile,
            Ok(_) | Err(_) => {
                debug!(
                    "event=identity_load module=repo status=fallback user_id={user_id} file={PROFILE_FILE_NAME}"
                );
                IdentityProfile {
                    user_id: user_id.to_string(),
                    display_name: user_id.to_string(),
                }
            }
        };
        Identity::from_profile(profile, &self.users_root)
    }
}

fn read_profile(path: &Path) -> Result<IdentityProfile, IdentityError> {
    let bytes = read_file(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_profile_if_absent(identity: &Identity) -> Result<(), IdentityError> {
    let path = identity.home_directory().join(PROFILE_FILE_NAME);
    if path.exists() {
        return Ok(());
    }
    let bytes = serde_json::to_vec_pretty(&identity.profile())?;
    match write_new_file(&path, &bytes) {
        Ok(()) => Ok(()),
        // Another process created it between the check and the write.
        Err(err) if err.is_already_exists() => Ok(()),
        Err(err) => Err(err.into()),
    }
}
