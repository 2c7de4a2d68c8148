//! Snapshot wire format for persisted counter sets.
//!
//! # Responsibility
//! - Define the versioned JSON document written for each saved session.
//! - Convert between documents and catalog-bound `CounterSet`s.
//!
//! # Invariants
//! - `counts` is written in catalog order.
//! - Decoding rejects unknown and duplicate category names.
//! - Catalog entries missing from a document decode as zero.

use crate::model::catalog::TreeCatalog;
use crate::model::counter::CounterSet;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Current snapshot schema version.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug)]
pub enum SnapshotCodecError {
    Json(serde_json::Error),
    UnsupportedVersion(u32),
    UnknownCategory(String),
    DuplicateCategory(String),
}

impl Display for SnapshotCodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid snapshot json: {err}"),
            Self::UnsupportedVersion(version) => write!(
                f,
                "snapshot schema version {version} is not supported (expected {SNAPSHOT_SCHEMA_VERSION})"
            ),
            Self::UnknownCategory(name) => write!(f, "snapshot names unknown category `{name}`"),
            Self::DuplicateCategory(name) => {
                write!(f, "snapshot lists category `{name}` more than once")
            }
        }
    }
}

impl Error for SnapshotCodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SnapshotCodecError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// One `(category, count)` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRecord {
    pub common_name: String,
    pub count: u64,
}

/// Versioned snapshot document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub schema_version: u32,
    /// RFC 3339 UTC save time; absent for in-memory serialization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    pub counts: Vec<CountRecord>,
}

impl SnapshotDocument {
    pub fn from_counter_set(set: &CounterSet, saved_at: Option<String>) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            saved_at,
            counts: set
                .counters()
                .iter()
                .map(|counter| CountRecord {
                    common_name: counter.category().common_name.clone(),
                    count: counter.count(),
                })
                .collect(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotCodecError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotCodecError> {
        let document: Self = serde_json::from_slice(bytes)?;
        if document.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotCodecError::UnsupportedVersion(
                document.schema_version,
            ));
        }
        Ok(document)
    }

    pub fn into_counter_set(
        self,
        catalog: Arc<TreeCatalog>,
    ) -> Result<CounterSet, SnapshotCodecError> {
        let mut counts = vec![0_u64; catalog.len()];
        let mut seen = vec![false; catalog.len()];
        for record in self.counts {
            let index = catalog
                .position(&record.common_name)
                .ok_or_else(|| SnapshotCodecError::UnknownCategory(record.common_name.clone()))?;
            if seen[index] {
                return Err(SnapshotCodecError::DuplicateCategory(record.common_name));
            }
            seen[index] = true;
            counts[index] = record.count;
        }
        Ok(CounterSet::from_counts(catalog, &counts))
    }
}

#[cfg(test)]
mod tests {
    use super::{SnapshotCodecError, SnapshotDocument, SNAPSHOT_SCHEMA_VERSION};
    use crate::model::catalog::{TreeCatalog, TreeCategory};
    use crate::model::counter::CounterSet;
    use std::sync::Arc;

    fn small_catalog() -> Arc<TreeCatalog> {
        Arc::new(
            TreeCatalog::new(vec![
                TreeCategory::new("pine", "Pinaceae"),
                TreeCategory::new("yew", "Taxaceae"),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn document_uses_expected_wire_fields() {
        let mut set = CounterSet::new(small_catalog());
        set.increment("yew").unwrap();

        let document =
            SnapshotDocument::from_counter_set(&set, Some("2026-10-18T10:15:00Z".to_string()));
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["schema_version"], SNAPSHOT_SCHEMA_VERSION);
        assert_eq!(json["saved_at"], "2026-10-18T10:15:00Z");
        assert_eq!(json["counts"][0]["common_name"], "pine");
        assert_eq!(json["counts"][0]["count"], 0);
        assert_eq!(json["counts"][1]["common_name"], "yew");
        assert_eq!(json["counts"][1]["count"], 1);
    }

    #[test]
    fn serialize_then_deserialize_preserves_pairs_and_order() {
        let catalog = Arc::new(TreeCatalog::conifers());
        let mut set = CounterSet::new(catalog.clone());
        set.increment("cypress").unwrap();
        set.increment("umbrella-pine").unwrap();
        set.increment("umbrella-pine").unwrap();

        let decoded = CounterSet::deserialize(catalog, &set.serialize().unwrap()).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn missing_categories_decode_as_zero() {
        let bytes = br#"{"schema_version":1,"counts":[{"common_name":"yew","count":4}]}"#;
        let set = CounterSet::deserialize(small_catalog(), bytes).unwrap();
        assert_eq!(set.counts(), vec![0, 4]);
    }

    #[test]
    fn decoding_rejects_bad_documents() {
        let unknown = br#"{"schema_version":1,"counts":[{"common_name":"oak","count":1}]}"#;
        assert!(matches!(
            CounterSet::deserialize(small_catalog(), unknown).unwrap_err(),
            SnapshotCodecError::UnknownCategory(name) if name == "oak"
        ));

        let duplicate = br#"{"schema_version":1,"counts":[
            {"common_name":"pine","count":1},{"common_name":"pine","count":2}]}"#;
        assert!(matches!(
            CounterSet::deserialize(small_catalog(), duplicate).unwrap_err(),
            SnapshotCodecError::DuplicateCategory(name) if name == "pine"
        ));

        let future = br#"{"schema_version":9,"counts":[]}"#;
        assert!(matches!(
            CounterSet::deserialize(small_catalog(), future).unwrap_err(),
            SnapshotCodecError::UnsupportedVersion(9)
        ));

        assert!(matches!(
            CounterSet::deserialize(small_catalog(), b"\x80pickle").unwrap_err(),
            SnapshotCodecError::Json(_)
        ));

        let negative = br#"{"schema_version":1,"counts":[{"common_name":"pine","count":-1}]}"#;
        assert!(CounterSet::deserialize(small_catalog(), negative).is_err());
    }
}
