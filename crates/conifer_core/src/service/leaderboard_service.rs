//! Leaderboard aggregation over persisted snapshots.
//!
//! # Responsibility
//! - Turn counter sets into a table: `identity`, `total`, one column per
//!   catalog entry.
//! - Load an identity's history (or every identity's) through the snapshot
//!   repository.
//!
//! # Invariants
//! - `build_table` is a pure function of its inputs.
//! - Category columns follow catalog order.
//! - Sorting is stable and only accepts numeric columns.

use crate::model::catalog::TreeCatalog;
use crate::model::counter::{CounterError, CounterSet};
use crate::model::identity::Identity;
use crate::repo::snapshot_repo::{CorruptSnapshot, RepoError, SnapshotRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Name of the identity column.
pub const IDENTITY_COLUMN: &str = "identity";
/// Name of the total column.
pub const TOTAL_COLUMN: &str = "total";

#[derive(Debug)]
pub enum LeaderboardError {
    Repo(RepoError),
    Counter(CounterError),
    UnknownColumn(String),
    NotNumeric(String),
    /// The row does not belong to this table's layout.
    MissingValue(String),
}

impl Display for LeaderboardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Counter(err) => write!(f, "{err}"),
            Self::UnknownColumn(name) => write!(f, "unknown leaderboard column `{name}`"),
            Self::NotNumeric(name) => write!(f, "leaderboard column `{name}` is not numeric"),
            Self::MissingValue(name) => write!(f, "row has no value for column `{name}`"),
        }
    }
}

impl Error for LeaderboardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Counter(err) => Some(err),
            Self::UnknownColumn(_) | Self::NotNumeric(_) | Self::MissingValue(_) => None,
        }
    }
}

impl From<RepoError> for LeaderboardError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<CounterError> for LeaderboardError {
    fn from(value: CounterError) -> Self {
        Self::Counter(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardColumn {
    /// Stable key: `identity`, `total`, or a category common name.
    pub name: String,
    /// Human-readable header.
    pub label: String,
    pub numeric: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub identity: String,
    pub total: u64,
    /// Per-category counts in catalog order.
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardTable {
    columns: Vec<LeaderboardColumn>,
    rows: Vec<LeaderboardRow>,
}

impl LeaderboardTable {
    pub fn columns(&self) -> &[LeaderboardColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[LeaderboardRow] {
        &self.rows
    }

    /// Value of numeric column `column` in `row`.
    pub fn value(&self, row: &LeaderboardRow, column: &str) -> Result<u64, LeaderboardError> {
        match self.numeric_index(column)? {
            None => Ok(row.total),
            Some(index) => row
                .counts
                .get(index)
                .copied()
                .ok_or_else(|| LeaderboardError::MissingValue(column.to_string())),
        }
    }

    /// Stable sort by a numeric column (`total` or a category name).
    pub fn sort_by(&mut self, column: &str, order: SortOrder) -> Result<(), LeaderboardError> {
        let index = self.numeric_index(column)?;
        let key = |row: &LeaderboardRow| match index {
            None => row.total,
            Some(index) => row.counts.get(index).copied().unwrap_or(0),
        };
        match order {
            SortOrder::Ascending => self.rows.sort_by_key(key),
            SortOrder::Descending => self.rows.sort_by(|a, b| key(b).cmp(&key(a))),
        }
        Ok(())
    }

    /// Renders the table as CSV with the column names as header.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let header = self
            .columns
            .iter()
            .map(|column| csv_field(&column.name))
            .collect::<Vec<_>>();
        out.push_str(&header.join(","));
        out.push('\n');
        for row in &self.rows {
            let mut fields = vec![csv_field(&row.identity), row.total.to_string()];
            fields.extend(row.counts.iter().map(u64::to_string));
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }

    // `Ok(None)` selects the total column, `Ok(Some(i))` category `i`.
    fn numeric_index(&self, column: &str) -> Result<Option<usize>, LeaderboardError> {
        if column == TOTAL_COLUMN {
            return Ok(None);
        }
        if column == IDENTITY_COLUMN {
            return Err(LeaderboardError::NotNumeric(column.to_string()));
        }
        self.columns
            .iter()
            .skip(2)
            .position(|candidate| candidate.name == column)
            .map(Some)
            .ok_or_else(|| LeaderboardError::UnknownColumn(column.to_string()))
    }
}

/// Builds a table with one row per `(display_name, counts)` pair.
pub fn build_table<'a>(
    catalog: &TreeCatalog,
    entries: impl IntoIterator<Item = (&'a str, &'a CounterSet)>,
) -> Result<LeaderboardTable, CounterError> {
    let mut columns = vec![
        LeaderboardColumn {
            name: IDENTITY_COLUMN.to_string(),
            label: "User".to_string(),
            numeric: false,
        },
        LeaderboardColumn {
            name: TOTAL_COLUMN.to_string(),
            label: "Total Count".to_string(),
            numeric: true,
        },
    ];
    columns.extend(catalog.list().iter().map(|category| LeaderboardColumn {
        name: category.common_name.clone(),
        label: category.display_title(),
        numeric: true,
    }));

    let mut rows = Vec::new();
    for (identity, counts) in entries {
        let per_category = catalog
            .list()
            .iter()
            .map(|category| counts.count(&category.common_name))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(LeaderboardRow {
            identity: identity.to_string(),
            total: per_category.iter().sum(),
            counts: per_category,
        });
    }

    Ok(LeaderboardTable { columns, rows })
}

/// A table plus what had to be left out while building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardReport {
    pub table: LeaderboardTable,
    /// Snapshot files that could not be decoded.
    pub skipped: Vec<CorruptSnapshot>,
    /// User ids whose home directory could not be listed; they have no row.
    pub unlisted: Vec<String>,
}

/// Loads snapshot history and aggregates it into leaderboard tables.
pub struct LeaderboardService<R: SnapshotRepository> {
    repo: R,
    catalog: Arc<TreeCatalog>,
}

impl<R: SnapshotRepository> LeaderboardService<R> {
    pub fn new(repo: R, catalog: Arc<TreeCatalog>) -> Self {
        Self { repo, catalog }
    }

    /// One row per saved session of `identity`, oldest first.
    pub fn identity_report(&self, identity: &Identity) -> Result<LeaderboardReport, LeaderboardError> {
        let listing = self.repo.list_snapshots(&self.catalog, identity)?;
        let table = build_table(
            &self.catalog,
            listing
                .counter_sets()
                .map(|counts| (identity.display_name(), counts)),
        )?;
        info!(
            "event=leaderboard_build module=service status=ok scope=identity user_id={} rows={} skipped={}",
            identity.user_id(),
            table.rows.len(),
            listing.errors.len()
        );
        Ok(LeaderboardReport {
            table,
            skipped: listing.errors,
            unlisted: Vec::new(),
        })
    }

    /// One row per identity, summing all of its saved sessions.
    ///
    /// An identity whose snapshots cannot be listed is left out and named in
    /// `unlisted`; the other identities still get their rows.
    pub fn all_identities_report(
        &self,
        identities: &[Identity],
    ) -> Result<LeaderboardReport, LeaderboardError> {
        let mut totals = Vec::with_capacity(identities.len());
        let mut skipped = Vec::new();
        let mut unlisted = Vec::new();
        for identity in identities {
            let listing = match self.repo.list_snapshots(&self.catalog, identity) {
                Ok(listing) => listing,
                Err(err) => {
                    warn!(
                        "event=leaderboard_build module=service status=error scope=all user_id={} error={}",
                        identity.user_id(),
                        err
                    );
                    unlisted.push(identity.user_id().to_string());
                    continue;
                }
            };
            let mut sum = CounterSet::new(self.catalog.clone());
            for counts in listing.counter_sets() {
                sum.absorb(counts)?;
            }
            totals.push((identity.display_name(), sum));
            skipped.extend(listing.errors);
        }

        let table = build_table(
            &self.catalog,
            totals.iter().map(|(name, sum)| (*name, sum)),
        )?;
        info!(
            "event=leaderboard_build module=service status=ok scope=all rows={} skipped={} unlisted={}",
            table.rows.len(),
            skipped.len(),
            unlisted.len()
        );
        Ok(LeaderboardReport {
            table,
            skipped,
            unlisted,
        })
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
