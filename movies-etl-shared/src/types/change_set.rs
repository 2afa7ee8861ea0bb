//! Change-sets detected in an entity stream.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

/// Seconds between the Unix epoch and `0001-01-01T00:00:00Z`.
const MIN_WATERMARK_SECS: i64 = -62_135_596_800;

/// The "never synced" watermark.
///
/// Kept inside the range PostgreSQL `timestamptz` accepts, so it can be bound
/// directly into a range query on the very first pass.
pub fn min_watermark() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(MIN_WATERMARK_SECS, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// A row of an entity table whose `modified` timestamp is past the watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedRow {
    pub id: Uuid,
    pub modified: DateTime<Utc>,
}

impl ModifiedRow {
    pub fn new(id: Uuid, modified: DateTime<Utc>) -> Self {
        Self { id, modified }
    }
}

/// Distinct ids changed since a stream's watermark, plus the candidate next watermark.
///
/// A change-set lives for a single pass: produced by the extractor, consumed by
/// the processor and loader, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// Changed ids, in first-seen order, without duplicates.
    pub ids: Vec<Uuid>,
    /// Maximum `modified` timestamp observed among the rows.
    pub last_modified: DateTime<Utc>,
}

impl ChangeSet {
    /// Build a change-set from modified rows.
    ///
    /// Returns `None` when there are no rows, meaning the stream has no work
    /// this pass and its watermark must stay where it is.
    pub fn from_rows(rows: impl IntoIterator<Item = ModifiedRow>) -> Option<Self> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut last_modified: Option<DateTime<Utc>> = None;

        for row in rows {
            if seen.insert(row.id) {
                ids.push(row.id);
            }
            last_modified = Some(match last_modified {
                Some(current) if current >= row.modified => current,
                _ => row.modified,
            });
        }

        last_modified.map(|last_modified| Self { ids, last_modified })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
