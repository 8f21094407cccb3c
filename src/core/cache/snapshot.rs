//! Materialized snapshot types
//!
//! A [`Snapshot`] is a point-in-time copy of one entity's result set. The
//! [`MaterializationRecord`] is the per-entity refresh log kept next to the
//! snapshots; unlike the snapshot it is also written when a refresh fails.

use crate::core::verification::checksum::table_checksum;
use crate::domain::{EntityName, Result, Table};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted copy of an entity's result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub entity: EntityName,
    pub refreshed_at: DateTime<Utc>,
    /// Run date the entity was evaluated for
    pub as_of: NaiveDate,
    pub row_count: usize,
    /// SHA-256 of the table's canonical JSON
    pub checksum: String,
    pub table: Table,
}

impl Snapshot {
    /// Captures a table, computing its row count and checksum
    pub fn capture(
        entity: EntityName,
        table: Table,
        as_of: NaiveDate,
        refreshed_at: DateTime<Utc>,
    ) -> Result<Self> {
        let checksum = table_checksum(&table)?;
        Ok(Self {
            entity,
            refreshed_at,
            as_of,
            row_count: table.len(),
            checksum,
            table,
        })
    }

    /// Recomputes the checksum and compares it to the stored one
    pub fn verify(&self) -> Result<bool> {
        Ok(table_checksum(&self.table)? == self.checksum && self.table.len() == self.row_count)
    }

    pub fn meta(&self) -> SnapshotMeta {
        SnapshotMeta {
            entity: self.entity.clone(),
            refreshed_at: self.refreshed_at,
            as_of: self.as_of,
            row_count: self.row_count,
            checksum: self.checksum.clone(),
        }
    }
}

/// Snapshot header without the rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub entity: EntityName,
    pub refreshed_at: DateTime<Utc>,
    pub as_of: NaiveDate,
    pub row_count: usize,
    pub checksum: String,
}

/// Outcome of the latest refresh attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStatus {
    Completed,
    Failed(String),
}

impl RefreshStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RefreshStatus::Completed)
    }
}

impl fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshStatus::Completed => write!(f, "completed"),
            RefreshStatus::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

impl Serialize for RefreshStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RefreshStatus {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "completed" {
            Ok(RefreshStatus::Completed)
        } else if let Some(message) = raw.strip_prefix("failed: ") {
            Ok(RefreshStatus::Failed(message.to_string()))
        } else if raw == "failed" {
            Ok(RefreshStatus::Failed(String::new()))
        } else {
            Err(serde::de::Error::custom(format!(
                "invalid refresh status '{}'",
                raw
            )))
        }
    }
}

/// Per-entity materialization log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializationRecord {
    pub entity: EntityName,
    pub last_refresh: DateTime<Utc>,
    /// Rows of the current snapshot; zero when no refresh ever succeeded
    pub row_count: usize,
    pub status: RefreshStatus,
}

impl MaterializationRecord {
    pub fn completed(snapshot: &Snapshot) -> Self {
        Self {
            entity: snapshot.entity.clone(),
            last_refresh: snapshot.refreshed_at,
            row_count: snapshot.row_count,
            status: RefreshStatus::Completed,
        }
    }

    /// Failed attempt; `previous_rows` is the row count of the retained snapshot
    pub fn failed(
        entity: EntityName,
        at: DateTime<Utc>,
        previous_rows: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entity,
            last_refresh: at,
            row_count: previous_rows,
            status: RefreshStatus::Failed(message.into()),
        }
    }
}

/// Where a read result came from and how old it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Evaluated against the upstream chain during the read
    Live { evaluated_at: DateTime<Utc> },
    /// Served from a materialized snapshot
    Snapshot {
        refreshed_at: DateTime<Utc>,
        age: Duration,
        /// Some upstream snapshot was refreshed after this one
        upstream_newer: bool,
        /// Age exceeds `cache.max_age_minutes`
        expired: bool,
    },
}

impl Freshness {
    pub fn is_live(&self) -> bool {
        matches!(self, Freshness::Live { .. })
    }

    pub fn is_stale(&self) -> bool {
        match self {
            Freshness::Live { .. } => false,
            Freshness::Snapshot {
                upstream_newer,
                expired,
                ..
            } => *upstream_newer || *expired,
        }
    }

    /// Timestamp of the data: evaluation time or snapshot refresh time
    pub fn as_of_time(&self) -> DateTime<Utc> {
        match self {
            Freshness::Live { evaluated_at } => *evaluated_at,
            Freshness::Snapshot { refreshed_at, .. } => *refreshed_at,
        }
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Freshness::Live { evaluated_at } => {
                write!(f, "live (evaluated {})", evaluated_at.to_rfc3339())
            }
            Freshness::Snapshot {
                refreshed_at, age, ..
            } => {
                write!(
                    f,
                    "snapshot (refreshed {}, {} min old{})",
                    refreshed_at.to_rfc3339(),
                    age.num_minutes(),
                    if self.is_stale() { ", stale" } else { "" }
                )
            }
        }
    }
}
