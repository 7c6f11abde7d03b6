//! Storage Layer - record store abstraction
//!
//! System of record is a relational store with tables:
//! - livestream(id, youtube_id, description, is_live)
//! - sermons(id, title, description, date, youtube_url, thumbnail_url)
//! - meetings(id, title, meeting_type, time, location, zoom_link, maps_link)
//! - prayer_requests(id, name, email, phone, request, is_private, status)
//!
//! Two backends implement `RecordStore`: an embedded SQLite file and a hosted
//! PostgREST-style endpoint reached over HTTP.

pub mod classify;
pub mod rest;
pub mod retry;
pub mod schema;
pub mod sqlite;
pub mod unconfigured;

pub use rest::RestStore;
pub use retry::RetryPolicy;
pub use sqlite::SqliteStore;
pub use unconfigured::UnconfiguredStore;

use crate::model::{
    Livestream, LivestreamUpdate, Meeting, MeetingDraft, MeetingType, PrayerRequest,
    PrayerRequestDraft, PrayerStatus, Sermon, SermonDraft,
};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::str::FromStr;

/// The content tables managed by the schema initializer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Livestream,
    Sermons,
    Meetings,
    PrayerRequests,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Livestream => "livestream",
            Table::Sermons => "sermons",
            Table::Meetings => "meetings",
            Table::PrayerRequests => "prayer_requests",
        }
    }

    pub fn all() -> &'static [Table] {
        &[
            Table::Livestream,
            Table::Sermons,
            Table::Meetings,
            Table::PrayerRequests,
        ]
    }
}

impl FromStr for Table {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "livestream" => Ok(Table::Livestream),
            "sermons" => Ok(Table::Sermons),
            "meetings" => Ok(Table::Meetings),
            "prayer_requests" => Ok(Table::PrayerRequests),
            _ => Err(Error::Validation(format!("Unknown table: {}", s))),
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a table-existence probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Present,
    Missing,
}

/// Typed access to the content tables.
///
/// Every operation returns a `Result`; a table that does not exist surfaces
/// as `Error::SchemaMissing` so callers can tell "no data" from "schema
/// missing".
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name for logs and status output
    fn backend(&self) -> &'static str;

    // ========== Schema Operations ==========

    /// Bounded read against `table`; only a missing relation maps to `Missing`
    async fn probe_table(&self, table: Table) -> Result<TableStatus>;

    /// Apply the idempotent schema migration
    async fn apply_schema(&self) -> Result<()>;

    /// Execute an arbitrary SQL string with elevated privileges
    async fn execute_sql(&self, sql: &str) -> Result<serde_json::Value>;

    async fn count_rows(&self, table: Table) -> Result<u64>;

    // ========== Livestream Operations ==========

    /// Read the singleton livestream row
    async fn get_livestream(&self) -> Result<Livestream>;

    /// Insert or merge the livestream row (id 1 unless given)
    async fn upsert_livestream(&self, update: &LivestreamUpdate) -> Result<Livestream>;

    /// Insert `default` only when the livestream table is empty.
    /// Returns true when a row was written.
    async fn seed_livestream(&self, default: &LivestreamUpdate) -> Result<bool>;

    // ========== Sermon Operations ==========

    /// All sermons, newest `date` first
    async fn list_sermons(&self) -> Result<Vec<Sermon>>;
    async fn get_sermon(&self, id: &str) -> Result<Sermon>;
    async fn create_sermon(&self, draft: &SermonDraft) -> Result<Sermon>;
    async fn update_sermon(&self, id: &str, draft: &SermonDraft) -> Result<Sermon>;
    async fn delete_sermon(&self, id: &str) -> Result<()>;

    // ========== Meeting Operations ==========

    async fn list_meetings(&self) -> Result<Vec<Meeting>>;

    /// Most recently created meeting of the given type
    async fn meeting_by_type(&self, meeting_type: MeetingType) -> Result<Option<Meeting>>;

    /// Insert or merge by `meeting_type`; absent optional fields keep their stored value
    async fn upsert_meeting(&self, draft: &MeetingDraft) -> Result<Meeting>;

    // ========== Prayer Request Operations ==========

    async fn create_prayer_request(&self, draft: &PrayerRequestDraft) -> Result<PrayerRequest>;

    /// Newest first, optionally filtered by status
    async fn list_prayer_requests(&self, status: Option<PrayerStatus>) -> Result<Vec<PrayerRequest>>;

    async fn set_prayer_request_status(&self, id: &str, status: PrayerStatus) -> Result<PrayerRequest>;
}

/// Row counts for every content table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowCounts {
    pub livestream: u64,
    pub sermons: u64,
    pub meetings: u64,
    pub prayer_requests: u64,
}

impl RowCounts {
    /// Count every table; a missing table counts as zero
    pub async fn collect(store: &dyn RecordStore) -> Result<Self> {
        let mut counts = Self::default();
        for table in Table::all() {
            let n = match store.count_rows(*table).await {
                Ok(n) => n,
                Err(e) if e.is_schema_missing() => 0,
                Err(e) => return Err(e),
            };
            match table {
                Table::Livestream => counts.livestream = n,
                Table::Sermons => counts.sermons = n,
                Table::Meetings => counts.meetings = n,
                Table::PrayerRequests => counts.prayer_requests = n,
            }
        }
        Ok(counts)
    }
}

/// Turn a blank optional field into `None`
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_roundtrip() {
        for table in Table::all() {
            let parsed: Table = table.as_str().parse().unwrap();
            assert_eq!(*table, parsed);
        }
        assert!(Table::from_str("users").is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" hall ")), Some("hall".to_string()));
    }
}
