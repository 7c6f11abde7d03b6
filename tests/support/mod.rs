//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ministry_site::model::{
    Livestream, LivestreamUpdate, Meeting, MeetingDraft, MeetingType, PrayerRequest,
    PrayerRequestDraft, PrayerStatus, Sermon, SermonDraft,
};
use ministry_site::storage::{RecordStore, SqliteStore, Table, TableStatus};
use ministry_site::Result;

/// In-memory store with the content schema applied
pub async fn migrated_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store.apply_schema().await.unwrap();
    store
}

pub fn sermon(title: &str, date: &str) -> SermonDraft {
    SermonDraft {
        title: title.to_string(),
        description: None,
        date: date.to_string(),
        youtube_url: format!("https://www.youtube.com/watch?v={}", date),
        thumbnail_url: None,
    }
}

/// Wraps a store and counts every call made through `RecordStore`
pub struct CountingStore<S> {
    inner: S,
    calls: AtomicUsize,
}

impl<S: RecordStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) -> &S {
        self.calls.fetch_add(1, Ordering::SeqCst);
        &self.inner
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for CountingStore<S> {
    fn backend(&self) -> &'static str {
        self.inner.backend()
    }

    async fn probe_table(&self, table: Table) -> Result<TableStatus> {
        self.hit().probe_table(table).await
    }

    async fn apply_schema(&self) -> Result<()> {
        self.hit().apply_schema().await
    }

    async fn execute_sql(&self, sql: &str) -> Result<serde_json::Value> {
        self.hit().execute_sql(sql).await
    }

    async fn count_rows(&self, table: Table) -> Result<u64> {
        self.hit().count_rows(table).await
    }

    async fn get_livestream(&self) -> Result<Livestream> {
        self.hit().get_livestream().await
    }

    async fn upsert_livestream(&self, update: &LivestreamUpdate) -> Result<Livestream> {
        self.hit().upsert_livestream(update).await
    }

    async fn seed_livestream(&self, default: &LivestreamUpdate) -> Result<bool> {
        self.hit().seed_livestream(default).await
    }

    async fn list_sermons(&self) -> Result<Vec<Sermon>> {
        self.hit().list_sermons().await
    }

    async fn get_sermon(&self, id: &str) -> Result<Sermon> {
        self.hit().get_sermon(id).await
    }

    async fn create_sermon(&self, draft: &SermonDraft) -> Result<Sermon> {
        self.hit().create_sermon(draft).await
    }

    async fn update_sermon(&self, id: &str, draft: &SermonDraft) -> Result<Sermon> {
        self.hit().update_sermon(id, draft).await
    }

    async fn delete_sermon(&self, id: &str) -> Result<()> {
        self.hit().delete_sermon(id).await
    }

    async fn list_meetings(&self) -> Result<Vec<Meeting>> {
        self.hit().list_meetings().await
    }

    async fn meeting_by_type(&self, meeting_type: MeetingType) -> Result<Option<Meeting>> {
        self.hit().meeting_by_type(meeting_type).await
    }

    async fn upsert_meeting(&self, draft: &MeetingDraft) -> Result<Meeting> {
        self.hit().upsert_meeting(draft).await
    }

    async fn create_prayer_request(&self, draft: &PrayerRequestDraft) -> Result<PrayerRequest> {
        self.hit().create_prayer_request(draft).await
    }

    async fn list_prayer_requests(&self, status: Option<PrayerStatus>) -> Result<Vec<PrayerRequest>> {
        self.hit().list_prayer_requests(status).await
    }

    async fn set_prayer_request_status(&self, id: &str, status: PrayerStatus) -> Result<PrayerRequest> {
        self.hit().set_prayer_request_status(id, status).await
    }
}
