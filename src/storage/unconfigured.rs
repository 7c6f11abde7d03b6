//! Stand-in store used when credentials are missing
//!
//! Every operation fails with `Error::Config`, so the server still starts
//! and each request reports the configuration problem instead of crashing.

use async_trait::async_trait;

use super::{RecordStore, Table, TableStatus};
use crate::auth::{AdminUser, AuthProvider, Session};
use crate::model::{
    Livestream, LivestreamUpdate, Meeting, MeetingDraft, MeetingType, PrayerRequest,
    PrayerRequestDraft, PrayerStatus, Sermon, SermonDraft,
};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct UnconfiguredStore {
    reason: String,
}

impl UnconfiguredStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> Result<T> {
        Err(Error::Config(self.reason.clone()))
    }
}

#[async_trait]
impl RecordStore for UnconfiguredStore {
    fn backend(&self) -> &'static str {
        "unconfigured"
    }

    async fn probe_table(&self, _table: Table) -> Result<TableStatus> {
        self.fail()
    }

    async fn apply_schema(&self) -> Result<()> {
        self.fail()
    }

    async fn execute_sql(&self, _sql: &str) -> Result<serde_json::Value> {
        self.fail()
    }

    async fn count_rows(&self, _table: Table) -> Result<u64> {
        self.fail()
    }

    async fn get_livestream(&self) -> Result<Livestream> {
        self.fail()
    }

    async fn upsert_livestream(&self, _update: &LivestreamUpdate) -> Result<Livestream> {
        self.fail()
    }

    async fn seed_livestream(&self, _default: &LivestreamUpdate) -> Result<bool> {
        self.fail()
    }

    async fn list_sermons(&self) -> Result<Vec<Sermon>> {
        self.fail()
    }

    async fn get_sermon(&self, _id: &str) -> Result<Sermon> {
        self.fail()
    }

    async fn create_sermon(&self, _draft: &SermonDraft) -> Result<Sermon> {
        self.fail()
    }

    async fn update_sermon(&self, _id: &str, _draft: &SermonDraft) -> Result<Sermon> {
        self.fail()
    }

    async fn delete_sermon(&self, _id: &str) -> Result<()> {
        self.fail()
    }

    async fn list_meetings(&self) -> Result<Vec<Meeting>> {
        self.fail()
    }

    async fn meeting_by_type(&self, _meeting_type: MeetingType) -> Result<Option<Meeting>> {
        self.fail()
    }

    async fn upsert_meeting(&self, _draft: &MeetingDraft) -> Result<Meeting> {
        self.fail()
    }

    async fn create_prayer_request(&self, _draft: &PrayerRequestDraft) -> Result<PrayerRequest> {
        self.fail()
    }

    async fn list_prayer_requests(&self, _status: Option<PrayerStatus>) -> Result<Vec<PrayerRequest>> {
        self.fail()
    }

    async fn set_prayer_request_status(&self, _id: &str, _status: PrayerStatus) -> Result<PrayerRequest> {
        self.fail()
    }
}

#[async_trait]
impl AuthProvider for UnconfiguredStore {
    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Session> {
        self.fail()
    }

    async fn session_user(&self, _token: &str) -> Result<Option<AdminUser>> {
        self.fail()
    }

    async fn sign_out(&self, _token: &str) -> Result<()> {
        self.fail()
    }
}
