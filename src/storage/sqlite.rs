//! SQLite storage implementation

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};

use super::{schema, RecordStore, Table, TableStatus};
use crate::auth::{self, AdminUser, AuthProvider, Session};
use crate::model::{
    new_record_id, Livestream, LivestreamUpdate, Meeting, MeetingDraft, MeetingType,
    PrayerRequest, PrayerRequestDraft, PrayerStatus, Sermon, SermonDraft, LIVESTREAM_ID,
};
use crate::{Error, Result};

const LIVESTREAM_COLUMNS: &str = "id, youtube_id, description, is_live, created_at, updated_at";
const SERMON_COLUMNS: &str =
    "id, title, description, date, youtube_url, thumbnail_url, created_at, updated_at";
const MEETING_COLUMNS: &str =
    "id, title, meeting_type, time, location, zoom_link, maps_link, created_at, updated_at";
const PRAYER_COLUMNS: &str =
    "id, name, email, phone, request, is_private, status, created_at, updated_at";

/// SQLite-backed record store with an embedded admin auth facility
pub struct SqliteStore {
    conn: Mutex<Connection>,
    session_ttl: Duration,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        for stmt in schema::sqlite::CREATE_AUTH_TABLES {
            conn.execute(stmt, [])?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
            session_ttl: Duration::hours(12),
        })
    }

    /// Override how long admin sessions stay valid
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Store("sqlite connection lock poisoned".to_string()))
    }

    /// Create or replace an admin account
    pub fn add_admin(&self, email: &str, password: &str) -> Result<()> {
        let hash = auth::hash_password(password)?;
        self.conn()?.execute(
            r#"
            INSERT INTO admin_users (email, password_hash) VALUES (?1, ?2)
            ON CONFLICT(email) DO UPDATE SET password_hash = excluded.password_hash
            "#,
            params![normalize_email(email), hash],
        )?;
        Ok(())
    }

    // ========== Row Helpers ==========

    fn row_to_livestream(row: &rusqlite::Row) -> rusqlite::Result<Livestream> {
        Ok(Livestream {
            id: row.get(0)?,
            youtube_id: row.get(1)?,
            description: row.get(2)?,
            is_live: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn row_to_sermon(row: &rusqlite::Row) -> rusqlite::Result<Sermon> {
        Ok(Sermon {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            date: row.get(3)?,
            youtube_url: row.get(4)?,
            thumbnail_url: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn row_to_meeting(row: &rusqlite::Row) -> rusqlite::Result<Meeting> {
        let kind_str: String = row.get(2)?;
        let meeting_type: MeetingType = kind_str.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Meeting {
            id: row.get(0)?,
            title: row.get(1)?,
            meeting_type,
            time: row.get(3)?,
            location: row.get(4)?,
            zoom_link: row.get(5)?,
            maps_link: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn row_to_prayer_request(row: &rusqlite::Row) -> rusqlite::Result<PrayerRequest> {
        let status_str: String = row.get(6)?;
        let status: PrayerStatus = status_str.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(PrayerRequest {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            request: row.get(4)?,
            is_private: row.get(5)?,
            status,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn query_livestream(conn: &Connection, id: i64) -> Result<Option<Livestream>> {
        conn.query_row(
            &format!("SELECT {} FROM livestream WHERE id = ?1", LIVESTREAM_COLUMNS),
            [id],
            Self::row_to_livestream,
        )
        .optional()
        .map_err(Into::into)
    }

    fn query_sermon(conn: &Connection, id: &str) -> Result<Sermon> {
        conn.query_row(
            &format!("SELECT {} FROM sermons WHERE id = ?1", SERMON_COLUMNS),
            [id],
            Self::row_to_sermon,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("sermon {}", id)))
    }

    fn query_meeting_by_type(conn: &Connection, meeting_type: MeetingType) -> Result<Option<Meeting>> {
        conn.query_row(
            &format!(
                "SELECT {} FROM meetings WHERE meeting_type = ?1 ORDER BY created_at DESC LIMIT 1",
                MEETING_COLUMNS
            ),
            [meeting_type.as_str()],
            Self::row_to_meeting,
        )
        .optional()
        .map_err(Into::into)
    }

    fn query_prayer_request(conn: &Connection, id: &str) -> Result<PrayerRequest> {
        conn.query_row(
            &format!("SELECT {} FROM prayer_requests WHERE id = ?1", PRAYER_COLUMNS),
            [id],
            Self::row_to_prayer_request,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("prayer request {}", id)))
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    // ========== Schema Operations ==========

    async fn probe_table(&self, table: Table) -> Result<TableStatus> {
        let conn = self.conn()?;
        let probe = conn
            .prepare(&format!("SELECT 1 FROM {} LIMIT 1", table.as_str()))
            .and_then(|mut stmt| stmt.exists([]));
        match probe {
            Ok(_) => Ok(TableStatus::Present),
            Err(e) => match Error::from(e) {
                Error::SchemaMissing { .. } => Ok(TableStatus::Missing),
                other => Err(other),
            },
        }
    }

    async fn apply_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        for stmt in schema::sqlite::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    async fn execute_sql(&self, sql: &str) -> Result<serde_json::Value> {
        let conn = self.conn()?;

        // Single row-returning statements come back as rows; anything else runs as a batch.
        if let Ok(mut stmt) = conn.prepare(sql) {
            if stmt.column_count() > 0 {
                let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
                let mut rows = stmt.query([])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut obj = serde_json::Map::new();
                    for (i, name) in names.iter().enumerate() {
                        obj.insert(name.clone(), value_to_json(row.get_ref(i)?));
                    }
                    out.push(serde_json::Value::Object(obj));
                }
                return Ok(serde_json::Value::Array(out));
            }
        }

        conn.execute_batch(sql)?;
        Ok(serde_json::json!({ "changes": conn.changes() }))
    }

    async fn count_rows(&self, table: Table) -> Result<u64> {
        let count: i64 = self.conn()?.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.as_str()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ========== Livestream Operations ==========

    async fn get_livestream(&self) -> Result<Livestream> {
        let conn = self.conn()?;
        Self::query_livestream(&conn, LIVESTREAM_ID)?
            .ok_or_else(|| Error::NotFound("livestream".to_string()))
    }

    async fn upsert_livestream(&self, update: &LivestreamUpdate) -> Result<Livestream> {
        let conn = self.conn()?;
        let id = update.target_id();
        let now = Utc::now();
        conn.execute(
            r#"
            INSERT INTO livestream (id, youtube_id, description, is_live, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(id) DO UPDATE SET
                youtube_id = excluded.youtube_id,
                description = excluded.description,
                is_live = excluded.is_live,
                updated_at = excluded.updated_at
            "#,
            params![id, update.youtube_id, update.description, update.is_live, now],
        )?;
        Self::query_livestream(&conn, id)?.ok_or_else(|| Error::NotFound("livestream".to_string()))
    }

    async fn seed_livestream(&self, default: &LivestreamUpdate) -> Result<bool> {
        let conn = self.conn()?;
        let now = Utc::now();
        let written = conn.execute(
            r#"
            INSERT INTO livestream (id, youtube_id, description, is_live, created_at, updated_at)
            SELECT ?1, ?2, ?3, ?4, ?5, ?5
            WHERE NOT EXISTS (SELECT 1 FROM livestream LIMIT 1)
            "#,
            params![default.target_id(), default.youtube_id, default.description, default.is_live, now],
        )?;
        Ok(written > 0)
    }

    // ========== Sermon Operations ==========

    async fn list_sermons(&self) -> Result<Vec<Sermon>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sermons ORDER BY date DESC, created_at DESC",
            SERMON_COLUMNS
        ))?;
        let sermons = stmt
            .query_map([], Self::row_to_sermon)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sermons)
    }

    async fn get_sermon(&self, id: &str) -> Result<Sermon> {
        let conn = self.conn()?;
        Self::query_sermon(&conn, id)
    }

    async fn create_sermon(&self, draft: &SermonDraft) -> Result<Sermon> {
        let conn = self.conn()?;
        let id = new_record_id();
        let now = Utc::now();
        conn.execute(
            r#"
            INSERT INTO sermons (id, title, description, date, youtube_url, thumbnail_url, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
            params![
                id,
                draft.title,
                draft.description,
                draft.date,
                draft.youtube_url,
                draft.thumbnail_url,
                now,
            ],
        )?;
        Self::query_sermon(&conn, &id)
    }

    async fn update_sermon(&self, id: &str, draft: &SermonDraft) -> Result<Sermon> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE sermons
            SET title = ?2, description = ?3, date = ?4, youtube_url = ?5, thumbnail_url = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                id,
                draft.title,
                draft.description,
                draft.date,
                draft.youtube_url,
                draft.thumbnail_url,
                Utc::now(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("sermon {}", id)));
        }
        Self::query_sermon(&conn, id)
    }

    async fn delete_sermon(&self, id: &str) -> Result<()> {
        let changed = self.conn()?.execute("DELETE FROM sermons WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("sermon {}", id)));
        }
        Ok(())
    }

    // ========== Meeting Operations ==========

    async fn list_meetings(&self) -> Result<Vec<Meeting>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM meetings ORDER BY created_at DESC",
            MEETING_COLUMNS
        ))?;
        let meetings = stmt
            .query_map([], Self::row_to_meeting)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(meetings)
    }

    async fn meeting_by_type(&self, meeting_type: MeetingType) -> Result<Option<Meeting>> {
        let conn = self.conn()?;
        Self::query_meeting_by_type(&conn, meeting_type)
    }

    async fn upsert_meeting(&self, draft: &MeetingDraft) -> Result<Meeting> {
        let conn = self.conn()?;
        let id = draft.id.clone().unwrap_or_else(new_record_id);
        conn.execute(
            r#"
            INSERT INTO meetings (id, title, meeting_type, time, location, zoom_link, maps_link, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            ON CONFLICT(meeting_type) DO UPDATE SET
                title = excluded.title,
                time = excluded.time,
                location = COALESCE(excluded.location, meetings.location),
                zoom_link = COALESCE(excluded.zoom_link, meetings.zoom_link),
                maps_link = COALESCE(excluded.maps_link, meetings.maps_link),
                updated_at = excluded.updated_at
            "#,
            params![
                id,
                draft.title,
                draft.meeting_type.as_str(),
                draft.time,
                draft.location,
                draft.zoom_link,
                draft.maps_link,
                Utc::now(),
            ],
        )?;
        Self::query_meeting_by_type(&conn, draft.meeting_type)?
            .ok_or_else(|| Error::NotFound(format!("{} meeting", draft.meeting_type)))
    }

    // ========== Prayer Request Operations ==========

    async fn create_prayer_request(&self, draft: &PrayerRequestDraft) -> Result<PrayerRequest> {
        let conn = self.conn()?;
        let id = new_record_id();
        conn.execute(
            r#"
            INSERT INTO prayer_requests (id, name, email, phone, request, is_private, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
            params![
                id,
                draft.name,
                draft.email,
                draft.phone,
                draft.request,
                draft.is_private,
                PrayerStatus::Pending.as_str(),
                Utc::now(),
            ],
        )?;
        Self::query_prayer_request(&conn, &id)
    }

    async fn list_prayer_requests(&self, status: Option<PrayerStatus>) -> Result<Vec<PrayerRequest>> {
        let conn = self.conn()?;
        let requests = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM prayer_requests WHERE status = ?1 ORDER BY created_at DESC",
                    PRAYER_COLUMNS
                ))?;
                stmt.query_map([status.as_str()], Self::row_to_prayer_request)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM prayer_requests ORDER BY created_at DESC",
                    PRAYER_COLUMNS
                ))?;
                stmt.query_map([], Self::row_to_prayer_request)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(requests)
    }

    async fn set_prayer_request_status(&self, id: &str, status: PrayerStatus) -> Result<PrayerRequest> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE prayer_requests SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), Utc::now()],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("prayer request {}", id)));
        }
        Self::query_prayer_request(&conn, id)
    }
}

#[async_trait]
impl AuthProvider for SqliteStore {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let conn = self.conn()?;
        let email = normalize_email(email);
        let stored: Option<String> = conn
            .query_row(
                "SELECT password_hash FROM admin_users WHERE email = ?1",
                [&email],
                |row| row.get(0),
            )
            .optional()?;

        let verified = stored
            .map(|hash| auth::verify_password(password, &hash))
            .unwrap_or(false);
        if !verified {
            return Err(Error::Auth("Invalid login credentials".to_string()));
        }

        let session = Session {
            token: new_record_id(),
            email,
            expires_at: Utc::now() + self.session_ttl,
        };
        conn.execute(
            "INSERT INTO admin_sessions (token, email, expires_at) VALUES (?1, ?2, ?3)",
            params![session.token, session.email, session.expires_at],
        )?;
        Ok(session)
    }

    async fn session_user(&self, token: &str) -> Result<Option<AdminUser>> {
        let conn = self.conn()?;
        let row: Option<(String, DateTime<Utc>)> = conn
            .query_row(
                "SELECT email, expires_at FROM admin_sessions WHERE token = ?1",
                [token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((email, expires_at)) if expires_at > Utc::now() => Ok(Some(AdminUser { email })),
            Some(_) => {
                conn.execute("DELETE FROM admin_sessions WHERE token = ?1", [token])?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn sign_out(&self, token: &str) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM admin_sessions WHERE token = ?1", [token])?;
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::from(b.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn migrated_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.apply_schema().await.unwrap();
        store
    }

    fn sample_sermon(title: &str, date: &str) -> SermonDraft {
        SermonDraft {
            title: title.to_string(),
            description: Some("A message".to_string()),
            date: date.to_string(),
            youtube_url: "https://youtube.com/watch?v=abc".to_string(),
            thumbnail_url: None,
        }
    }

    #[tokio::test]
    async fn test_probe_reports_missing_before_migration() {
        let store = SqliteStore::open_in_memory().unwrap();
        for table in Table::all() {
            assert_eq!(store.probe_table(*table).await.unwrap(), TableStatus::Missing);
        }
        store.apply_schema().await.unwrap();
        for table in Table::all() {
            assert_eq!(store.probe_table(*table).await.unwrap(), TableStatus::Present);
        }
    }

    #[tokio::test]
    async fn test_reads_before_migration_are_schema_missing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.list_sermons().await.unwrap_err();
        assert!(err.is_schema_missing());
    }

    #[tokio::test]
    async fn test_sermon_crud() {
        let store = migrated_store().await;

        let older = store.create_sermon(&sample_sermon("Older", "2024-01-07")).await.unwrap();
        let newer = store.create_sermon(&sample_sermon("Newer", "2024-02-04")).await.unwrap();

        let listed = store.list_sermons().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);

        let updated = store
            .update_sermon(&older.id, &sample_sermon("Renamed", "2024-01-07"))
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");

        store.delete_sermon(&older.id).await.unwrap();
        assert!(matches!(store.get_sermon(&older.id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_meeting_upsert_keeps_one_row_per_type() {
        let store = migrated_store().await;

        store
            .upsert_meeting(&MeetingDraft::new(MeetingType::Morning, "Prayer", "7 AM").with_zoom_link("z1"))
            .await
            .unwrap();
        let second = store
            .upsert_meeting(&MeetingDraft::new(MeetingType::Morning, "Devotion", "6 AM"))
            .await
            .unwrap();

        assert_eq!(second.title, "Devotion");
        assert_eq!(second.zoom_link.as_deref(), Some("z1"));
        assert_eq!(store.count_rows(Table::Meetings).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_execute_sql_returns_rows() {
        let store = migrated_store().await;
        store
            .execute_sql("INSERT INTO livestream (id, youtube_id, is_live) VALUES (1, 'xyz', 1)")
            .await
            .unwrap();
        let rows = store.execute_sql("SELECT id, youtube_id FROM livestream").await.unwrap();
        assert_eq!(rows, serde_json::json!([{ "id": 1, "youtube_id": "xyz" }]));
    }

    #[tokio::test]
    async fn test_admin_sign_in() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_admin("Pastor@Example.org", "correct horse").unwrap();

        assert!(matches!(
            store.sign_in("pastor@example.org", "wrong").await,
            Err(Error::Auth(_))
        ));

        let session = store.sign_in(" pastor@example.org ", "correct horse").await.unwrap();
        let user = store.session_user(&session.token).await.unwrap().unwrap();
        assert_eq!(user.email, "pastor@example.org");

        store.sign_out(&session.token).await.unwrap();
        assert!(store.session_user(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let store = SqliteStore::open_in_memory()
            .unwrap()
            .with_session_ttl(Duration::seconds(-1));
        store.add_admin("admin@example.org", "pw").unwrap();
        let session = store.sign_in("admin@example.org", "pw").await.unwrap();
        assert!(store.session_user(&session.token).await.unwrap().is_none());
    }
}
