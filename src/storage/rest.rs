//! Hosted record store reached over a PostgREST-style HTTP API
//!
//! Table rows live under `{url}/rest/v1/{table}`, SQL runs through the
//! `exec_sql` RPC and admin credentials go to `{url}/auth/v1`. Reads and
//! writes use the anon key; schema operations require the service key.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{schema, RecordStore, RetryPolicy, Table, TableStatus};
use crate::auth::{AdminUser, AuthProvider, Session};
use crate::model::{
    Livestream, LivestreamUpdate, Meeting, MeetingDraft, MeetingType, PrayerRequest,
    PrayerRequestDraft, PrayerStatus, Sermon, SermonDraft,
};
use crate::{Error, Result};

const PREFER_RETURN: &str = "return=representation";
const PREFER_MERGE: &str = "resolution=merge-duplicates,return=representation";
const PREFER_IGNORE: &str = "resolution=ignore-duplicates,return=representation";

pub struct RestStore {
    client: Client,
    base_url: String,
    anon_key: String,
    service_key: Option<String>,
    retry: RetryPolicy,
}

/// Meeting upsert body; absent optional fields are left out so the merge
/// keeps their stored values.
#[derive(Serialize)]
struct MeetingBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    title: &'a str,
    meeting_type: MeetingType,
    time: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    zoom_link: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    maps_link: Option<&'a str>,
    updated_at: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    #[serde(default)]
    email: Option<String>,
}

impl RestStore {
    pub fn new(
        url: &str,
        anon_key: &str,
        service_key: Option<&str>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let base_url = url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config("store URL is not set".to_string()));
        }
        if anon_key.trim().is_empty() {
            return Err(Error::Config("store anon key is not set".to_string()));
        }

        let client = Client::builder()
            .timeout(retry.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            anon_key: anon_key.trim().to_string(),
            service_key: service_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }

    fn service_key(&self) -> Result<&str> {
        self.service_key.as_deref().ok_or_else(|| {
            Error::Config("store service key is not set; schema operations need it".to_string())
        })
    }

    fn request(&self, method: Method, url: &str, key: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(key)
    }

    /// Send with retry; non-success statuses become classified errors
    async fn send(&self, what: &str, build: impl Fn() -> RequestBuilder) -> Result<Response> {
        self.retry
            .run(what, || {
                let request = build();
                async move {
                    let response = request.send().await?;
                    check_status(response).await
                }
            })
            .await
    }

    /// Send with retry on transport failures only; the caller inspects the status
    async fn send_raw(&self, what: &str, build: impl Fn() -> RequestBuilder) -> Result<Response> {
        self.retry
            .run(what, || {
                let request = build();
                async move {
                    let response = request.send().await?;
                    let status = response.status();
                    if status.is_server_error() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::Transient(
                            error_message(&body).unwrap_or_else(|| format!("HTTP {}", status)),
                        ));
                    }
                    Ok(response)
                }
            })
            .await
    }

    async fn rows<T: DeserializeOwned>(
        &self,
        what: &str,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<Vec<T>> {
        let response = self.send(what, build).await?;
        Ok(response.json::<Vec<T>>().await?)
    }

    async fn first_row<T: DeserializeOwned>(
        &self,
        what: &str,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<T> {
        self.rows(what, build)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(what.to_string()))
    }
}

#[async_trait]
impl RecordStore for RestStore {
    fn backend(&self) -> &'static str {
        "rest"
    }

    // ========== Schema Operations ==========

    async fn probe_table(&self, table: Table) -> Result<TableStatus> {
        let url = self.table_url(table);
        let probe = self
            .send(&format!("probe {}", table), || {
                self.request(Method::GET, &url, &self.anon_key)
                    .query(&[("select", "id"), ("limit", "1")])
            })
            .await;
        match probe {
            Ok(_) => Ok(TableStatus::Present),
            Err(e) if e.is_schema_missing() => Ok(TableStatus::Missing),
            Err(e) => Err(e),
        }
    }

    async fn apply_schema(&self) -> Result<()> {
        self.execute_sql(&schema::postgres::migration_script()).await?;
        Ok(())
    }

    async fn execute_sql(&self, sql: &str) -> Result<serde_json::Value> {
        let key = self.service_key()?;
        let url = format!("{}/rest/v1/rpc/exec_sql", self.base_url);
        let body = serde_json::json!({ "sql": sql });
        let response = self
            .send("execute sql", || {
                self.request(Method::POST, &url, key).json(&body)
            })
            .await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn count_rows(&self, table: Table) -> Result<u64> {
        let url = self.table_url(table);
        let response = self
            .send(&format!("count {}", table), || {
                self.request(Method::GET, &url, &self.anon_key)
                    .query(&[("select", "id"), ("limit", "0")])
                    .header("Prefer", "count=exact")
            })
            .await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| Error::Store(format!("count {}: missing Content-Range total", table)))
    }

    // ========== Livestream Operations ==========

    async fn get_livestream(&self) -> Result<Livestream> {
        let url = self.table_url(Table::Livestream);
        self.first_row("livestream", || {
            self.request(Method::GET, &url, &self.anon_key)
                .query(&[("select", "*"), ("id", "eq.1")])
        })
        .await
    }

    async fn upsert_livestream(&self, update: &LivestreamUpdate) -> Result<Livestream> {
        let url = self.table_url(Table::Livestream);
        let body = serde_json::json!([{
            "id": update.target_id(),
            "youtube_id": update.youtube_id,
            "description": update.description,
            "is_live": update.is_live,
            "updated_at": Utc::now().to_rfc3339(),
        }]);
        self.first_row("livestream", || {
            self.request(Method::POST, &url, &self.anon_key)
                .query(&[("on_conflict", "id")])
                .header("Prefer", PREFER_MERGE)
                .json(&body)
        })
        .await
    }

    async fn seed_livestream(&self, default: &LivestreamUpdate) -> Result<bool> {
        if self.count_rows(Table::Livestream).await? > 0 {
            return Ok(false);
        }
        let url = self.table_url(Table::Livestream);
        let body = serde_json::json!([{
            "id": default.target_id(),
            "youtube_id": default.youtube_id,
            "description": default.description,
            "is_live": default.is_live,
        }]);
        let written: Vec<Livestream> = self
            .rows("seed livestream", || {
                self.request(Method::POST, &url, &self.anon_key)
                    .query(&[("on_conflict", "id")])
                    .header("Prefer", PREFER_IGNORE)
                    .json(&body)
            })
            .await?;
        Ok(!written.is_empty())
    }

    // ========== Sermon Operations ==========

    async fn list_sermons(&self) -> Result<Vec<Sermon>> {
        let url = self.table_url(Table::Sermons);
        self.rows("list sermons", || {
            self.request(Method::GET, &url, &self.anon_key)
                .query(&[("select", "*"), ("order", "date.desc,created_at.desc")])
        })
        .await
    }

    async fn get_sermon(&self, id: &str) -> Result<Sermon> {
        let url = self.table_url(Table::Sermons);
        let filter = format!("eq.{}", id);
        self.first_row(&format!("sermon {}", id), || {
            self.request(Method::GET, &url, &self.anon_key)
                .query(&[("select", "*"), ("id", filter.as_str())])
        })
        .await
    }

    async fn create_sermon(&self, draft: &SermonDraft) -> Result<Sermon> {
        let url = self.table_url(Table::Sermons);
        self.first_row("create sermon", || {
            self.request(Method::POST, &url, &self.anon_key)
                .header("Prefer", PREFER_RETURN)
                .json(draft)
        })
        .await
    }

    async fn update_sermon(&self, id: &str, draft: &SermonDraft) -> Result<Sermon> {
        let url = self.table_url(Table::Sermons);
        let filter = format!("eq.{}", id);
        let mut body = serde_json::to_value(draft)?;
        body["updated_at"] = serde_json::Value::String(Utc::now().to_rfc3339());
        self.first_row(&format!("sermon {}", id), || {
            self.request(Method::PATCH, &url, &self.anon_key)
                .query(&[("id", filter.as_str())])
                .header("Prefer", PREFER_RETURN)
                .json(&body)
        })
        .await
    }

    async fn delete_sermon(&self, id: &str) -> Result<()> {
        let url = self.table_url(Table::Sermons);
        let filter = format!("eq.{}", id);
        let _: Sermon = self
            .first_row(&format!("sermon {}", id), || {
                self.request(Method::DELETE, &url, &self.anon_key)
                    .query(&[("id", filter.as_str())])
                    .header("Prefer", PREFER_RETURN)
            })
            .await?;
        Ok(())
    }

    // ========== Meeting Operations ==========

    async fn list_meetings(&self) -> Result<Vec<Meeting>> {
        let url = self.table_url(Table::Meetings);
        self.rows("list meetings", || {
            self.request(Method::GET, &url, &self.anon_key)
                .query(&[("select", "*"), ("order", "created_at.desc")])
        })
        .await
    }

    async fn meeting_by_type(&self, meeting_type: MeetingType) -> Result<Option<Meeting>> {
        let url = self.table_url(Table::Meetings);
        let filter = format!("eq.{}", meeting_type);
        let rows: Vec<Meeting> = self
            .rows(&format!("{} meeting", meeting_type), || {
                self.request(Method::GET, &url, &self.anon_key).query(&[
                    ("select", "*"),
                    ("meeting_type", filter.as_str()),
                    ("order", "created_at.desc"),
                    ("limit", "1"),
                ])
            })
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_meeting(&self, draft: &MeetingDraft) -> Result<Meeting> {
        let url = self.table_url(Table::Meetings);
        let body = [MeetingBody {
            id: draft.id.as_deref(),
            title: &draft.title,
            meeting_type: draft.meeting_type,
            time: &draft.time,
            location: draft.location.as_deref(),
            zoom_link: draft.zoom_link.as_deref(),
            maps_link: draft.maps_link.as_deref(),
            updated_at: Utc::now().to_rfc3339(),
        }];
        self.first_row(&format!("{} meeting", draft.meeting_type), || {
            self.request(Method::POST, &url, &self.anon_key)
                .query(&[("on_conflict", "meeting_type")])
                .header("Prefer", PREFER_MERGE)
                .json(&body)
        })
        .await
    }

    // ========== Prayer Request Operations ==========

    async fn create_prayer_request(&self, draft: &PrayerRequestDraft) -> Result<PrayerRequest> {
        let url = self.table_url(Table::PrayerRequests);
        let mut body = serde_json::to_value(draft)?;
        body["status"] = serde_json::to_value(PrayerStatus::Pending)?;
        self.first_row("create prayer request", || {
            self.request(Method::POST, &url, &self.anon_key)
                .header("Prefer", PREFER_RETURN)
                .json(&body)
        })
        .await
    }

    async fn list_prayer_requests(&self, status: Option<PrayerStatus>) -> Result<Vec<PrayerRequest>> {
        let url = self.table_url(Table::PrayerRequests);
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(status) = status {
            query.push(("status", format!("eq.{}", status)));
        }
        self.rows("list prayer requests", || {
            self.request(Method::GET, &url, &self.anon_key).query(&query)
        })
        .await
    }

    async fn set_prayer_request_status(&self, id: &str, status: PrayerStatus) -> Result<PrayerRequest> {
        let url = self.table_url(Table::PrayerRequests);
        let filter = format!("eq.{}", id);
        let body = serde_json::json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339(),
        });
        self.first_row(&format!("prayer request {}", id), || {
            self.request(Method::PATCH, &url, &self.anon_key)
                .query(&[("id", filter.as_str())])
                .header("Prefer", PREFER_RETURN)
                .json(&body)
        })
        .await
    }
}

#[async_trait]
impl AuthProvider for RestStore {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let url = format!("{}/auth/v1/token", self.base_url);
        let body = serde_json::json!({ "email": email.trim(), "password": password });
        let response = self
            .send_raw("sign in", || {
                self.client
                    .post(&url)
                    .query(&[("grant_type", "password")])
                    .header("apikey", &self.anon_key)
                    .json(&body)
            })
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(
                error_message(&body).unwrap_or_else(|| "Invalid login credentials".to_string()),
            ));
        }

        let token: TokenResponse = response.json().await?;
        Ok(Session {
            token: token.access_token,
            email: token.user.email.unwrap_or_else(|| email.trim().to_lowercase()),
            expires_at: Utc::now() + Duration::seconds(token.expires_in.unwrap_or(3600)),
        })
    }

    async fn session_user(&self, token: &str) -> Result<Option<AdminUser>> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .send_raw("session lookup", || {
                self.client
                    .get(&url)
                    .header("apikey", &self.anon_key)
                    .bearer_auth(token)
            })
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user: TokenUser = response.json().await?;
                Ok(Some(AdminUser {
                    email: user.email.unwrap_or_default(),
                }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Store(
                    error_message(&body).unwrap_or_else(|| format!("HTTP {}", status)),
                ))
            }
        }
    }

    async fn sign_out(&self, token: &str) -> Result<()> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        let response = self
            .send_raw("sign out", || {
                self.client
                    .post(&url)
                    .header("apikey", &self.anon_key)
                    .bearer_auth(token)
            })
            .await?;
        if let Err(e) = response.error_for_status() {
            tracing::debug!("sign out was not acknowledged: {}", e);
        }
        Ok(())
    }
}

/// Map a non-success response into a classified error
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| format!("HTTP {}", status));
    let err = Error::from_store_message(message);
    if err.is_schema_missing() {
        return Err(err);
    }
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::Transient(err.to_string()));
    }
    Err(err)
}

/// Pull a human-readable message out of an error body
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
    }
    Some(trimmed.to_string())
}

/// Total from a `Content-Range` header such as `0-24/57` or `*/0`
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/').and_then(|(_, total)| total.trim().parse().ok())
}
