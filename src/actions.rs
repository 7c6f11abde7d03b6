//! Form actions
//!
//! Each action validates the submitted fields, delegates to the record
//! store and reports which public pages must be invalidated. Validation
//! failures are returned before any store call is made.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::auth::{AuthProvider, Session};
use crate::model::{
    LivestreamUpdate, MeetingDraft, MeetingType, PrayerRequestDraft, PrayerStatus, SermonDraft,
};
use crate::storage::{non_blank, RecordStore};
use crate::{Error, ErrorClass, Result};

/// Submitted form fields, keyed by input name
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FormData(HashMap<String, String>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }

    /// Trimmed value, `None` when absent or blank
    pub fn text(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn optional(&self, name: &str) -> Option<String> {
        non_blank(self.0.get(name).map(String::as_str))
    }

    /// Checkbox inputs are only submitted when ticked
    pub fn checkbox(&self, name: &str) -> bool {
        matches!(
            self.text(name).map(|v| v.to_lowercase()).as_deref(),
            Some("on" | "true" | "1")
        )
    }

    /// Fail with every blank required field named in one message
    pub fn require(&self, names: &[&str]) -> Result<()> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| self.text(name).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    fn required(&self, name: &str) -> Result<String> {
        self.text(name)
            .map(str::to_string)
            .ok_or_else(|| Error::Validation(format!("Missing required fields: {}", name)))
    }
}

impl From<HashMap<String, String>> for FormData {
    fn from(fields: HashMap<String, String>) -> Self {
        Self(fields)
    }
}

/// Public pages whose cached views an action can invalidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Home,
    Sermons,
    Meetings,
    AdminDashboard,
}

impl Page {
    pub fn path(&self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::Sermons => "/sermons",
            Page::Meetings => "/meetings",
            Page::AdminDashboard => "/admin/dashboard",
        }
    }

    pub fn all() -> &'static [Page] {
        &[Page::Home, Page::Sermons, Page::Meetings, Page::AdminDashboard]
    }
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Paths to revalidate; empty on failure
    #[serde(serialize_with = "serialize_paths")]
    pub revalidate: Vec<Page>,
    #[serde(skip)]
    pub class: Option<ErrorClass>,
}

fn serialize_paths<S: serde::Serializer>(pages: &[Page], s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_seq(pages.iter().map(Page::path))
}

impl ActionOutcome {
    pub fn succeeded<T: Serialize>(data: &T, revalidate: &[Page]) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            revalidate: revalidate.to_vec(),
            class: None,
        }
    }

    pub fn failed(err: Error) -> Self {
        let class = err.class();
        match class {
            ErrorClass::Validation => tracing::debug!("form rejected: {}", err),
            _ => tracing::warn!("form action failed: {}", err),
        }
        Self {
            success: false,
            data: None,
            error: Some(user_message(&err)),
            revalidate: Vec::new(),
            class: Some(class),
        }
    }

    fn from_result<T: Serialize>(result: Result<T>, revalidate: &[Page]) -> Self {
        match result {
            Ok(data) => Self::succeeded(&data, revalidate),
            Err(e) => Self::failed(e),
        }
    }
}

/// Message shown to the person who submitted the form
pub fn user_message(err: &Error) -> String {
    match err {
        Error::Validation(msg) => msg.clone(),
        Error::SchemaMissing { table } => format!(
            "The database is not initialized (table \"{}\" is missing). Run initialization first.",
            table
        ),
        Error::Config(_) => "The site is not configured to reach its database.".to_string(),
        Error::Auth(msg) => msg.clone(),
        other => other.to_string(),
    }
}

// ========== Admin Session ==========

pub async fn sign_in(auth: &dyn AuthProvider, form: &FormData) -> Result<Session> {
    form.require(&["email", "password"])?;
    let email = form.required("email")?;
    let password = form.required("password")?;
    auth.sign_in(&email, &password).await
}

// ========== Livestream ==========

pub async fn update_livestream(store: &dyn RecordStore, form: &FormData) -> ActionOutcome {
    let update = match livestream_from_form(form) {
        Ok(update) => update,
        Err(e) => return ActionOutcome::failed(e),
    };
    ActionOutcome::from_result(
        store.upsert_livestream(&update).await,
        &[Page::Home, Page::AdminDashboard],
    )
}

fn livestream_from_form(form: &FormData) -> Result<LivestreamUpdate> {
    form.require(&["youtube_id"])?;
    let id = match form.text("id") {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| Error::Validation(format!("Invalid livestream id: {}", raw)))?,
        ),
        None => None,
    };
    Ok(LivestreamUpdate {
        id,
        youtube_id: form.required("youtube_id")?,
        description: form.optional("description"),
        is_live: form.checkbox("is_live"),
    })
}

// ========== Sermons ==========

pub async fn create_sermon(store: &dyn RecordStore, form: &FormData) -> ActionOutcome {
    let draft = match sermon_from_form(form) {
        Ok(draft) => draft,
        Err(e) => return ActionOutcome::failed(e),
    };
    ActionOutcome::from_result(store.create_sermon(&draft).await, SERMON_PAGES)
}

pub async fn update_sermon(store: &dyn RecordStore, form: &FormData) -> ActionOutcome {
    let parsed = form
        .require(&["id", "title", "date", "youtube_url"])
        .and_then(|_| Ok((form.required("id")?, sermon_from_form(form)?)));
    let (id, draft) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return ActionOutcome::failed(e),
    };
    ActionOutcome::from_result(store.update_sermon(&id, &draft).await, SERMON_PAGES)
}

pub async fn delete_sermon(store: &dyn RecordStore, form: &FormData) -> ActionOutcome {
    let id = match form.required("id") {
        Ok(id) => id,
        Err(e) => return ActionOutcome::failed(e),
    };
    let result = store
        .delete_sermon(&id)
        .await
        .map(|_| serde_json::json!({ "id": id }));
    ActionOutcome::from_result(result, SERMON_PAGES)
}

const SERMON_PAGES: &[Page] = &[Page::Sermons, Page::AdminDashboard];

fn sermon_from_form(form: &FormData) -> Result<SermonDraft> {
    form.require(&["title", "date", "youtube_url"])?;
    Ok(SermonDraft {
        title: form.required("title")?,
        description: form.optional("description"),
        date: form.required("date")?,
        youtube_url: form.required("youtube_url")?,
        thumbnail_url: form.optional("thumbnail_url"),
    })
}

// ========== Meetings ==========

pub async fn update_morning_meeting(store: &dyn RecordStore, form: &FormData) -> ActionOutcome {
    update_meeting(store, form, MeetingType::Morning).await
}

pub async fn update_evening_meeting(store: &dyn RecordStore, form: &FormData) -> ActionOutcome {
    update_meeting(store, form, MeetingType::Evening).await
}

pub async fn update_meeting(
    store: &dyn RecordStore,
    form: &FormData,
    meeting_type: MeetingType,
) -> ActionOutcome {
    let draft = match meeting_from_form(form, meeting_type) {
        Ok(draft) => draft,
        Err(e) => return ActionOutcome::failed(e),
    };
    ActionOutcome::from_result(
        store.upsert_meeting(&draft).await,
        &[Page::Meetings, Page::AdminDashboard],
    )
}

fn meeting_from_form(form: &FormData, meeting_type: MeetingType) -> Result<MeetingDraft> {
    form.require(&["title", "time"])?;
    let mut draft = MeetingDraft::new(meeting_type, form.required("title")?, form.required("time")?);
    draft.id = form.optional("id");
    match meeting_type {
        MeetingType::Morning => {
            draft.zoom_link = form.optional("zoom_link");
        }
        MeetingType::Evening => {
            draft.location = form.optional("location");
            draft.maps_link = form.optional("maps_link");
        }
    }
    Ok(draft)
}

// ========== Prayer Requests ==========

pub async fn submit_prayer_request(store: &dyn RecordStore, form: &FormData) -> ActionOutcome {
    if let Err(e) = form.require(&["name", "request"]) {
        return ActionOutcome::failed(e);
    }
    let draft = PrayerRequestDraft {
        name: form.text("name").unwrap_or_default().to_string(),
        email: form.optional("email"),
        phone: form.optional("phone"),
        request: form.text("request").unwrap_or_default().to_string(),
        is_private: form.checkbox("is_private"),
    };
    ActionOutcome::from_result(
        store.create_prayer_request(&draft).await,
        &[Page::AdminDashboard],
    )
}

pub async fn set_prayer_request_status(store: &dyn RecordStore, form: &FormData) -> ActionOutcome {
    let parsed = form
        .require(&["id", "status"])
        .and_then(|_| Ok((form.required("id")?, form.required("status")?.parse::<PrayerStatus>()?)));
    let (id, status) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return ActionOutcome::failed(e),
    };
    ActionOutcome::from_result(
        store.set_prayer_request_status(&id, status).await,
        &[Page::AdminDashboard],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    async fn migrated_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.apply_schema().await.unwrap();
        store
    }

    #[test]
    fn test_require_names_every_blank_field() {
        let form = FormData::new().with("title", "  ").with("date", "2024-05-01");
        let err = form.require(&["title", "date", "youtube_url"]).unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: title, youtube_url");
        assert_eq!(err.class(), ErrorClass::Validation);
    }

    #[test]
    fn test_checkbox_values() {
        let form = FormData::new()
            .with("a", "on")
            .with("b", "TRUE")
            .with("c", "1")
            .with("d", "off");
        assert!(form.checkbox("a"));
        assert!(form.checkbox("b"));
        assert!(form.checkbox("c"));
        assert!(!form.checkbox("d"));
        assert!(!form.checkbox("missing"));
    }

    #[tokio::test]
    async fn test_livestream_action_invalidates_home() {
        let store = migrated_store().await;
        let form = FormData::new()
            .with("youtube_id", "abc123")
            .with("description", "")
            .with("is_live", "on");

        let outcome = update_livestream(&store, &form).await;
        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(outcome.revalidate, vec![Page::Home, Page::AdminDashboard]);

        let stored = store.get_livestream().await.unwrap();
        assert_eq!(stored.id, 1);
        assert!(stored.is_live);
        assert_eq!(stored.description, None);
    }

    #[tokio::test]
    async fn test_sermon_date_is_stored_as_given() {
        let store = migrated_store().await;
        let form = FormData::new()
            .with("title", "Grace")
            .with("date", " May 1, 2023 ")
            .with("youtube_url", "https://youtu.be/x");
        let outcome = create_sermon(&store, &form).await;
        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(outcome.revalidate, vec![Page::Sermons, Page::AdminDashboard]);

        let sermons = store.list_sermons().await.unwrap();
        assert_eq!(sermons[0].date, "May 1, 2023");
    }

    #[tokio::test]
    async fn test_prayer_request_blank_contact_fields_are_absent() {
        let store = migrated_store().await;
        let form = FormData::new()
            .with("name", "Ruth")
            .with("email", " ")
            .with("phone", "")
            .with("request", "Healing for my mother");

        let outcome = submit_prayer_request(&store, &form).await;
        assert!(outcome.success);
        assert_eq!(outcome.revalidate, vec![Page::AdminDashboard]);

        let requests = store.list_prayer_requests(None).await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].email, None);
        assert_eq!(requests[0].phone, None);
        assert_eq!(requests[0].status, PrayerStatus::Pending);
        assert!(!requests[0].is_private);
    }

    #[tokio::test]
    async fn test_unknown_prayer_status_is_validation() {
        let store = migrated_store().await;
        let form = FormData::new().with("id", "x").with("status", "archived");
        let outcome = set_prayer_request_status(&store, &form).await;
        assert_eq!(outcome.class, Some(ErrorClass::Validation));
    }

    #[tokio::test]
    async fn test_schema_missing_has_friendly_message() {
        let store = SqliteStore::open_in_memory().unwrap();
        let form = FormData::new().with("title", "Morning").with("time", "7 AM");
        let outcome = update_morning_meeting(&store, &form).await;
        assert_eq!(outcome.class, Some(ErrorClass::SchemaMissing));
        assert!(outcome.error.unwrap().contains("not initialized"));
    }

    #[test]
    fn test_outcome_serializes_paths() {
        let outcome = ActionOutcome::succeeded(&serde_json::json!({"id": "1"}), &[Page::Sermons]);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["revalidate"], serde_json::json!(["/sermons"]));
        assert!(json.get("error").is_none());
    }
}
