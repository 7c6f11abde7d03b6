//! Page view models
//!
//! Each page fetches its records and classifies any store failure:
//! a missing table becomes `NeedsInitialization`, everything else
//! `Unavailable`. Ready views are cached until an action invalidates them.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;

use crate::actions::Page;
use crate::init::default_meeting;
use crate::model::{Livestream, Meeting, MeetingDraft, MeetingType, PrayerRequest, PrayerStatus, Sermon};
use crate::storage::RecordStore;
use crate::{Error, ErrorClass, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PageState<T> {
    Ready {
        data: T,
    },
    NeedsInitialization {
        table: String,
        message: String,
    },
    Unavailable {
        message: String,
        #[serde(skip)]
        class: ErrorClass,
    },
}

impl<T> PageState<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(data) => PageState::Ready { data },
            Err(Error::SchemaMissing { table }) => {
                tracing::warn!("page needs initialization: table {} is missing", table);
                PageState::NeedsInitialization {
                    message: format!(
                        "The \"{}\" table does not exist yet. Initialize the database to continue.",
                        table
                    ),
                    table,
                }
            }
            Err(e) => {
                tracing::error!("page unavailable: {}", e);
                PageState::Unavailable {
                    message: crate::actions::user_message(&e),
                    class: e.class(),
                }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PageState::Ready { .. })
    }
}

impl<T: Serialize> PageState<T> {
    pub fn into_json(self) -> PageState<serde_json::Value> {
        match self {
            PageState::Ready { data } => match serde_json::to_value(data) {
                Ok(data) => PageState::Ready { data },
                Err(e) => PageState::from_result(Err(e.into())),
            },
            PageState::NeedsInitialization { table, message } => {
                PageState::NeedsInitialization { table, message }
            }
            PageState::Unavailable { message, class } => PageState::Unavailable { message, class },
        }
    }
}

// ========== Views ==========

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeView {
    pub livestream: Option<Livestream>,
    pub embed_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SermonsView {
    pub sermons: Vec<Sermon>,
}

/// A meeting as shown on the meetings page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingSlot {
    #[serde(flatten)]
    pub meeting: MeetingDraft,
    /// False when no row is stored and the built-in default is shown
    pub saved: bool,
}

impl MeetingSlot {
    fn resolve(stored: Option<Meeting>, meeting_type: MeetingType) -> Self {
        match stored {
            Some(m) => Self {
                meeting: MeetingDraft {
                    id: Some(m.id),
                    title: m.title,
                    meeting_type: m.meeting_type,
                    time: m.time,
                    location: m.location,
                    zoom_link: m.zoom_link,
                    maps_link: m.maps_link,
                },
                saved: true,
            },
            None => Self {
                meeting: default_meeting(meeting_type),
                saved: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingsView {
    pub morning: MeetingSlot,
    pub evening: MeetingSlot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub livestream: Option<Livestream>,
    pub sermons: Vec<Sermon>,
    pub morning: Option<Meeting>,
    pub evening: Option<Meeting>,
    pub prayer_requests: Vec<PrayerRequest>,
    pub pending_prayer_requests: usize,
}

pub fn embed_url(youtube_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}", youtube_id)
}

/// The livestream row, treating an empty table as "nothing to show"
async fn optional_livestream(store: &dyn RecordStore) -> Result<Option<Livestream>> {
    match store.get_livestream().await {
        Ok(livestream) => Ok(Some(livestream)),
        Err(Error::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn home(store: &dyn RecordStore) -> PageState<HomeView> {
    let result = optional_livestream(store).await.map(|livestream| HomeView {
        embed_url: livestream.as_ref().map(|l| embed_url(&l.youtube_id)),
        livestream,
    });
    PageState::from_result(result)
}

pub async fn sermons(store: &dyn RecordStore) -> PageState<SermonsView> {
    PageState::from_result(store.list_sermons().await.map(|sermons| SermonsView { sermons }))
}

pub async fn meetings(store: &dyn RecordStore) -> PageState<MeetingsView> {
    let result = async {
        let morning = store.meeting_by_type(MeetingType::Morning).await?;
        let evening = store.meeting_by_type(MeetingType::Evening).await?;
        Ok::<_, Error>(MeetingsView {
            morning: MeetingSlot::resolve(morning, MeetingType::Morning),
            evening: MeetingSlot::resolve(evening, MeetingType::Evening),
        })
    }
    .await;
    PageState::from_result(result)
}

pub async fn dashboard(store: &dyn RecordStore) -> PageState<DashboardView> {
    let result = async {
        let livestream = optional_livestream(store).await?;
        let sermons = store.list_sermons().await?;
        let morning = store.meeting_by_type(MeetingType::Morning).await?;
        let evening = store.meeting_by_type(MeetingType::Evening).await?;
        let prayer_requests = store.list_prayer_requests(None).await?;
        let pending_prayer_requests = prayer_requests
            .iter()
            .filter(|r| r.status == PrayerStatus::Pending)
            .count();
        Ok::<_, Error>(DashboardView {
            livestream,
            sermons,
            morning,
            evening,
            prayer_requests,
            pending_prayer_requests,
        })
    }
    .await;
    PageState::from_result(result)
}

// ========== Cache ==========

/// Rendered ready views, keyed by page
#[derive(Debug, Default)]
pub struct PageCache {
    views: RwLock<HashMap<Page, serde_json::Value>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, page: Page) -> Option<serde_json::Value> {
        self.views.read().ok()?.get(&page).cloned()
    }

    pub fn put(&self, page: Page, view: serde_json::Value) {
        if let Ok(mut views) = self.views.write() {
            views.insert(page, view);
        }
    }

    pub fn invalidate(&self, pages: &[Page]) {
        if let Ok(mut views) = self.views.write() {
            for page in pages {
                if views.remove(page).is_some() {
                    tracing::debug!("invalidated cached view {}", page);
                }
            }
        }
    }

    pub fn clear(&self) {
        if let Ok(mut views) = self.views.write() {
            views.clear();
        }
    }
}

/// Render `page`, serving and filling the cache
pub async fn view(
    store: &dyn RecordStore,
    cache: &PageCache,
    page: Page,
) -> PageState<serde_json::Value> {
    if let Some(data) = cache.get(page) {
        return PageState::Ready { data };
    }

    let state = match page {
        Page::Home => home(store).await.into_json(),
        Page::Sermons => sermons(store).await.into_json(),
        Page::Meetings => meetings(store).await.into_json(),
        Page::AdminDashboard => dashboard(store).await.into_json(),
    };

    if let PageState::Ready { data } = &state {
        cache.put(page, data.clone());
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SermonDraft;
    use crate::storage::SqliteStore;

    #[tokio::test]
    async fn test_meetings_page_without_schema_needs_initialization() {
        let store = SqliteStore::open_in_memory().unwrap();
        match meetings(&store).await {
            PageState::NeedsInitialization { table, .. } => assert_eq!(table, "meetings"),
            other => panic!("expected NeedsInitialization, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_meetings_page_falls_back_to_defaults() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.apply_schema().await.unwrap();

        let PageState::Ready { data } = meetings(&store).await else {
            panic!("meetings page should be ready");
        };
        assert!(!data.morning.saved);
        assert_eq!(data.morning.meeting.title, "Morning Prayer & Devotion");
        assert_eq!(
            data.evening.meeting.location.as_deref(),
            Some("Community Church Hall")
        );
    }

    #[tokio::test]
    async fn test_home_page_without_livestream_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.apply_schema().await.unwrap();

        let PageState::Ready { data } = home(&store).await else {
            panic!("home page should be ready");
        };
        assert_eq!(data.livestream, None);
        assert_eq!(data.embed_url, None);
    }

    #[tokio::test]
    async fn test_cache_serves_until_invalidated() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.apply_schema().await.unwrap();
        let cache = PageCache::new();

        let first = view(&store, &cache, Page::Sermons).await;
        assert!(first.is_ready());
        assert!(cache.get(Page::Sermons).is_some());

        store
            .create_sermon(&SermonDraft {
                title: "Walking in Faith".to_string(),
                description: None,
                date: "2024-04-25".to_string(),
                youtube_url: "https://www.youtube.com/watch?v=abc".to_string(),
                thumbnail_url: None,
            })
            .await
            .unwrap();

        let PageState::Ready { data } = view(&store, &cache, Page::Sermons).await else {
            panic!("cached view should be ready");
        };
        assert_eq!(data["sermons"].as_array().unwrap().len(), 0);

        cache.invalidate(&[Page::Sermons]);
        let PageState::Ready { data } = view(&store, &cache, Page::Sermons).await else {
            panic!("fresh view should be ready");
        };
        assert_eq!(data["sermons"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unready_views_are_not_cached() {
        let store = SqliteStore::open_in_memory().unwrap();
        let cache = PageCache::new();
        let state = view(&store, &cache, Page::Home).await;
        assert!(!state.is_ready());
        assert!(cache.get(Page::Home).is_none());
    }
}
