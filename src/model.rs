//! Content records
//!
//! Four flat records back the site:
//! - `Livestream`: singleton row (id 1) shown on the home page
//! - `Sermon`: archived messages, newest first
//! - `Meeting`: one row per `MeetingType`
//! - `PrayerRequest`: visitor submissions moderated by admins
//!
//! The `*Draft` types carry the writable fields of each record.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Primary key of the singleton livestream row
pub const LIVESTREAM_ID: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Livestream {
    pub id: i64,
    pub youtube_id: String,
    pub description: Option<String>,
    pub is_live: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Writable livestream fields. A missing `id` targets the singleton row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivestreamUpdate {
    pub id: Option<i64>,
    pub youtube_id: String,
    pub description: Option<String>,
    pub is_live: bool,
}

impl LivestreamUpdate {
    pub fn target_id(&self) -> i64 {
        self.id.unwrap_or(LIVESTREAM_ID)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sermon {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// ISO date (`YYYY-MM-DD`); lexical order is chronological order
    pub date: String,
    pub youtube_url: String,
    pub thumbnail_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SermonDraft {
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub youtube_url: String,
    pub thumbnail_url: Option<String>,
}

/// The two weekly gatherings listed on the meetings page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingType {
    /// Online prayer meeting, joined over Zoom
    Morning,
    /// In-person bible study with a map link
    Evening,
}

impl MeetingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingType::Morning => "morning",
            MeetingType::Evening => "evening",
        }
    }

    pub fn all() -> &'static [MeetingType] {
        &[MeetingType::Morning, MeetingType::Evening]
    }
}

impl FromStr for MeetingType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(MeetingType::Morning),
            "evening" => Ok(MeetingType::Evening),
            _ => Err(Error::Validation(format!("Unknown meeting type: {}", s))),
        }
    }
}

impl std::fmt::Display for MeetingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    pub meeting_type: MeetingType,
    pub time: String,
    pub location: Option<String>,
    pub zoom_link: Option<String>,
    pub maps_link: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Writable meeting fields. Writes merge on `meeting_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingDraft {
    pub id: Option<String>,
    pub title: String,
    pub meeting_type: MeetingType,
    pub time: String,
    pub location: Option<String>,
    pub zoom_link: Option<String>,
    pub maps_link: Option<String>,
}

impl MeetingDraft {
    pub fn new(meeting_type: MeetingType, title: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            meeting_type,
            time: time.into(),
            location: None,
            zoom_link: None,
            maps_link: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_zoom_link(mut self, link: impl Into<String>) -> Self {
        self.zoom_link = Some(link.into());
        self
    }

    pub fn with_maps_link(mut self, link: impl Into<String>) -> Self {
        self.maps_link = Some(link.into());
        self
    }
}

/// Moderation state of a prayer request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrayerStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl PrayerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerStatus::Pending => "pending",
            PrayerStatus::Approved => "approved",
            PrayerStatus::Rejected => "rejected",
        }
    }

    pub fn all() -> &'static [PrayerStatus] {
        &[PrayerStatus::Pending, PrayerStatus::Approved, PrayerStatus::Rejected]
    }
}

impl FromStr for PrayerStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(PrayerStatus::Pending),
            "approved" | "approve" => Ok(PrayerStatus::Approved),
            "rejected" | "reject" => Ok(PrayerStatus::Rejected),
            _ => Err(Error::Validation(format!("Unknown prayer request status: {}", s))),
        }
    }
}

impl std::fmt::Display for PrayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerRequest {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub request: String,
    pub is_private: bool,
    pub status: PrayerStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerRequestDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub request: String,
    pub is_private: bool,
}

/// Generate a primary key for sermons, meetings and prayer requests
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meeting_type_roundtrip() {
        for kind in MeetingType::all() {
            let parsed: MeetingType = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
        assert!(MeetingType::from_str("midday").is_err());
    }

    #[test]
    fn test_prayer_status_aliases() {
        assert_eq!(PrayerStatus::from_str("approve").unwrap(), PrayerStatus::Approved);
        assert_eq!(PrayerStatus::from_str(" Rejected ").unwrap(), PrayerStatus::Rejected);
        assert_eq!(PrayerStatus::default(), PrayerStatus::Pending);
    }

    #[test]
    fn test_livestream_update_defaults_to_singleton() {
        let update = LivestreamUpdate {
            id: None,
            youtube_id: "abc123".to_string(),
            description: None,
            is_live: true,
        };
        assert_eq!(update.target_id(), LIVESTREAM_ID);
    }

    #[test]
    fn test_meeting_serializes_type_lowercase() {
        let json = serde_json::to_value(MeetingType::Evening).unwrap();
        assert_eq!(json, serde_json::json!("evening"));
    }
}
