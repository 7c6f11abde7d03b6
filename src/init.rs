//! Schema initialization and default-data seeding
//!
//! Initialization runs the backend's single idempotent migration and then
//! seeds the default livestream row. Running it any number of times leaves
//! existing rows untouched.

use serde::Serialize;

use crate::model::{LivestreamUpdate, MeetingDraft, MeetingType};
use crate::storage::{RecordStore, Table, TableStatus};
use crate::{Error, Result};

pub const DEFAULT_YOUTUBE_ID: &str = "jfKfPfyJRdk";
pub const DEFAULT_LIVESTREAM_DESCRIPTION: &str = "Welcome to Luke Barnabas Ministry livestream";

/// Values written into an empty store
#[derive(Debug, Clone, PartialEq)]
pub struct SeedDefaults {
    pub youtube_id: String,
    pub description: String,
}

impl Default for SeedDefaults {
    fn default() -> Self {
        Self {
            youtube_id: DEFAULT_YOUTUBE_ID.to_string(),
            description: DEFAULT_LIVESTREAM_DESCRIPTION.to_string(),
        }
    }
}

impl SeedDefaults {
    pub fn livestream(&self) -> LivestreamUpdate {
        LivestreamUpdate {
            id: None,
            youtube_id: self.youtube_id.clone(),
            description: Some(self.description.clone()),
            is_live: false,
        }
    }
}

/// The meeting shown for `meeting_type` before an admin has saved one
pub fn default_meeting(meeting_type: MeetingType) -> MeetingDraft {
    match meeting_type {
        MeetingType::Morning => {
            MeetingDraft::new(meeting_type, "Morning Prayer & Devotion", "7:00 AM - 8:00 AM")
                .with_zoom_link("https://zoom.us/j/example")
        }
        MeetingType::Evening => {
            MeetingDraft::new(meeting_type, "Evening Bible Study", "7:30 PM - 9:00 PM")
                .with_location("Community Church Hall")
                .with_maps_link("https://maps.google.com/?q=Community+Church+Hall")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: Table,
    pub status: TableStatus,
}

/// Presence of every content table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaStatus {
    pub tables: Vec<TableReport>,
}

impl SchemaStatus {
    pub fn missing(&self) -> Vec<Table> {
        self.tables
            .iter()
            .filter(|t| t.status == TableStatus::Missing)
            .map(|t| t.table)
            .collect()
    }

    pub fn all_present(&self) -> bool {
        self.missing().is_empty()
    }

    fn status_of(&self, table: Table) -> TableStatus {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .map(|t| t.status)
            .unwrap_or(TableStatus::Missing)
    }
}

impl std::fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Schema status:")?;
        for report in &self.tables {
            let status = match report.status {
                TableStatus::Present => "present",
                TableStatus::Missing => "missing",
            };
            writeln!(f, "  {}: {}", report.table, status)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitReport {
    /// Tables that were missing before the migration ran
    pub created: Vec<Table>,
    pub seeded_livestream: bool,
}

impl InitReport {
    pub fn message(&self) -> String {
        if self.created.is_empty() {
            "Database already initialized".to_string()
        } else {
            let names: Vec<&str> = self.created.iter().map(|t| t.as_str()).collect();
            format!("Created tables: {}", names.join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub success: bool,
    pub message: String,
    pub seeded_livestream: bool,
    pub seeded_meetings: Vec<MeetingType>,
}

pub struct SchemaInitializer<'a> {
    store: &'a dyn RecordStore,
    defaults: SeedDefaults,
}

impl<'a> SchemaInitializer<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self {
            store,
            defaults: SeedDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: SeedDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Probe every content table
    pub async fn status(&self) -> Result<SchemaStatus> {
        let mut tables = Vec::with_capacity(Table::all().len());
        for table in Table::all() {
            let status = self.store.probe_table(*table).await?;
            tracing::debug!("table {} is {:?}", table, status);
            tables.push(TableReport {
                table: *table,
                status,
            });
        }
        Ok(SchemaStatus { tables })
    }

    /// Apply the migration and seed the default livestream row if absent
    pub async fn initialize(&self) -> Result<InitReport> {
        let before = self.status().await?;

        tracing::info!("applying schema migration ({} backend)", self.store.backend());
        self.store.apply_schema().await?;

        let after = self.status().await?;
        let still_missing = after.missing();
        if !still_missing.is_empty() {
            let names: Vec<&str> = still_missing.iter().map(|t| t.as_str()).collect();
            return Err(Error::Store(format!(
                "tables still missing after migration: {}",
                names.join(", ")
            )));
        }

        let created: Vec<Table> = before
            .missing()
            .into_iter()
            .filter(|t| after.status_of(*t) == TableStatus::Present)
            .collect();

        let seeded_livestream = self
            .store
            .seed_livestream(&self.defaults.livestream())
            .await?;
        if seeded_livestream {
            tracing::info!("seeded default livestream row");
        }

        Ok(InitReport {
            created,
            seeded_livestream,
        })
    }

    /// Seed default rows into an initialized store; refuses when tables are missing
    pub async fn check_and_seed(&self) -> Result<SeedReport> {
        let status = self.status().await?;
        if !status.all_present() {
            let names: Vec<&str> = status.missing().iter().map(|t| t.as_str()).collect();
            return Ok(SeedReport {
                success: false,
                message: format!(
                    "Some tables don't exist ({}). Run the database initialization first.",
                    names.join(", ")
                ),
                seeded_livestream: false,
                seeded_meetings: Vec::new(),
            });
        }

        let seeded_livestream = self
            .store
            .seed_livestream(&self.defaults.livestream())
            .await?;

        let mut seeded_meetings = Vec::new();
        for meeting_type in MeetingType::all() {
            if self.store.meeting_by_type(*meeting_type).await?.is_none() {
                self.store
                    .upsert_meeting(&default_meeting(*meeting_type))
                    .await?;
                seeded_meetings.push(*meeting_type);
            }
        }

        let message = if !seeded_livestream && seeded_meetings.is_empty() {
            "Database is properly set up; nothing to seed".to_string()
        } else {
            "Database is properly set up and default data has been seeded".to_string()
        };
        tracing::info!("{}", message);

        Ok(SeedReport {
            success: true,
            message,
            seeded_livestream,
            seeded_meetings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{RowCounts, SqliteStore};

    #[tokio::test]
    async fn test_initialize_creates_tables_and_seeds() {
        let store = SqliteStore::open_in_memory().unwrap();
        let init = SchemaInitializer::new(&store);

        assert_eq!(init.status().await.unwrap().missing().len(), 4);

        let report = init.initialize().await.unwrap();
        assert_eq!(report.created.len(), 4);
        assert!(report.seeded_livestream);
        assert!(init.status().await.unwrap().all_present());

        let livestream = store.get_livestream().await.unwrap();
        assert_eq!(livestream.youtube_id, DEFAULT_YOUTUBE_ID);
        assert!(!livestream.is_live);
    }

    #[tokio::test]
    async fn test_initialize_twice_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let init = SchemaInitializer::new(&store);

        init.initialize().await.unwrap();
        let first = RowCounts::collect(&store).await.unwrap();

        let report = init.initialize().await.unwrap();
        assert!(report.created.is_empty());
        assert!(!report.seeded_livestream);
        assert_eq!(report.message(), "Database already initialized");
        assert_eq!(RowCounts::collect(&store).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_check_and_seed_refuses_missing_tables() {
        let store = SqliteStore::open_in_memory().unwrap();
        let report = SchemaInitializer::new(&store).check_and_seed().await.unwrap();
        assert!(!report.success);
        assert!(report.message.contains("livestream"));
    }

    #[tokio::test]
    async fn test_check_and_seed_fills_only_absent_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.apply_schema().await.unwrap();
        store
            .upsert_meeting(&MeetingDraft::new(MeetingType::Morning, "Dawn Prayer", "6:00 AM"))
            .await
            .unwrap();

        let init = SchemaInitializer::new(&store);
        let report = init.check_and_seed().await.unwrap();
        assert!(report.success);
        assert!(report.seeded_livestream);
        assert_eq!(report.seeded_meetings, vec![MeetingType::Evening]);

        let morning = store.meeting_by_type(MeetingType::Morning).await.unwrap().unwrap();
        assert_eq!(morning.title, "Dawn Prayer");

        let again = init.check_and_seed().await.unwrap();
        assert!(!again.seeded_livestream);
        assert!(again.seeded_meetings.is_empty());
    }
}
