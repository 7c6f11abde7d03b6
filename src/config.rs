use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthProvider;
use crate::init::{SeedDefaults, DEFAULT_LIVESTREAM_DESCRIPTION, DEFAULT_YOUTUBE_ID};
use crate::storage::{RecordStore, RestStore, RetryPolicy, SqliteStore, UnconfiguredStore};
use crate::{Error, Result};

pub const ENV_STORE_BACKEND: &str = "MINISTRY_STORE_BACKEND";
pub const ENV_DATABASE: &str = "MINISTRY_DATABASE";
pub const ENV_STORE_URL: &str = "MINISTRY_STORE_URL";
pub const ENV_STORE_ANON_KEY: &str = "MINISTRY_STORE_ANON_KEY";
pub const ENV_STORE_SERVICE_KEY: &str = "MINISTRY_STORE_SERVICE_KEY";
pub const ENV_BIND: &str = "MINISTRY_BIND";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Rest,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Rest => "rest",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "rest" => Ok(StoreBackend::Rest),
            _ => Err(Error::Config(format!("unknown store backend: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite database file
    pub database: String,
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_key: Option<String>,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            backend: StoreBackend::Sqlite,
            database: default_database_path().display().to_string(),
            url: None,
            anon_key: None,
            service_key: None,
            timeout_ms: retry.timeout.as_millis() as u64,
            retry_attempts: retry.attempts,
            retry_base_delay_ms: retry.base_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub youtube_id: String,
    pub description: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            youtube_id: DEFAULT_YOUTUBE_ID.to_string(),
            description: DEFAULT_LIVESTREAM_DESCRIPTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub seed: SeedConfig,
}

/// Store handle plus the authenticator backed by the same store
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn RecordStore>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Backend {
    pub fn sqlite(store: SqliteStore) -> Self {
        let store = Arc::new(store);
        Self {
            store: store.clone(),
            auth: store,
        }
    }

    pub fn rest(store: RestStore) -> Self {
        let store = Arc::new(store);
        Self {
            store: store.clone(),
            auth: store,
        }
    }

    /// A backend whose every call reports `reason` as a configuration error
    pub fn unconfigured(reason: impl Into<String>) -> Self {
        let store = Arc::new(UnconfiguredStore::new(reason));
        Self {
            store: store.clone(),
            auth: store,
        }
    }
}

impl SiteConfig {
    /// Load the config file (if any) and apply environment overrides
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = load_config(path)?.unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override file values with `MINISTRY_*` variables from `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = var(ENV_STORE_BACKEND) {
            self.store.backend = backend.parse()?;
        }
        if let Some(database) = var(ENV_DATABASE) {
            self.store.database = database;
        }
        if let Some(url) = var(ENV_STORE_URL) {
            self.store.url = Some(url);
        }
        if let Some(key) = var(ENV_STORE_ANON_KEY) {
            self.store.anon_key = Some(key);
        }
        if let Some(key) = var(ENV_STORE_SERVICE_KEY) {
            self.store.service_key = Some(key);
        }
        if let Some(bind) = var(ENV_BIND) {
            self.server.bind = bind;
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            attempts: self.store.retry_attempts.max(1),
            base_delay: Duration::from_millis(self.store.retry_base_delay_ms),
            max_delay: defaults.max_delay,
            timeout: Duration::from_millis(self.store.timeout_ms.max(1)),
        }
    }

    pub fn seed_defaults(&self) -> SeedDefaults {
        SeedDefaults {
            youtube_id: self.seed.youtube_id.clone(),
            description: self.seed.description.clone(),
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.auth.session_ttl_hours.max(1))
    }

    /// Open the configured store; missing credentials are `Error::Config`
    pub fn open_backend(&self) -> Result<Backend> {
        match self.store.backend {
            StoreBackend::Sqlite => {
                let path = PathBuf::from(&self.store.database);
                ensure_db_dir(&path)?;
                let store = SqliteStore::open(&path)?.with_session_ttl(self.session_ttl());
                tracing::info!("using sqlite store at {}", path.display());
                Ok(Backend::sqlite(store))
            }
            StoreBackend::Rest => {
                let url = self.store.url.as_deref().ok_or_else(|| {
                    Error::Config(format!("{} is not set", ENV_STORE_URL))
                })?;
                let anon_key = self.store.anon_key.as_deref().ok_or_else(|| {
                    Error::Config(format!("{} is not set", ENV_STORE_ANON_KEY))
                })?;
                let store = RestStore::new(
                    url,
                    anon_key,
                    self.store.service_key.as_deref(),
                    self.retry_policy(),
                )?;
                tracing::info!("using rest store at {}", store.base_url());
                Ok(Backend::rest(store))
            }
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("ministry.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from(".ministry").join("ministry.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<SiteConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: SiteConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &SiteConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
