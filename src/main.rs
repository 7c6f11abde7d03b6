//! ministry-site CLI - serve the site and manage its record store

use clap::{Parser, Subcommand, ValueEnum};
use ministry_site::config::{self, Backend, SiteConfig, StoreBackend};
use ministry_site::init::SchemaInitializer;
use ministry_site::model::PrayerStatus;
use ministry_site::server::{self, AppState};
use ministry_site::storage::{schema, RecordStore, RowCounts, SqliteStore};
use ministry_site::ui;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ministry-site")]
#[command(version = "0.1.0")]
#[command(about = "Content-managed ministry website backed by a relational record store")]
#[command(long_about = r#"
ministry-site serves the public pages (livestream, sermons, meetings,
prayer requests) and the admin dashboard, and manages the record store.

Example usage:
  ministry-site migrate
  ministry-site admin add --email pastor@example.org --password '...'
  ministry-site serve --bind 0.0.0.0:3000
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides config and environment)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Create any missing tables and seed the default livestream row
    Migrate,

    /// Show table presence and row counts
    Status,

    /// Seed default livestream and meeting rows where absent
    Seed,

    /// Execute a SQL statement against the store
    Sql {
        /// SQL to execute
        sql: String,
    },

    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Print the schema DDL
    Schema {
        #[arg(long, value_enum, default_value = "sqlite")]
        dialect: Dialect,
    },

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Create an admin or reset its password (sqlite backend)
    Add {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Dialect {
    Sqlite,
    Postgres,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let site = || load_site(cli.config.as_deref(), cli.database.as_deref());

    match cli.command {
        Commands::Serve { bind } => {
            let site = site()?;
            let bind = bind.unwrap_or_else(|| site.server.bind.clone());
            let backend = site.open_backend().unwrap_or_else(|e| {
                ui::warn(&format!("{}; every request will report it", e));
                Backend::unconfigured(e.to_string())
            });
            let state = AppState::new(backend).with_seed(site.seed_defaults());
            server::start_server(&bind, state).await?;
        }

        Commands::Migrate => {
            let site = site()?;
            let backend = site.open_backend()?;
            ui::header(&format!("Migrating {} store", backend.store.backend()));
            let report = SchemaInitializer::new(backend.store.as_ref())
                .with_defaults(site.seed_defaults())
                .initialize()
                .await?;
            ui::success(&report.message());
            if report.seeded_livestream {
                ui::summary_row("Seeded:", "default livestream row");
            }
        }

        Commands::Status => {
            let site = site()?;
            let backend = site.open_backend()?;
            ui::header("Record store status");
            ui::info("Backend", backend.store.backend());
            let status = SchemaInitializer::new(backend.store.as_ref()).status().await?;

            ui::section("Tables");
            for report in &status.tables {
                ui::table_status(report.table.as_str(), report.status);
            }

            if !status.all_present() {
                println!();
                ui::warn("Some tables are missing; run `ministry-site migrate`");
                return Ok(());
            }

            let counts = RowCounts::collect(backend.store.as_ref()).await?;
            ui::section("Rows");
            ui::summary_row("Livestream:", &counts.livestream.to_string());
            ui::summary_row("Sermons:", &counts.sermons.to_string());
            ui::summary_row("Meetings:", &counts.meetings.to_string());
            ui::summary_row("Prayer requests:", &counts.prayer_requests.to_string());

            ui::section("Livestream");
            let current = match backend.store.get_livestream().await {
                Ok(stream) => Some(stream),
                Err(ministry_site::Error::NotFound(_)) => None,
                Err(e) => return Err(e.into()),
            };
            ui::livestream(current.as_ref());

            ui::section("Prayer requests");
            for &prayer_status in PrayerStatus::all() {
                let requests = backend.store.list_prayer_requests(Some(prayer_status)).await?;
                ui::prayer_count(prayer_status, requests.len());
            }
        }

        Commands::Seed => {
            let site = site()?;
            let backend = site.open_backend()?;
            let report = SchemaInitializer::new(backend.store.as_ref())
                .with_defaults(site.seed_defaults())
                .check_and_seed()
                .await?;
            if report.success {
                ui::success(&report.message);
                for meeting_type in &report.seeded_meetings {
                    ui::summary_row("Seeded meeting:", meeting_type.as_str());
                }
            } else {
                ui::error(&report.message);
                std::process::exit(1);
            }
        }

        Commands::Sql { sql } => {
            let backend = site()?.open_backend()?;
            let result = backend.store.execute_sql(&sql).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Admin {
            command: AdminCommands::Add { email, password },
        } => {
            let site = site()?;
            if site.store.backend != StoreBackend::Sqlite {
                anyhow::bail!(
                    "admin accounts for the {} backend are managed by the hosted auth service",
                    site.store.backend.as_str()
                );
            }
            let path = Path::new(&site.store.database);
            config::ensure_db_dir(path)?;
            let store = SqliteStore::open(path)?;
            store.add_admin(&email, &password)?;
            ui::success(&format!("Admin {} saved", email.trim()));
        }

        Commands::Schema { dialect } => match dialect {
            Dialect::Sqlite => {
                for stmt in schema::sqlite::all_schema_statements() {
                    println!("{};", stmt.trim());
                }
            }
            Dialect::Postgres => {
                println!("{}", schema::postgres::CREATE_EXEC_SQL_FUNCTION.trim());
                println!("{}", schema::postgres::migration_script());
            }
        },

        Commands::InitConfig { force } => {
            let path = cli.config.clone().unwrap_or_else(config::default_config_path);
            config::write_config(&path, &SiteConfig::default(), force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }
    }

    Ok(())
}

/// Config file, then environment, then `--database`
fn load_site(config_path: Option<&Path>, database: Option<&Path>) -> anyhow::Result<SiteConfig> {
    let mut site = SiteConfig::resolve(config_path)?;
    if let Some(database) = database {
        site.store.backend = StoreBackend::Sqlite;
        site.store.database = database.display().to_string();
    }
    Ok(site)
}
