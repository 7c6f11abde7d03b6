//! Database schema definitions
//!
//! Every statement is guarded with `IF NOT EXISTS` so the migration can be
//! re-run against a partially initialized store.

/// SQLite dialect of the content tables
pub mod sqlite {
    pub const CREATE_LIVESTREAM_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS livestream (
    id INTEGER PRIMARY KEY,
    youtube_id TEXT NOT NULL,
    description TEXT,
    is_live INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

    pub const CREATE_SERMONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sermons (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    date TEXT NOT NULL,
    youtube_url TEXT NOT NULL,
    thumbnail_url TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

    /// One row per meeting type
    pub const CREATE_MEETINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS meetings (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    meeting_type TEXT NOT NULL UNIQUE CHECK (meeting_type IN ('morning', 'evening')),
    time TEXT NOT NULL,
    location TEXT,
    zoom_link TEXT,
    maps_link TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

    pub const CREATE_PRAYER_REQUESTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS prayer_requests (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    request TEXT NOT NULL,
    is_private INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'approved', 'rejected')),
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

    pub const CREATE_INDEXES: &[&str] = &[
        "CREATE INDEX IF NOT EXISTS idx_sermons_date ON sermons(date)",
        "CREATE INDEX IF NOT EXISTS idx_prayer_requests_status ON prayer_requests(status)",
    ];

    /// Admin accounts and sessions backing the embedded auth facility.
    /// Created on open, independent of the content migration.
    pub const CREATE_AUTH_TABLES: &[&str] = &[
        r#"
CREATE TABLE IF NOT EXISTS admin_users (
    email TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#,
        r#"
CREATE TABLE IF NOT EXISTS admin_sessions (
    token TEXT PRIMARY KEY,
    email TEXT NOT NULL REFERENCES admin_users(email) ON DELETE CASCADE,
    expires_at TEXT NOT NULL
)
"#,
    ];

    /// All content schema statements
    pub fn all_schema_statements() -> Vec<&'static str> {
        let mut stmts = vec![
            CREATE_LIVESTREAM_TABLE,
            CREATE_SERMONS_TABLE,
            CREATE_MEETINGS_TABLE,
            CREATE_PRAYER_REQUESTS_TABLE,
        ];
        stmts.extend(CREATE_INDEXES.iter().copied());
        stmts
    }
}

/// Postgres dialect, sent to the hosted store through the `exec_sql` RPC
pub mod postgres {
    pub const CREATE_LIVESTREAM_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS livestream (
    id INTEGER PRIMARY KEY DEFAULT 1,
    youtube_id TEXT NOT NULL,
    description TEXT,
    is_live BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
    updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);
"#;

    pub const CREATE_SERMONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sermons (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    title TEXT NOT NULL,
    description TEXT,
    date DATE NOT NULL,
    youtube_url TEXT NOT NULL,
    thumbnail_url TEXT,
    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
    updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);
"#;

    pub const CREATE_MEETINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS meetings (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    title TEXT NOT NULL,
    meeting_type TEXT NOT NULL UNIQUE CHECK (meeting_type IN ('morning', 'evening')),
    time TEXT NOT NULL,
    location TEXT,
    zoom_link TEXT,
    maps_link TEXT,
    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
    updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);
"#;

    pub const CREATE_PRAYER_REQUESTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS prayer_requests (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    request TEXT NOT NULL,
    is_private BOOLEAN NOT NULL DEFAULT FALSE,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'approved', 'rejected')),
    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
    updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
);
"#;

    pub const CREATE_INDEXES: &[&str] = &[
        "CREATE INDEX IF NOT EXISTS idx_sermons_date ON sermons(date);",
        "CREATE INDEX IF NOT EXISTS idx_prayer_requests_status ON prayer_requests(status);",
    ];

    /// One-time bootstrap run by the database owner so the service key can
    /// apply migrations over HTTP.
    pub const CREATE_EXEC_SQL_FUNCTION: &str = r#"
CREATE OR REPLACE FUNCTION exec_sql(sql TEXT)
RETURNS JSON
LANGUAGE plpgsql
SECURITY DEFINER
AS $$
BEGIN
    EXECUTE sql;
    RETURN json_build_object('success', TRUE);
END;
$$;
REVOKE ALL ON FUNCTION exec_sql(TEXT) FROM PUBLIC, anon, authenticated;
"#;

    pub fn all_schema_statements() -> Vec<&'static str> {
        let mut stmts = vec![
            CREATE_LIVESTREAM_TABLE,
            CREATE_SERMONS_TABLE,
            CREATE_MEETINGS_TABLE,
            CREATE_PRAYER_REQUESTS_TABLE,
        ];
        stmts.extend(CREATE_INDEXES.iter().copied());
        stmts
    }

    /// The whole migration as one script
    pub fn migration_script() -> String {
        all_schema_statements().join("\n")
    }
}
