//! Database engine and connection management

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::Paths;

static DB_ENGINE: OnceCell<Arc<DbEngine>> = OnceCell::new();

/// Database engine wrapper
pub struct DbEngine {
    pool: SqlitePool,
}

impl DbEngine {
    /// Get the global database engine instance
    pub fn get() -> Result<Arc<DbEngine>> {
        DB_ENGINE
            .get()
            .map(Arc::clone)
            .context("Database not initialized")
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Setup the SQLite database
pub async fn setup_sqlite() -> Result<()> {
    let paths = Paths::get()?;
    let db_path = paths.app_db_path();

    // Create connection options with SQLite pragmas
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30))
        .pragma("cache_size", "10000")
        .pragma("foreign_keys", "ON");

    // Create connection pool
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    let engine = DbEngine { pool };

    DB_ENGINE
        .set(Arc::new(engine))
        .map_err(|_| anyhow::anyhow!("Database already initialized"))?;

    create_tables().await?;

    Ok(())
}

/// Create all database tables
async fn create_tables() -> Result<()> {
    let engine = DbEngine::get()?;
    let pool = engine.pool();

    // Track table. Artists and genres are stored denormalized as JSON.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS track (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            artists TEXT NOT NULL DEFAULT '[]',
            genres TEXT NOT NULL DEFAULT '[]',
            mood TEXT,
            tempo REAL,
            key TEXT,
            scale TEXT,
            danceability REAL,
            energy REAL,
            duration INTEGER NOT NULL DEFAULT 0,
            playcount INTEGER NOT NULL DEFAULT 0,
            date_added INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1
        );
        CREATE INDEX IF NOT EXISTS idx_track_active_playcount
            ON track(is_active, playcount DESC, date_added DESC);
        "#,
    )
    .execute(pool)
    .await?;

    // Playlist table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlist (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            userid INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            cover_url TEXT,
            privacy TEXT NOT NULL DEFAULT 'private',
            kind TEXT NOT NULL DEFAULT 'user',
            is_ai_generated INTEGER NOT NULL DEFAULT 0,
            total_tracks INTEGER NOT NULL DEFAULT 0,
            total_duration INTEGER NOT NULL DEFAULT 0,
            last_generated_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_playlist_userid ON playlist(userid);
        "#,
    )
    .execute(pool)
    .await?;

    // Playlist track links
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlist_track (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            playlistid INTEGER NOT NULL,
            trackid INTEGER NOT NULL,
            position INTEGER NOT NULL,
            UNIQUE(playlistid, position)
        );
        CREATE INDEX IF NOT EXISTS idx_playlist_track_playlistid
            ON playlist_track(playlistid);
        "#,
    )
    .execute(pool)
    .await?;

    // Listening history
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            userid INTEGER NOT NULL,
            trackid INTEGER NOT NULL,
            played_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_user_history_userid
            ON user_history(userid, played_at DESC);
        "#,
    )
    .execute(pool)
    .await?;

    // Migration version tracking
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dbmigration (
            id INTEGER PRIMARY KEY,
            version INTEGER NOT NULL DEFAULT 0
        );
        INSERT OR IGNORE INTO dbmigration (id, version) VALUES (1, 0);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize the path and database singletons against a throwaway directory,
/// once per test process. The directory is leaked so the database file
/// outlives every test.
#[cfg(test)]
pub(crate) async fn setup_test_db() {
    use tokio::sync::OnceCell;

    static INIT: OnceCell<()> = OnceCell::const_new();

    INIT.get_or_init(|| async {
        let dir = tempfile::tempdir().unwrap();
        crate::config::Paths::init(Some(dir.path().to_path_buf())).unwrap();
        std::mem::forget(dir);

        setup_sqlite().await.unwrap();
        super::run_migrations().await.unwrap();
    })
    .await;
}
