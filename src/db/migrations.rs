//! Database migrations

use anyhow::Result;
use tracing::info;

use super::DbEngine;

/// Current migration version
const CURRENT_VERSION: i32 = 1;

/// Run database migrations
pub async fn run_migrations() -> Result<()> {
    let engine = DbEngine::get()?;
    let pool = engine.pool();

    let row: (i32,) = sqlx::query_as("SELECT version FROM dbmigration WHERE id = 1")
        .fetch_one(pool)
        .await?;
    let current_version = row.0;

    if current_version >= CURRENT_VERSION {
        info!("Database is up to date (version {})", current_version);
        return Ok(());
    }

    info!(
        "Running migrations from version {} to {}",
        current_version, CURRENT_VERSION
    );

    for version in (current_version + 1)..=CURRENT_VERSION {
        run_migration(version).await?;

        sqlx::query("UPDATE dbmigration SET version = ? WHERE id = 1")
            .bind(version)
            .execute(pool)
            .await?;

        info!("Applied migration {}", version);
    }

    Ok(())
}

async fn run_migration(version: i32) -> Result<()> {
    match version {
        1 => {
            // Initial migration - tables already created in setup_sqlite
        }
        _ => {
            anyhow::bail!("Unknown migration version: {}", version);
        }
    }

    Ok(())
}
