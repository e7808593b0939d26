//! Listening history table operations

use anyhow::Result;

use crate::db::DbEngine;

/// Listening history table operations
pub struct HistoryTable;

impl HistoryTable {
    /// Get the most recently played track IDs for a user, newest first.
    /// Repeated plays of the same track collapse to the most recent entry.
    pub async fn recent_for_user(user_id: i64, limit: usize) -> Result<Vec<i64>> {
        let engine = DbEngine::get()?;
        let pool = engine.pool();

        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT trackid FROM user_history WHERE userid = ? \
             GROUP BY trackid ORDER BY MAX(played_at) DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Record a play event
    pub async fn record_play(user_id: i64, track_id: i64, played_at: i64) -> Result<()> {
        let engine = DbEngine::get()?;
        let pool = engine.pool();

        sqlx::query("INSERT INTO user_history (userid, trackid, played_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(track_id)
            .bind(played_at)
            .execute(pool)
            .await?;

        Ok(())
    }
}
