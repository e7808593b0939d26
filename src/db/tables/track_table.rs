//! Track table operations

use anyhow::Result;
use sqlx::FromRow;

use crate::db::DbEngine;
use crate::models::{ArtistRef, Track};

/// Database row for track table
#[derive(Debug, FromRow)]
struct TrackRow {
    id: i64,
    title: String,
    artists: String,
    genres: String,
    mood: Option<String>,
    tempo: Option<f32>,
    key: Option<String>,
    scale: Option<String>,
    danceability: Option<f32>,
    energy: Option<f32>,
    duration: i32,
    playcount: i32,
    date_added: i64,
    is_active: bool,
}

impl TrackRow {
    fn into_track(self) -> Track {
        let artists: Vec<ArtistRef> = serde_json::from_str(&self.artists).unwrap_or_default();
        let genres: Vec<String> = serde_json::from_str(&self.genres).unwrap_or_default();

        Track {
            id: self.id,
            title: self.title,
            artists,
            genres,
            mood: self.mood,
            tempo: self.tempo,
            key: self.key,
            scale: self.scale,
            danceability: self.danceability,
            energy: self.energy,
            duration: self.duration,
            playcount: self.playcount,
            date_added: self.date_added,
            is_active: self.is_active,
        }
    }
}

/// Track table operations
pub struct TrackTable;

impl TrackTable {
    /// Get active tracks ordered by popularity then recency
    pub async fn find_active(limit: usize) -> Result<Vec<Track>> {
        let engine = DbEngine::get()?;
        let pool = engine.pool();

        let rows: Vec<TrackRow> = sqlx::query_as(
            "SELECT * FROM track WHERE is_active = 1 \
             ORDER BY playcount DESC, date_added DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_track()).collect())
    }

    /// Get the most played active tracks
    pub async fn top_played(limit: usize) -> Result<Vec<Track>> {
        let engine = DbEngine::get()?;
        let pool = engine.pool();

        let rows: Vec<TrackRow> = sqlx::query_as(
            "SELECT * FROM track WHERE is_active = 1 \
             ORDER BY playcount DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_track()).collect())
    }

    /// Get tracks by IDs. The result is unordered; callers that care about
    /// order must reorder against their own ID list.
    pub async fn find_by_ids(ids: &[i64]) -> Result<Vec<Track>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let engine = DbEngine::get()?;
        let pool = engine.pool();

        let placeholders = vec!["?"; ids.len()].join(", ");
        let query = format!("SELECT * FROM track WHERE id IN ({})", placeholders);

        let mut q = sqlx::query_as::<_, TrackRow>(&query);
        for id in ids {
            q = q.bind(id);
        }

        let rows = q.fetch_all(pool).await?;
        Ok(rows.into_iter().map(|r| r.into_track()).collect())
    }

    /// Insert a track (catalog ingestion / tests)
    pub async fn insert(track: &Track) -> Result<i64> {
        let engine = DbEngine::get()?;
        let pool = engine.pool();

        let artists = serde_json::to_string(&track.artists)?;
        let genres = serde_json::to_string(&track.genres)?;

        let result = sqlx::query(
            "INSERT INTO track (title, artists, genres, mood, tempo, key, scale, \
             danceability, energy, duration, playcount, date_added, is_active) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&track.title)
        .bind(&artists)
        .bind(&genres)
        .bind(&track.mood)
        .bind(track.tempo)
        .bind(&track.key)
        .bind(&track.scale)
        .bind(track.danceability)
        .bind(track.energy)
        .bind(track.duration)
        .bind(track.playcount)
        .bind(track.date_added)
        .bind(track.is_active)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}
