//! Playlist table operations

use anyhow::Result;
use sqlx::FromRow;

use crate::db::DbEngine;
use crate::models::{Playlist, PlaylistKind, PlaylistTrack, Privacy};

/// Database row for playlist table
#[derive(Debug, FromRow)]
struct PlaylistRow {
    id: i64,
    userid: i64,
    name: String,
    description: String,
    cover_url: Option<String>,
    privacy: String,
    kind: String,
    is_ai_generated: bool,
    total_tracks: i32,
    total_duration: i32,
    last_generated_at: Option<i64>,
}

impl PlaylistRow {
    fn into_playlist(self, tracks: Vec<PlaylistTrack>) -> Playlist {
        Playlist {
            id: self.id,
            user_id: self.userid,
            name: self.name,
            description: self.description,
            cover_url: self.cover_url,
            privacy: Privacy::from_str_or_default(&self.privacy),
            kind: PlaylistKind::from_str_or_default(&self.kind),
            is_ai_generated: self.is_ai_generated,
            total_tracks: self.total_tracks,
            total_duration: self.total_duration,
            last_generated_at: self.last_generated_at,
            tracks,
        }
    }
}

/// Playlist table operations
pub struct PlaylistTable;

impl PlaylistTable {
    /// Get playlist by ID with its ordered track links
    pub async fn get_by_id(id: i64) -> Result<Option<Playlist>> {
        let engine = DbEngine::get()?;
        let pool = engine.pool();

        let row: Option<PlaylistRow> = sqlx::query_as("SELECT * FROM playlist WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let tracks = Self::get_tracks(id).await?;
        Ok(Some(row.into_playlist(tracks)))
    }

    /// Get the ordered track links of a playlist
    pub async fn get_tracks(playlist_id: i64) -> Result<Vec<PlaylistTrack>> {
        let engine = DbEngine::get()?;
        let pool = engine.pool();

        let rows: Vec<(i64, i32)> = sqlx::query_as(
            "SELECT trackid, position FROM playlist_track \
             WHERE playlistid = ? ORDER BY position ASC",
        )
        .bind(playlist_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(track_id, position)| PlaylistTrack { track_id, position })
            .collect())
    }

    /// Insert a playlist together with its track links
    pub async fn insert(playlist: &Playlist) -> Result<i64> {
        let engine = DbEngine::get()?;
        let pool = engine.pool();

        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO playlist (userid, name, description, cover_url, privacy, kind, \
             is_ai_generated, total_tracks, total_duration, last_generated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(playlist.user_id)
        .bind(&playlist.name)
        .bind(&playlist.description)
        .bind(&playlist.cover_url)
        .bind(playlist.privacy.as_str())
        .bind(playlist.kind.as_str())
        .bind(playlist.is_ai_generated)
        .bind(playlist.total_tracks)
        .bind(playlist.total_duration)
        .bind(playlist.last_generated_at)
        .execute(&mut *tx)
        .await?;

        let playlist_id = result.last_insert_rowid();

        for track in &playlist.tracks {
            sqlx::query(
                "INSERT INTO playlist_track (playlistid, trackid, position) VALUES (?, ?, ?)",
            )
            .bind(playlist_id)
            .bind(track.track_id)
            .bind(track.position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(playlist_id)
    }

    /// Append tracks at the playlist tail and recompute aggregates.
    ///
    /// The read-append-recompute sequence runs in one transaction so two
    /// concurrent appends to the same playlist cannot interleave positions
    /// or leave stale aggregates.
    pub async fn append_tracks(playlist_id: i64, track_ids: &[i64]) -> Result<Vec<PlaylistTrack>> {
        let engine = DbEngine::get()?;
        let pool = engine.pool();

        let mut tx = pool.begin().await?;

        let (tail,): (i32,) = sqlx::query_as(
            "SELECT COALESCE(MAX(position), 0) FROM playlist_track WHERE playlistid = ?",
        )
        .bind(playlist_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut appended = Vec::with_capacity(track_ids.len());
        for (i, track_id) in track_ids.iter().enumerate() {
            let position = tail + i as i32 + 1;
            sqlx::query(
                "INSERT INTO playlist_track (playlistid, trackid, position) VALUES (?, ?, ?)",
            )
            .bind(playlist_id)
            .bind(track_id)
            .bind(position)
            .execute(&mut *tx)
            .await?;
            appended.push(PlaylistTrack::new(*track_id, position));
        }

        // Recompute aggregates over the full (old + new) track set
        let (total_tracks, total_duration): (i32, Option<i32>) = sqlx::query_as(
            "SELECT COUNT(pt.trackid), SUM(t.duration) \
             FROM playlist_track pt JOIN track t ON t.id = pt.trackid \
             WHERE pt.playlistid = ?",
        )
        .bind(playlist_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE playlist SET total_tracks = ?, total_duration = ?, last_generated_at = ? \
             WHERE id = ?",
        )
        .bind(total_tracks)
        .bind(total_duration.unwrap_or(0))
        .bind(chrono::Utc::now().timestamp())
        .bind(playlist_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(appended)
    }

    /// Overwrite playlist aggregates
    pub async fn update_aggregates(
        playlist_id: i64,
        total_tracks: i32,
        total_duration: i32,
    ) -> Result<()> {
        let engine = DbEngine::get()?;
        let pool = engine.pool();

        sqlx::query("UPDATE playlist SET total_tracks = ?, total_duration = ? WHERE id = ?")
            .bind(total_tracks)
            .bind(total_duration)
            .bind(playlist_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Set the cover URL (best-effort cover generation callback)
    pub async fn set_cover_url(playlist_id: i64, cover_url: &str) -> Result<()> {
        let engine = DbEngine::get()?;
        let pool = engine.pool();

        sqlx::query("UPDATE playlist SET cover_url = ? WHERE id = ?")
            .bind(cover_url)
            .bind(playlist_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tables::TrackTable;
    use crate::models::{ArtistRef, Track};

    // Unpublished tracks: present in the catalog tables, invisible to the
    // candidate pools other tests expect to stay empty.
    fn catalog_track(title: &str, duration: i32) -> Track {
        let mut t = Track::new();
        t.title = title.to_string();
        t.duration = duration;
        t.artists = vec![ArtistRef::new(1, "Tulus".to_string(), true)];
        t.is_active = false;
        t
    }

    #[tokio::test]
    async fn test_append_tracks_extends_tail_and_recomputes_aggregates() {
        crate::db::setup_test_db().await;

        let a = TrackTable::insert(&catalog_track("a", 100)).await.unwrap();
        let b = TrackTable::insert(&catalog_track("b", 150)).await.unwrap();
        let c = TrackTable::insert(&catalog_track("c", 200)).await.unwrap();
        let d = TrackTable::insert(&catalog_track("d", 250)).await.unwrap();

        let mut playlist = Playlist::new(7, "evening".to_string());
        playlist.total_tracks = 2;
        playlist.total_duration = 250;
        playlist.tracks = vec![PlaylistTrack::new(a, 1), PlaylistTrack::new(b, 2)];
        let id = PlaylistTable::insert(&playlist).await.unwrap();

        let appended = PlaylistTable::append_tracks(id, &[c, d]).await.unwrap();
        assert_eq!(
            appended,
            vec![PlaylistTrack::new(c, 3), PlaylistTrack::new(d, 4)]
        );

        // aggregates must equal the stored link set, not old + delta math
        let reloaded = PlaylistTable::get_by_id(id).await.unwrap().unwrap();
        assert_eq!(reloaded.total_tracks, 4);
        assert_eq!(reloaded.total_duration, 100 + 150 + 200 + 250);
        assert_eq!(
            reloaded.tracks.iter().map(|t| t.position).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert!(reloaded.last_generated_at.is_some());
    }
}
