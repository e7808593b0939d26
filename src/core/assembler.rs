//! Playlist assembler
//!
//! Turns a validated selection into a persisted playlist: resolves full track
//! rows in selection order, computes aggregate duration and count, fills in a
//! name/description when the model did not supply usable ones, and writes the
//! playlist with its ordered track links. Cover image generation is spawned
//! fire-and-forget; its failure never fails the playlist.

use anyhow::Context;
use chrono::Utc;
use tracing::warn;

use crate::core::error::PipelineError;
use crate::core::selector::ValidatedSelection;
use crate::db::tables::{PlaylistTable, TrackTable};
use crate::models::{Playlist, PlaylistKind, PlaylistTrack, Privacy, Track};
use crate::plugins::cover::CoverImageClient;

/// How many leading tracks feed the name/description synthesis
const SYNTHESIS_WINDOW: usize = 5;

/// Name and description for a playlist, either from the model or synthesized
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistTitle {
    pub name: String,
    pub description: String,
}

/// Resolve full track rows in selection order. IDs that no longer resolve
/// (deleted between validation and assembly) are skipped.
pub async fn resolve_tracks(selection: &ValidatedSelection) -> Result<Vec<Track>, PipelineError> {
    let fetched = TrackTable::find_by_ids(&selection.track_ids)
        .await
        .context("failed to resolve selected tracks")?;

    let by_id: std::collections::HashMap<i64, Track> =
        fetched.into_iter().map(|t| (t.id, t)).collect();

    Ok(selection
        .track_ids
        .iter()
        .filter_map(|id| by_id.get(id).cloned())
        .collect())
}

/// Pick a title from the model response, falling back to synthesis when the
/// model supplied nothing usable.
pub fn resolve_title(
    model_name: Option<&str>,
    model_description: Option<&str>,
    tracks: &[Track],
) -> PlaylistTitle {
    let synthesized = synthesize_title(tracks);

    let name = model_name
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or(synthesized.name);
    let description = model_description
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or(synthesized.description);

    PlaylistTitle { name, description }
}

/// Deterministic template title from the dominant artists among the first
/// few selected tracks.
pub fn synthesize_title(tracks: &[Track]) -> PlaylistTitle {
    let mut artists: Vec<String> = Vec::new();
    for track in tracks.iter().take(SYNTHESIS_WINDOW) {
        for artist in &track.artists {
            if !artists.contains(&artist.name) {
                artists.push(artist.name.clone());
            }
        }
    }

    match artists.as_slice() {
        [] => PlaylistTitle {
            name: "Recommended For You".to_string(),
            description: "Fresh picks based on your listening".to_string(),
        },
        [only] => PlaylistTitle {
            name: format!("{} Playlist", only),
            description: format!("With {}", only),
        },
        [first, rest @ ..] => PlaylistTitle {
            name: format!("{} Playlist", first),
            description: format!("With {}, {} and more...", first, rest[0]),
        },
    }
}

/// Ordered track refs with positions starting at `start`
pub fn track_refs_from(track_ids: &[i64], start: i32) -> Vec<PlaylistTrack> {
    track_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| PlaylistTrack::new(id, start + i as i32))
        .collect()
}

/// Create a new AI-generated playlist from resolved tracks.
pub async fn create_playlist(
    user_id: i64,
    kind: PlaylistKind,
    title: PlaylistTitle,
    tracks: &[Track],
) -> Result<Playlist, PipelineError> {
    let track_ids: Vec<i64> = tracks.iter().map(|t| t.id).collect();
    let total_duration: i32 = tracks.iter().map(|t| t.duration).sum();

    let mut playlist = Playlist::new(user_id, title.name);
    playlist.description = title.description;
    playlist.privacy = Privacy::Private;
    playlist.kind = kind;
    playlist.is_ai_generated = true;
    playlist.total_tracks = tracks.len() as i32;
    playlist.total_duration = total_duration;
    playlist.last_generated_at = Some(Utc::now().timestamp());
    playlist.tracks = track_refs_from(&track_ids, 1);

    let id = PlaylistTable::insert(&playlist)
        .await
        .context("failed to persist playlist")?;
    playlist.id = id;

    spawn_cover_generation(&playlist, tracks);

    Ok(playlist)
}

/// Append a validated selection to an existing playlist and return the
/// refreshed playlist. An empty selection is a no-op.
pub async fn append_to_playlist(
    playlist_id: i64,
    selection: &ValidatedSelection,
) -> Result<Playlist, PipelineError> {
    if !selection.is_empty() {
        PlaylistTable::append_tracks(playlist_id, &selection.track_ids)
            .await
            .context("failed to append playlist tracks")?;
    }

    PlaylistTable::get_by_id(playlist_id)
        .await
        .context("failed to reload playlist")?
        .ok_or(PipelineError::PlaylistNotFound(playlist_id))
}

/// Fire-and-forget cover image generation. Failure is logged, never raised;
/// the playlist keeps a NULL cover_url until the task succeeds.
fn spawn_cover_generation(playlist: &Playlist, tracks: &[Track]) {
    let Some(client) = CoverImageClient::from_config() else {
        return;
    };

    let playlist_id = playlist.id;
    let name = playlist.name.clone();
    let description = playlist.description.clone();
    let artists: Vec<String> = {
        let mut seen = Vec::new();
        for track in tracks.iter().take(SYNTHESIS_WINDOW) {
            for artist in &track.artists {
                if !seen.contains(&artist.name) {
                    seen.push(artist.name.clone());
                }
            }
        }
        seen
    };

    tokio::spawn(async move {
        match client.generate(&name, &description, &artists).await {
            Some(url) => {
                if let Err(e) = PlaylistTable::set_cover_url(playlist_id, &url).await {
                    warn!("failed to store cover url for playlist {}: {}", playlist_id, e);
                }
            }
            None => {
                warn!("cover generation yielded nothing for playlist {}", playlist_id);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtistRef;

    fn track(id: i64, artist: &str, duration: i32) -> Track {
        let mut t = Track::new();
        t.id = id;
        t.title = format!("t{}", id);
        t.duration = duration;
        t.artists = vec![ArtistRef::new(id * 10, artist.to_string(), true)];
        t
    }

    #[test]
    fn test_track_refs_start_at_one_for_new_playlists() {
        let refs = track_refs_from(&[7, 8, 9], 1);
        assert_eq!(refs[0], PlaylistTrack::new(7, 1));
        assert_eq!(refs[2], PlaylistTrack::new(9, 3));
    }

    #[test]
    fn test_track_refs_continue_from_tail() {
        // playlist tail at position 3, the two appended refs land at 4 and 5
        let refs = track_refs_from(&[40, 50], 4);
        assert_eq!(refs[0], PlaylistTrack::new(40, 4));
        assert_eq!(refs[1], PlaylistTrack::new(50, 5));
    }

    #[test]
    fn test_synthesize_title_single_artist() {
        let tracks = vec![track(1, "Tulus", 200), track(2, "Tulus", 180)];
        let title = synthesize_title(&tracks);
        assert_eq!(title.name, "Tulus Playlist");
        assert_eq!(title.description, "With Tulus");
    }

    #[test]
    fn test_synthesize_title_multiple_artists() {
        let tracks = vec![
            track(1, "Tulus", 200),
            track(2, "Nadin Amizah", 180),
            track(3, "Hindia", 210),
        ];
        let title = synthesize_title(&tracks);
        assert_eq!(title.name, "Tulus Playlist");
        assert_eq!(title.description, "With Tulus, Nadin Amizah and more...");
    }

    #[test]
    fn test_synthesize_title_empty() {
        let title = synthesize_title(&[]);
        assert_eq!(title.name, "Recommended For You");
    }

    #[test]
    fn test_resolve_title_prefers_model_values() {
        let tracks = vec![track(1, "Tulus", 200)];
        let title = resolve_title(Some("Rainy Days"), Some("For the gloom"), &tracks);
        assert_eq!(title.name, "Rainy Days");
        assert_eq!(title.description, "For the gloom");
    }

    #[test]
    fn test_resolve_title_falls_back_per_field() {
        let tracks = vec![track(1, "Tulus", 200)];
        let title = resolve_title(Some("  "), None, &tracks);
        assert_eq!(title.name, "Tulus Playlist");
        assert_eq!(title.description, "With Tulus");
    }
}
