//! Candidate pool builder
//!
//! Builds the bounded, ranked set of tracks a single generation request is
//! allowed to select from, and serializes each track into one compact
//! attribute line for prompt embedding. The resulting universe is the only
//! legal output space for the request; anything the model returns outside it
//! is discarded downstream.

use std::collections::HashSet;

use anyhow::Result;

use crate::db::tables::TrackTable;
use crate::models::Track;

/// Immutable per-request snapshot of a track's prompt-relevant attributes
#[derive(Debug, Clone)]
pub struct CandidateTrack {
    pub id: i64,
    pub title: String,
    pub artist_name: String,
    /// Artist IDs, kept for artist-only narrowing
    pub artist_ids: Vec<i64>,
    pub genres: Vec<String>,
    pub mood: Option<String>,
    pub tempo: Option<f32>,
    pub key: Option<String>,
    pub scale: Option<String>,
    pub danceability: Option<f32>,
    pub energy: Option<f32>,
}

impl CandidateTrack {
    pub fn from_track(track: &Track) -> Self {
        Self {
            id: track.id,
            title: track.title.clone(),
            artist_name: track.artist(),
            artist_ids: track.artist_ids(),
            genres: track.genres.clone(),
            mood: track.mood.clone(),
            tempo: track.tempo,
            key: track.key.clone(),
            scale: track.scale.clone(),
            danceability: track.danceability,
            energy: track.energy,
        }
    }

    /// Serialize into one descriptive line for the model prompt
    pub fn serialize_line(&self) -> String {
        let mut line = format!(
            "id={} | title=\"{}\" | artist=\"{}\"",
            self.id, self.title, self.artist_name
        );

        if !self.genres.is_empty() {
            line.push_str(&format!(" | genres={}", self.genres.join(",")));
        }
        if let Some(ref mood) = self.mood {
            line.push_str(&format!(" | mood={}", mood));
        }
        if let Some(tempo) = self.tempo {
            line.push_str(&format!(" | tempo={:.0}bpm", tempo));
        }
        if let Some(ref key) = self.key {
            match self.scale {
                Some(ref scale) => line.push_str(&format!(" | key={} {}", key, scale)),
                None => line.push_str(&format!(" | key={}", key)),
            }
        }
        if let Some(danceability) = self.danceability {
            line.push_str(&format!(" | danceability={:.2}", danceability));
        }
        if let Some(energy) = self.energy {
            line.push_str(&format!(" | energy={:.2}", energy));
        }

        line
    }
}

/// The closed set of track IDs a generation request may select from.
/// Created per request and discarded after assembly.
#[derive(Debug, Clone, Default)]
pub struct CandidateUniverse {
    tracks: Vec<CandidateTrack>,
    ids: HashSet<i64>,
}

impl CandidateUniverse {
    pub fn new(tracks: Vec<CandidateTrack>) -> Self {
        let ids = tracks.iter().map(|t| t.id).collect();
        Self { tracks, ids }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Tracks in ranked order
    pub fn tracks(&self) -> &[CandidateTrack] {
        &self.tracks
    }

    /// One serialized line per candidate, prompt-ready
    pub fn serialize_for_prompt(&self) -> String {
        self.tracks
            .iter()
            .map(|t| t.serialize_line())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Narrow to tracks by the given artists, excluding specific track IDs.
    /// Used by artist-only mode: candidates come from the history artists
    /// but never from the history tracks themselves.
    pub fn narrow_to_artists(&self, artist_ids: &HashSet<i64>, exclude: &HashSet<i64>) -> Self {
        let tracks: Vec<CandidateTrack> = self
            .tracks
            .iter()
            .filter(|t| {
                !exclude.contains(&t.id) && t.artist_ids.iter().any(|a| artist_ids.contains(a))
            })
            .cloned()
            .collect();
        Self::new(tracks)
    }

    /// Keep only candidates not present in the given set
    pub fn without(&self, exclude: &HashSet<i64>) -> Self {
        let tracks: Vec<CandidateTrack> = self
            .tracks
            .iter()
            .filter(|t| !exclude.contains(&t.id))
            .cloned()
            .collect();
        Self::new(tracks)
    }
}

/// Builds candidate universes from the track store
pub struct PoolBuilder;

impl PoolBuilder {
    /// Active tracks ranked by popularity then recency. Used by free-text
    /// and suggestion modes, where inactive artists are still playable.
    pub async fn active_pool(limit: usize) -> Result<CandidateUniverse> {
        let tracks = TrackTable::find_active(limit).await?;
        Ok(Self::snapshot(tracks, false))
    }

    /// Active tracks whose artists are all active. History and seed modes
    /// only recommend tracks with published artists.
    pub async fn active_pool_strict(limit: usize) -> Result<CandidateUniverse> {
        let tracks = TrackTable::find_active(limit).await?;
        Ok(Self::snapshot(tracks, true))
    }

    /// Seed pool: the caller-supplied track IDs when present, otherwise the
    /// top-played tracks. Ordering follows the seed list where given.
    pub async fn seed_pool(seed_ids: &[i64], limit: usize) -> Result<CandidateUniverse> {
        if seed_ids.is_empty() {
            let tracks = TrackTable::top_played(limit).await?;
            return Ok(Self::snapshot(tracks, true));
        }

        let fetched = TrackTable::find_by_ids(seed_ids).await?;
        let by_id: std::collections::HashMap<i64, Track> =
            fetched.into_iter().map(|t| (t.id, t)).collect();

        let tracks: Vec<Track> = seed_ids
            .iter()
            .filter_map(|id| by_id.get(id).cloned())
            .collect();

        Ok(Self::snapshot(tracks, true))
    }

    /// Top-played pool for the history emergency fallback
    pub async fn top_played_pool(limit: usize) -> Result<CandidateUniverse> {
        let tracks = TrackTable::top_played(limit).await?;
        Ok(Self::snapshot(tracks, true))
    }

    fn snapshot(tracks: Vec<Track>, require_active_artists: bool) -> CandidateUniverse {
        let candidates: Vec<CandidateTrack> = tracks
            .iter()
            .filter(|t| t.is_active && (!require_active_artists || t.all_artists_active()))
            .map(CandidateTrack::from_track)
            .collect();
        CandidateUniverse::new(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtistRef;

    fn track(id: i64, title: &str, artist: &str) -> Track {
        let mut t = Track::new();
        t.id = id;
        t.title = title.to_string();
        t.artists = vec![ArtistRef::new(id * 100, artist.to_string(), true)];
        t
    }

    #[test]
    fn test_serialize_line_minimal() {
        let t = track(7, "Bertaut", "Nadin Amizah");
        let line = CandidateTrack::from_track(&t).serialize_line();
        assert_eq!(line, "id=7 | title=\"Bertaut\" | artist=\"Nadin Amizah\"");
    }

    #[test]
    fn test_serialize_line_full() {
        let mut t = track(7, "Bertaut", "Nadin Amizah");
        t.genres = vec!["pop".to_string(), "folk".to_string()];
        t.mood = Some("melancholic".to_string());
        t.tempo = Some(82.4);
        t.key = Some("F".to_string());
        t.scale = Some("minor".to_string());
        t.danceability = Some(0.41);
        t.energy = Some(0.3);

        let line = CandidateTrack::from_track(&t).serialize_line();
        assert!(line.contains("genres=pop,folk"));
        assert!(line.contains("mood=melancholic"));
        assert!(line.contains("tempo=82bpm"));
        assert!(line.contains("key=F minor"));
        assert!(line.contains("danceability=0.41"));
        assert!(line.contains("energy=0.30"));
    }

    #[test]
    fn test_universe_membership() {
        let tracks = vec![
            CandidateTrack::from_track(&track(1, "a", "x")),
            CandidateTrack::from_track(&track(2, "b", "y")),
        ];
        let universe = CandidateUniverse::new(tracks);

        assert_eq!(universe.len(), 2);
        assert!(universe.contains(1));
        assert!(!universe.contains(999));
    }

    #[test]
    fn test_narrow_to_artists_excludes_history_tracks() {
        let t1 = track(1, "a", "x"); // artist 100
        let t2 = track(2, "b", "y"); // artist 200
        let mut t3 = track(3, "c", "x");
        t3.artists = vec![ArtistRef::new(100, "x".to_string(), true)];

        let universe = CandidateUniverse::new(
            [&t1, &t2, &t3]
                .iter()
                .map(|t| CandidateTrack::from_track(t))
                .collect(),
        );

        let artist_ids: HashSet<i64> = [100].into_iter().collect();
        let history: HashSet<i64> = [1].into_iter().collect();

        let narrowed = universe.narrow_to_artists(&artist_ids, &history);
        assert_eq!(narrowed.len(), 1);
        assert!(narrowed.contains(3));
        assert!(!narrowed.contains(1));
        assert!(!narrowed.contains(2));
    }

    #[test]
    fn test_snapshot_filters_inactive() {
        let mut inactive = track(1, "a", "x");
        inactive.is_active = false;
        let mut hidden_artist = track(2, "b", "y");
        hidden_artist.artists[0].is_active = false;
        let active = track(3, "c", "z");

        let strict = PoolBuilder::snapshot(vec![inactive.clone(), hidden_artist.clone(), active.clone()], true);
        assert_eq!(strict.len(), 1);
        assert!(strict.contains(3));

        // lenient pools keep tracks whose artist is unpublished
        let lenient = PoolBuilder::snapshot(vec![inactive, hidden_artist, active], false);
        assert_eq!(lenient.len(), 2);
    }
}
