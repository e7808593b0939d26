//! Playlist model

use serde::{Deserialize, Serialize};

use super::enums::{PlaylistKind, Privacy};

/// An ordered track reference inside a playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    pub track_id: i64,
    /// Position within the playlist, starting at 1
    pub position: i32,
}

impl PlaylistTrack {
    pub fn new(track_id: i64, position: i32) -> Self {
        Self { track_id, position }
    }
}

/// A playlist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    /// Database ID
    pub id: i64,
    /// Owner user ID
    pub user_id: i64,
    /// Playlist name
    pub name: String,
    /// Playlist description
    #[serde(default)]
    pub description: String,
    /// Cover image URL (nullable)
    #[serde(default)]
    pub cover_url: Option<String>,
    /// Privacy setting
    #[serde(default)]
    pub privacy: Privacy,
    /// Playlist kind
    #[serde(default)]
    pub kind: PlaylistKind,
    /// Whether this playlist was produced by the AI pipeline
    #[serde(default)]
    pub is_ai_generated: bool,
    /// Track count (must equal tracks.len())
    #[serde(default)]
    pub total_tracks: i32,
    /// Total duration in seconds (must equal the sum of track durations)
    #[serde(default)]
    pub total_duration: i32,
    /// Last generation timestamp (Unix, nullable)
    #[serde(default)]
    pub last_generated_at: Option<i64>,
    /// Ordered track references
    #[serde(default)]
    pub tracks: Vec<PlaylistTrack>,
}

impl Playlist {
    /// Create a new empty playlist
    pub fn new(user_id: i64, name: String) -> Self {
        Self {
            id: 0,
            user_id,
            name,
            description: String::new(),
            cover_url: None,
            privacy: Privacy::default(),
            kind: PlaylistKind::default(),
            is_ai_generated: false,
            total_tracks: 0,
            total_duration: 0,
            last_generated_at: None,
            tracks: Vec::new(),
        }
    }

    /// Position after the current last track (1 for an empty playlist)
    pub fn next_position(&self) -> i32 {
        self.tracks.iter().map(|t| t.position).max().unwrap_or(0) + 1
    }

    /// Track IDs in playlist order
    pub fn track_ids(&self) -> Vec<i64> {
        let mut refs = self.tracks.clone();
        refs.sort_by_key(|t| t.position);
        refs.into_iter().map(|t| t.track_id).collect()
    }
}

impl PartialEq for Playlist {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Playlist {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_position() {
        let mut playlist = Playlist::new(1, "test".to_string());
        assert_eq!(playlist.next_position(), 1);

        playlist.tracks = vec![PlaylistTrack::new(10, 1), PlaylistTrack::new(11, 2)];
        assert_eq!(playlist.next_position(), 3);
    }

    #[test]
    fn test_track_ids_ordered() {
        let mut playlist = Playlist::new(1, "test".to_string());
        playlist.tracks = vec![
            PlaylistTrack::new(30, 3),
            PlaylistTrack::new(10, 1),
            PlaylistTrack::new(20, 2),
        ];
        assert_eq!(playlist.track_ids(), vec![10, 20, 30]);
    }
}
