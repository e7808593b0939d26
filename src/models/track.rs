//! Track model

use serde::{Deserialize, Serialize};

use super::ArtistRef;

/// A catalog track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Database ID
    pub id: i64,
    /// Track title
    pub title: String,
    /// Track artists
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    /// Genres
    #[serde(default)]
    pub genres: Vec<String>,
    /// Editorial mood label (nullable)
    #[serde(default)]
    pub mood: Option<String>,
    /// Tempo in BPM (nullable)
    #[serde(default)]
    pub tempo: Option<f32>,
    /// Musical key, e.g. "C#" (nullable)
    #[serde(default)]
    pub key: Option<String>,
    /// Scale, "major" or "minor" (nullable)
    #[serde(default)]
    pub scale: Option<String>,
    /// Danceability score 0.0-1.0 (nullable)
    #[serde(default)]
    pub danceability: Option<f32>,
    /// Energy score 0.0-1.0 (nullable)
    #[serde(default)]
    pub energy: Option<f32>,
    /// Duration in seconds
    pub duration: i32,
    /// Play count
    #[serde(default)]
    pub playcount: i32,
    /// When the track was added to the catalog (Unix timestamp)
    #[serde(default)]
    pub date_added: i64,
    /// Whether the track is published and streamable
    #[serde(default)]
    pub is_active: bool,
}

impl Track {
    /// Create a new track with default values
    pub fn new() -> Self {
        Self {
            id: 0,
            title: String::new(),
            artists: Vec::new(),
            genres: Vec::new(),
            mood: None,
            tempo: None,
            key: None,
            scale: None,
            danceability: None,
            energy: None,
            duration: 0,
            playcount: 0,
            date_added: 0,
            is_active: true,
        }
    }

    /// Get artist as a comma-separated string
    pub fn artist(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Get genre as a comma-separated string
    pub fn genre(&self) -> String {
        self.genres.join(", ")
    }

    /// All artists on the track are published
    pub fn all_artists_active(&self) -> bool {
        self.artists.iter().all(|a| a.is_active)
    }

    /// Artist IDs on this track
    pub fn artist_ids(&self) -> Vec<i64> {
        self.artists.iter().map(|a| a.id).collect()
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtistRef;

    #[test]
    fn test_artist_string() {
        let mut track = Track::new();
        track.artists = vec![
            ArtistRef::new(1, "Nadin Amizah".to_string(), true),
            ArtistRef::new(2, "Tulus".to_string(), true),
        ];
        assert_eq!(track.artist(), "Nadin Amizah, Tulus");
    }

    #[test]
    fn test_all_artists_active() {
        let mut track = Track::new();
        track.artists = vec![
            ArtistRef::new(1, "A".to_string(), true),
            ArtistRef::new(2, "B".to_string(), false),
        ];
        assert!(!track.all_artists_active());

        track.artists[1].is_active = true;
        assert!(track.all_artists_active());
    }
}
