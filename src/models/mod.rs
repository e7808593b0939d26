//! Data models for Harmonia
//!
//! This module contains the core data structures used throughout the application.

mod enums;
mod playlist;
mod track;

pub use enums::{PlaylistKind, Privacy};
pub use playlist::{Playlist, PlaylistTrack};
pub use track::Track;

/// Reference to an artist (used in track artist lists)
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ArtistRef {
    pub id: i64,
    pub name: String,
    /// Whether the artist is published
    #[serde(default)]
    pub is_active: bool,
}

impl ArtistRef {
    pub fn new(id: i64, name: String, is_active: bool) -> Self {
        Self {
            id,
            name,
            is_active,
        }
    }
}
