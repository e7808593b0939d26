//! Shared enums

use serde::{Deserialize, Serialize};

/// Playlist visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Private,
    Public,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Private => "private",
            Privacy::Public => "public",
        }
    }

    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "public" => Privacy::Public,
            _ => Privacy::Private,
        }
    }
}

/// Playlist kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistKind {
    #[default]
    User,
    Recommendation,
    Mix,
}

impl PlaylistKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaylistKind::User => "user",
            PlaylistKind::Recommendation => "recommendation",
            PlaylistKind::Mix => "mix",
        }
    }

    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "recommendation" => PlaylistKind::Recommendation,
            "mix" => PlaylistKind::Mix,
            _ => PlaylistKind::User,
        }
    }
}
