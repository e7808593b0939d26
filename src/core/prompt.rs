//! Prompt composer
//!
//! Builds the model instruction text for each generation mode. Every prompt
//! embeds the serialized candidate universe, pins the model to the listed IDs,
//! inlines the exact JSON schema the response must match, and demands that the
//! response be nothing but that JSON object. Administrator guidance, when
//! configured, is prepended as a preamble the model must follow first.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::candidates::{CandidateTrack, CandidateUniverse};

/// Matches administrator guidance that restricts recommendations to
/// artist similarity alone, which switches history mode to artist-only.
static ARTIST_ONLY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:artist[-\s]?only|artist\s+similarity\s+only|only\s+(?:recommend|suggest|pick)\s+(?:tracks|songs)?\s*(?:by|from)\s+(?:the\s+)?(?:same|history|listened)\s+artists?)\b",
    )
    .expect("artist-only pattern must compile")
});

/// True when the admin guidance demands artist-similarity-only recommendations
pub fn is_artist_only_guidance(guidance: &str) -> bool {
    ARTIST_ONLY_PATTERN.is_match(guidance)
}

/// Composes per-mode model instructions
pub struct PromptComposer {
    guidance: Option<String>,
}

impl PromptComposer {
    pub fn new(guidance: Option<String>) -> Self {
        let guidance = guidance.filter(|g| !g.trim().is_empty());
        Self { guidance }
    }

    /// Free-text playlist creation
    pub fn free_text(
        &self,
        user_prompt: &str,
        universe: &CandidateUniverse,
        requested_count: usize,
    ) -> String {
        let mut out = String::new();
        self.push_guidance(&mut out);

        out.push_str(
            "You are a music curator for a streaming service. Build a playlist that \
             matches the listener request below, selecting ONLY from the candidate \
             tracks listed. Never invent, alter, or guess track ids: every id you \
             return must appear in the candidate list.\n\n",
        );
        out.push_str(&format!("Listener request: \"{}\"\n\n", user_prompt));
        out.push_str(&format!(
            "Select up to {} tracks, ordered from best match to weakest.\n",
            requested_count
        ));
        out.push_str(
            "If nothing in the list fits the request, return an empty trackIds array \
             and use playlistName and playlistDescription to briefly explain that no \
             matching tracks were found.\n\n",
        );
        out.push_str(&schema_block(
            r#"{"trackIds": [<number>, ...], "playlistName": "<string>", "playlistDescription": "<string>"}"#,
        ));
        out.push_str("\nCandidate tracks:\n");
        out.push_str(&universe.serialize_for_prompt());
        out
    }

    /// Suggestion-addition to an existing playlist
    pub fn suggestion(
        &self,
        user_prompt: &str,
        current_tracks: &[CandidateTrack],
        pool: &CandidateUniverse,
        default_count: usize,
        max_count: usize,
    ) -> String {
        let mut out = String::new();
        self.push_guidance(&mut out);

        out.push_str(
            "You are a music curator for a streaming service. The listener wants to \
             extend an existing playlist. Suggest additional tracks selecting ONLY \
             from the candidate list. Never invent track ids.\n\n",
        );
        out.push_str(&format!("Listener request: \"{}\"\n\n", user_prompt));
        out.push_str(&format!(
            "Infer how many tracks the listener asked for from their request. \
             When the request does not state a number, suggest {} tracks. \
             Never suggest more than {} tracks.\n\n",
            default_count, max_count
        ));
        out.push_str(&schema_block(r#"{"suggestedTrackIds": [<number>, ...]}"#));
        out.push_str("\nTracks already in the playlist (do NOT re-suggest any of these):\n");
        for track in current_tracks {
            out.push_str(&track.serialize_line());
            out.push('\n');
        }
        out.push_str("\nCandidate tracks:\n");
        out.push_str(&pool.serialize_for_prompt());
        out
    }

    /// History-based recommendation
    pub fn history(
        &self,
        history_tracks: &[CandidateTrack],
        universe: &CandidateUniverse,
        requested_count: usize,
    ) -> String {
        let mut out = String::new();
        self.push_guidance(&mut out);

        out.push_str(
            "You are a music recommendation engine. Infer the listener's taste from \
             their recent listening history below (genres, moods, tempo, energy), \
             then recommend NEW tracks they have not heard, selecting ONLY from the \
             candidate list. Never invent track ids and never return a track that \
             appears in the history.\n\n",
        );
        out.push_str(&format!(
            "Return exactly {} track ids, ordered from strongest to weakest match, \
             with a one-sentence explanation of the inferred taste.\n\n",
            requested_count
        ));
        out.push_str(&schema_block(
            r#"{"trackIds": [<number>, ...], "explanation": "<string>"}"#,
        ));
        out.push_str("\nRecent listening history:\n");
        for track in history_tracks {
            out.push_str(&track.serialize_line());
            out.push('\n');
        }
        out.push_str("\nCandidate tracks:\n");
        out.push_str(&universe.serialize_for_prompt());
        out
    }

    /// Artist-only recommendation: the candidate pool is already narrowed to
    /// tracks by the history artists.
    pub fn artist_only(
        &self,
        history_tracks: &[CandidateTrack],
        narrowed_pool: &CandidateUniverse,
        requested_count: usize,
    ) -> String {
        let mut out = String::new();
        self.push_guidance(&mut out);

        out.push_str(
            "You are a music recommendation engine. The listener wants more music \
             from the artists they already listen to, and nothing else. The candidate \
             list below contains only tracks by those artists. Pick a diverse spread \
             across the artists, selecting ONLY from the candidate list. Never invent \
             track ids and never return a track from the listening history.\n\n",
        );
        out.push_str(&format!(
            "Return exactly {} track ids, ordered from strongest to weakest match.\n\n",
            requested_count
        ));
        out.push_str(&schema_block(
            r#"{"trackIds": [<number>, ...], "explanation": "<string>"}"#,
        ));
        out.push_str("\nRecent listening history:\n");
        for track in history_tracks {
            out.push_str(&track.serialize_line());
            out.push('\n');
        }
        out.push_str("\nCandidate tracks:\n");
        out.push_str(&narrowed_pool.serialize_for_prompt());
        out
    }

    /// Seed-based "popular mix"
    pub fn seed(&self, universe: &CandidateUniverse, requested_count: usize) -> String {
        let mut out = String::new();
        self.push_guidance(&mut out);

        out.push_str(
            "You are a music curator assembling a \"popular mix\". Pick a diverse \
             selection from exactly the seed tracks listed below: vary artists, \
             genres, and energy rather than stacking one artist. Select ONLY from \
             the listed ids, never invent ids.\n\n",
        );
        out.push_str(&format!(
            "Return exactly {} track ids.\n\n",
            requested_count
        ));
        out.push_str(&schema_block(r#"{"trackIds": [<number>, ...]}"#));
        out.push_str("\nSeed tracks:\n");
        out.push_str(&universe.serialize_for_prompt());
        out
    }

    fn push_guidance(&self, out: &mut String) {
        if let Some(ref guidance) = self.guidance {
            out.push_str(
                "Follow these standing instructions from the service administrator \
                 before applying anything else:\n",
            );
            out.push_str(guidance);
            out.push_str("\n\n");
        }
    }
}

/// Shared response-format contract appended to every prompt
fn schema_block(schema: &str) -> String {
    format!(
        "Respond with a single JSON object and nothing else: no prose, no markdown, \
         no code fences. The object must match this schema exactly:\n{}\n",
        schema
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::candidates::CandidateTrack;

    fn candidate(id: i64, title: &str, artist: &str) -> CandidateTrack {
        CandidateTrack {
            id,
            title: title.to_string(),
            artist_name: artist.to_string(),
            artist_ids: vec![id * 100],
            genres: vec![],
            mood: None,
            tempo: None,
            key: None,
            scale: None,
            danceability: None,
            energy: None,
        }
    }

    fn universe() -> CandidateUniverse {
        CandidateUniverse::new(vec![candidate(1, "a", "x"), candidate(2, "b", "y")])
    }

    #[test]
    fn test_free_text_embeds_universe_and_schema() {
        let composer = PromptComposer::new(None);
        let prompt = composer.free_text("rainy day songs", &universe(), 10);

        assert!(prompt.contains("id=1"));
        assert!(prompt.contains("id=2"));
        assert!(prompt.contains("\"trackIds\""));
        assert!(prompt.contains("playlistName"));
        assert!(prompt.contains("rainy day songs"));
        assert!(prompt.contains("empty trackIds array"));
    }

    #[test]
    fn test_guidance_is_prepended() {
        let composer = PromptComposer::new(Some("Prefer local artists.".to_string()));
        let prompt = composer.seed(&universe(), 5);
        let guidance_pos = prompt.find("Prefer local artists.").unwrap();
        let body_pos = prompt.find("popular mix").unwrap();
        assert!(guidance_pos < body_pos);
    }

    #[test]
    fn test_blank_guidance_ignored() {
        let composer = PromptComposer::new(Some("   ".to_string()));
        let prompt = composer.seed(&universe(), 5);
        assert!(!prompt.contains("standing instructions"));
    }

    #[test]
    fn test_suggestion_marks_current_tracks() {
        let composer = PromptComposer::new(None);
        let current = vec![candidate(9, "old", "z")];
        let prompt = composer.suggestion("add 3 more", &current, &universe(), 5, 10);

        assert!(prompt.contains("do NOT re-suggest"));
        assert!(prompt.contains("id=9"));
        assert!(prompt.contains("suggestedTrackIds"));
    }

    #[test]
    fn test_history_requests_exact_count() {
        let composer = PromptComposer::new(None);
        let history = vec![candidate(5, "h", "w")];
        let prompt = composer.history(&history, &universe(), 7);
        assert!(prompt.contains("exactly 7 track ids"));
        assert!(prompt.contains("explanation"));
    }

    #[test]
    fn test_artist_only_guidance_pattern() {
        assert!(is_artist_only_guidance("artist-only recommendations"));
        assert!(is_artist_only_guidance("Use artist similarity only"));
        assert!(is_artist_only_guidance(
            "Only recommend tracks by the same artists"
        ));
        assert!(!is_artist_only_guidance("Prefer upbeat tracks"));
        assert!(!is_artist_only_guidance("Focus on new artists"));
    }
}
