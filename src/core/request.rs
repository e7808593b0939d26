//! Generation request types
//!
//! The five generation modes are a closed enum, each variant carrying only
//! the fields that mode needs. This removes the "which optional field is
//! valid here" class of bugs that a single flat request struct invites.

use crate::config::MAX_SUGGESTIONS;
use crate::core::error::PipelineError;

/// How a playlist generation request was triggered
#[derive(Debug, Clone)]
pub enum GenerationMode {
    /// Build a new playlist from a free-text description
    FreeText { prompt: String },
    /// Append suggestions to an existing playlist
    Suggestion { playlist_id: i64, prompt: String },
    /// Recommend from the user's listening history
    History,
    /// History specialization: recommend only from the history artists
    ArtistOnly,
    /// "Popular mix" anchored on a seed track set
    Seed { seed_ids: Vec<i64> },
}

impl GenerationMode {
    pub fn name(&self) -> &'static str {
        match self {
            GenerationMode::FreeText { .. } => "free_text",
            GenerationMode::Suggestion { .. } => "suggestion",
            GenerationMode::History => "history",
            GenerationMode::ArtistOnly => "artist_only",
            GenerationMode::Seed { .. } => "seed",
        }
    }
}

/// One validated pipeline invocation
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub user_id: i64,
    pub mode: GenerationMode,
    pub requested_count: usize,
}

impl GenerationRequest {
    pub fn new(
        user_id: i64,
        mode: GenerationMode,
        requested_count: usize,
    ) -> Result<Self, PipelineError> {
        if requested_count == 0 {
            return Err(PipelineError::InvalidPrompt(
                "Requested track count must be at least 1".to_string(),
            ));
        }

        if matches!(mode, GenerationMode::Suggestion { .. }) && requested_count > MAX_SUGGESTIONS {
            return Err(PipelineError::InvalidPrompt(format!(
                "At most {} suggestions can be added at once",
                MAX_SUGGESTIONS
            )));
        }

        Ok(Self {
            user_id,
            mode,
            requested_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_count() {
        let result = GenerationRequest::new(1, GenerationMode::History, 0);
        assert!(matches!(result, Err(PipelineError::InvalidPrompt(_))));
    }

    #[test]
    fn test_suggestion_count_cap() {
        let mode = GenerationMode::Suggestion {
            playlist_id: 1,
            prompt: "more like this".to_string(),
        };
        assert!(GenerationRequest::new(1, mode.clone(), MAX_SUGGESTIONS).is_ok());
        assert!(GenerationRequest::new(1, mode, MAX_SUGGESTIONS + 1).is_err());
    }

    #[test]
    fn test_other_modes_allow_large_counts() {
        assert!(GenerationRequest::new(1, GenerationMode::History, 50).is_ok());
    }
}
