//! Error taxonomy for the generation pipeline
//!
//! Every stage raises a typed error. The HTTP layer maps these onto status
//! codes; user-facing messages stay short and non-technical while internals
//! are logged only.

use thiserror::Error;

/// Errors raised by the playlist generation pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Gatekeeper rejection, user-correctable
    #[error("{0}")]
    InvalidPrompt(String),

    /// Model not configured, operator-fixable
    #[error("Playlist generation is not available right now")]
    ServiceUnavailable,

    /// Model refused the content, carries the block reason
    #[error("The request was blocked by content safety filters")]
    SafetyBlocked { reason: String },

    /// Catalog has nothing eligible
    #[error("No eligible tracks available in the catalog")]
    EmptyCandidatePool,

    /// Model output unusable after all parsing fallbacks
    #[error("Could not understand the generated response, please try again")]
    ParseFailure,

    /// Transport or model error
    #[error("The music assistant is unavailable, please try again")]
    UpstreamFailure(#[source] anyhow::Error),

    /// Suggestion mode against an unknown playlist
    #[error("Playlist not found")]
    PlaylistNotFound(i64),

    /// Storage failure
    #[error("Something went wrong")]
    Database(#[from] anyhow::Error),
}

impl PipelineError {
    /// Stable machine-readable tag, used in API bodies and logs
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidPrompt(_) => "invalid_prompt",
            PipelineError::ServiceUnavailable => "service_unavailable",
            PipelineError::SafetyBlocked { .. } => "safety_blocked",
            PipelineError::EmptyCandidatePool => "empty_candidate_pool",
            PipelineError::ParseFailure => "parse_failure",
            PipelineError::UpstreamFailure(_) => "upstream_failure",
            PipelineError::PlaylistNotFound(_) => "playlist_not_found",
            PipelineError::Database(_) => "internal",
        }
    }

    /// Errors where a caller retry can plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::ParseFailure | PipelineError::UpstreamFailure(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_hide_internals() {
        let err = PipelineError::UpstreamFailure(anyhow::anyhow!("connection reset by peer"));
        assert!(!err.to_string().contains("connection reset"));

        let err = PipelineError::SafetyBlocked {
            reason: "HARM_CATEGORY_HARASSMENT".to_string(),
        };
        assert!(!err.to_string().contains("HARM_CATEGORY"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(PipelineError::ParseFailure.is_transient());
        assert!(!PipelineError::ServiceUnavailable.is_transient());
        assert!(!PipelineError::InvalidPrompt("x".into()).is_transient());
    }
}
