//! REST API routes for Harmonia

pub mod generate;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use tracing::error;

use crate::core::PipelineError;

/// Configure all API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .service(web::scope("/ai").configure(generate::configure));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

impl ResponseError for PipelineError {
    fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::InvalidPrompt(_) => StatusCode::BAD_REQUEST,
            PipelineError::SafetyBlocked { .. } => StatusCode::BAD_REQUEST,
            PipelineError::PlaylistNotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::EmptyCandidatePool => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::ParseFailure => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::UpstreamFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // internals are logged here; the response body stays non-technical
        match self {
            PipelineError::UpstreamFailure(source) => {
                error!("upstream failure: {:#}", source);
            }
            PipelineError::Database(source) => {
                error!("database failure: {:#}", source);
            }
            PipelineError::SafetyBlocked { reason } => {
                error!("model safety block: {}", reason);
            }
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            PipelineError::InvalidPrompt("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PipelineError::ServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            PipelineError::PlaylistNotFound(3).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PipelineError::SafetyBlocked {
                reason: "SAFETY".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PipelineError::ParseFailure.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
