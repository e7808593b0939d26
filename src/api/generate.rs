//! AI generation API routes

use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;

use crate::config::{DEFAULT_PLAYLIST_LENGTH, MAX_SUGGESTIONS};
use crate::core::{GenerationMode, GenerationRequest, Pipeline, PipelineError};
use crate::db::tables::{PlaylistTable, TrackTable};
use crate::models::Playlist;

#[derive(Debug, Deserialize)]
pub struct GeneratePlaylistBody {
    pub userid: i64,
    pub prompt: String,
    #[serde(default = "default_playlist_count")]
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct SuggestBody {
    pub userid: i64,
    pub prompt: String,
    /// Optional hard cap. When absent, the model infers the count from the
    /// prompt and only the global suggestion limit applies.
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendBody {
    pub userid: i64,
    #[serde(default = "default_playlist_count")]
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct MixBody {
    pub userid: i64,
    #[serde(default)]
    pub seed_ids: Vec<i64>,
    #[serde(default = "default_playlist_count")]
    pub count: usize,
}

fn default_playlist_count() -> usize {
    DEFAULT_PLAYLIST_LENGTH
}

/// The count the validator truncates suggestions at. A caller-supplied count
/// wins; otherwise the prompt already instructs the model to infer the count
/// from the listener's words, so only the global limit is enforced here.
fn suggestion_cap(count: Option<usize>) -> usize {
    count.unwrap_or(MAX_SUGGESTIONS)
}

/// POST /ai/playlist - create a playlist from a free-text request
#[post("/playlist")]
pub async fn generate_playlist(
    body: web::Json<GeneratePlaylistBody>,
) -> Result<HttpResponse, PipelineError> {
    let request = GenerationRequest::new(
        body.userid,
        GenerationMode::FreeText {
            prompt: body.prompt.clone(),
        },
        body.count,
    )?;

    let playlist = Pipeline::new().generate(request).await?;
    playlist_response(playlist).await
}

/// POST /ai/playlist/{playlistid}/suggest - append suggestions to a playlist
#[post("/playlist/{playlistid}/suggest")]
pub async fn suggest_tracks(
    path: web::Path<i64>,
    body: web::Json<SuggestBody>,
) -> Result<HttpResponse, PipelineError> {
    let request = GenerationRequest::new(
        body.userid,
        GenerationMode::Suggestion {
            playlist_id: path.into_inner(),
            prompt: body.prompt.clone(),
        },
        suggestion_cap(body.count),
    )?;

    let playlist = Pipeline::new().generate(request).await?;
    playlist_response(playlist).await
}

/// POST /ai/recommend - recommend a playlist from listening history
#[post("/recommend")]
pub async fn recommend(body: web::Json<RecommendBody>) -> Result<HttpResponse, PipelineError> {
    let request = GenerationRequest::new(body.userid, GenerationMode::History, body.count)?;

    let playlist = Pipeline::new().generate(request).await?;
    playlist_response(playlist).await
}

/// POST /ai/mix - build a popular mix from seed tracks
#[post("/mix")]
pub async fn mix(body: web::Json<MixBody>) -> Result<HttpResponse, PipelineError> {
    let request = GenerationRequest::new(
        body.userid,
        GenerationMode::Seed {
            seed_ids: body.seed_ids.clone(),
        },
        body.count,
    )?;

    let playlist = Pipeline::new().generate(request).await?;
    playlist_response(playlist).await
}

/// GET /ai/playlist/{playlistid} - read back a generated playlist
#[get("/playlist/{playlistid}")]
pub async fn get_playlist(path: web::Path<i64>) -> impl Responder {
    let playlist_id = path.into_inner();

    let playlist = match PlaylistTable::get_by_id(playlist_id).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "error": "Playlist not found"
            }))
        }
        Err(_) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Something went wrong"
            }))
        }
    };

    match playlist_response(playlist).await {
        Ok(response) => response,
        Err(err) => {
            use actix_web::ResponseError;
            err.error_response()
        }
    }
}

/// Serialize a playlist with its resolved tracks in playlist order
async fn playlist_response(playlist: Playlist) -> Result<HttpResponse, PipelineError> {
    use anyhow::Context;

    let ids = playlist.track_ids();
    let fetched = TrackTable::find_by_ids(&ids)
        .await
        .context("failed to resolve playlist tracks")?;

    let by_id: std::collections::HashMap<i64, _> =
        fetched.into_iter().map(|t| (t.id, t)).collect();
    let tracks: Vec<_> = ids.iter().filter_map(|id| by_id.get(id)).collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "playlist": playlist,
        "tracks": tracks,
    })))
}

/// Configure generation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(generate_playlist)
        .service(suggest_tracks)
        .service(recommend)
        .service(mix)
        .service(get_playlist);
}
