//! Generation pipeline orchestration
//!
//! One inbound request runs the stages in order: candidate pool build,
//! prompt gatekeeping, prompt composition, model invocation, response
//! parsing, selection validation, playlist assembly. Each invocation is
//! independent and sequential; the only shared state is the database.

use std::collections::HashSet;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::{ServerConfig, DEFAULT_SUGGESTION_COUNT, MAX_SUGGESTIONS};
use crate::core::assembler;
use crate::core::candidates::{CandidateTrack, PoolBuilder};
use crate::core::error::PipelineError;
use crate::core::gatekeeper::Gatekeeper;
use crate::core::parser::{parse_model_response, ModelResponse};
use crate::core::prompt::{is_artist_only_guidance, PromptComposer};
use crate::core::request::{GenerationMode, GenerationRequest};
use crate::core::selector::{emergency_selection, validate_selection, ValidatedSelection};
use crate::db::tables::{HistoryTable, PlaylistTable, TrackTable};
use crate::models::{Playlist, PlaylistKind};
use crate::plugins::GeminiClient;

/// The AI playlist generation pipeline
pub struct Pipeline {
    config: ServerConfig,
    gatekeeper: Gatekeeper,
    composer: PromptComposer,
}

impl Pipeline {
    /// Build a pipeline from the current server config
    pub fn new() -> Self {
        let config = ServerConfig::global().read().clone();
        Self::with_config(config)
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let gatekeeper = Gatekeeper::new(config.gatekeeper.clone());
        let composer = PromptComposer::new(config.custom_guidance.clone());
        Self {
            config,
            gatekeeper,
            composer,
        }
    }

    /// Run one generation request to completion.
    pub async fn generate(&self, request: GenerationRequest) -> Result<Playlist, PipelineError> {
        info!(
            "generation request: user={} mode={} count={}",
            request.user_id,
            request.mode.name(),
            request.requested_count
        );

        match &request.mode {
            GenerationMode::FreeText { prompt } => {
                self.run_free_text(&request, prompt.clone()).await
            }
            GenerationMode::Suggestion {
                playlist_id,
                prompt,
            } => {
                self.run_suggestion(&request, *playlist_id, prompt.clone())
                    .await
            }
            GenerationMode::History => self.run_history(&request, false).await,
            GenerationMode::ArtistOnly => self.run_history(&request, true).await,
            GenerationMode::Seed { seed_ids } => self.run_seed(&request, seed_ids.clone()).await,
        }
    }

    // ---- free text -------------------------------------------------------

    async fn run_free_text(
        &self,
        request: &GenerationRequest,
        prompt: String,
    ) -> Result<Playlist, PipelineError> {
        self.gatekeeper.check(&prompt)?;

        let universe = PoolBuilder::active_pool(self.config.free_text_pool_limit)
            .await
            .context("failed to build candidate pool")?;
        if universe.is_empty() {
            return Err(PipelineError::EmptyCandidatePool);
        }

        let instructions = self
            .composer
            .free_text(&prompt, &universe, request.requested_count);
        let response = self.invoke_and_parse(&instructions).await?;

        let selection = validate_selection(
            &response.recommended_ids,
            &universe,
            &HashSet::new(),
            request.requested_count,
        );

        // an empty selection is a valid "no match" outcome: the playlist is
        // created empty, with the model's explanatory name when it gave one
        let tracks = assembler::resolve_tracks(&selection).await?;
        let title = assembler::resolve_title(
            response.playlist_name.as_deref(),
            response.playlist_description.as_deref(),
            &tracks,
        );

        assembler::create_playlist(request.user_id, PlaylistKind::User, title, &tracks).await
    }

    // ---- suggestion ------------------------------------------------------

    async fn run_suggestion(
        &self,
        request: &GenerationRequest,
        playlist_id: i64,
        prompt: String,
    ) -> Result<Playlist, PipelineError> {
        self.gatekeeper.check(&prompt)?;

        let playlist = PlaylistTable::get_by_id(playlist_id)
            .await
            .context("failed to load playlist")?
            .ok_or(PipelineError::PlaylistNotFound(playlist_id))?;

        let existing_ids: HashSet<i64> = playlist.tracks.iter().map(|t| t.track_id).collect();

        let universe = PoolBuilder::active_pool(self.config.suggestion_pool_limit)
            .await
            .context("failed to build candidate pool")?;
        let pool = universe.without(&existing_ids);
        if pool.is_empty() {
            return Err(PipelineError::EmptyCandidatePool);
        }

        let current_tracks = self.playlist_candidates(&playlist).await?;

        let instructions = self.composer.suggestion(
            &prompt,
            &current_tracks,
            &pool,
            DEFAULT_SUGGESTION_COUNT,
            MAX_SUGGESTIONS,
        );
        let response = self.invoke_and_parse(&instructions).await?;

        let selection = validate_selection(
            &response.recommended_ids,
            &pool,
            &existing_ids,
            request.requested_count,
        );

        if selection.is_empty() {
            // valid "no match": the playlist is returned untouched
            info!("suggestion produced no new tracks for playlist {}", playlist_id);
            return Ok(playlist);
        }

        assembler::append_to_playlist(playlist_id, &selection).await
    }

    // ---- history / artist-only ------------------------------------------

    async fn run_history(
        &self,
        request: &GenerationRequest,
        force_artist_only: bool,
    ) -> Result<Playlist, PipelineError> {
        let history_ids = HistoryTable::recent_for_user(request.user_id, self.config.history_window)
            .await
            .context("failed to load listening history")?;
        let history_set: HashSet<i64> = history_ids.iter().copied().collect();

        let universe = PoolBuilder::active_pool_strict(self.config.history_pool_limit)
            .await
            .context("failed to build candidate pool")?;
        if universe.is_empty() {
            return Err(PipelineError::EmptyCandidatePool);
        }

        let history_tracks = self.history_candidates(&history_ids).await?;

        let artist_only = force_artist_only
            || self
                .config
                .custom_guidance
                .as_deref()
                .is_some_and(is_artist_only_guidance);

        let (pool, instructions) = if artist_only {
            let history_artists: HashSet<i64> = history_tracks
                .iter()
                .flat_map(|t| t.artist_ids.iter().copied())
                .collect();
            let narrowed = universe.narrow_to_artists(&history_artists, &history_set);
            if narrowed.is_empty() {
                return Err(PipelineError::EmptyCandidatePool);
            }
            let instructions =
                self.composer
                    .artist_only(&history_tracks, &narrowed, request.requested_count);
            (narrowed, instructions)
        } else {
            let instructions =
                self.composer
                    .history(&history_tracks, &universe, request.requested_count);
            (universe, instructions)
        };

        // the only mode permitted to substitute a canned result: on any model
        // or parse failure (except a missing credential), fall back to the
        // top-played list minus history
        let selection = match self.invoke_and_parse(&instructions).await {
            Ok(response) => validate_selection(
                &response.recommended_ids,
                &pool,
                &history_set,
                request.requested_count,
            ),
            Err(PipelineError::ServiceUnavailable) => {
                return Err(PipelineError::ServiceUnavailable)
            }
            Err(err) => {
                warn!(
                    "history generation falling back to top played: {}",
                    err.kind()
                );
                self.emergency_fallback(&history_set, request.requested_count)
                    .await?
            }
        };

        let tracks = assembler::resolve_tracks(&selection).await?;
        let title = assembler::synthesize_title(&tracks);

        assembler::create_playlist(request.user_id, PlaylistKind::Recommendation, title, &tracks)
            .await
    }

    async fn emergency_fallback(
        &self,
        history_set: &HashSet<i64>,
        requested_count: usize,
    ) -> Result<ValidatedSelection, PipelineError> {
        let fallback_pool = PoolBuilder::top_played_pool(self.config.fallback_pool_limit)
            .await
            .context("failed to build fallback pool")?;
        Ok(emergency_selection(&fallback_pool, history_set, requested_count))
    }

    // ---- seed ------------------------------------------------------------

    async fn run_seed(
        &self,
        request: &GenerationRequest,
        seed_ids: Vec<i64>,
    ) -> Result<Playlist, PipelineError> {
        let universe = PoolBuilder::seed_pool(&seed_ids, self.config.seed_pool_limit)
            .await
            .context("failed to build seed pool")?;
        if universe.is_empty() {
            return Err(PipelineError::EmptyCandidatePool);
        }

        let instructions = self.composer.seed(&universe, request.requested_count);
        let response = self.invoke_and_parse(&instructions).await?;

        let selection = validate_selection(
            &response.recommended_ids,
            &universe,
            &HashSet::new(),
            request.requested_count,
        );

        let tracks = assembler::resolve_tracks(&selection).await?;
        let title = assembler::synthesize_title(&tracks);

        assembler::create_playlist(request.user_id, PlaylistKind::Mix, title, &tracks).await
    }

    // ---- shared ----------------------------------------------------------

    /// Invoke the model and parse its output. No retries.
    async fn invoke_and_parse(&self, instructions: &str) -> Result<ModelResponse, PipelineError> {
        let client = GeminiClient::from_config(&self.config)?;

        debug!("model prompt is {} chars", instructions.len());
        let text = client.generate(instructions).await?;
        debug!("model returned {} chars", text.len());

        parse_model_response(&text)
    }

    /// Candidate snapshots for an existing playlist's tracks, in order
    async fn playlist_candidates(
        &self,
        playlist: &Playlist,
    ) -> Result<Vec<CandidateTrack>, PipelineError> {
        let ids = playlist.track_ids();
        self.history_candidates(&ids).await
    }

    /// Candidate snapshots for the given IDs, preserving the ID order
    async fn history_candidates(
        &self,
        ids: &[i64],
    ) -> Result<Vec<CandidateTrack>, PipelineError> {
        let fetched = TrackTable::find_by_ids(ids)
            .await
            .context("failed to resolve tracks")?;

        let by_id: std::collections::HashMap<i64, _> =
            fetched.into_iter().map(|t| (t.id, t)).collect();

        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(CandidateTrack::from_track)
            .collect())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The stage logic is covered by the per-module tests (gatekeeper, parser,
    // selector, assembler, candidates). What remains here is the mode
    // dispatch glue around the gatekeeper, which must fire before any
    // network or store access for prompt-bearing modes.

    #[tokio::test]
    async fn test_free_text_rejects_off_topic_before_io() {
        let config = ServerConfig::default();
        let pipeline = Pipeline::with_config(config);

        // no database or model is configured in this test; an early
        // gatekeeper rejection proves neither was touched
        let request = GenerationRequest::new(
            1,
            GenerationMode::FreeText {
                prompt: "tell me a joke".to_string(),
            },
            10,
        )
        .unwrap();

        let result = pipeline.generate(request).await;
        assert!(matches!(result, Err(PipelineError::InvalidPrompt(_))));
    }

    #[tokio::test]
    async fn test_suggestion_rejects_off_topic_before_io() {
        let pipeline = Pipeline::with_config(ServerConfig::default());
        let request = GenerationRequest::new(
            1,
            GenerationMode::Suggestion {
                playlist_id: 1,
                prompt: "what is the weather today".to_string(),
            },
            5,
        )
        .unwrap();

        let result = pipeline.generate(request).await;
        assert!(matches!(result, Err(PipelineError::InvalidPrompt(_))));
    }

    // No model credential is configured in these tests. Getting
    // EmptyCandidatePool rather than ServiceUnavailable proves the pool
    // check runs before any model client is even constructed.

    #[tokio::test]
    async fn test_free_text_empty_catalog_fails_before_model_call() {
        crate::db::setup_test_db().await;

        let pipeline = Pipeline::with_config(ServerConfig::default());
        let request = GenerationRequest::new(
            1,
            GenerationMode::FreeText {
                prompt: "a chill jazz playlist for late nights".to_string(),
            },
            10,
        )
        .unwrap();

        let result = pipeline.generate(request).await;
        assert!(matches!(result, Err(PipelineError::EmptyCandidatePool)));
    }

    #[tokio::test]
    async fn test_seed_with_unknown_ids_fails_before_model_call() {
        crate::db::setup_test_db().await;

        let pipeline = Pipeline::with_config(ServerConfig::default());
        let request = GenerationRequest::new(
            1,
            GenerationMode::Seed {
                seed_ids: vec![987_654, 987_655],
            },
            10,
        )
        .unwrap();

        let result = pipeline.generate(request).await;
        assert!(matches!(result, Err(PipelineError::EmptyCandidatePool)));
    }
}
