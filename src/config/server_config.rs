//! Server configuration for Harmonia
//!
//! This module handles operator-configurable settings stored in settings.json.
//! The AI pipeline reads its model credentials, pool limits, and gatekeeper
//! rule sets from here so none of them are hard-coded.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::Paths;

static SERVER_CONFIG: OnceCell<Arc<RwLock<ServerConfig>>> = OnceCell::new();

/// Keyword/phrase rules for the prompt gatekeeper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatekeeperRules {
    /// Words that mark a prompt as music-related
    #[serde(default = "default_music_keywords")]
    pub music_keywords: Vec<String>,

    /// Generic question openers that mark a prompt as off-topic
    #[serde(default = "default_question_openers")]
    pub question_openers: Vec<String>,

    /// Prompts shorter than this with no music keyword are rejected
    #[serde(default = "default_min_prompt_len")]
    pub min_prompt_len: usize,

    /// Prompts shorter than this with no whitespace are treated as gibberish
    #[serde(default = "default_gibberish_len")]
    pub gibberish_len: usize,
}

impl Default for GatekeeperRules {
    fn default() -> Self {
        Self {
            music_keywords: default_music_keywords(),
            question_openers: default_question_openers(),
            min_prompt_len: default_min_prompt_len(),
            gibberish_len: default_gibberish_len(),
        }
    }
}

/// Server configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Server ID
    #[serde(default)]
    pub server_id: String,

    /// Gemini API key; falls back to the GEMINI_API_KEY env var when empty
    #[serde(default)]
    pub gemini_api_key: String,

    /// Generative model name
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Generation temperature (kept low for deterministic selection)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Maximum output tokens per generation
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Aggregate streamed model responses instead of single-shot calls
    #[serde(default)]
    pub stream_responses: bool,

    /// Administrator guidance prepended to every generation prompt
    #[serde(default)]
    pub custom_guidance: Option<String>,

    /// Cover image generation endpoint (best-effort; disabled when unset)
    #[serde(default)]
    pub cover_image_endpoint: Option<String>,

    /// Candidate pool limit for free-text generation
    #[serde(default = "default_free_text_pool_limit")]
    pub free_text_pool_limit: usize,

    /// Candidate pool limit for suggestion mode
    #[serde(default = "default_suggestion_pool_limit")]
    pub suggestion_pool_limit: usize,

    /// Candidate pool limit for history-based recommendation
    #[serde(default = "default_history_pool_limit")]
    pub history_pool_limit: usize,

    /// Candidate pool limit for seed mixes
    #[serde(default = "default_seed_pool_limit")]
    pub seed_pool_limit: usize,

    /// Top-played fetch size for the history emergency fallback
    #[serde(default = "default_fallback_pool_limit")]
    pub fallback_pool_limit: usize,

    /// How many recent history entries feed taste inference
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Gatekeeper rule sets
    #[serde(default)]
    pub gatekeeper: GatekeeperRules,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_id: String::new(),
            gemini_api_key: String::new(),
            model_name: default_model_name(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
            stream_responses: false,
            custom_guidance: None,
            cover_image_endpoint: None,
            free_text_pool_limit: default_free_text_pool_limit(),
            suggestion_pool_limit: default_suggestion_pool_limit(),
            history_pool_limit: default_history_pool_limit(),
            seed_pool_limit: default_seed_pool_limit(),
            fallback_pool_limit: default_fallback_pool_limit(),
            history_window: default_history_window(),
            gatekeeper: GatekeeperRules::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let paths = Paths::get()?;
        let settings_path = paths.settings_path();

        if settings_path.exists() {
            let content =
                std::fs::read_to_string(&settings_path).context("Failed to read settings file")?;
            let config: ServerConfig =
                serde_json::from_str(&content).context("Failed to parse settings file")?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let paths = Paths::get()?;
        let settings_path = paths.settings_path();

        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(&settings_path, content).context("Failed to write settings file")?;

        Ok(())
    }

    /// Get the global config instance
    pub fn global() -> Arc<RwLock<ServerConfig>> {
        SERVER_CONFIG
            .get_or_init(|| {
                let config = ServerConfig::load().unwrap_or_default();
                Arc::new(RwLock::new(config))
            })
            .clone()
    }

    /// Resolve the model API key from settings or environment
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.gemini_api_key.is_empty() {
            return Some(self.gemini_api_key.clone());
        }
        std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty())
    }
}

// Default value functions for serde

fn default_model_name() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_output_tokens() -> u32 {
    4096
}

fn default_free_text_pool_limit() -> usize {
    500
}

fn default_suggestion_pool_limit() -> usize {
    300
}

fn default_history_pool_limit() -> usize {
    400
}

fn default_seed_pool_limit() -> usize {
    100
}

fn default_fallback_pool_limit() -> usize {
    50
}

fn default_history_window() -> usize {
    30
}

fn default_min_prompt_len() -> usize {
    10
}

fn default_gibberish_len() -> usize {
    25
}

fn default_music_keywords() -> Vec<String> {
    [
        // genres
        "rock", "pop", "jazz", "blues", "metal", "punk", "indie", "folk", "classical", "edm",
        "house", "techno", "trance", "hip hop", "hiphop", "rap", "r&b", "rnb", "soul", "funk",
        "reggae", "dangdut", "lofi", "lo-fi", "acoustic", "instrumental", "orchestra", "dance",
        // moods and activities
        "chill", "relax", "sad", "happy", "upbeat", "energetic", "mellow", "romantic", "workout",
        "study", "sleep", "party", "focus", "calm", "nostalgic", "galau",
        // domain words and verbs
        "music", "song", "songs", "track", "tracks", "playlist", "album", "artist", "band",
        "singer", "vocal", "melody", "tempo", "beat", "mix", "tune", "genre", "listen", "play",
        "add", "create", "make", "suggest", "recommend", "vibe", "vibes",
        // localized terms
        "lagu", "musik", "penyanyi", "musica", "cancion", "canción",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_question_openers() -> Vec<String> {
    [
        "what is", "what are", "what's", "who is", "who are", "where is", "when is", "when was",
        "why is", "why do", "how to", "how do", "how does", "tell me", "explain", "define",
        "translate", "calculate", "write me", "give me a joke", "apa itu", "siapa", "bagaimana",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
