//! Configuration module for Harmonia
//!
//! This module contains the application configuration structures and path management.

mod paths;
mod server_config;

pub use paths::Paths;
pub use server_config::{GatekeeperRules, ServerConfig};

/// Hard cap on tracks added per suggestion request
pub const MAX_SUGGESTIONS: usize = 10;

/// Suggestion count used when the prompt does not state one
pub const DEFAULT_SUGGESTION_COUNT: usize = 5;

/// Default playlist length for history/seed generations
pub const DEFAULT_PLAYLIST_LENGTH: usize = 20;
