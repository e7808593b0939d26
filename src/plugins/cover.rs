//! Cover image service client
//!
//! Best-effort collaborator: asks an external service to render a cover for a
//! generated playlist. Every failure path returns None and logs; playlist
//! creation never waits on or fails because of this call.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::config::ServerConfig;

#[derive(Debug, Deserialize)]
struct CoverResponse {
    url: Option<String>,
}

/// Client for the cover image generation endpoint
pub struct CoverImageClient {
    client: Client,
    endpoint: String,
}

impl CoverImageClient {
    /// Build from global config; None when no endpoint is configured.
    pub fn from_config() -> Option<Self> {
        let endpoint = ServerConfig::global().read().cover_image_endpoint.clone()?;
        if endpoint.trim().is_empty() {
            return None;
        }
        Some(Self {
            client: Client::new(),
            endpoint,
        })
    }

    /// Request a cover image. Returns the image URL, or None on any failure.
    pub async fn generate(
        &self,
        name: &str,
        description: &str,
        artist_names: &[String],
    ) -> Option<String> {
        let body = json!({
            "name": name,
            "description": description,
            "artists": artist_names,
        });

        let response = match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("cover image request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("cover image service returned {}", response.status());
            return None;
        }

        match response.json::<CoverResponse>().await {
            Ok(parsed) => parsed.url.filter(|u| !u.is_empty()),
            Err(e) => {
                warn!("cover image response unreadable: {}", e);
                None
            }
        }
    }
}
