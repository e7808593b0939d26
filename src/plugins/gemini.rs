//! Gemini model client
//!
//! Thin client over the Generative Language REST API. Sends composed prompts
//! with deterministic low-temperature settings and medium-and-above safety
//! blocking, and aggregates either single-shot or streamed responses into one
//! text blob for the parser. No retries happen here; retry policy belongs to
//! the caller.

use anyhow::{anyhow, Context};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::ServerConfig;
use crate::core::error::PipelineError;

const API_ROOT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Clone, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback", default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason", default)]
    block_reason: Option<String>,
}

/// Client for the generative model endpoint
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
    stream: bool,
}

impl GeminiClient {
    /// Build a client from server config. Fails fast with a
    /// service-unavailable signal when no credential is configured.
    pub fn from_config(config: &ServerConfig) -> Result<Self, PipelineError> {
        let api_key = config
            .resolve_api_key()
            .ok_or(PipelineError::ServiceUnavailable)?;

        Ok(Self {
            client: Client::new(),
            api_key,
            model: config.model_name.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
            stream: config.stream_responses,
        })
    }

    /// Send a prompt and return the aggregated response text.
    pub async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        if self.stream {
            self.generate_streamed(prompt).await
        } else {
            self.generate_single(prompt).await
        }
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let safety_settings: Vec<SafetySetting> = SAFETY_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category,
                threshold: "BLOCK_MEDIUM_AND_ABOVE",
            })
            .collect();

        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "topP": self.top_p,
                "maxOutputTokens": self.max_output_tokens,
            },
            "safetySettings": safety_settings,
        })
    }

    async fn generate_single(&self, prompt: &str) -> Result<String, PipelineError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            API_ROOT, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamFailure(e.into()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!("model endpoint returned {}: {}", status, body);
            return Err(PipelineError::UpstreamFailure(anyhow!(
                "model endpoint returned {}",
                status
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::UpstreamFailure(e.into()))?;

        Self::aggregate(vec![parsed])
    }

    /// Streamed generation via server-sent events; text fragments from all
    /// chunks are concatenated before handing off.
    async fn generate_streamed(&self, prompt: &str) -> Result<String, PipelineError> {
        let url = format!(
            "{}/{}:streamGenerateContent?alt=sse&key={}",
            API_ROOT, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamFailure(e.into()))?;

        if !response.status().is_success() {
            return Err(PipelineError::UpstreamFailure(anyhow!(
                "model endpoint returned {}",
                response.status()
            )));
        }

        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut stream = response.bytes_stream();

        while let Some(piece) = stream.next().await {
            let piece = piece.map_err(|e| PipelineError::UpstreamFailure(e.into()))?;
            buffer.push_str(&String::from_utf8_lossy(&piece));

            // SSE events are newline-delimited; keep the trailing partial line
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);

                if let Some(data) = line.strip_prefix("data:") {
                    let data = data.trim();
                    if data.is_empty() {
                        continue;
                    }
                    let chunk: GenerateResponse = serde_json::from_str(data)
                        .context("malformed stream chunk")
                        .map_err(PipelineError::UpstreamFailure)?;
                    chunks.push(chunk);
                }
            }
        }

        Self::aggregate(chunks)
    }

    /// Collapse one or more response chunks into the final text, surfacing
    /// safety blocks and empty responses as typed failures.
    fn aggregate(chunks: Vec<GenerateResponse>) -> Result<String, PipelineError> {
        let mut text = String::new();

        for chunk in &chunks {
            if let Some(feedback) = &chunk.prompt_feedback {
                if let Some(reason) = &feedback.block_reason {
                    return Err(PipelineError::SafetyBlocked {
                        reason: reason.clone(),
                    });
                }
            }

            for candidate in &chunk.candidates {
                if candidate.finish_reason.as_deref() == Some("SAFETY") {
                    return Err(PipelineError::SafetyBlocked {
                        reason: "SAFETY".to_string(),
                    });
                }
                if let Some(content) = &candidate.content {
                    for part in &content.parts {
                        if let Some(t) = &part.text {
                            text.push_str(t);
                        }
                    }
                }
            }
        }

        if text.trim().is_empty() {
            return Err(PipelineError::UpstreamFailure(anyhow!(
                "model returned no candidate content"
            )));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(json_text: &str) -> GenerateResponse {
        serde_json::from_str(json_text).unwrap()
    }

    #[test]
    fn test_aggregate_concatenates_stream_fragments() {
        let chunks = vec![
            chunk(r#"{"candidates": [{"content": {"parts": [{"text": "{\"trackIds\": "}]}}]}"#),
            chunk(r#"{"candidates": [{"content": {"parts": [{"text": "[1, 2]}"}]}}]}"#),
        ];
        let text = GeminiClient::aggregate(chunks).unwrap();
        assert_eq!(text, r#"{"trackIds": [1, 2]}"#);
    }

    #[test]
    fn test_aggregate_surfaces_block_reason() {
        let chunks = vec![chunk(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)];
        let result = GeminiClient::aggregate(chunks);
        assert!(matches!(
            result,
            Err(PipelineError::SafetyBlocked { reason }) if reason == "SAFETY"
        ));
    }

    #[test]
    fn test_aggregate_surfaces_safety_finish() {
        let chunks = vec![chunk(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#)];
        assert!(matches!(
            GeminiClient::aggregate(chunks),
            Err(PipelineError::SafetyBlocked { .. })
        ));
    }

    #[test]
    fn test_aggregate_rejects_empty_response() {
        let chunks = vec![chunk(r#"{"candidates": []}"#)];
        assert!(matches!(
            GeminiClient::aggregate(chunks),
            Err(PipelineError::UpstreamFailure(_))
        ));
    }

    #[test]
    fn test_missing_credential_fails_fast() {
        let mut config = ServerConfig::default();
        config.gemini_api_key = String::new();
        std::env::remove_var("GEMINI_API_KEY");
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(PipelineError::ServiceUnavailable)
        ));
    }
}
