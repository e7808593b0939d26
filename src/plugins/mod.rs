//! External service integrations
//!
//! Clients for collaborators the pipeline talks to over HTTP: the generative
//! model endpoint and the best-effort cover image service.

pub mod cover;
pub mod gemini;

pub use gemini::GeminiClient;
