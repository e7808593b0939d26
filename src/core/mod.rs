//! Core logic for Harmonia
//!
//! Home of the AI playlist generation pipeline and its stages.

pub mod assembler;
pub mod candidates;
pub mod error;
pub mod gatekeeper;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod request;
pub mod selector;

pub use error::PipelineError;
pub use pipeline::Pipeline;
pub use request::{GenerationMode, GenerationRequest};
