//! Client for the remote text-generation endpoint.
//!
//! The endpoint speaks the Ollama HTTP API: `POST /api/generate` for a single
//! non-streaming completion and `GET /api/tags` to list installed models.
//! Conversation history is flattened into one `User:` / `Assistant:` prompt by
//! [`build_prompt`].

pub mod client;
pub mod prompt;

pub use client::{GenerationClient, GenerationOptions, ModelInfo, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use prompt::build_prompt;
