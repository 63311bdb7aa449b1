//! Interactive chat with the Pepper robot.
//!
//! Reads user messages, asks the generation endpoint for a reply, and relays
//! the sanitized reply to whichever speech path [`pepper_speech`] resolves.

pub mod config;
pub mod orchestrator;

pub use orchestrator::{ChatError, ConversationOrchestrator, RunSummary, EXIT_KEYWORDS};
