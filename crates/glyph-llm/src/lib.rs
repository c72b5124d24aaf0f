//! Generation collaborators for glyphsmith.
//!
//! Provides the `TextGenerator` / `StreamingGenerator` capability traits, the
//! `Collaborator` tagged union the orchestrator is built around, a
//! chat-completions adapter for Groq (or any OpenAI-compatible endpoint), and
//! `ScriptedGenerator` for offline runs and tests.

mod chat;
mod generator;
mod scripted;

pub use chat::ChatCompletionsAdapter;
pub use generator::*;
pub use scripted::{CallLog, RecordedCall, ScriptedGenerator};
