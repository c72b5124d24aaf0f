//! Generation orchestration for glyphsmith.
//!
//! Drives the generation collaborator through bounded retry loops, in buffered
//! and streaming form, layering feedback prompts onto the per-mode system prompt
//! and escalating to a hard reset when art output keeps collapsing into ladders.

pub mod feedback;
pub mod orchestrator;
pub mod prompts;
pub mod rate_limit;
pub mod session;

pub use feedback::{FeedbackHistory, MAX_FIXES};
pub use orchestrator::{Generation, RetryConfig, RetryOrchestrator, StreamRun};
pub use prompts::{system_prompt, Orientation};
pub use rate_limit::RateLimiter;
pub use session::{Interaction, SessionMemory};
