//! Shared modes, errors, and wire sentinels for the glyphsmith generator.
//!
//! This crate provides the foundational types used across all other glyphsmith crates:
//! - `Mode`: the four rendering modes (art, chart, diagram, logo)
//! - `ProviderError`: typed form of the `ERROR_CODE:` sentinel produced by LLM collaborators
//! - `GlyphError`: crate-level error taxonomy
//! - wire helpers for the `[RETRY]` / `[FINAL]` stream markers

use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Rendering mode. Selects the character policy, cleaning strategy, and system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Art,
    Chart,
    Diagram,
    Logo,
}

impl Mode {
    /// Resolve a mode name. Total: unknown names fall back to [`Mode::Art`].
    pub fn from_name(name: &str) -> Mode {
        match name.trim().to_ascii_lowercase().as_str() {
            "chart" => Mode::Chart,
            "diagram" => Mode::Diagram,
            "logo" => Mode::Logo,
            _ => Mode::Art,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Art => "art",
            Mode::Chart => "chart",
            Mode::Diagram => "diagram",
            Mode::Logo => "logo",
        }
    }

    /// Charts and diagrams are expected to be flush and box-aligned.
    pub fn is_structured(&self) -> bool {
        matches!(self, Mode::Chart | Mode::Diagram)
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Art
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Wire sentinels and stream markers
// ---------------------------------------------------------------------------

/// Emitted inline in a stream: the presentation layer discards prior partial output.
pub const RETRY_MARKER: &str = "\n[RETRY]";

/// Emitted inline in a stream, followed by a corrected full re-render.
pub const FINAL_MARKER: &str = "\n[FINAL]";

/// Error code of the terminal sentinel produced when ladder escalation is exhausted.
pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";

/// Format an error sentinel: `ERROR_CODE: <code>\nERROR_MESSAGE: <message>`.
pub fn format_sentinel(code: &str, message: &str) -> String {
    format!("ERROR_CODE: {code}\nERROR_MESSAGE: {message}")
}

/// Returns `true` if `text` is an error sentinel rather than generated content.
pub fn is_sentinel(text: &str) -> bool {
    text.trim_start().starts_with("ERROR_CODE:")
}

static SENTINEL_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?s)\AERROR_CODE:[ \t]*([A-Za-z0-9_]+)[ \t]*(?:\r?\nERROR_MESSAGE:[ \t]*(.*))?")
        .expect("sentinel pattern is valid")
});

// ---------------------------------------------------------------------------
// ProviderError
// ---------------------------------------------------------------------------

/// Failure reported by a generation collaborator.
///
/// Inside the workspace this travels as a typed value; it is converted to the
/// sentinel string form only at the external edge (see [`ProviderError::to_sentinel`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("{message}")]
    Timeout { message: String },

    #[error("{message}")]
    QuotaExceeded { message: String },

    #[error("{message}")]
    SafetyBlocked { message: String },

    #[error("{message}")]
    RecitationBlocked { message: String },

    #[error("{message}")]
    MalformedResponse { message: String },

    #[error("{message}")]
    NoResponse { message: String },

    #[error("{message}")]
    Auth { message: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("{message}")]
    Other { code: String, message: String },
}

impl ProviderError {
    pub fn timeout(seconds: u64) -> Self {
        ProviderError::Timeout {
            message: format!(
                "Request timed out after {seconds} seconds. The API may be slow or unavailable."
            ),
        }
    }

    pub fn no_response() -> Self {
        ProviderError::NoResponse {
            message: "No response generated from the API".into(),
        }
    }

    /// The `ERROR_CODE` value for this error.
    pub fn code(&self) -> &str {
        match self {
            ProviderError::Timeout { .. } => "TIMEOUT",
            ProviderError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            ProviderError::SafetyBlocked { .. } => "SAFETY_BLOCKED",
            ProviderError::RecitationBlocked { .. } => "RECITATION_BLOCKED",
            ProviderError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            ProviderError::NoResponse { .. } => "NO_RESPONSE",
            ProviderError::Auth { .. } => "AUTH_ERROR",
            ProviderError::Http { .. } => "HTTP_ERROR",
            ProviderError::Other { code, .. } => code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ProviderError::Timeout { message }
            | ProviderError::QuotaExceeded { message }
            | ProviderError::SafetyBlocked { message }
            | ProviderError::RecitationBlocked { message }
            | ProviderError::MalformedResponse { message }
            | ProviderError::NoResponse { message }
            | ProviderError::Auth { message }
            | ProviderError::Http { message, .. }
            | ProviderError::Other { message, .. } => message,
        }
    }

    /// Render as the external sentinel string.
    pub fn to_sentinel(&self) -> String {
        format_sentinel(self.code(), &self.to_string())
    }

    /// Parse a sentinel string. Returns `None` for ordinary content.
    pub fn from_sentinel(text: &str) -> Option<ProviderError> {
        let caps = SENTINEL_RE.captures(text.trim_start())?;
        let code = caps.get(1)?.as_str().to_ascii_uppercase();
        let message = caps
            .get(2)
            .map(|m| m.as_str().trim_end().to_string())
            .unwrap_or_default();
        Some(match code.as_str() {
            "TIMEOUT" => ProviderError::Timeout { message },
            "QUOTA_EXCEEDED" => ProviderError::QuotaExceeded { message },
            "SAFETY_BLOCKED" => ProviderError::SafetyBlocked { message },
            "RECITATION_BLOCKED" => ProviderError::RecitationBlocked { message },
            "MALFORMED_RESPONSE" => ProviderError::MalformedResponse { message },
            "NO_RESPONSE" => ProviderError::NoResponse { message },
            "AUTH_ERROR" => ProviderError::Auth { message },
            _ => ProviderError::Other { code, message },
        })
    }
}

// ---------------------------------------------------------------------------
// GlyphError
// ---------------------------------------------------------------------------

/// Unified error type for configuration and I/O around the generation engine.
#[derive(Debug, thiserror::Error)]
pub enum GlyphError {
    #[error("{var} is required but not set")]
    MissingApiKey { var: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Provider error [{code}]: {0}", code = .0.code())]
    Provider(#[from] ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// A convenience alias for `Result<T, GlyphError>`.
pub type Result<T> = std::result::Result<T, GlyphError>;
