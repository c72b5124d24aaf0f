//! Environment-driven configuration.

use std::str::FromStr;
use std::time::Duration;

use glyph_generate::RateLimiter;
use glyph_types::{GlyphError, Result};

pub const API_KEY_VAR: &str = "GROQ_API_KEY";

const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub rate_limit_rpm: usize,
    pub rate_limit_window_secs: u64,
    pub max_retries: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            api_key: get(API_KEY_VAR),
            model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("GROQ_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout_secs: parse_number(get("GLYPH_TIMEOUT_SECS"), "GLYPH_TIMEOUT_SECS", 60)?,
            rate_limit_rpm: parse_number(get("GLYPH_RATE_LIMIT_RPM"), "GLYPH_RATE_LIMIT_RPM", 15)?,
            rate_limit_window_secs: parse_number(
                get("GLYPH_RATE_LIMIT_WINDOW_SECS"),
                "GLYPH_RATE_LIMIT_WINDOW_SECS",
                60,
            )?,
            max_retries: parse_number(get("GLYPH_MAX_RETRIES"), "GLYPH_MAX_RETRIES", 2)?,
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| GlyphError::MissingApiKey {
                var: API_KEY_VAR.into(),
            })
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(
            self.rate_limit_rpm,
            Duration::from_secs(self.rate_limit_window_secs),
        )
    }
}

fn parse_number<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| {
            GlyphError::Config(format!("{key} must be a non-negative integer, got '{value}'"))
        }),
    }
}
