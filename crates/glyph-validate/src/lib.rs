//! Content-quality validation engine for generated ASCII output.
//!
//! Provides character policies per mode, the structural analyzer, the two-tier
//! cleaner, the incremental `StreamingGate`, and art quality scoring.
//! [`AsciiValidator`] bundles a mode's policy with all of them.

pub mod analyzer;
pub mod cleaner;
pub mod policy;
pub mod quality;
pub mod streaming;

pub use analyzer::{analyze, Finding, Severity};
pub use cleaner::complete_incomplete_boxes;
pub use policy::PolicyConfig;
pub use quality::{measure_art_quality, ArtQuality};
pub use streaming::StreamingGate;

use glyph_types::Mode;
use serde::Serialize;

/// Error substrings that mark an outcome as worth regenerating.
pub const QUALITY_KEYWORDS: &[&str] = &[
    "broken",
    "markdown",
    "disallowed characters",
    "exceeds maximum",
    "incomplete",
    "cut off",
];

/// Substrings that classify a failure as a degenerate ladder/template loop.
pub const LADDER_KEYWORDS: &[&str] = &[
    "degenerate",
    "template",
    "ladder",
    "extreme repetition",
    "pattern repetition",
    "consecutive identical",
];

// ---------------------------------------------------------------------------
// ValidationOutcome
// ---------------------------------------------------------------------------

/// Result of one validation pass. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    is_valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationOutcome {
    pub(crate) fn from_parts(is_valid: bool, errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid,
            errors,
            warnings,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// A new outcome with extra errors appended. Any extra error makes it invalid.
    pub fn with_errors(&self, extra: impl IntoIterator<Item = String>) -> Self {
        let mut errors = self.errors.clone();
        for e in extra {
            if !errors.contains(&e) {
                errors.push(e);
            }
        }
        let is_valid = self.is_valid && errors.len() == self.errors.len();
        Self {
            is_valid,
            errors,
            warnings: self.warnings.clone(),
        }
    }

    /// Errors only; warnings never count.
    pub fn has_quality_issues(&self) -> bool {
        self.errors.iter().any(|e| contains_any(e, QUALITY_KEYWORDS))
    }

    pub fn is_ladder_failure(&self) -> bool {
        self.errors
            .iter()
            .chain(&self.warnings)
            .any(|m| contains_any(m, LADDER_KEYWORDS))
    }

    /// The ladder-class errors alone.
    pub fn ladder_errors(&self) -> Vec<String> {
        self.errors
            .iter()
            .filter(|e| contains_any(e, LADDER_KEYWORDS))
            .cloned()
            .collect()
    }

    /// Whether the orchestrator should regenerate.
    pub fn needs_retry(&self) -> bool {
        !self.is_valid || self.has_quality_issues()
    }
}

fn contains_any(message: &str, keywords: &[&str]) -> bool {
    let lowered = message.to_lowercase();
    keywords.iter().any(|k| lowered.contains(k))
}

// ---------------------------------------------------------------------------
// Shared line helpers
// ---------------------------------------------------------------------------

/// A line with every whitespace character removed.
pub fn normalize_line(line: &str) -> String {
    line.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Short, low-variety patterns such as `||` or `/ /`.
pub fn is_simple_pattern(normalized: &str) -> bool {
    let mut distinct: Vec<char> = Vec::with_capacity(3);
    let mut len = 0;
    for c in normalized.chars() {
        len += 1;
        if len > 3 {
            return false;
        }
        if !distinct.contains(&c) {
            distinct.push(c);
        }
    }
    distinct.len() <= 2
}

// ---------------------------------------------------------------------------
// AsciiValidator
// ---------------------------------------------------------------------------

/// Validation and cleaning bound to one mode's policy.
#[derive(Debug, Clone, Copy)]
pub struct AsciiValidator {
    policy: PolicyConfig,
}

impl AsciiValidator {
    pub fn new(mode: Mode) -> Self {
        Self {
            policy: PolicyConfig::resolve(mode),
        }
    }

    pub fn for_name(name: &str) -> Self {
        Self::new(Mode::from_name(name))
    }

    pub fn mode(&self) -> Mode {
        self.policy.mode
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn validate(&self, content: &str, strict: bool) -> ValidationOutcome {
        analyzer::validate(content, &self.policy, strict)
    }

    pub fn clean(&self, content: &str) -> String {
        cleaner::clean(content, &self.policy)
    }

    pub fn clean_minimal(&self, content: &str) -> String {
        cleaner::clean_minimal(content)
    }

    /// Clean, then validate the cleaned text. `minimal_clean` only takes effect in art mode.
    pub fn validate_and_clean(
        &self,
        content: &str,
        strict: bool,
        minimal_clean: bool,
    ) -> (String, ValidationOutcome) {
        let cleaned = if minimal_clean && self.policy.mode == Mode::Art {
            self.clean_minimal(content)
        } else {
            self.clean(content)
        };
        let outcome = self.validate(&cleaned, strict);
        (cleaned, outcome)
    }

    /// Drop every character outside the whitelist, keeping newlines.
    pub fn filter_chunk(&self, chunk: &str) -> String {
        chunk
            .chars()
            .filter(|c| *c == '\n' || self.policy.allows(*c))
            .collect()
    }
}
