//! Feedback prompts built from failed validation outcomes.

use glyph_types::Mode;
use glyph_validate::ValidationOutcome;

/// Most fixes listed in a single feedback prompt.
pub const MAX_FIXES: usize = 5;

/// Lines of the ladder pattern shown as a negative example.
const LADDER_EXAMPLE_LINES: usize = 4;

/// Map the messages of a failed outcome onto concrete instructions.
///
/// `previous_lines` is the line count of the rejected candidate and
/// `max_lines` the mode's limit.
pub fn fixes_for(outcome: &ValidationOutcome, previous_lines: usize, max_lines: usize) -> Vec<String> {
    let messages: Vec<String> = outcome
        .errors()
        .iter()
        .chain(outcome.warnings())
        .map(|m| m.to_lowercase())
        .collect();
    let mentions = |needle: &str| messages.iter().any(|m| m.contains(needle));

    let mut fixes = Vec::new();
    if mentions("incomplete") || mentions("cut off") {
        fixes.push("Finish the drawing: close every shape and end on a complete line".to_string());
    }
    if messages
        .iter()
        .any(|m| m.contains("exceeds maximum") && m.contains("lines"))
    {
        let target = max_lines.min(previous_lines.saturating_sub(1)).max(1);
        fixes.push(format!(
            "Too many lines: reduce to {target} lines (the last attempt had {previous_lines})"
        ));
    }
    if mentions("dense") {
        fixes.push("Add whitespace: leave breathing room between strokes".to_string());
    }
    if mentions("repetit") {
        fixes.push("Vary each line: never repeat the same row".to_string());
    }
    if mentions("symmetry") {
        fixes.push("Mirror sides: the left and right halves should balance".to_string());
    }
    if mentions("diversity") || mentions("feature") {
        fixes.push("Add iconic characters: eyes, mouth, texture".to_string());
    }
    fixes.truncate(MAX_FIXES);
    fixes
}

/// Fixes requested across the attempts of one generation, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct FeedbackHistory {
    fixes: Vec<String>,
}

impl FeedbackHistory {
    pub fn absorb(&mut self, fixes: impl IntoIterator<Item = String>) {
        for fix in fixes {
            if !self.fixes.contains(&fix) {
                self.fixes.push(fix);
            }
        }
    }

    pub fn clear(&mut self) {
        self.fixes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn fixes(&self) -> &[String] {
        &self.fixes
    }

    /// The base system prompt with the most recent fixes and a reference example appended.
    pub fn layer_onto(&self, base: &str, mode: Mode) -> String {
        let start = self.fixes.len().saturating_sub(MAX_FIXES);
        let mut prompt = String::from(base);
        prompt.push_str("\n\n# Corrections\n\nThe previous attempt was rejected. Fix these problems:\n");
        if self.fixes.is_empty() {
            prompt.push_str("1. Follow every rule above exactly\n");
        }
        for (i, fix) in self.fixes[start..].iter().enumerate() {
            prompt.push_str(&format!("{}. {fix}\n", i + 1));
        }
        prompt.push_str("\nReference example of acceptable output:\n");
        prompt.push_str(reference_example(mode));
        prompt
    }
}

pub fn reference_example(mode: Mode) -> &'static str {
    match mode {
        Mode::Art => "   /\\_/\\\n  ( o.o )\n   > ^ <\n  /|   |\\\n (_|   |_)",
        Mode::Logo => "█████  ███\n  █   █   █\n  █   █   █\n  █    ███",
        Mode::Chart => "Revenue\n┌──────────────────┐\n│ Jan ████     40% │\n│ Feb ██████   60% │\n└──────────────────┘",
        Mode::Diagram => "┌───────┐\n│ Input │\n└───────┘\n    ↓\n┌────────┐\n│ Output │\n└────────┘",
    }
}

/// Replace all accumulated feedback with a strict from-scratch instruction set.
pub fn hard_reset_prompt(base: &str) -> String {
    let ladder = vec!["/ /| |\\ \\"; LADDER_EXAMPLE_LINES].join("\n");
    format!(
        "{base}\n\n# Start over\n\n\
         Start over from scratch. Earlier attempts collapsed into a repeating template.\n\
         STRICT RULES:\n\
         1. Between 6 and 14 lines\n\
         2. No line wider than 60 characters\n\
         3. At most 2 similar lines in a row\n\
         4. Every line must add a new part of the subject\n\n\
         NEVER produce output like this:\n{ladder}"
    )
}
