//! In-memory record of recent generations.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Local};
use serde::Serialize;

use glyph_types::Mode;

/// Characters of a prompt quoted in a context summary.
const SUMMARY_PROMPT_CHARS: usize = 50;
/// Interactions listed in a context summary.
const SUMMARY_LIMIT: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub prompt: String,
    pub result: String,
    pub timestamp: DateTime<Local>,
    pub generator_type: Mode,
    pub success: bool,
}

/// Bounded history of interactions, evicted by count and by age.
#[derive(Debug, Clone)]
pub struct SessionMemory {
    max_interactions: usize,
    max_age: Duration,
    interactions: VecDeque<Interaction>,
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self::new(10, Duration::minutes(60))
    }
}

impl SessionMemory {
    pub fn new(max_interactions: usize, max_age: Duration) -> Self {
        Self {
            max_interactions,
            max_age,
            interactions: VecDeque::with_capacity(max_interactions),
        }
    }

    pub fn add_interaction(&mut self, prompt: &str, result: &str, kind: Mode, success: bool) {
        self.push(Interaction {
            prompt: prompt.to_string(),
            result: result.to_string(),
            timestamp: Local::now(),
            generator_type: kind,
            success,
        });
    }

    /// Append an interaction, then evict expired and surplus entries.
    pub fn push(&mut self, interaction: Interaction) {
        self.interactions.push_back(interaction);
        self.evict();
    }

    fn evict(&mut self) {
        let cutoff = Local::now() - self.max_age;
        self.interactions.retain(|i| i.timestamp > cutoff);
        while self.interactions.len() > self.max_interactions {
            self.interactions.pop_front();
        }
    }

    /// Up to `limit` live interactions, oldest first, optionally filtered by mode.
    pub fn recent(&self, kind: Option<Mode>, limit: usize) -> Vec<&Interaction> {
        let cutoff = Local::now() - self.max_age;
        let matching: Vec<&Interaction> = self
            .interactions
            .iter()
            .filter(|i| i.timestamp > cutoff)
            .filter(|i| kind.map_or(true, |k| i.generator_type == k))
            .collect();
        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).collect()
    }

    /// Short text digest of the last few interactions. Empty when there are none.
    pub fn context_summary(&self, kind: Option<Mode>) -> String {
        let recent = self.recent(kind, SUMMARY_LIMIT);
        if recent.is_empty() {
            return String::new();
        }
        let mut parts = vec!["Recent context from this session:".to_string()];
        for interaction in recent {
            let prompt: String = interaction.prompt.chars().take(SUMMARY_PROMPT_CHARS).collect();
            parts.push(format!("- User requested: {prompt}..."));
            if interaction.success {
                parts.push(format!("  Generated: {} chars", interaction.result.chars().count()));
            } else {
                parts.push("  Result: Failed".to_string());
            }
        }
        parts.join("\n")
    }

    pub fn clear(&mut self) {
        self.interactions.clear();
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    pub fn last(&self) -> Option<&Interaction> {
        self.interactions.back()
    }
}
