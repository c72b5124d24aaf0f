//! Bounded retry loops around the generation collaborator.
//!
//! A user prompt becomes a sequence of attempts. Each candidate is cleaned and
//! validated; failures feed concrete fixes into the next attempt's system
//! prompt until the retry budget runs out. The streaming path additionally
//! gates fragments in real time and, for art, escalates repeated ladder
//! failures to a one-time hard reset.
//!
//! Nothing here returns an error: every path ends in content or a sentinel.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio_stream::StreamExt;
use uuid::Uuid;

use glyph_llm::{classify_reply, Collaborator, FragmentStream};
use glyph_types::{format_sentinel, Mode, ProviderError, FINAL_MARKER, RETRY_MARKER, VALIDATION_FAILED};
use glyph_validate::{AsciiValidator, StreamingGate, ValidationOutcome};

use crate::feedback::{fixes_for, hard_reset_prompt, FeedbackHistory};
use crate::prompts::{system_prompt, Orientation};
use crate::rate_limit::RateLimiter;
use crate::session::SessionMemory;

/// Verdict error added when the streaming gate cut an art candidate short on a
/// run of identical lines.
pub const GATE_STOP_ERROR: &str =
    "Streaming stopped: repetitive loop of consecutive identical lines (degenerate template/ladder)";

// ---------------------------------------------------------------------------
// Configuration and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Extra attempts after the first.
    pub max_retries: usize,
    /// Treat warnings as failures.
    pub strict: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            strict: false,
        }
    }
}

/// Final product of one user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Cleaned content, or a sentinel string.
    pub content: String,
    pub success: bool,
    /// Generator calls made.
    pub attempts: usize,
}

// ---------------------------------------------------------------------------
// RetryOrchestrator
// ---------------------------------------------------------------------------

pub struct RetryOrchestrator {
    collaborator: Collaborator,
    validator: AsciiValidator,
    system_prompt: String,
    config: RetryConfig,
    memory: SessionMemory,
    limiter: Option<Arc<RateLimiter>>,
}

impl RetryOrchestrator {
    pub fn new(collaborator: Collaborator, mode: Mode) -> Self {
        Self {
            collaborator,
            validator: AsciiValidator::new(mode),
            system_prompt: system_prompt(mode, Orientation::default()),
            config: RetryConfig::default(),
            memory: SessionMemory::default(),
            limiter: None,
        }
    }

    pub fn with_config(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.system_prompt = system_prompt(self.validator.mode(), orientation);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_memory(mut self, memory: SessionMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn mode(&self) -> Mode {
        self.validator.mode()
    }

    pub fn config(&self) -> RetryConfig {
        self.config
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    pub fn collaborator(&self) -> &Collaborator {
        &self.collaborator
    }

    /// Buffered generation with feedback-driven retries.
    pub async fn generate(&mut self, prompt: &str) -> Generation {
        let id = Uuid::new_v4();
        let mode = self.validator.mode();
        let total = self.config.max_retries + 1;
        let mut history = FeedbackHistory::default();
        let mut system = self.system_prompt.clone();
        let mut best = String::new();

        tracing::info!(generation = %id, %mode, collaborator = self.collaborator.name(), "starting generation");

        for attempt in 0..total {
            throttle(self.limiter.as_deref()).await;
            tracing::debug!(generation = %id, attempt, "requesting candidate");

            let raw = match self.collaborator.generate(prompt, &system).await {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(generation = %id, attempt, code = err.code(), "generation failed");
                    if attempt + 1 == total {
                        return self.conclude(prompt, err.to_sentinel(), false, attempt + 1);
                    }
                    continue;
                }
            };

            let (cleaned, verdict) = assess(&self.validator, &raw, self.config.strict, None);
            if !verdict.needs_retry() {
                tracing::info!(generation = %id, attempts = attempt + 1, "candidate accepted");
                return self.conclude(prompt, cleaned, true, attempt + 1);
            }

            tracing::info!(
                generation = %id,
                attempt,
                errors = verdict.errors().len(),
                "candidate rejected"
            );
            best = cleaned;
            if attempt + 1 < total {
                let max_lines = self.validator.policy().max_lines;
                history.absorb(fixes_for(&verdict, raw.lines().count(), max_lines));
                system = history.layer_onto(&self.system_prompt, mode);
            }
        }

        tracing::warn!(generation = %id, attempts = total, "retry budget exhausted");
        self.conclude(prompt, best, false, total)
    }

    fn conclude(&mut self, prompt: &str, content: String, success: bool, attempts: usize) -> Generation {
        self.memory
            .add_interaction(prompt, &content, self.validator.mode(), success);
        Generation {
            content,
            success,
            attempts,
        }
    }

    /// Streaming generation. Pull fragments with [`StreamRun::next`].
    pub fn generate_stream(&mut self, prompt: &str) -> StreamRun<'_> {
        let id = Uuid::new_v4();
        tracing::info!(
            generation = %id,
            mode = %self.validator.mode(),
            collaborator = self.collaborator.name(),
            streaming = self.collaborator.supports_streaming(),
            "starting streamed generation"
        );
        StreamRun {
            collaborator: &self.collaborator,
            memory: &mut self.memory,
            validator: self.validator,
            limiter: self.limiter.clone(),
            base_system: &self.system_prompt,
            config: self.config,
            prompt: prompt.to_string(),
            id,
            system: self.system_prompt.clone(),
            history: FeedbackHistory::default(),
            attempt: 0,
            budget: self.config.max_retries + 1,
            ladder_failures: 0,
            hard_reset: false,
            phase: Phase::Start,
            pending: VecDeque::new(),
            result: None,
        }
    }
}

impl std::fmt::Debug for RetryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryOrchestrator")
            .field("collaborator", &self.collaborator)
            .field("mode", &self.validator.mode())
            .field("config", &self.config)
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}

async fn throttle(limiter: Option<&RateLimiter>) {
    if let Some(limiter) = limiter {
        limiter.wait_if_needed().await;
    }
}

/// Clean a candidate and decide whether it is acceptable.
///
/// The verdict is the cleaned outcome. For art it also carries the
/// ladder-class errors of the raw candidate, since conservative capping can
/// hide a loop from the post-clean pass, and a gate stop on a full run of
/// identical lines. Structured modes are judged on the cleaned text alone.
/// Without a gate the art-mode minimal clean is used.
fn assess(
    validator: &AsciiValidator,
    raw: &str,
    strict: bool,
    gate: Option<&StreamingGate>,
) -> (String, ValidationOutcome) {
    let (cleaned, outcome) = match gate {
        Some(gate) => gate.finalize_with_outcome(),
        None => validator.validate_and_clean(raw, strict, true),
    };
    if validator.mode() != Mode::Art {
        return (cleaned, outcome);
    }
    let mut verdict = outcome.with_errors(validator.validate(raw, strict).ladder_errors());
    if gate.is_some_and(StreamingGate::stopped_on_full_run) {
        verdict = verdict.with_errors([GATE_STOP_ERROR.to_string()]);
    }
    (cleaned, verdict)
}

/// Per-line right-trim with outer blank lines removed.
fn normalize_block(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
    lines[start..end].join("\n")
}

// ---------------------------------------------------------------------------
// StreamRun
// ---------------------------------------------------------------------------

enum Phase<'a> {
    Start,
    Streaming {
        stream: FragmentStream<'a>,
        gate: StreamingGate,
        emitted: String,
    },
    Done,
}

/// One streamed request: a lazy, finite, non-restartable fragment sequence.
///
/// Fragments are gated as they arrive. Between attempts the sequence carries
/// `[RETRY]` markers; a cleaned re-render that differs from what was streamed
/// follows a `[FINAL]` marker. Dropping the run cancels the current attempt.
pub struct StreamRun<'a> {
    collaborator: &'a Collaborator,
    memory: &'a mut SessionMemory,
    validator: AsciiValidator,
    limiter: Option<Arc<RateLimiter>>,
    base_system: &'a str,
    config: RetryConfig,
    prompt: String,
    id: Uuid,
    system: String,
    history: FeedbackHistory,
    attempt: usize,
    budget: usize,
    ladder_failures: usize,
    hard_reset: bool,
    phase: Phase<'a>,
    pending: VecDeque<String>,
    result: Option<Generation>,
}

impl<'a> StreamRun<'a> {
    /// The next fragment, or `None` once the run is over.
    pub async fn next(&mut self) -> Option<String> {
        loop {
            if let Some(fragment) = self.pending.pop_front() {
                return Some(fragment);
            }
            match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Done => return None,
                Phase::Start => {
                    throttle(self.limiter.as_deref()).await;
                    tracing::debug!(generation = %self.id, attempt = self.attempt, "opening stream");
                    let collaborator: &'a Collaborator = self.collaborator;
                    self.phase = Phase::Streaming {
                        stream: collaborator.open_stream(&self.prompt, &self.system),
                        gate: StreamingGate::new(self.validator.mode()),
                        emitted: String::new(),
                    };
                }
                Phase::Streaming {
                    mut stream,
                    mut gate,
                    mut emitted,
                } => match stream.next().await {
                    Some(Ok(fragment)) => match classify_reply(fragment) {
                        Ok(fragment) => {
                            let forwarded = gate.process_chunk(&fragment);
                            if gate.is_stopped() {
                                tracing::info!(generation = %self.id, attempt = self.attempt, "gate stopped stream");
                                drop(stream);
                                self.finish_attempt(&gate, &emitted);
                                continue;
                            }
                            if !forwarded.is_empty() {
                                emitted.push_str(&forwarded);
                                self.pending.push_back(forwarded);
                            }
                            self.phase = Phase::Streaming {
                                stream,
                                gate,
                                emitted,
                            };
                        }
                        Err(err) => self.provider_failure(err),
                    },
                    Some(Err(err)) => self.provider_failure(err),
                    None => self.finish_attempt(&gate, &emitted),
                },
            }
        }
    }

    /// Drain every remaining fragment.
    pub async fn collect_all(mut self) -> (Vec<String>, Option<Generation>) {
        let mut fragments = Vec::new();
        while let Some(fragment) = self.next().await {
            fragments.push(fragment);
        }
        (fragments, self.result)
    }

    /// Available once the run has ended.
    pub fn result(&self) -> Option<&Generation> {
        self.result.as_ref()
    }

    pub fn attempts(&self) -> usize {
        self.attempt + 1
    }

    fn provider_failure(&mut self, err: ProviderError) {
        tracing::warn!(generation = %self.id, attempt = self.attempt, code = err.code(), "stream failed");
        if self.attempt + 1 >= self.budget {
            let sentinel = err.to_sentinel();
            self.pending.push_back(sentinel.clone());
            self.conclude(sentinel, false);
            return;
        }
        self.begin_retry();
    }

    fn finish_attempt(&mut self, gate: &StreamingGate, emitted: &str) {
        let mode = self.validator.mode();
        let raw = gate.accumulated();
        let (cleaned, verdict) = assess(&self.validator, raw, self.config.strict, Some(gate));

        if !verdict.needs_retry() {
            tracing::info!(generation = %self.id, attempts = self.attempt + 1, "candidate accepted");
            self.push_final(&cleaned, emitted);
            self.conclude(cleaned, true);
            return;
        }

        let ladder = mode == Mode::Art && verdict.is_ladder_failure();
        tracing::info!(
            generation = %self.id,
            attempt = self.attempt,
            errors = verdict.errors().len(),
            ladder,
            "candidate rejected"
        );

        if ladder {
            self.ladder_failures += 1;
            if self.hard_reset {
                tracing::warn!(generation = %self.id, "ladder output survived hard reset, aborting");
                let sentinel = format_sentinel(
                    VALIDATION_FAILED,
                    "Output kept collapsing into a repeating ladder pattern after a hard reset",
                );
                self.pending.push_back(sentinel.clone());
                self.conclude(sentinel, false);
                return;
            }
        }

        let used = self.attempt + 1;
        let escalate = ladder && self.ladder_failures >= 2;
        if escalate {
            tracing::info!(generation = %self.id, attempt = self.attempt, "escalating to hard reset");
            self.hard_reset = true;
            self.history.clear();
            self.system = hard_reset_prompt(self.base_system);
            if used >= self.budget {
                self.budget += 1;
            }
        }

        if used >= self.budget {
            tracing::warn!(generation = %self.id, attempts = used, "retry budget exhausted");
            self.push_final(&cleaned, emitted);
            self.conclude(cleaned, false);
            return;
        }

        if !escalate {
            let max_lines = self.validator.policy().max_lines;
            self.history
                .absorb(fixes_for(&verdict, raw.lines().count(), max_lines));
            self.system = self.history.layer_onto(self.base_system, mode);
        }
        self.begin_retry();
    }

    fn begin_retry(&mut self) {
        self.pending.push_back(RETRY_MARKER.to_string());
        self.attempt += 1;
        self.phase = Phase::Start;
    }

    fn push_final(&mut self, cleaned: &str, emitted: &str) {
        if normalize_block(cleaned) != normalize_block(emitted) {
            self.pending.push_back(format!("{FINAL_MARKER}\n{cleaned}"));
        }
    }

    fn conclude(&mut self, content: String, success: bool) {
        self.memory
            .add_interaction(&self.prompt, &content, self.validator.mode(), success);
        self.result = Some(Generation {
            content,
            success,
            attempts: self.attempt + 1,
        });
        self.phase = Phase::Done;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
