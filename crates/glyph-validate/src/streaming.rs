//! Incremental validation for streamed output.

use glyph_types::Mode;

use crate::{is_simple_pattern, normalize_line, AsciiValidator, ValidationOutcome};

/// Trailing window scanned for non-empty lines.
const WINDOW: usize = 10;
/// Non-empty lines compared by the repetition detector.
const SAMPLE: usize = 6;
/// Leading lines that must match when the pattern is simple.
const SIMPLE_RUN: usize = 4;

/// Filters each fragment against the mode whitelist and stops the stream once
/// the tail of the accumulated text falls into a repetitive loop.
///
/// Once stopped, nothing is ever emitted or accumulated again; the frozen
/// buffer is what [`StreamingGate::finalize`] cleans.
#[derive(Debug, Clone)]
pub struct StreamingGate {
    validator: AsciiValidator,
    accumulated: String,
    stopped: bool,
}

impl StreamingGate {
    pub fn new(mode: Mode) -> Self {
        Self {
            validator: AsciiValidator::new(mode),
            accumulated: String::new(),
            stopped: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.validator.mode()
    }

    /// Filter one fragment and return the text to forward. Empty once stopped.
    pub fn process_chunk(&mut self, chunk: &str) -> String {
        if self.stopped {
            return String::new();
        }

        let filtered = self.validator.filter_chunk(chunk);
        self.accumulated.push_str(&filtered);

        if self.detect_loop() {
            self.stopped = true;
            tracing::debug!(
                mode = %self.validator.mode(),
                accumulated = self.accumulated.len(),
                "streaming gate stopped on repetition"
            );
            return String::new();
        }
        filtered
    }

    fn detect_loop(&self) -> bool {
        let lines: Vec<&str> = self.accumulated.split('\n').collect();
        if lines.len() < SAMPLE {
            return false;
        }

        let window = &lines[lines.len().saturating_sub(WINDOW)..];
        let recent: Vec<String> = window
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| normalize_line(l))
            .collect();
        if recent.len() < SAMPLE {
            return false;
        }

        let sample = &recent[recent.len() - SAMPLE..];
        let first = &sample[0];
        if is_simple_pattern(first) && sample[..SIMPLE_RUN].iter().all(|l| l == first) {
            return true;
        }
        sample.iter().all(|l| l == first)
    }

    /// Stopped with the last sampled lines all identical, as opposed to the
    /// early stop on a short run of a simple pattern.
    pub fn stopped_on_full_run(&self) -> bool {
        if !self.stopped {
            return false;
        }
        let recent: Vec<String> = self
            .accumulated
            .split('\n')
            .filter(|l| !l.trim().is_empty())
            .map(normalize_line)
            .collect();
        if recent.len() < SAMPLE {
            return false;
        }
        let sample = &recent[recent.len() - SAMPLE..];
        sample.iter().all(|l| *l == sample[0])
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Full clean and validation of everything accumulated so far.
    pub fn finalize(&self) -> String {
        self.finalize_with_outcome().0
    }

    pub fn finalize_with_outcome(&self) -> (String, ValidationOutcome) {
        self.validator
            .validate_and_clean(&self.accumulated, false, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_disallowed_characters() {
        let mut gate = StreamingGate::new(Mode::Art);
        assert_eq!(gate.process_chunk("a█b\n"), "ab\n");
        assert_eq!(gate.accumulated(), "ab\n");
    }

    #[test]
    fn stops_on_simple_repetition() {
        let mut gate = StreamingGate::new(Mode::Art);
        for i in 0..5 {
            assert_eq!(gate.process_chunk("| |\n"), "| |\n", "chunk {i}");
        }
        assert_eq!(gate.process_chunk("| |\n"), "");
        assert!(gate.is_stopped());

        let frozen = gate.accumulated().to_string();
        assert_eq!(gate.process_chunk("new text\n"), "");
        assert_eq!(gate.accumulated(), frozen);
    }

    #[test]
    fn complex_lines_need_six_matches() {
        let mut gate = StreamingGate::new(Mode::Art);
        gate.process_chunk("head\n");
        for _ in 0..5 {
            gate.process_chunk("( o.o )\n");
        }
        assert!(!gate.is_stopped());
        gate.process_chunk("( o.o )\n");
        assert!(gate.is_stopped());
    }

    #[test]
    fn simple_pattern_stops_on_first_four() {
        let mut gate = StreamingGate::new(Mode::Art);
        for chunk in ["||\n", "||\n", "||\n", "||\n", "/\\_\n"] {
            gate.process_chunk(chunk);
        }
        assert!(!gate.is_stopped());
        gate.process_chunk("( )\n");
        assert!(gate.is_stopped());
    }

    #[test]
    fn short_simple_run_is_not_a_full_run() {
        let mut gate = StreamingGate::new(Mode::Art);
        let tree = "   /\\\n  /  \\\n /    \\\n/______\\\n   ||\n   ||\n   ||\n   ||\n  ====\n  ~~~~\n";
        for line in tree.split_inclusive('\n') {
            gate.process_chunk(line);
        }
        assert!(gate.is_stopped());
        assert!(!gate.stopped_on_full_run());
        assert!(gate.accumulated().ends_with("~~~~\n"));

        let mut gate = StreamingGate::new(Mode::Art);
        for _ in 0..6 {
            gate.process_chunk("( o.o )\n");
        }
        assert!(gate.stopped_on_full_run());
    }

    #[test]
    fn varied_content_flows_through() {
        let mut gate = StreamingGate::new(Mode::Art);
        let art = "  /\\_/\\\n ( o.o )\n  > ^ <\n /|   |\\\n(_|   |_)\n   ---\n";
        let mut forwarded = String::new();
        for c in art.chars() {
            forwarded.push_str(&gate.process_chunk(&c.to_string()));
        }
        assert!(!gate.is_stopped());
        assert_eq!(forwarded, art);
    }

    #[test]
    fn finalize_runs_full_clean() {
        let mut gate = StreamingGate::new(Mode::Diagram);
        gate.process_chunk("┌───┐\n");
        gate.process_chunk("│ A │\n");
        let (cleaned, outcome) = gate.finalize_with_outcome();
        assert_eq!(cleaned, "┌───┐\n│ A │\n└───┘");
        assert!(outcome.is_valid());
        assert_eq!(gate.finalize(), cleaned);
    }
}
