//! Structural analysis: rule checks over a complete text blob.
//!
//! Each [`Check`] inspects a pre-split [`Document`] and reports [`Finding`]s.
//! Checks run in a fixed priority order and never short-circuit, except for the
//! empty-content check which ends analysis immediately.

use std::collections::{BTreeSet, HashMap, HashSet};

use glyph_types::Mode;

use crate::policy::{is_arrow, is_drawing_glyph, PolicyConfig, CORNERS};
use crate::{normalize_line, ValidationOutcome};

// ---------------------------------------------------------------------------
// Finding types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct Finding {
    pub check: &'static str,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    fn error(check: &'static str, message: impl Into<String>) -> Self {
        Self {
            check,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(check: &'static str, message: impl Into<String>) -> Self {
        Self {
            check,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Content split once and shared by every check.
pub struct Document<'a> {
    pub content: &'a str,
    pub lines: Vec<&'a str>,
    /// Lines with visible content, untrimmed.
    pub non_empty: Vec<&'a str>,
    /// `non_empty` with all whitespace removed.
    pub normalized: Vec<String>,
}

impl<'a> Document<'a> {
    pub fn new(content: &'a str) -> Self {
        let body = content.strip_suffix('\n').unwrap_or(content);
        let lines: Vec<&str> = body.split('\n').collect();
        let non_empty: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|l| !l.trim().is_empty())
            .collect();
        let normalized = non_empty.iter().map(|l| normalize_line(l)).collect();
        Self {
            content,
            lines,
            non_empty,
            normalized,
        }
    }
}

pub(crate) fn indentation(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn width(line: &str) -> usize {
    line.chars().count()
}

// ---------------------------------------------------------------------------
// Check trait
// ---------------------------------------------------------------------------

pub trait Check: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, doc: &Document<'_>, policy: &PolicyConfig) -> Vec<Finding>;
}

// ---------------------------------------------------------------------------
// Size and character checks
// ---------------------------------------------------------------------------

struct LineCountCheck;
impl Check for LineCountCheck {
    fn name(&self) -> &'static str {
        "line_count"
    }
    fn apply(&self, doc: &Document<'_>, policy: &PolicyConfig) -> Vec<Finding> {
        if doc.lines.len() > policy.max_lines {
            vec![Finding::error(
                self.name(),
                format!(
                    "Exceeds maximum {} lines (has {} lines)",
                    policy.max_lines,
                    doc.lines.len()
                ),
            )]
        } else {
            vec![]
        }
    }
}

struct CharacterCheck;
impl Check for CharacterCheck {
    fn name(&self) -> &'static str {
        "characters"
    }
    fn apply(&self, doc: &Document<'_>, policy: &PolicyConfig) -> Vec<Finding> {
        let invalid: BTreeSet<char> = doc
            .lines
            .iter()
            .flat_map(|l| l.chars())
            .filter(|c| !policy.allows(*c))
            .collect();
        if invalid.is_empty() {
            return vec![];
        }
        let listed = invalid
            .iter()
            .map(|c| format!("'{}' (U+{:04X})", c.escape_debug(), *c as u32))
            .collect::<Vec<_>>()
            .join(", ");
        vec![Finding::error(
            self.name(),
            format!("Contains disallowed characters: {listed}"),
        )]
    }
}

struct WidthCheck;
impl Check for WidthCheck {
    fn name(&self) -> &'static str {
        "width"
    }
    fn apply(&self, doc: &Document<'_>, policy: &PolicyConfig) -> Vec<Finding> {
        let too_wide: Vec<(usize, usize)> = doc
            .lines
            .iter()
            .enumerate()
            .map(|(i, l)| (i + 1, width(l)))
            .filter(|(_, w)| *w > policy.max_width)
            .collect();
        if too_wide.is_empty() {
            return vec![];
        }
        let details = too_wide
            .iter()
            .take(3)
            .map(|(i, w)| format!("line {i}: {w} chars"))
            .collect::<Vec<_>>()
            .join(", ");
        vec![Finding::error(
            self.name(),
            format!(
                "Line width exceeds maximum of {} chars: {details}",
                policy.max_width
            ),
        )]
    }
}

// ---------------------------------------------------------------------------
// Formatting checks
// ---------------------------------------------------------------------------

struct AlignmentCheck;
impl Check for AlignmentCheck {
    fn name(&self) -> &'static str {
        "alignment"
    }
    fn apply(&self, doc: &Document<'_>, _policy: &PolicyConfig) -> Vec<Finding> {
        let levels: HashSet<usize> = doc.non_empty.iter().map(|l| indentation(l)).collect();
        if levels.len() > 1 {
            vec![Finding::warning(
                self.name(),
                format!(
                    "Inconsistent alignment: found {} different indentation levels",
                    levels.len()
                ),
            )]
        } else {
            vec![]
        }
    }
}

struct TrailingWhitespaceCheck;
impl Check for TrailingWhitespaceCheck {
    fn name(&self) -> &'static str {
        "trailing_whitespace"
    }
    fn apply(&self, doc: &Document<'_>, _policy: &PolicyConfig) -> Vec<Finding> {
        let count = doc
            .lines
            .iter()
            .filter(|l| !l.is_empty() && l.trim_end() != **l)
            .count();
        if count > 0 {
            vec![Finding::warning(
                self.name(),
                format!("Found trailing whitespace on {count} line(s)"),
            )]
        } else {
            vec![]
        }
    }
}

struct MarkdownFenceCheck;
impl Check for MarkdownFenceCheck {
    fn name(&self) -> &'static str {
        "markdown_fence"
    }
    fn apply(&self, doc: &Document<'_>, _policy: &PolicyConfig) -> Vec<Finding> {
        let trimmed = doc.content.trim();
        if trimmed.starts_with("```") || trimmed.ends_with("```") {
            vec![Finding::error(
                self.name(),
                "Contains markdown code block artifacts (```) - output must be pure ASCII",
            )]
        } else {
            vec![]
        }
    }
}

struct ProseCheck;
impl Check for ProseCheck {
    fn name(&self) -> &'static str {
        "prose"
    }
    fn apply(&self, doc: &Document<'_>, _policy: &PolicyConfig) -> Vec<Finding> {
        let prose = doc
            .non_empty
            .iter()
            .map(|l| l.trim())
            .filter(|l| {
                width(l) > 40 && l.split_whitespace().count() > 6 && !l.chars().any(is_drawing_glyph)
            })
            .count();
        if prose > 2 {
            vec![Finding::warning(
                self.name(),
                format!("May contain explanatory text instead of pure ASCII art ({prose} prose-like lines)"),
            )]
        } else {
            vec![]
        }
    }
}

// ---------------------------------------------------------------------------
// Art-only quality heuristics
// ---------------------------------------------------------------------------

const LOW_SIGNAL: [char; 5] = ['|', '-', '_', '/', '\\'];

struct ArtQualityCheck;
impl Check for ArtQualityCheck {
    fn name(&self) -> &'static str {
        "art_quality"
    }
    fn apply(&self, doc: &Document<'_>, policy: &PolicyConfig) -> Vec<Finding> {
        let total = doc.non_empty.len();
        if policy.mode != Mode::Art || total < 3 {
            return vec![];
        }
        let mut findings = Vec::new();

        let distinct: HashSet<&str> = doc.normalized.iter().map(String::as_str).collect();
        if total > 10 && distinct.len() < 3 {
            findings.push(Finding::error(
                self.name(),
                "Output appears broken: stuck in repetitive loop (degenerate template/ladder)",
            ));
        }

        let features: HashSet<char> = doc
            .non_empty
            .iter()
            .flat_map(|l| l.chars())
            .filter(|c| !c.is_whitespace() && !LOW_SIGNAL.contains(c))
            .collect();
        if features.len() < 2 && total > 5 {
            findings.push(Finding::warning(
                self.name(),
                "Low character diversity: add distinctive features (eyes, mouth, texture)",
            ));
        }

        let lengths: HashSet<usize> = doc.non_empty.iter().map(|l| width(l.trim())).collect();
        if lengths.len() < 2 && total > 5 {
            findings.push(Finding::warning(
                self.name(),
                "Low structural variety: every line has the same length",
            ));
        }

        let asymmetric = doc.non_empty.iter().filter(|l| is_lopsided(l.trim())).count();
        if asymmetric * 10 > total * 3 {
            findings.push(Finding::warning(
                self.name(),
                format!("Poor symmetry: {asymmetric} of {total} lines are lopsided"),
            ));
        }

        findings
    }
}

/// One half carries more than twice the ink of the other.
fn is_lopsided(stripped: &str) -> bool {
    let chars: Vec<char> = stripped.chars().collect();
    if chars.len() <= 3 {
        return false;
    }
    let (left, right) = chars.split_at(chars.len() / 2);
    let ink = |half: &[char]| half.iter().filter(|c| !c.is_whitespace()).count();
    let (l, r) = (ink(left), ink(right));
    l.max(r) > 2 * l.min(r)
}

// ---------------------------------------------------------------------------
// Diagram box structure
// ---------------------------------------------------------------------------

struct BoxStructureCheck;
impl Check for BoxStructureCheck {
    fn name(&self) -> &'static str {
        "box_structure"
    }
    fn apply(&self, doc: &Document<'_>, policy: &PolicyConfig) -> Vec<Finding> {
        if policy.mode != Mode::Diagram || !doc.content.contains(['┌', '┐', '└', '┘', '─', '│']) {
            return vec![];
        }
        let mut findings = Vec::new();

        if doc.content.contains(CORNERS) {
            let count = |c: char| doc.content.chars().filter(|x| *x == c).count();
            let (tl, tr, bl, br) = (count('┌'), count('┐'), count('└'), count('┘'));
            if tl != bl || tr != br {
                findings.push(Finding::error(
                    self.name(),
                    format!(
                        "Incomplete box structures: {tl} top-left corners but {bl} bottom-left, \
                         {tr} top-right but {br} bottom-right. Every box must have all 4 corners complete."
                    ),
                ));
            }
        }

        for (i, line) in doc.lines.iter().enumerate() {
            if !line.chars().any(is_arrow) {
                continue;
            }
            let parts: Vec<&str> = line.split('│').collect();
            if parts.len() <= 2 {
                continue;
            }
            for part in &parts[1..parts.len() - 1] {
                if part.chars().any(is_arrow) {
                    findings.push(Finding::warning(
                        self.name(),
                        format!(
                            "Arrow found inside box on line {}. Arrows should be between boxes, not inside them.",
                            i + 1
                        ),
                    ));
                }
            }
        }

        if has_duplicate_box_rows(&doc.lines) {
            findings.push(Finding::warning(
                self.name(),
                "Box contains duplicate content lines - each line should be unique",
            ));
        }

        findings
    }
}

fn has_duplicate_box_rows(lines: &[&str]) -> bool {
    let mut in_box = false;
    let mut seen: HashSet<String> = HashSet::new();
    for line in lines {
        if line.contains('┌') && line.contains('┐') {
            in_box = true;
            seen.clear();
        } else if line.contains('└') && line.contains('┘') {
            in_box = false;
            seen.clear();
        } else if in_box && line.contains('│') {
            let text = box_row_text(line).trim().to_lowercase();
            if !text.is_empty() && !seen.insert(text) {
                return true;
            }
        }
    }
    false
}

fn box_row_text(line: &str) -> String {
    let parts: Vec<&str> = line.split('│').collect();
    if parts.len() >= 3 {
        parts[1..parts.len() - 1].concat()
    } else {
        line.to_string()
    }
}

// ---------------------------------------------------------------------------
// Cross-mode degeneracy checks
// ---------------------------------------------------------------------------

struct ConsecutiveRepetitionCheck;
impl Check for ConsecutiveRepetitionCheck {
    fn name(&self) -> &'static str {
        "consecutive_repetition"
    }
    fn apply(&self, doc: &Document<'_>, _policy: &PolicyConfig) -> Vec<Finding> {
        let longest = longest_run(&doc.normalized);
        if longest > 10 {
            vec![Finding::error(
                self.name(),
                format!("Extreme repetition detected: {longest} consecutive identical lines"),
            )]
        } else {
            vec![]
        }
    }
}

pub(crate) fn longest_run(normalized: &[String]) -> usize {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<&str> = None;
    for line in normalized {
        if previous == Some(line.as_str()) {
            run += 1;
        } else {
            run = 1;
            previous = Some(line);
        }
        longest = longest.max(run);
    }
    longest
}

struct PatternRepetitionCheck;
impl Check for PatternRepetitionCheck {
    fn name(&self) -> &'static str {
        "pattern_repetition"
    }
    fn apply(&self, doc: &Document<'_>, _policy: &PolicyConfig) -> Vec<Finding> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for line in &doc.normalized {
            let entry = counts.entry(line.as_str()).or_insert(0);
            if *entry == 0 {
                order.push(line);
            }
            *entry += 1;
        }
        // First-seen pattern wins ties.
        let mut best: Option<(&str, usize)> = None;
        for pattern in order {
            let n = counts[pattern];
            if best.map_or(true, |(_, m)| n > m) {
                best = Some((pattern, n));
            }
        }
        match best {
            Some((pattern, n)) if n >= 15 => {
                let preview: String = pattern.chars().take(15).collect();
                vec![Finding::error(
                    self.name(),
                    format!("Extreme pattern repetition: '{preview}' appears {n} times"),
                )]
            }
            _ => vec![],
        }
    }
}

struct DensityCheck;
impl Check for DensityCheck {
    fn name(&self) -> &'static str {
        "density"
    }
    fn apply(&self, doc: &Document<'_>, _policy: &PolicyConfig) -> Vec<Finding> {
        if doc.non_empty.len() < 3 {
            return vec![];
        }
        let sum: f64 = doc
            .non_empty
            .iter()
            .map(|l| {
                let total = width(l);
                let filled = l.chars().filter(|c| !c.is_whitespace()).count();
                filled as f64 / total as f64
            })
            .sum();
        let ratio = sum / doc.non_empty.len() as f64;
        if ratio > 0.90 {
            vec![Finding::error(
                self.name(),
                format!(
                    "Extremely dense ({}% filled) - likely broken output",
                    (ratio * 100.0) as u32
                ),
            )]
        } else {
            vec![]
        }
    }
}

struct TruncationCheck;
impl Check for TruncationCheck {
    fn name(&self) -> &'static str {
        "truncation"
    }
    fn apply(&self, doc: &Document<'_>, _policy: &PolicyConfig) -> Vec<Finding> {
        let Some(last) = doc.non_empty.last().map(|l| l.trim()) else {
            return vec![];
        };
        let Some(open) = last.chars().last() else {
            return vec![];
        };
        let close = match open {
            '(' => ')',
            '[' => ']',
            '{' => '}',
            _ => return vec![],
        };
        let opens = last.chars().filter(|c| *c == open).count();
        let closes = last.chars().filter(|c| *c == close).count();
        if opens > closes {
            vec![Finding::error(
                self.name(),
                format!("Output appears incomplete or cut off - last line ends with an unclosed '{open}'"),
            )]
        } else {
            vec![]
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

static CHECKS: &[&dyn Check] = &[
    &LineCountCheck,
    &CharacterCheck,
    &WidthCheck,
    &AlignmentCheck,
    &TrailingWhitespaceCheck,
    &MarkdownFenceCheck,
    &ProseCheck,
    &ArtQualityCheck,
    &BoxStructureCheck,
    &ConsecutiveRepetitionCheck,
    &PatternRepetitionCheck,
    &DensityCheck,
    &TruncationCheck,
];

/// Run every check. Empty content yields a single error and nothing else.
pub fn analyze(content: &str, policy: &PolicyConfig) -> Vec<Finding> {
    if content.trim().is_empty() {
        return vec![Finding::error("empty", "Content is empty")];
    }
    let doc = Document::new(content);
    CHECKS
        .iter()
        .flat_map(|check| check.apply(&doc, policy))
        .collect()
}

pub fn validate(content: &str, policy: &PolicyConfig, strict: bool) -> ValidationOutcome {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for finding in analyze(content, policy) {
        match finding.severity {
            Severity::Error => errors.push(finding.message),
            Severity::Warning => warnings.push(finding.message),
        }
    }

    let mut is_valid = errors.is_empty();
    if strict && !warnings.is_empty() {
        is_valid = false;
    }
    // Broken art is never valid, whatever else the flags say.
    if policy.mode == Mode::Art
        && errors.iter().any(|e| {
            let e = e.to_lowercase();
            e.contains("broken") || e.contains("repetitive")
        })
    {
        is_valid = false;
    }

    tracing::debug!(
        mode = %policy.mode,
        errors = errors.len(),
        warnings = warnings.len(),
        is_valid,
        "validated content"
    );

    ValidationOutcome::from_parts(is_valid, errors, warnings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn art() -> PolicyConfig {
        PolicyConfig::resolve(Mode::Art)
    }

    fn diagram() -> PolicyConfig {
        PolicyConfig::resolve(Mode::Diagram)
    }

    // Test 1: Empty content short-circuits
    #[test]
    fn empty_content_single_error() {
        let out = validate("   \n\n", &art(), false);
        assert!(!out.is_valid());
        assert_eq!(out.errors(), ["Content is empty"]);
        assert!(out.warnings().is_empty());
    }

    // Test 2: Line limit reports actual vs limit
    #[test]
    fn too_many_lines() {
        let content = (0..25).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let out = validate(&content, &art(), false);
        assert!(out.errors().iter().any(|e| e == "Exceeds maximum 20 lines (has 25 lines)"));
    }

    // Test 3: A single trailing newline does not count as a line
    #[test]
    fn trailing_newline_not_counted() {
        let content = "ab\n".repeat(20);
        let out = validate(&content, &art(), false);
        assert!(!out.errors().iter().any(|e| e.contains("Exceeds maximum")));
    }

    // Test 4: Disallowed characters are reported once each, sorted, with codepoints
    #[test]
    fn disallowed_characters_deduplicated() {
        let out = validate("a█b█\n┌c", &art(), false);
        let err = out
            .errors()
            .iter()
            .find(|e| e.starts_with("Contains disallowed characters"))
            .unwrap();
        assert_eq!(
            err,
            "Contains disallowed characters: '┌' (U+250C), '█' (U+2588)"
        );
    }

    // Test 5: Width overflow names at most three lines
    #[test]
    fn width_overflow_lists_first_three() {
        let wide = "x ".repeat(45);
        let content = vec![wide.as_str(); 5].join("\n");
        let out = validate(&content, &art(), false);
        let err = out.errors().iter().find(|e| e.contains("width")).unwrap();
        assert!(err.contains("line 1: 90 chars"));
        assert!(err.contains("line 3: 90 chars"));
        assert!(!err.contains("line 4"));
    }

    // Test 6: Width counts characters, not bytes
    #[test]
    fn width_counts_chars() {
        let line = format!("┌{}┐", "─".repeat(78));
        let out = validate(&line, &diagram(), false);
        assert!(!out.errors().iter().any(|e| e.contains("width")));
    }

    // Test 7: Alignment and trailing whitespace are warnings only
    #[test]
    fn formatting_warnings() {
        let out = validate("  /\\ \n /  \\\n/____\\", &art(), false);
        assert!(out.is_valid());
        assert!(out.warnings().iter().any(|w| w.contains("3 different indentation levels")));
        assert!(out.warnings().iter().any(|w| w == "Found trailing whitespace on 1 line(s)"));
    }

    // Test 8: Strict mode turns warnings into invalidity
    #[test]
    fn strict_mode_fails_on_warnings() {
        let content = " /\\\n/  \\";
        assert!(validate(content, &art(), false).is_valid());
        let strict = validate(content, &art(), true);
        assert!(!strict.is_valid());
        assert!(strict.errors().is_empty());
    }

    // Test 9: Markdown fences are errors
    #[test]
    fn markdown_fence_error() {
        let out = validate("```\n( o.o )\n```", &art(), false);
        assert!(out.errors().iter().any(|e| e.contains("markdown")));
    }

    // Test 10: Prose detection needs more than two sentence-like lines
    #[test]
    fn prose_warning() {
        let sentence = "This is a picture of a cat sitting quietly on a mat today";
        let two = format!("{sentence}\n{sentence}\n( o.o )");
        assert!(!validate(&two, &art(), false)
            .warnings()
            .iter()
            .any(|w| w.contains("explanatory")));
        let three = format!("{sentence}\n{sentence}\n{sentence}");
        assert!(validate(&three, &art(), false)
            .warnings()
            .iter()
            .any(|w| w.contains("explanatory")));
    }

    // Test 11: Degenerate ladder output in art mode
    #[test]
    fn degenerate_ladder_error() {
        let content = "/ /| |\\ \\\n".repeat(12);
        let out = validate(&content, &art(), false);
        assert!(!out.is_valid());
        assert!(out.errors().iter().any(|e| e.contains("degenerate")));
        assert!(out.errors().iter().any(|e| e.contains("12 consecutive identical lines")));
    }

    // Test 12: Low diversity and variety warnings
    #[test]
    fn diversity_and_variety_warnings() {
        let content = "|--|\n|__|\n|--|\n|__|\n|/\\|\n|\\/|";
        let out = validate(content, &art(), false);
        assert!(out.warnings().iter().any(|w| w.contains("feature")));
        assert!(out.warnings().iter().any(|w| w.contains("structural variety")));
    }

    // Test 13: Lopsided lines trigger the symmetry warning
    #[test]
    fn symmetry_warning() {
        let content = "####   o\n####    o\n###     o\n( o.o )";
        let out = validate(content, &art(), false);
        assert!(out.warnings().iter().any(|w| w.contains("symmetry")));
        assert!(is_lopsided("####   o"));
        assert!(!is_lopsided("( o.o )"));
        assert!(!is_lopsided("abc"));
    }

    // Test 14: Art heuristics do not run for other modes
    #[test]
    fn art_heuristics_art_only() {
        let content = "ab\n".repeat(12);
        let out = validate(&content, &PolicyConfig::resolve(Mode::Chart), false);
        assert!(!out.errors().iter().any(|e| e.contains("degenerate")));
        assert!(out.errors().iter().any(|e| e.contains("Extreme repetition")));
    }

    // Test 15: Corner imbalance in diagrams
    #[test]
    fn corner_imbalance_error() {
        let out = validate("┌───────┐\n│ Hello │\n│ World │\n", &diagram(), false);
        assert!(!out.is_valid());
        let err = out.errors().iter().find(|e| e.contains("corner")).unwrap();
        assert!(err.to_lowercase().contains("incomplete"));
        assert!(err.contains("1 top-left corners but 0 bottom-left"));
    }

    // Test 16: Balanced diagram passes
    #[test]
    fn balanced_diagram_valid() {
        let content = "┌──────┐\n│ API  │\n└──────┘\n    ↓\n┌──────┐\n│ DB   │\n└──────┘";
        let out = validate(content, &diagram(), false);
        assert!(out.is_valid(), "{:?}", out.errors());
    }

    // Test 17: Arrows inside a box are flagged per occurrence
    #[test]
    fn arrow_inside_box_warning() {
        let content = "┌──────────┐\n│ A → B    │\n└──────────┘";
        let out = validate(content, &diagram(), false);
        assert!(out.warnings().iter().any(|w| w.contains("Arrow found inside box on line 2")));
    }

    // Test 18: Duplicate rows inside one box
    #[test]
    fn duplicate_box_rows_warning() {
        let content = "┌────────┐\n│ Server │\n│ server │\n└────────┘";
        let out = validate(content, &diagram(), false);
        assert!(out.warnings().iter().any(|w| w.contains("duplicate content")));

        let blank_rows = "┌────────┐\n│        │\n│ Server │\n│        │\n└────────┘";
        let out = validate(blank_rows, &diagram(), false);
        assert!(!out.warnings().iter().any(|w| w.contains("duplicate content")));
    }

    // Test 19: Pattern repetition across non-consecutive lines
    #[test]
    fn pattern_repetition_error() {
        let content = (0..30)
            .map(|i| if i % 2 == 0 { "<==>" } else { "  o  o" })
            .collect::<Vec<_>>()
            .join("\n");
        let out = validate(&content, &PolicyConfig::resolve(Mode::Logo), false);
        assert!(out
            .errors()
            .iter()
            .any(|e| e == "Extreme pattern repetition: '<==>' appears 15 times"));
    }

    // Test 20: Density over 90% is broken output
    #[test]
    fn density_error() {
        let content = "##########\n##########\n#########";
        let out = validate(content, &art(), false);
        assert!(out.errors().iter().any(|e| e.contains("Extremely dense")));

        let two_lines = "##########\n##########";
        assert!(!validate(two_lines, &art(), false)
            .errors()
            .iter()
            .any(|e| e.contains("dense")));
    }

    // Test 21: Unclosed bracket on the last line signals truncation
    #[test]
    fn truncation_error() {
        let out = validate(" /\\_/\\\n( o.o )\n > ^ <\n  (", &art(), false);
        assert!(out.errors().iter().any(|e| e.contains("incomplete or cut off")));
    }

    // Test 22: Short signatures and closed brackets are not truncation
    #[test]
    fn signature_not_truncation() {
        let out = validate(" /\\_/\\\n( o.o )\n > ^ <\n  jgs", &art(), false);
        assert!(!out.errors().iter().any(|e| e.contains("cut off")));
        let out = validate(" /\\_/\\\n( o.o )\n [ok]", &art(), false);
        assert!(!out.errors().iter().any(|e| e.contains("cut off")));
    }

    #[test]
    fn longest_run_counts() {
        let lines: Vec<String> = ["a", "a", "b", "a", "a", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(longest_run(&lines), 3);
        assert_eq!(longest_run(&[]), 0);
    }
}
