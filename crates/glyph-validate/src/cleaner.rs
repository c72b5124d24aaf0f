//! Deterministic repair of generated text.
//!
//! Art-family modes (art, logo) get the conservative strategy: repetition is
//! capped generously and indentation is treated as shape. Chart and diagram get
//! the normalizing strategy: tight repetition caps, flush indentation, and box
//! geometry repair.

use std::collections::HashMap;

use crate::analyzer::indentation;
use crate::policy::{is_box_row_glyph, PolicyConfig};
use crate::{is_simple_pattern, normalize_line};

/// Identical lines kept in a run before the art cleaner stops copying.
const CONSERVATIVE_CAP: usize = 10;
const SIMPLE_PATTERN_CAP: usize = 4;
const COMPLEX_PATTERN_CAP: usize = 5;

/// Indentation above the minimum beyond which an art line is treated as noise.
const EXTREME_INDENT: usize = 10;

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

pub fn clean(content: &str, policy: &PolicyConfig) -> String {
    let lines = strip_fences(content);
    if lines.is_empty() {
        return String::new();
    }
    let lines_in = lines.len();
    let structured = policy.mode.is_structured();

    let lines = if structured {
        cap_aggressive(lines)
    } else {
        cap_conservative(lines)
    };
    let lines = if structured {
        flush_to_minimum(lines)
    } else {
        pull_extreme_indents(pad_outliers(lines))
    };
    let lines = substitute_disallowed(lines, policy);
    let lines = truncate_lines(lines, policy);
    let lines = if structured {
        complete_incomplete_boxes(&normalize_box_widths(lines))
    } else {
        lines
    };
    let mut lines = truncate_width(lines, policy.max_width);
    let leading = lines.iter().take_while(|l| l.trim().is_empty()).count();
    lines.drain(..leading);
    drop_trailing_blank(&mut lines);

    tracing::debug!(
        mode = %policy.mode,
        lines_in,
        lines_out = lines.len(),
        "cleaned content"
    );
    lines.join("\n")
}

/// Fence removal, right-trim, and conservative capping only.
pub fn clean_minimal(content: &str) -> String {
    cap_conservative(strip_fences(content)).join("\n")
}

// ---------------------------------------------------------------------------
// Steps 1-2: fences and whitespace
// ---------------------------------------------------------------------------

fn strip_fences(content: &str) -> Vec<String> {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = normalized
        .split('\n')
        .filter(|l| !l.trim_start().starts_with("```"))
        .map(|l| l.trim_end().to_string())
        .collect();

    let leading = lines.iter().take_while(|l| l.is_empty()).count();
    lines.drain(..leading);
    drop_trailing_blank(&mut lines);
    lines
}

fn drop_trailing_blank(lines: &mut Vec<String>) {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
}

// ---------------------------------------------------------------------------
// Step 3: repetition capping
// ---------------------------------------------------------------------------

/// Copy lines until a run of identical lines passes the cap, then stop entirely.
fn cap_conservative(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut previous: Option<String> = None;
    let mut run = 0;

    for line in lines {
        if line.trim().is_empty() {
            if !out.is_empty() {
                out.push(line);
            }
            continue;
        }
        let norm = normalize_line(&line);
        if previous.as_deref() == Some(norm.as_str()) {
            run += 1;
            if run > CONSERVATIVE_CAP {
                break;
            }
        } else {
            run = 1;
            previous = Some(norm);
        }
        out.push(line);
    }

    drop_trailing_blank(&mut out);
    out
}

/// Skip lines past a complexity-dependent cap and keep scanning.
fn cap_aggressive(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut previous: Option<String> = None;
    let mut run = 0;

    for line in lines {
        if line.trim().is_empty() {
            if !out.is_empty() {
                out.push(line);
            }
            continue;
        }
        let norm = normalize_line(&line);
        let cap = if is_simple_pattern(&norm) {
            SIMPLE_PATTERN_CAP
        } else {
            COMPLEX_PATTERN_CAP
        };
        if previous.as_deref() == Some(norm.as_str()) {
            run += 1;
            if run > cap {
                continue;
            }
        } else {
            run = 1;
            previous = Some(norm);
        }
        out.push(line);
    }

    drop_trailing_blank(&mut out);
    out
}

// ---------------------------------------------------------------------------
// Step 4: alignment
// ---------------------------------------------------------------------------

fn min_indent(lines: &[String]) -> Option<usize> {
    lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indentation(l))
        .min()
}

fn reindent(line: &str, indent: usize) -> String {
    format!("{}{}", " ".repeat(indent), line.trim_start())
}

fn flush_to_minimum(lines: Vec<String>) -> Vec<String> {
    let Some(min) = min_indent(&lines) else {
        return lines;
    };
    lines
        .into_iter()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                reindent(&l, min)
            }
        })
        .collect()
}

fn pull_extreme_indents(lines: Vec<String>) -> Vec<String> {
    let Some(min) = min_indent(&lines) else {
        return lines;
    };
    lines
        .into_iter()
        .map(|l| {
            if !l.trim().is_empty() && indentation(&l) > min + EXTREME_INDENT {
                reindent(&l, min)
            } else {
                l
            }
        })
        .collect()
}

/// Pad a small minority of flush-left lines up to the dominant indentation.
///
/// Only acts when at least one non-empty line sits at indentation 0, the most
/// common indentation is above 0 and held by at least half of the non-empty
/// lines, and the flush lines are at most a quarter of them. Never removes
/// characters.
pub fn pad_outliers(lines: Vec<String>) -> Vec<String> {
    let indents: Vec<(usize, usize)> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i, indentation(l)))
        .collect();

    let mut counts: HashMap<usize, usize> = HashMap::new();
    let mut dominant: Option<(usize, usize)> = None;
    for (_, indent) in &indents {
        *counts.entry(*indent).or_insert(0) += 1;
    }
    for (_, indent) in &indents {
        let n = counts[indent];
        if dominant.map_or(true, |(_, best)| n > best) {
            dominant = Some((*indent, n));
        }
    }
    let Some((dominant, held)) = dominant else {
        return lines;
    };
    if held * 2 < indents.len() {
        return lines;
    }

    let outliers: Vec<usize> = indents
        .iter()
        .filter(|(_, indent)| *indent == 0)
        .map(|(i, _)| *i)
        .collect();
    if dominant == 0 || outliers.is_empty() || outliers.len() * 4 > indents.len() {
        return lines;
    }

    let mut lines = lines;
    for i in outliers {
        lines[i] = format!("{}{}", " ".repeat(dominant), lines[i]);
    }
    lines
}

// ---------------------------------------------------------------------------
// Steps 5-6: characters and line budget
// ---------------------------------------------------------------------------

fn substitute_disallowed(lines: Vec<String>, policy: &PolicyConfig) -> Vec<String> {
    lines
        .into_iter()
        .map(|l| {
            if l.chars().all(|c| policy.allows(c)) {
                return l;
            }
            let replaced: String = l
                .chars()
                .map(|c| if policy.allows(c) { c } else { ' ' })
                .collect();
            replaced.trim_end().to_string()
        })
        .collect()
}

fn truncate_lines(mut lines: Vec<String>, policy: &PolicyConfig) -> Vec<String> {
    if lines.len() <= policy.max_lines {
        return lines;
    }
    let tail = &lines[lines.len().saturating_sub(3)..];
    let keeps_border = policy.mode.is_structured()
        && tail.iter().any(|l| l.contains(['└', '┘', '─']));
    let keep = if keeps_border {
        (policy.max_lines + 2).min(lines.len())
    } else {
        policy.max_lines
    };
    lines.truncate(keep);
    lines
}

// ---------------------------------------------------------------------------
// Step 7: box width normalization
// ---------------------------------------------------------------------------

fn is_box_row(line: &str) -> bool {
    line.chars().any(is_box_row_glyph)
}

/// Pad each run of box rows to the run's widest row.
pub fn normalize_box_widths(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut group: Vec<String> = Vec::new();

    for line in lines {
        if is_box_row(&line) {
            group.push(line);
        } else {
            out.extend(pad_box_group(std::mem::take(&mut group)));
            out.push(line);
        }
    }
    out.extend(pad_box_group(group));
    out
}

fn pad_box_group(group: Vec<String>) -> Vec<String> {
    let Some(target) = group.iter().map(|l| l.chars().count()).max() else {
        return group;
    };
    group
        .into_iter()
        .map(|line| pad_box_row(line, target))
        .collect()
}

fn pad_box_row(line: String, target: usize) -> String {
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();
    if len >= target {
        return line;
    }
    let pad = target - len;
    let prefix: String = chars[..len - 1].iter().collect();

    match chars[len - 1] {
        '│' => format!("{prefix}{}│", " ".repeat(pad)),
        close @ ('┐' | '┘' | '┤') if len >= 2 && chars[len - 2] == '─' => {
            format!("{prefix}{}{close}", "─".repeat(pad))
        }
        '─' => match open_corner_without_close(&chars) {
            Some(open) => {
                let close = if open == '┌' { '┐' } else { '┘' };
                format!("{line}{}{close}", "─".repeat(pad - 1))
            }
            None => line,
        },
        _ => line,
    }
}

/// The rightmost `┌`/`└` when no closing corner follows it.
fn open_corner_without_close(chars: &[char]) -> Option<char> {
    let pos = chars.iter().rposition(|c| matches!(c, '┌' | '└'))?;
    let closed = chars[pos + 1..].iter().any(|c| matches!(c, '┐' | '┘'));
    (!closed).then_some(chars[pos])
}

// ---------------------------------------------------------------------------
// Step 8: box completion
// ---------------------------------------------------------------------------

fn continues_box(line: &str) -> bool {
    line.contains(['│', '├', '┤', '└', '┘', '┬', '┴', '┼'])
}

/// Append a bottom border to every box whose `└…┘` never arrives.
///
/// A box opens on a line containing `┌` and runs while the following lines
/// carry box glyphs. If it ends without a line holding both `└` and `┘`, a
/// border matching the top line's `┌…┐` span is appended.
pub fn complete_incomplete_boxes(lines: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        if !lines[i].contains('┌') {
            out.push(lines[i].clone());
            i += 1;
            continue;
        }

        let start = i;
        let mut j = i;
        let mut closed = false;
        while j < lines.len() {
            let current = &lines[j];
            j += 1;
            if current.contains('└') && current.contains('┘') {
                closed = true;
                break;
            }
            match lines.get(j) {
                Some(next) if continues_box(next) => {}
                _ => break,
            }
        }

        out.extend(lines[start..j].iter().cloned());
        if !closed {
            if let Some(border) = bottom_border_for(&lines[start]) {
                out.push(border);
            }
        }
        i = j;
    }

    out
}

/// One `└…┘` under each `┌…┐` span of the top line.
fn bottom_border_for(top: &str) -> Option<String> {
    let mut border = String::new();
    let mut open = false;
    for c in top.chars() {
        match c {
            '┌' => {
                border.push('└');
                open = true;
            }
            '┐' if open => {
                border.push('┘');
                open = false;
            }
            _ if open => border.push('─'),
            _ => border.push(' '),
        }
    }
    // A trailing `┌` without its `┐` yields no corner to close.
    if open {
        let keep = border.rfind('└').unwrap_or(border.len());
        border.truncate(keep);
    }
    let border = border.trim_end().to_string();
    border.contains('┘').then_some(border)
}

// ---------------------------------------------------------------------------
// Step 9: width
// ---------------------------------------------------------------------------

fn truncate_width(lines: Vec<String>, max_width: usize) -> Vec<String> {
    lines
        .into_iter()
        .map(|l| {
            if l.chars().count() <= max_width || l.contains(['│', '┤', '┘', '└']) {
                l
            } else {
                l.chars().take(max_width).collect()
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
