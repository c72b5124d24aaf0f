//! Numeric quality score for art output.

use std::collections::HashSet;

use serde::Serialize;

use crate::analyzer::longest_run;
use crate::normalize_line;

/// Characters that read as deliberate features (eyes, mouths, outlines).
const FEATURE_CHARS: &str = "oO@.^(){}[]<>vV/\\|_-=~";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub line_count: usize,
    /// Non-space share of the bounding box, 0.0-1.0.
    pub density: f64,
    pub feature_chars: usize,
    pub max_consecutive: usize,
    /// Distinct line lengths over line count, 0.0-1.0.
    pub variety: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtQuality {
    pub score: u32,
    pub grade: char,
    pub metrics: Option<QualityMetrics>,
}

impl ArtQuality {
    pub fn is_passing(&self) -> bool {
        self.grade != 'F'
    }
}

fn grade_for(score: u32) -> char {
    match score {
        90.. => 'A',
        80..=89 => 'B',
        70..=79 => 'C',
        60..=69 => 'D',
        _ => 'F',
    }
}

/// Score art on line count, fill, features, repetition, and line-length variety.
pub fn measure_art_quality(content: &str) -> ArtQuality {
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return ArtQuality {
            score: 0,
            grade: 'F',
            metrics: None,
        };
    }

    let line_count = lines.len();
    let line_score: f64 = match line_count {
        4..=12 => 100.0,
        0..=15 => 70.0,
        16..=20 => 40.0,
        _ => 0.0,
    };

    let max_width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let filled: usize = lines
        .iter()
        .map(|l| l.chars().filter(|c| !c.is_whitespace()).count())
        .sum();
    let area = (line_count * max_width).max(1);
    let density = filled as f64 / area as f64;
    let density_score = if (0.4..=0.6).contains(&density) {
        100.0
    } else if density < 0.4 {
        70.0
    } else if density <= 0.7 {
        60.0
    } else {
        20.0
    };

    let features: HashSet<char> = lines
        .iter()
        .flat_map(|l| l.chars())
        .filter(|c| FEATURE_CHARS.contains(*c))
        .collect();
    let feature_score = match features.len() {
        3.. => 100.0,
        2 => 70.0,
        1 => 40.0,
        _ => 0.0,
    };

    let normalized: Vec<String> = lines.iter().map(|l| normalize_line(l)).collect();
    let max_consecutive = longest_run(&normalized);
    let repetition_score = match max_consecutive {
        0..=3 => 100.0,
        4 => 60.0,
        _ => 0.0,
    };

    let lengths: HashSet<usize> = lines.iter().map(|l| l.chars().count()).collect();
    let variety = lengths.len() as f64 / line_count as f64;

    let weighted = line_score * 0.25
        + density_score * 0.25
        + feature_score * 0.2
        + repetition_score * 0.2
        + variety * 100.0 * 0.1;
    let score = weighted.round().clamp(0.0, 100.0) as u32;

    ArtQuality {
        score,
        grade: grade_for(score),
        metrics: Some(QualityMetrics {
            line_count,
            density,
            feature_chars: features.len(),
            max_consecutive,
            variety,
        }),
    }
}
