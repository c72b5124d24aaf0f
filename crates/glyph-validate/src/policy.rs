//! Per-mode character whitelists and size limits.
//!
//! The whitelists are process-wide constants built once on first use; every
//! [`PolicyConfig`] for a mode borrows the same set.

use std::collections::HashSet;
use std::sync::LazyLock;

use glyph_types::Mode;

const ALPHANUMERIC: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const PRINTABLE_PUNCTUATION: &str = " !\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";
const BLOCKS: &str = "█▓▒░";
const BOX_DRAWING: &str = "─│┌┐└┘├┤┬┴┼";
const ARROWS: &str = "→←↑↓";

fn charset(parts: &[&str]) -> HashSet<char> {
    parts.iter().flat_map(|p| p.chars()).collect()
}

static ART_CHARS: LazyLock<HashSet<char>> =
    LazyLock::new(|| charset(&[ALPHANUMERIC, PRINTABLE_PUNCTUATION]));

static LOGO_CHARS: LazyLock<HashSet<char>> =
    LazyLock::new(|| charset(&[ALPHANUMERIC, PRINTABLE_PUNCTUATION, BLOCKS]));

static CHART_CHARS: LazyLock<HashSet<char>> =
    LazyLock::new(|| charset(&[BOX_DRAWING, BLOCKS, ALPHANUMERIC, " .,:-+%$#@()[]"]));

static DIAGRAM_CHARS: LazyLock<HashSet<char>> =
    LazyLock::new(|| charset(&[BOX_DRAWING, ARROWS, ALPHANUMERIC, " .,:-_/()"]));

// ---------------------------------------------------------------------------
// PolicyConfig
// ---------------------------------------------------------------------------

/// Legal characters and hard size limits for one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    pub mode: Mode,
    pub allowed_characters: &'static HashSet<char>,
    pub max_lines: usize,
    pub max_width: usize,
}

impl PolicyConfig {
    pub fn resolve(mode: Mode) -> Self {
        let (allowed_characters, max_lines, max_width) = match mode {
            Mode::Art => (&*ART_CHARS, 20, 80),
            Mode::Chart => (&*CHART_CHARS, 30, 80),
            Mode::Diagram => (&*DIAGRAM_CHARS, 50, 80),
            Mode::Logo => (&*LOGO_CHARS, 100, 150),
        };
        Self {
            mode,
            allowed_characters,
            max_lines,
            max_width,
        }
    }

    /// Resolve by name. Unknown names get the art policy.
    pub fn resolve_name(name: &str) -> Self {
        Self::resolve(Mode::from_name(name))
    }

    pub fn allows(&self, c: char) -> bool {
        self.allowed_characters.contains(&c)
    }
}

// ---------------------------------------------------------------------------
// Glyph classes shared by the analyzer and cleaner
// ---------------------------------------------------------------------------

pub(crate) const CORNERS: [char; 4] = ['┌', '┐', '└', '┘'];

pub(crate) fn is_arrow(c: char) -> bool {
    ARROWS.contains(c)
}

/// Glyphs that mark a line as part of a box for width normalization.
pub(crate) fn is_box_row_glyph(c: char) -> bool {
    matches!(c, '┌' | '┐' | '└' | '┘' | '│' | '┬' | '┴' | '├' | '┤')
}

/// Structural and block glyphs; lines containing any are never prose.
pub(crate) fn is_drawing_glyph(c: char) -> bool {
    matches!(c, '│' | '─' | '┌' | '┐' | '└' | '┘') || BLOCKS.contains(c)
}
