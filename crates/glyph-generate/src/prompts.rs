//! Per-mode system prompts.

use glyph_types::Mode;
use glyph_validate::PolicyConfig;

/// Flow direction requested for diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    TopToBottom,
    LeftToRight,
}

impl Orientation {
    /// Accepts `left-to-right`, `ltr` and `horizontal`; everything else is top-to-bottom.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "left-to-right" | "ltr" | "horizontal" => Orientation::LeftToRight,
            _ => Orientation::TopToBottom,
        }
    }
}

const ART_CHARACTERS: &str = "\
ALLOWED CHARACTERS:
- Letters: A-Z, a-z
- Numbers: 0-9
- Symbols: ! \" # $ % & ' ( ) * + , - . / : ; < = > ? @ [ \\ ] ^ _ ` { | } ~
- Spaces for positioning";

const LOGO_CHARACTERS: &str = "\
ALLOWED CHARACTERS:
- Letters: A-Z, a-z
- Numbers: 0-9
- Symbols: ! \" # $ % & ' ( ) * + , - . / : ; < = > ? @ [ \\ ] ^ _ ` { | } ~
- Block characters: █ ▓ ▒ ░
- Spaces for positioning";

const CHART_CHARACTERS: &str = "\
ALLOWED CHARACTERS:
- Box-drawing: ─ │ ┌ ┐ └ ┘ ├ ┤ ┬ ┴ ┼
- Block characters: █ ▓ ▒ ░
- Letters: A-Z, a-z
- Numbers: 0-9
- Symbols: . , : - + % $ # @ ( ) [ ] (space)";

const DIAGRAM_CHARACTERS: &str = "\
ALLOWED CHARACTERS:
- Box-drawing: ┌ ┐ └ ┘ ─ │ ├ ┤ ┬ ┴ ┼
- Arrows: → ← ↑ ↓
- Letters: A-Z, a-z
- Numbers: 0-9
- Symbols: . , : - _ / ( ) (space)";

const OUTPUT_RULES: &str = "\
- Output ONLY the drawing: no explanations, no descriptions, no markdown
- NEVER use ``` code blocks
- NO trailing whitespace at the end of lines";

fn limits(mode: Mode) -> String {
    let policy = PolicyConfig::resolve(mode);
    format!(
        "- Maximum {} lines (HARD LIMIT)\n- Maximum width: {} characters per line (HARD LIMIT)",
        policy.max_lines, policy.max_width
    )
}

/// The base system prompt for a mode. `orientation` only affects diagrams.
pub fn system_prompt(mode: Mode, orientation: Orientation) -> String {
    match mode {
        Mode::Art => format!(
            "You are an expert ASCII artist. Draw the requested subject using only the allowed characters.\n\n\
             {ART_CHARACTERS}\n\n\
             CRITICAL RULES:\n{}\n{OUTPUT_RULES}\n\
             - Keep indentation consistent so the shape reads as one piece\n\
             - Every line should differ from the one before it\n\n\
             Example:\n   /\\_/\\\n  ( o.o )\n   > ^ <\n  /|   |\\\n\n\
             OUTPUT FORMAT: Pure ASCII art only.",
            limits(mode)
        ),
        Mode::Logo => format!(
            "You are a logo designer working in text. Render the requested name or brand as a bold text logo.\n\n\
             {LOGO_CHARACTERS}\n\n\
             CRITICAL RULES:\n{}\n{OUTPUT_RULES}\n\
             - Letters must be legible at a glance\n\n\
             OUTPUT FORMAT: Pure logo only.",
            limits(mode)
        ),
        Mode::Chart => format!(
            "Generate a terminal chart for the requested data.\n\n\
             {CHART_CHARACTERS}\n\n\
             CRITICAL RULES:\n{}\n{OUTPUT_RULES}\n\
             - Every box needs all 4 corners: ┌ ┐ └ ┘\n\
             - Labels and values must line up\n\n\
             Example:\nSales Report\n┌────────────────────┐\n│ Q1 ████████ 100    │\n│ Q2 ████████████ 150│\n└────────────────────┘\n\n\
             OUTPUT FORMAT: Pure chart only.",
            limits(mode)
        ),
        Mode::Diagram => {
            let (flow, example) = match orientation {
                Orientation::TopToBottom => (
                    "Flow TOP TO BOTTOM: ↓ between boxes, │ for vertical connections, ┬ and ┴ for junctions",
                    "┌─────────┐\n│  Start  │\n└────┬────┘\n     ↓\n┌─────────┐\n│ Process │\n└─────────┘",
                ),
                Orientation::LeftToRight => (
                    "Flow LEFT TO RIGHT: → between boxes",
                    "┌─────────┐ → ┌─────────┐\n│  Start  │   │   End   │\n└─────────┘   └─────────┘",
                ),
            };
            format!(
                "Generate an ASCII flowchart for the requested process.\n\n\
                 {DIAGRAM_CHARACTERS}\n\n\
                 CRITICAL RULES:\n{}\n{OUTPUT_RULES}\n\
                 - Every box needs all 4 corners: ┌ ┐ └ ┘\n\
                 - Arrows go between boxes, never inside them\n\
                 - {flow}\n\n\
                 Example:\n{example}\n\n\
                 OUTPUT FORMAT: Pure diagram only.",
                limits(mode)
            )
        }
    }
}
