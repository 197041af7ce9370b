//! Style-specific prompt wording

use limner_config::ImageStyle;

/// Text wrapped around an image prompt for one style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleModifier {
    /// Sentence placed before the prompt
    pub prefix: &'static str,
    /// Sentence placed after the prompt
    pub suffix: &'static str,
}

/// Modifier for a style
pub fn style_modifier(style: ImageStyle) -> StyleModifier {
    match style {
        ImageStyle::Infographic => StyleModifier {
            prefix: "Create a modern infographic visualization.",
            suffix: "Use flat design, data-driven icons, clean color palette. Professional infographic style.",
        },
        ImageStyle::Diagram => StyleModifier {
            prefix: "Create a clear conceptual diagram.",
            suffix: "Use geometric shapes, connecting arrows, hierarchical layout. Minimal diagram style.",
        },
        ImageStyle::Card => StyleModifier {
            prefix: "Create a summary card design.",
            suffix: "Use bold visual hierarchy, icon grid, gradient background. Modern UI card style.",
        },
        ImageStyle::Whiteboard => StyleModifier {
            prefix: "Create a hand-drawn whiteboard sketch.",
            suffix: "Use loose sketchy lines, warm colors, informal doodle style. Educational whiteboard feel.",
        },
        ImageStyle::Slide => StyleModifier {
            prefix: "Create a professional presentation slide design.",
            suffix: "Use corporate color scheme, structured layout, subtle gradients. Business slide style.",
        },
    }
}

/// Wrap `prompt` as `{prefix}\n\n{prompt}\n\n{suffix}`
pub fn enhance_prompt(prompt: &str, style: ImageStyle) -> String {
    let modifier = style_modifier(style);
    format!("{}\n\n{}\n\n{}", modifier.prefix, prompt, modifier.suffix)
}

/// Planning guidance for a style, used when asking for prompts
pub(crate) fn plan_guidance(style: ImageStyle) -> &'static str {
    match style {
        ImageStyle::Infographic => {
            "data-focused visuals: charts, statistic bubbles, color-coded sections, flat icons"
        }
        ImageStyle::Diagram => {
            "structural or flow diagrams: boxes, arrows and connections showing relationships"
        }
        ImageStyle::Card => "clean summary cards with 3-5 key points, icons and a bold hierarchy",
        ImageStyle::Whiteboard => {
            "hand-drawn sketches with informal arrows, doodles and a mind-map layout"
        }
        ImageStyle::Slide => {
            "professional slides with a title, 3-4 bullet points and clean typography"
        }
    }
}
