use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two placeholder locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Label written to the session log.
    pub fn label(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Colour class of a text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tone {
    #[default]
    Neutral,
    Positive,
    Negative,
}

/// Items a presentation surface knows how to draw. Positions and sizes are
/// resolved by the surface from its layout.
#[derive(Debug, Clone, PartialEq)]
pub enum Drawable {
    FixationMark,
    Box { side: Side, highlighted: bool },
    TargetMarker(Side),
    TextMessage { text: String, tone: Tone },
}

impl Drawable {
    pub fn text(text: impl Into<String>, tone: Tone) -> Self {
        Drawable::TextMessage {
            text: text.into(),
            tone,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Drawable::TextMessage { .. })
    }

    /// Fixation mark plus both boxes, optionally with one box highlighted.
    pub fn placeholders(highlight: Option<Side>) -> Vec<Drawable> {
        vec![
            Drawable::FixationMark,
            Drawable::Box {
                side: Side::Left,
                highlighted: highlight == Some(Side::Left),
            },
            Drawable::Box {
                side: Side::Right,
                highlighted: highlight == Some(Side::Right),
            },
        ]
    }
}

/// Screen geometry in pixels. Box centres are offsets from the screen centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub display: (u32, u32),
    pub box_size: f32,
    pub left_box: (f32, f32),
    pub right_box: (f32, f32),
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            display: (1280, 720),
            box_size: 200.0,
            left_box: (-320.0, 0.0),
            right_box: (320.0, 0.0),
        }
    }
}

impl Layout {
    pub fn box_offset(&self, side: Side) -> (f32, f32) {
        match side {
            Side::Left => self.left_box,
            Side::Right => self.right_box,
        }
    }
}
