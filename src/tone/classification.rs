//! Tone categories and the mapping from raw classifier scores.

use serde::{Deserialize, Serialize};

use crate::aura::AuraState;

/// Minimum confidence the top-scored category needs to count.
pub const CONFIDENCE_THRESHOLD: f64 = 0.70;

/// One scored category from the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneScore {
    /// Opaque category id, e.g. `"joy"` or `"anger"`.
    pub category: String,
    /// Confidence in `0.0..=1.0`.
    pub score: f64,
}

impl ToneScore {
    pub fn new(category: impl Into<String>, score: f64) -> Self {
        Self {
            category: category.into(),
            score,
        }
    }
}

/// Emotional tone of a message.
///
/// `Neutral` doubles as "do not move the aura".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Hostile,
    Joyful,
    Sorrowful,
    Neutral,
}

impl Tone {
    /// Map a classifier category id. Unknown ids are neutral.
    pub fn from_category(category: &str) -> Self {
        match category {
            "anger" | "disgust" => Self::Hostile,
            "joy" => Self::Joyful,
            "sadness" | "fear" => Self::Sorrowful,
            _ => Self::Neutral,
        }
    }

    /// Aura channel this tone pushes toward 255 (0 = red, 1 = green,
    /// 2 = blue). `None` for neutral.
    pub fn hot_channel(&self) -> Option<usize> {
        match self {
            Self::Hostile => Some(0),
            Self::Joyful => Some(1),
            Self::Sorrowful => Some(2),
            Self::Neutral => None,
        }
    }

    pub fn is_neutral(&self) -> bool {
        matches!(self, Self::Neutral)
    }

    /// Integer code stored on message records (`3` = neutral).
    pub fn code(&self) -> u8 {
        match self {
            Self::Hostile => 0,
            Self::Joyful => 1,
            Self::Sorrowful => 2,
            Self::Neutral => 3,
        }
    }

    /// Decode a message-record tone code. Anything unknown is neutral.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Hostile,
            1 => Self::Joyful,
            2 => Self::Sorrowful,
            _ => Self::Neutral,
        }
    }

    /// Colour used to render a single message of this tone.
    pub fn display_color(&self) -> AuraState {
        match self {
            Self::Hostile => AuraState::new(0xe8, 0x27, 0x54),
            Self::Joyful => AuraState::new(0x68, 0xf0, 0x46),
            Self::Sorrowful => AuraState::new(0x07, 0xb0, 0xf2),
            Self::Neutral => AuraState::new(0x88, 0x88, 0x88),
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Hostile => "hostile",
            Self::Joyful => "joyful",
            Self::Sorrowful => "sorrowful",
            Self::Neutral => "neutral",
        };
        write!(f, "{s}")
    }
}

/// Resolve classifier output to a single tone.
///
/// `scores` is ordered by descending confidence; only the first entry is
/// considered. Empty input, a top score below `threshold` (or NaN), and
/// unmapped categories all give [`Tone::Neutral`].
pub fn classify_scores(scores: &[ToneScore], threshold: f64) -> Tone {
    let Some(top) = scores.first() else {
        return Tone::Neutral;
    };
    if top.score.is_nan() || top.score < threshold {
        return Tone::Neutral;
    }
    Tone::from_category(&top.category)
}
