//! Error types for timetable decoding.

/// Why a block's positional style could not be turned into a [`TimeSlot`](super::TimeSlot).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("style is missing required key `{0}`")]
    MissingKey(&'static str),
    #[error("style key `{key}` is not a numeric percentage: {value:?}")]
    NotAPercentage { key: &'static str, value: String },
    #[error("block width must be positive, got {0}%")]
    DegenerateWidth(f64),
    #[error("block height must be positive, got {0}%")]
    DegenerateHeight(f64),
    #[error("decoded day {0} is outside 0..=6")]
    DayOutOfRange(i64),
    #[error("decoded slot count {0} is below 1")]
    SlotCountOutOfRange(i64),
    #[error("decoded span {start}..{end} is outside the display window {min}..{max}")]
    OutsideWindow {
        start: i64,
        end: i64,
        min: u32,
        max: u32,
    },
}

/// A single activity block that had to be skipped.
#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("activity block has no style attribute")]
    MissingStyle,
    #[error("failed to decode block geometry from style {style:?}")]
    Geometry {
        style: String,
        #[source]
        source: GeometryError,
    },
}

impl BlockError {
    /// The raw style string, when there was one.
    pub fn style(&self) -> Option<&str> {
        match self {
            Self::MissingStyle => None,
            Self::Geometry { style, .. } => Some(style),
        }
    }
}

/// A grid link carried a type code no handler exists for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableTypeError {
    #[error("unrecognized table type code {0}")]
    Unknown(u32),
}
