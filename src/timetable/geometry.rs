//! Decoding of activity block positions on the weekly grid canvas.
//!
//! The canvas is 7 day columns across 100% of the width and the display
//! window (8:00 to 21:00 by default) across 100% of the height. Blocks are
//! absolutely positioned with percentage `left`/`top`/`width`/`height`
//! values, which are turned back into a day index, minutes since midnight,
//! and the number of parallel slots sharing the column.

use super::errors::GeometryError;
use super::models::TimeSlot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parsed `style` attribute: property name to raw value.
pub type StyleMap<'a> = HashMap<&'a str, &'a str>;

/// Constants describing the grid canvas layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// First hour shown at the top of the canvas.
    pub day_start_hour: u32,
    /// Hour at the bottom edge of the canvas.
    pub day_end_hour: u32,
    /// Reciprocal of one day column's width in percent (100/7 % ~ 1/0.07).
    pub column_scale: f64,
    /// Added before every truncation so values meant to land on an integer
    /// boundary are not pushed one below it by percentage round-tripping.
    pub epsilon: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            day_start_hour: 8,
            day_end_hour: 21,
            column_scale: 0.07,
            epsilon: 1e-5,
        }
    }
}

impl GridConfig {
    /// Minutes since midnight at the top edge of the canvas.
    pub fn window_start(&self) -> u32 {
        self.day_start_hour * 60
    }

    /// Minutes since midnight at the bottom edge of the canvas.
    pub fn window_end(&self) -> u32 {
        self.day_end_hour * 60
    }

    fn minutes_per_percent(&self) -> f64 {
        f64::from(self.day_end_hour.saturating_sub(self.day_start_hour)) * 0.01 * 60.0
    }

    fn truncate(&self, value: f64) -> i64 {
        (value + self.epsilon).floor() as i64
    }
}

/// Split a style attribute into its declarations.
///
/// Declarations without a `:` are ignored; keys and values are trimmed.
pub fn parse_style(style: &str) -> StyleMap<'_> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (key, value) = declaration.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key, value.trim()))
        })
        .collect()
}

/// Magnitude of a percentage value, unscaled (`"14.2857%"` is `14.2857`).
fn percentage(style: &StyleMap<'_>, key: &'static str) -> Result<f64, GeometryError> {
    let raw = style.get(key).ok_or(GeometryError::MissingKey(key))?;
    let invalid = || GeometryError::NotAPercentage {
        key,
        value: (*raw).to_owned(),
    };

    let number = raw.strip_suffix('%').ok_or_else(invalid)?;
    let value: f64 = number.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(value)
}

/// Decode a block's position into a [`TimeSlot`].
pub fn decode_time_slot(style: &StyleMap<'_>, grid: &GridConfig) -> Result<TimeSlot, GeometryError> {
    let left = percentage(style, "left")?;
    let top = percentage(style, "top")?;
    let width = percentage(style, "width")?;
    let height = percentage(style, "height")?;

    if width <= 0.0 {
        return Err(GeometryError::DegenerateWidth(width));
    }
    if height <= 0.0 {
        return Err(GeometryError::DegenerateHeight(height));
    }

    let day = grid.truncate(left * grid.column_scale);
    if !(0..=6).contains(&day) {
        return Err(GeometryError::DayOutOfRange(day));
    }

    let slots = grid.truncate(1.0 / (width * grid.column_scale));
    let one_nth = match u32::try_from(slots) {
        Ok(n) if n >= 1 => n,
        _ => return Err(GeometryError::SlotCountOutOfRange(slots)),
    };

    // Both edges are snapped to the minute grid independently, so the
    // rounding error of the printed top and height percentages does not
    // accumulate into the duration. This can be one minute longer than
    // truncating the height alone, whenever the fractional minutes of top
    // and height add up to a whole minute.
    let scale = grid.minutes_per_percent();
    let origin = i64::from(grid.window_start());
    let start = grid.truncate(scale * top) + origin;
    let end = grid.truncate(scale * (top + height)) + origin;

    let (min, max) = (grid.window_start(), grid.window_end());
    if start < i64::from(min) || end > i64::from(max) {
        return Err(GeometryError::OutsideWindow {
            start,
            end,
            min,
            max,
        });
    }
    if end <= start {
        return Err(GeometryError::DegenerateHeight(height));
    }

    // Range checks above guarantee these fit.
    let start = start as u32;
    let end = end as u32;
    Ok(TimeSlot {
        day: day as u8,
        start,
        end,
        one_nth,
        duration: end - start,
    })
}

/// Parse a raw style attribute and decode it in one step.
pub fn decode_style(style: &str, grid: &GridConfig) -> Result<TimeSlot, GeometryError> {
    decode_time_slot(&parse_style(style), grid)
}
