//! Severity from cell fill colors
//!
//! The condition matrix marks equipment state by painting cells rather than writing it down.
//! Fill colors are bucketed with fixed RGB heuristics, see [`ColorThresholds`].

use cmon_common::config::ColorThresholds;
use cmon_common::db::SeverityColor;

/// Classified fill: bucket plus the exact uppercase `RRGGBB` it came from
///
/// `hex` is only kept when `color` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorSample {
    pub color: Option<SeverityColor>,
    pub hex: Option<String>,
}

impl ColorSample {
    /// No color signal
    pub const NONE: ColorSample = ColorSample {
        color: None,
        hex: None,
    };

    pub fn is_none(&self) -> bool {
        self.color.is_none()
    }
}

/// Last six characters of a fill color as uppercase hex
///
/// `AARRGGBB` and `RRGGBB` both reduce to `RRGGBB`. Shorter or non-hex values give `None`.
pub fn normalize_hex(raw: &str) -> Option<String> {
    let chars: Vec<char> = raw.trim().chars().collect();
    if chars.len() < 6 {
        return None;
    }

    let hex: String = chars[chars.len() - 6..].iter().collect();
    hex.chars()
        .all(|c| c.is_ascii_hexdigit())
        .then(|| hex.to_ascii_uppercase())
}

fn rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Maps fills to severity buckets
#[derive(Debug, Clone, Default)]
pub struct ColorClassifier {
    thresholds: ColorThresholds,
}

impl ColorClassifier {
    pub fn new(thresholds: ColorThresholds) -> Self {
        Self { thresholds }
    }

    /// Classify one raw fill color
    ///
    /// Checked in order: red, yellow, blue, green. Pure black and pure white carry no signal.
    pub fn classify(&self, fill: Option<&str>) -> ColorSample {
        let Some(hex) = fill.and_then(normalize_hex) else {
            return ColorSample::NONE;
        };
        let Some((r, g, b)) = rgb(&hex) else {
            return ColorSample::NONE;
        };

        let t = &self.thresholds;
        let color = if (r, g, b) == (0, 0, 0) || (r, g, b) == (255, 255, 255) {
            None
        } else if r > t.strong_red && g < t.red_max_other && b < t.red_max_other {
            Some(SeverityColor::Red)
        } else if r > t.strong_red && g > t.yellow_min_green && b < t.yellow_max_blue {
            Some(SeverityColor::Yellow)
        } else if b > r.max(g) && b > t.dominant_min {
            Some(SeverityColor::Blue)
        } else if g > r.max(b) && g > t.dominant_min {
            Some(SeverityColor::Green)
        } else {
            None
        };

        match color {
            Some(color) => ColorSample {
                color: Some(color),
                hex: Some(hex),
            },
            None => ColorSample::NONE,
        }
    }

    /// Classify a whole row, cells left to right
    ///
    /// The first red cell wins outright. Otherwise the last colored cell wins.
    pub fn classify_row<'a>(&self, fills: impl IntoIterator<Item = Option<&'a str>>) -> ColorSample {
        let mut result = ColorSample::NONE;

        for fill in fills {
            let sample = self.classify(fill);
            match sample.color {
                Some(SeverityColor::Red) => return sample,
                Some(_) => result = sample,
                None => {}
            }
        }

        result
    }
}
