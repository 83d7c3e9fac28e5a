//! SVG length units.
//!
//! Conversion assumes 90 px per inch, a 12 pt nominal font size, and an
//! x-height of 0.7 em. The arithmetic order below is fixed so results are
//! reproducible bit for bit.

use crate::error::InvalidLengthError;

pub const PX_PER_INCH: f64 = 90.0;
const INCH_PER_MM: f64 = 1.0 / 25.4;
const INCH_PER_PT: f64 = 1.0 / 72.0;
const FONT_SIZE_PT: f64 = 12.0;
const X_HEIGHT: f64 = 0.7;

/// A length unit accepted in SVG attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Em,
    Ex,
    Px,
    In,
    Cm,
    Mm,
    Pt,
    Pc,
    /// Relative to a reference dimension the converter does not know.
    Percent,
}

impl Unit {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "em" => Self::Em,
            "ex" => Self::Ex,
            "px" => Self::Px,
            "in" => Self::In,
            "cm" => Self::Cm,
            "mm" => Self::Mm,
            "pt" => Self::Pt,
            "pc" => Self::Pc,
            "%" => Self::Percent,
            _ => return None,
        })
    }

    /// Convert `value` in this unit to pixels. Percentages are returned
    /// unchanged.
    pub fn to_px(self, value: f64) -> f64 {
        match self {
            Self::Em => value * PX_PER_INCH * FONT_SIZE_PT * INCH_PER_PT,
            Self::Ex => value * PX_PER_INCH * X_HEIGHT * FONT_SIZE_PT * INCH_PER_PT,
            Self::Px => value,
            Self::In => value * PX_PER_INCH,
            Self::Cm => value * PX_PER_INCH * INCH_PER_MM * 10.0,
            Self::Mm => value * PX_PER_INCH * INCH_PER_MM,
            Self::Pt => value * PX_PER_INCH * INCH_PER_PT,
            Self::Pc => value * PX_PER_INCH * INCH_PER_PT * 12.0,
            Self::Percent => value,
        }
    }
}

/// Split a length token into its numeric value and unit.
///
/// A bare number is in pixels. Otherwise the unit is the trailing `%` or the
/// last two characters.
pub fn parse(token: &str) -> Result<(f64, Unit), InvalidLengthError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(InvalidLengthError::new(token, "empty length"));
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        return Ok((value, Unit::Px));
    }

    let unit_len = if trimmed.ends_with('%') { 1 } else { 2 };
    let split = trimmed
        .len()
        .checked_sub(unit_len)
        .filter(|&at| trimmed.is_char_boundary(at))
        .ok_or_else(|| InvalidLengthError::new(token, "missing numeric value"))?;
    let (number, suffix) = trimmed.split_at(split);

    let unit = Unit::from_suffix(suffix).ok_or_else(|| InvalidLengthError::new(token, "unknown unit"))?;
    let value = number
        .trim_end()
        .parse::<f64>()
        .map_err(|_| InvalidLengthError::new(token, "unparseable number"))?;
    Ok((value, unit))
}

/// Convert an SVG length token to pixels.
///
/// `convert("1in") == 90.0`. Percent tokens yield their bare numeric value.
pub fn convert(token: &str) -> Result<f64, InvalidLengthError> {
    let (value, unit) = parse(token)?;
    Ok(unit.to_px(value))
}
