//! Duration text grammar used on game detail pages
//!
//! Accepted shapes: `N Hour(s)`, `N Min(s)`, the placeholders `N/A` and `--`
//! (zero minutes), and a hyphen range `X - Y unit` where the left side may
//! omit the unit. The half glyph (`½` or its `&#189;` entity) reads as `.5`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{ParsingError, ParsingResult};

static DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+(?:\.\d+)?|\.\d+)\s*(hours?|mins?|minutes?)?$")
        .unwrap_or_else(|e| panic!("invalid duration pattern: {e}"))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Hours,
    Minutes,
}

impl Unit {
    fn from_suffix(suffix: &str) -> Self {
        if suffix.to_ascii_lowercase().starts_with('h') {
            Self::Hours
        } else {
            Self::Minutes
        }
    }

    fn to_minutes(self, value: f64) -> u32 {
        let minutes = match self {
            Self::Hours => value * 60.0,
            Self::Minutes => value,
        };
        minutes.round().clamp(0.0, f64::from(u32::MAX)) as u32
    }
}

fn is_placeholder(text: &str) -> bool {
    text.eq_ignore_ascii_case("N/A") || text == "--"
}

fn normalize_half(text: &str) -> String {
    let normalized = text.replace("&#189;", ".5").replace('½', ".5");
    let trimmed = normalized.trim();
    if trimmed.starts_with('.') {
        format!("0{trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// Split a duration into its number and optional unit
fn split_value(text: &str) -> ParsingResult<(f64, Option<Unit>)> {
    let normalized = normalize_half(text);
    let captures = DURATION_PATTERN
        .captures(&normalized)
        .ok_or_else(|| ParsingError::format(format!("unrecognized duration text '{text}'")))?;

    let value = captures[1]
        .parse::<f64>()
        .map_err(|e| ParsingError::format(format!("bad duration number in '{text}': {e}")))?;
    let unit = captures.get(2).map(|m| Unit::from_suffix(m.as_str()));
    Ok((value, unit))
}

/// Parse a single duration to whole minutes.
pub fn parse_duration(text: &str) -> ParsingResult<u32> {
    let text = text.trim();
    if is_placeholder(text) {
        return Ok(0);
    }
    match split_value(text)? {
        (value, Some(unit)) => Ok(unit.to_minutes(value)),
        (_, None) => Err(ParsingError::format(format!("duration without unit '{text}'"))),
    }
}

/// Parse a single duration or a hyphen range into `(low, high)` minutes.
///
/// A single value yields `(v, v)`. Reversed ranges are swapped.
pub fn parse_duration_range(text: &str) -> ParsingResult<(u32, u32)> {
    let text = text.trim();
    if is_placeholder(text) {
        return Ok((0, 0));
    }
    if !text.contains('-') {
        let minutes = parse_duration(text)?;
        return Ok((minutes, minutes));
    }

    let parts: Vec<&str> = text.split('-').map(str::trim).collect();
    let [left, right] = parts.as_slice() else {
        return Err(ParsingError::format(format!("malformed duration range '{text}'")));
    };
    if left.is_empty() || right.is_empty() {
        return Err(ParsingError::format(format!("malformed duration range '{text}'")));
    }

    let (high_value, high_unit) = split_value(right)?;
    let high_unit = high_unit
        .ok_or_else(|| ParsingError::format(format!("duration range without unit '{text}'")))?;
    let (low_value, low_unit) = split_value(left)?;

    let low = low_unit.unwrap_or(high_unit).to_minutes(low_value);
    let high = high_unit.to_minutes(high_value);
    Ok(if low <= high { (low, high) } else { (high, low) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1 Hour", 60)]
    #[case("1&#189; Hours", 90)]
    #[case("1½ Hours", 90)]
    #[case("&#189; Hours", 30)]
    #[case("45 Min", 45)]
    #[case("45 Mins", 45)]
    #[case("12 Hours", 720)]
    #[case("2.25 Hours", 135)]
    #[case("N/A", 0)]
    #[case("--", 0)]
    #[case("  3 Hours  ", 180)]
    fn test_parse_duration(#[case] text: &str, #[case] expected: u32) {
        assert_eq!(parse_duration(text), Ok(expected));
    }

    #[rstest]
    #[case("2 - 4 Hours", (120, 240))]
    #[case("4 - 2 Hours", (120, 240))]
    #[case("30 Mins - 1 Hour", (30, 60))]
    #[case("20 - 40 Mins", (20, 40))]
    #[case("5 Hours", (300, 300))]
    #[case("--", (0, 0))]
    fn test_parse_duration_range(#[case] text: &str, #[case] expected: (u32, u32)) {
        assert_eq!(parse_duration_range(text), Ok(expected));
    }

    #[rstest]
    #[case("soon")]
    #[case("5")]
    #[case("Hours")]
    #[case("")]
    fn test_unrecognized_duration_is_format_fault(#[case] text: &str) {
        assert!(matches!(parse_duration(text), Err(ParsingError::Format { .. })));
    }

    #[rstest]
    #[case("2 - 4 - 6 Hours")]
    #[case("- 4 Hours")]
    #[case("2 -")]
    #[case("2 - 4")]
    fn test_malformed_range_is_format_fault(#[case] text: &str) {
        assert!(matches!(parse_duration_range(text), Err(ParsingError::Format { .. })));
    }
}
