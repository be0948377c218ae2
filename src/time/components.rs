//! Calendar components and the tolerant embedded-date parser

use regex::Regex;
use std::sync::OnceLock;

/// Calendar date/time fields; any of them may be missing.
///
/// Values are taken as written. No calendar validation happens, so a month
/// of 13 survives parsing and formatting unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateComponents {
    pub year: Option<u32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
}

impl DateComponents {
    /// Fully populated components
    pub fn new(year: u32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            day: Some(day),
            hour: Some(hour),
            minute: Some(minute),
            second: Some(second),
        }
    }
}

/// `YYYY[-:]MM[-:]DD`, optionally followed by `[T ]HH[-:]MM[-:]SS`
static DATE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn date_pattern() -> &'static Regex {
    DATE_PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4})[-:](\d{2})[-:](\d{2})(?:[T\s]+(\d{2})[-:](\d{2})[-:](\d{2}))?").unwrap()
    })
}

/// Parse an embedded date string such as `2024:07:04 10:15:30`.
///
/// Anything after the matched date/time (sub-seconds, zone offsets) is
/// ignored and no timezone conversion is applied.
pub fn parse_embedded_date(s: &str) -> Option<DateComponents> {
    let s = s.trim().trim_matches('"').trim();
    let caps = date_pattern().captures(s)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    Some(DateComponents {
        year: field(1),
        month: field(2),
        day: field(3),
        hour: field(4),
        minute: field(5),
        second: field(6),
    })
}
