//! Lap time text helpers.
//!
//! Lap times travel as display strings (`"01:02.345"`). The schema never
//! interprets them; these helpers exist for summaries and tooling.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

/// A lap time string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid lap time '{input}': expected MM:SS.mmm")]
pub struct LapTimeError {
    input: String,
}

impl LapTimeError {
    /// The text that failed to parse.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

fn lap_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Minutes, two-digit seconds, optional fraction up to nanoseconds.
        Regex::new(r"^(\d+):([0-5]\d)(?:\.(\d{1,9}))?$").expect("Invalid lap time pattern")
    })
}

/// Parse `MM:SS.mmm` into a [`Duration`].
///
/// # Errors
///
/// Returns a [`LapTimeError`] if the text is not in `MM:SS[.fraction]` form.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use racedash::laptime::parse_lap_time;
///
/// assert_eq!(parse_lap_time("01:02.500").unwrap(), Duration::from_millis(62_500));
/// ```
pub fn parse_lap_time(text: &str) -> Result<Duration, LapTimeError> {
    let invalid = || LapTimeError {
        input: text.to_string(),
    };

    let caps = lap_time_pattern().captures(text.trim()).ok_or_else(invalid)?;
    let minutes: u64 = caps[1].parse().map_err(|_| invalid())?;
    let seconds: u64 = caps[2].parse().map_err(|_| invalid())?;
    let nanos = match caps.get(3) {
        Some(fraction) => {
            let digits = fraction.as_str();
            // Right-pad to nine digits: ".5" is 500ms, not 5ns.
            format!("{digits:0<9}").parse::<u32>().map_err(|_| invalid())?
        }
        None => 0,
    };

    let whole = minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(invalid)?;
    Ok(Duration::new(whole, nanos))
}

/// Format a [`Duration`] as `MM:SS.mmm`, rounding to the nearest millisecond.
#[must_use]
pub fn format_lap_time(time: Duration) -> String {
    let total_millis = (time.as_micros() + 500) / 1000;
    let minutes = total_millis / 60_000;
    let seconds = (total_millis / 1000) % 60;
    let millis = total_millis % 1000;
    format!("{minutes:02}:{seconds:02}.{millis:03}")
}
