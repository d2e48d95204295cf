use std::{fmt::Display, num::ParseFloatError, ops::Range, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A closed retention time window, in minutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }

    /// Whether `time` is already beyond the end of the window
    pub fn is_past(&self, time: f64) -> bool {
        time > self.end
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: f64::INFINITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeRangeParseError {
    #[error("Failed to parse time range start {0}")]
    MalformedStart(#[source] ParseFloatError),
    #[error("Failed to parse time range end {0}")]
    MalformedEnd(#[source] ParseFloatError),
    #[error("Time range start {0} is after its end {1}")]
    Inverted(f64, f64),
}

fn parse_bound(
    token: Option<&str>,
    default: f64,
    on_error: fn(ParseFloatError) -> TimeRangeParseError,
) -> Result<f64, TimeRangeParseError> {
    match token.map(str::trim) {
        None | Some("") => Ok(default),
        Some(tok) => tok.parse().map_err(on_error),
    }
}

impl FromStr for TimeRange {
    type Err = TimeRangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let sep = [' ', ':', '-']
            .into_iter()
            .find(|c| s.contains(*c))
            .unwrap_or(' ');
        let mut tokens = s.splitn(2, sep);
        let start = parse_bound(tokens.next(), 0.0, TimeRangeParseError::MalformedStart)?;
        let end = parse_bound(
            tokens.next(),
            f64::INFINITY,
            TimeRangeParseError::MalformedEnd,
        )?;
        if start > end {
            return Err(TimeRangeParseError::Inverted(start, end));
        }
        Ok(TimeRange { start, end })
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.end.is_infinite() {
            write!(f, "{}-", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl TryFrom<String> for TimeRange {
    type Error = TimeRangeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeRange> for String {
    fn from(value: TimeRange) -> Self {
        value.to_string()
    }
}

impl From<Range<f64>> for TimeRange {
    fn from(value: Range<f64>) -> Self {
        Self::new(value.start, value.end)
    }
}
