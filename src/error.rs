//! # Error Taxonomy
//!
//! Three families, kept apart so callers can match on what they care about:
//!
//! - [`ValidationError`]: bad caller input (negative speed, malformed bearing,
//!   time or date). Always surfaced, never coerced.
//! - [`TideError`]: the tide dataset could not be read or breaks one of its
//!   invariants. Absence of data for a date is *not* an error; lookups return
//!   `None` for that.
//! - [`EngineError`]: what the composed engine returns, wrapping the two above
//!   plus failures raised by caller-supplied fetch closures.

use std::io;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("speed must not be negative: {0} m/s")]
    NegativeSpeed(f64),

    #[error("speed must be finite: {0}")]
    NonFiniteSpeed(f64),

    #[error("bearing must be a finite value in [0, 360): {0}")]
    InvalidBearing(f64),

    #[error("time must be HH:MM: {0:?}")]
    InvalidTime(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid course: {0}")]
    InvalidCourse(String),

    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("invalid coefficient: {0}")]
    InvalidCoefficient(String),
}

/// Errors raised while loading or validating a tide dataset.
#[derive(Error, Debug)]
pub enum TideError {
    /// Dataset file could not be read
    #[error("tide dataset IO: {0}")]
    Io(#[from] io::Error),

    /// Dataset is not valid JSON or does not match the expected shape
    #[error("tide dataset JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("month key {0:?} is not <year>-<month>")]
    InvalidMonthKey(String),

    #[error("month key {key:?} does not match body {year}-{month}")]
    KeyMismatch { key: String, year: i32, month: u32 },

    #[error("month {year}-{month} appears more than once")]
    DuplicateMonth { year: i32, month: u32 },

    #[error("day {day} appears more than once in {year}-{month}")]
    DuplicateDay { year: i32, month: u32, day: u32 },

    #[error("day {day} does not exist in {year}-{month}")]
    InvalidDay { year: i32, month: u32, day: u32 },

    #[error("tides for {year}-{month}-{day} are not sorted by time")]
    UnsortedTides { year: i32, month: u32, day: u32 },

    #[error("negative tide height {height} on {year}-{month}-{day}")]
    NegativeHeight {
        year: i32,
        month: u32,
        day: u32,
        height: f64,
    },
}

/// Errors surfaced by [`crate::engine::ConditionsEngine`].
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Tide(#[from] TideError),

    /// Raised by a caller-supplied fetch; never cached
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}
