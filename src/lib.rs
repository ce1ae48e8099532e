//! # Rowing Conditions Core Library
//!
//! This library turns raw tide tables, wind observations and water-current
//! observations into an actionable answer to "should we row, when, and how
//! hard will it be?" for one fixed course.
//!
//! ## Design Philosophy
//!
//! ### Pure computation
//! - **No I/O in the hot path**: classification, pace estimation and slot
//!   ranking are pure functions over their arguments
//! - **Explicit configuration**: course geometry and every threshold live in
//!   immutable structs built once at startup and passed down by reference
//! - **Shared state is narrow**: only the tide repository and the TTL cache
//!   hold process-wide mutable state, and both are safe for concurrent use
//!
//! ### Data Flow
//! 1. **Load**: tide dataset (JSON) + configuration (TOML) at startup
//! 2. **Classify**: wind/current vectors → favorability, water state, chop
//! 3. **Estimate**: current vector → pace delta per 500 m
//! 4. **Recommend**: candidate start times → scored, totally ordered slots
//!
//! ## Core Types
//!
//! The library exports three small value types shared by every module:
//! - [`Vector2D`]: a wind or current sample (speed + compass bearing)
//! - [`Coordinate`]: a latitude/longitude pair for the course endpoints
//! - [`TimeOfDay`]: an `HH:MM` wall-clock time used by tide rows and slots

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub mod cache;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod pace;
pub mod recommender;
pub mod report;
pub mod tide_data;
pub mod units;

pub use error::{EngineError, TideError, ValidationError};

/// A wind or water-current sample.
///
/// Direction follows the compass convention used throughout the crate:
/// degrees clockwise from north, in `[0, 360)`.
///
/// # Example
/// ```
/// use rowing_conditions_lib::Vector2D;
///
/// let wind = Vector2D::new(1.0, 315.0).unwrap();
/// assert_eq!(wind.direction_deg, 315.0);
///
/// // Negative speeds are rejected, never clamped
/// assert!(Vector2D::new(-0.5, 90.0).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vector2D {
    /// Speed in metres per second
    pub speed_ms: f64,
    /// Bearing in degrees, `[0, 360)`
    pub direction_deg: f64,
}

impl Vector2D {
    /// Build a validated vector.
    pub fn new(speed_ms: f64, direction_deg: f64) -> Result<Self, ValidationError> {
        let vector = Vector2D {
            speed_ms,
            direction_deg,
        };
        vector.validate()?;
        Ok(vector)
    }

    /// Check speed and bearing. Deserialized vectors skip [`Vector2D::new`],
    /// so every consumer calls this before using one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.speed_ms.is_finite() {
            return Err(ValidationError::NonFiniteSpeed(self.speed_ms));
        }
        if self.speed_ms < 0.0 {
            return Err(ValidationError::NegativeSpeed(self.speed_ms));
        }
        geometry::validate_bearing(self.direction_deg)?;
        Ok(())
    }
}

/// Latitude/longitude in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Wall-clock time with minute resolution, written as `HH:MM`.
///
/// Ordering is chronological within a day, which is what both tide lookups
/// ("first tide strictly after") and slot tie-breaking rely on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(TimeOfDay)
            .ok_or_else(|| ValidationError::InvalidTime(format!("{:02}:{:02}", hour, minute)))
    }

    /// For literal defaults only.
    pub(crate) fn hm(hour: u32, minute: u32) -> Self {
        Self::from_hm(hour, minute).expect("literal time should be valid")
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Minutes since midnight.
    pub fn minutes(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }

    /// Add minutes, returning `None` instead of wrapping past midnight.
    pub fn checked_add_minutes(&self, minutes: u32) -> Option<Self> {
        let total = self.minutes().checked_add(minutes)?;
        if total >= 24 * 60 {
            return None;
        }
        NaiveTime::from_hms_opt(total / 60, total % 60, 0).map(TimeOfDay)
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // chrono accepts single-digit hours; the dataset format does not
        if trimmed.len() != 5 {
            return Err(ValidationError::InvalidTime(s.to_string()));
        }
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .map(TimeOfDay)
            .map_err(|_| ValidationError::InvalidTime(s.to_string()))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
