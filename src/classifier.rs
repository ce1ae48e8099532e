//! # Condition Classifier
//!
//! Compares the course azimuth against wind and current bearings and labels
//! the result.
//!
//! ## Rules
//!
//! ### Favorability (any vector)
//! - `angle_to_bow <= favorable_max_deg` (30°) → [`Favorability::Favorable`]
//! - `angle_to_bow >  difficult_min_deg` (110°) → [`Favorability::Difficult`]
//! - anything in between → [`Favorability::Neutral`]
//!
//! ### Water state (wind only)
//! - `speed <  mirror_max_ms` (2.5 m/s) → [`WaterState::Mirror`]
//! - `speed <= ripple_max_ms` (7.0 m/s) → [`WaterState::Ripple`]
//! - faster → [`WaterState::Chaotic`]
//!
//! ### Lateral chop (wind only)
//! Raised when `angle_to_bow` falls in the crosswind band
//! `[chop_min_deg, chop_max_deg]` (60°–120°), whatever the speed band. It is
//! reported next to the water state, never in place of it.
//!
//! Classification is a pure function of its inputs. Every threshold comes
//! from [`Thresholds`], which is loaded from configuration.

use crate::config::CourseConfig;
use crate::geometry::angular_difference;
use crate::{ValidationError, Vector2D};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Favorability {
    Favorable,
    Neutral,
    Difficult,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaterState {
    Mirror,
    Ripple,
    Chaotic,
}

impl fmt::Display for Favorability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Favorability::Favorable => "FAVORABLE",
            Favorability::Neutral => "NEUTRAL",
            Favorability::Difficult => "DIFFICULT",
        })
    }
}

impl fmt::Display for WaterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            WaterState::Mirror => "MIRROR",
            WaterState::Ripple => "RIPPLE",
            WaterState::Chaotic => "CHAOTIC",
        })
    }
}

/// Classification thresholds, adjustable through the `[thresholds]` config
/// section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Largest angle to bow still counted as favorable
    pub favorable_max_deg: f64,
    /// Angles strictly above this are difficult
    pub difficult_min_deg: f64,
    /// Wind speeds strictly below this leave the water mirror-flat
    pub mirror_max_ms: f64,
    /// Wind speeds up to and including this produce ripples
    pub ripple_max_ms: f64,
    /// Crosswind band lower edge (inclusive)
    pub chop_min_deg: f64,
    /// Crosswind band upper edge (inclusive)
    pub chop_max_deg: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            favorable_max_deg: 30.0,
            difficult_min_deg: 110.0,
            mirror_max_ms: 2.5,
            ripple_max_ms: 7.0,
            chop_min_deg: 60.0,
            chop_max_deg: 120.0,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let angles = [
            self.favorable_max_deg,
            self.difficult_min_deg,
            self.chop_min_deg,
            self.chop_max_deg,
        ];
        if angles.iter().any(|a| !a.is_finite() || !(0.0..=180.0).contains(a)) {
            return Err(ValidationError::InvalidThresholds(
                "angles must lie in [0, 180]".to_string(),
            ));
        }
        if self.favorable_max_deg > self.difficult_min_deg {
            return Err(ValidationError::InvalidThresholds(format!(
                "favorable_max_deg {} exceeds difficult_min_deg {}",
                self.favorable_max_deg, self.difficult_min_deg
            )));
        }
        if self.chop_min_deg > self.chop_max_deg {
            return Err(ValidationError::InvalidThresholds(format!(
                "chop band [{}, {}] is empty",
                self.chop_min_deg, self.chop_max_deg
            )));
        }
        if !self.mirror_max_ms.is_finite()
            || !self.ripple_max_ms.is_finite()
            || self.mirror_max_ms < 0.0
            || self.mirror_max_ms > self.ripple_max_ms
        {
            return Err(ValidationError::InvalidThresholds(format!(
                "speed bands must satisfy 0 <= mirror ({}) <= ripple ({})",
                self.mirror_max_ms, self.ripple_max_ms
            )));
        }
        Ok(())
    }

    pub fn favorability(&self, angle_to_bow_deg: f64) -> Favorability {
        if angle_to_bow_deg <= self.favorable_max_deg {
            Favorability::Favorable
        } else if angle_to_bow_deg > self.difficult_min_deg {
            Favorability::Difficult
        } else {
            Favorability::Neutral
        }
    }

    pub fn water_state(&self, wind_speed_ms: f64) -> WaterState {
        if wind_speed_ms < self.mirror_max_ms {
            WaterState::Mirror
        } else if wind_speed_ms <= self.ripple_max_ms {
            WaterState::Ripple
        } else {
            WaterState::Chaotic
        }
    }

    pub fn is_chop(&self, angle_to_bow_deg: f64) -> bool {
        (self.chop_min_deg..=self.chop_max_deg).contains(&angle_to_bow_deg)
    }
}

/// Verdict for any vector measured against the course: direction only.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorVerdict {
    pub favorability: Favorability,
    /// In `[0, 180]`
    pub angle_to_bow_deg: f64,
    pub speed_ms: f64,
}

/// Full verdict for a wind vector: direction, surface state and chop.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionVerdict {
    pub favorability: Favorability,
    pub water_state: WaterState,
    pub chop: bool,
    /// In `[0, 180]`
    pub angle_to_bow_deg: f64,
}

/// Either vector may be missing; the classifier reports on what it gets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub wind: Option<Vector2D>,
    pub current: Option<Vector2D>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub wind: Option<ConditionVerdict>,
    pub current: Option<VectorVerdict>,
}

/// Favorability of a single vector.
pub fn classify_vector(
    course: &CourseConfig,
    vector: &Vector2D,
    thresholds: &Thresholds,
) -> Result<VectorVerdict, ValidationError> {
    vector.validate()?;
    let angle_to_bow_deg = angular_difference(course.azimuth_deg, vector.direction_deg);
    Ok(VectorVerdict {
        favorability: thresholds.favorability(angle_to_bow_deg),
        angle_to_bow_deg,
        speed_ms: vector.speed_ms,
    })
}

/// Full wind verdict, including water state and chop.
pub fn classify_wind(
    course: &CourseConfig,
    wind: &Vector2D,
    thresholds: &Thresholds,
) -> Result<ConditionVerdict, ValidationError> {
    let base = classify_vector(course, wind, thresholds)?;
    Ok(ConditionVerdict {
        favorability: base.favorability,
        water_state: thresholds.water_state(wind.speed_ms),
        chop: thresholds.is_chop(base.angle_to_bow_deg),
        angle_to_bow_deg: base.angle_to_bow_deg,
    })
}

/// Classify whatever vectors the request carries.
pub fn classify(
    course: &CourseConfig,
    request: &ClassificationRequest,
    thresholds: &Thresholds,
) -> Result<Classification, ValidationError> {
    let wind = request
        .wind
        .as_ref()
        .map(|w| classify_wind(course, w, thresholds))
        .transpose()?;
    let current = request
        .current
        .as_ref()
        .map(|c| classify_vector(course, c, thresholds))
        .transpose()?;
    Ok(Classification { wind, current })
}
