//! # Pace Impact Estimator
//!
//! Converts a classified current into an estimated change of the 500 m split.
//!
//! The model is a linear first-order approximation, not a hydrodynamic one:
//!
//! ```text
//! effective = current_speed * cos(angle_to_bow) * coefficient
//! baseline  = reference_distance / boat_speed
//! delta     = -(effective / boat_speed) * baseline
//! ```
//!
//! A current running with the course (`effective > 0`) gives a negative
//! delta, i.e. the split gets faster.

use crate::classifier::VectorVerdict;
use crate::config::CourseConfig;
use crate::ValidationError;
use serde::{Deserialize, Serialize};

/// Deltas smaller than this are reported as exactly zero, so a pure crosscurrent
/// is neither helping nor hindering despite `cos(90°)` not being exactly 0.
const DELTA_EPSILON_S: f64 = 1e-9;

/// Pace calibration, `[pace]` config section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaceSettings {
    /// Scales the along-course component of the current
    pub impact_coefficient: f64,
    /// Split distance the delta refers to, metres
    pub reference_distance_m: f64,
}

impl Default for PaceSettings {
    fn default() -> Self {
        PaceSettings {
            impact_coefficient: 1.0,
            reference_distance_m: 500.0,
        }
    }
}

impl PaceSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.impact_coefficient.is_finite() || self.impact_coefficient < 0.0 {
            return Err(ValidationError::InvalidCoefficient(format!(
                "impact_coefficient must be finite and non-negative, got {}",
                self.impact_coefficient
            )));
        }
        if !self.reference_distance_m.is_finite() || self.reference_distance_m <= 0.0 {
            return Err(ValidationError::InvalidCoefficient(format!(
                "reference_distance_m must be positive, got {}",
                self.reference_distance_m
            )));
        }
        Ok(())
    }

    /// Still-water split for the course's nominal speed, seconds.
    pub fn baseline_seconds(&self, course: &CourseConfig) -> f64 {
        self.reference_distance_m / course.avg_boat_speed_ms
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaceEstimate {
    /// Signed change of the split; negative means faster
    pub delta_seconds: f64,
    pub helped: bool,
}

impl PaceEstimate {
    /// No current, no change.
    pub fn neutral() -> Self {
        PaceEstimate {
            delta_seconds: 0.0,
            helped: false,
        }
    }
}

/// Estimate the split change for a current meeting the course at
/// `angle_to_bow_deg`.
pub fn estimate(
    angle_to_bow_deg: f64,
    current_speed_ms: f64,
    course: &CourseConfig,
    settings: &PaceSettings,
) -> Result<PaceEstimate, ValidationError> {
    if !current_speed_ms.is_finite() {
        return Err(ValidationError::NonFiniteSpeed(current_speed_ms));
    }
    if current_speed_ms < 0.0 {
        return Err(ValidationError::NegativeSpeed(current_speed_ms));
    }
    if !course.avg_boat_speed_ms.is_finite() || course.avg_boat_speed_ms <= 0.0 {
        return Err(ValidationError::InvalidCourse(format!(
            "avg_boat_speed_ms must be positive, got {}",
            course.avg_boat_speed_ms
        )));
    }

    let effective =
        current_speed_ms * angle_to_bow_deg.to_radians().cos() * settings.impact_coefficient;
    let baseline = settings.baseline_seconds(course);
    let mut delta_seconds = -(effective / course.avg_boat_speed_ms) * baseline;
    if delta_seconds.abs() < DELTA_EPSILON_S {
        delta_seconds = 0.0;
    }

    Ok(PaceEstimate {
        delta_seconds,
        helped: delta_seconds < 0.0,
    })
}

/// Estimate from a current verdict produced by the classifier.
pub fn estimate_for_current(
    current: &VectorVerdict,
    course: &CourseConfig,
    settings: &PaceSettings,
) -> Result<PaceEstimate, ValidationError> {
    estimate(current.angle_to_bow_deg, current.speed_ms, course, settings)
}
