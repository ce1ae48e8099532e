//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! rowing-config.toml file. It describes the rowing course and every tunable
//! threshold the engine uses, so several courses (or threshold sets) can be
//! run side by side without touching code.

use crate::cache::CacheSettings;
use crate::classifier::Thresholds;
use crate::geometry::{
    angular_difference, haversine_distance_m, initial_bearing, validate_bearing,
};
use crate::pace::PaceSettings;
use crate::recommender::{ScoreWeights, SlotSettings};
use crate::tide_data::TideSettings;
use crate::{Coordinate, ValidationError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default configuration file name, resolved against the working directory
pub const DEFAULT_CONFIG_PATH: &str = "rowing-config.toml";

/// Application configuration loaded from rowing-config.toml
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// The rowing course this deployment serves
    pub course: CourseConfig,
    /// Classification thresholds
    pub thresholds: Thresholds,
    /// Pace impact calibration
    pub pace: PaceSettings,
    /// Tide dataset location and reference levels
    pub tides: TideSettings,
    /// Cache lifetimes and capacity
    pub cache: CacheSettings,
    /// Candidate start-time bands
    pub slots: SlotSettings,
    /// Recommendation score weights
    pub scoring: ScoreWeights,
}

/// Immutable description of a rowing course.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CourseConfig {
    /// Human-readable course name
    pub name: String,
    /// Direction of travel, degrees clockwise from north in `[0, 360)`
    pub azimuth_deg: f64,
    /// Nominal crew speed through still water, m/s
    pub avg_boat_speed_ms: f64,
    /// Course start
    pub start: Coordinate,
    /// Course end
    pub end: Coordinate,
}

impl Default for CourseConfig {
    fn default() -> Self {
        CourseConfig {
            name: "Reference course".to_string(),
            azimuth_deg: 315.0,
            avg_boat_speed_ms: 3.5,
            start: Coordinate {
                lat: 38.6930,
                lon: -9.2080,
            },
            end: Coordinate {
                lat: 38.7057,
                lon: -9.2243,
            },
        }
    }
}

/// Largest gap between the configured azimuth and the start→end bearing that
/// passes without a warning.
const AZIMUTH_TOLERANCE_DEG: f64 = 20.0;

impl CourseConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_bearing(self.azimuth_deg)?;
        if !self.avg_boat_speed_ms.is_finite() || self.avg_boat_speed_ms <= 0.0 {
            return Err(ValidationError::InvalidCourse(format!(
                "avg_boat_speed_ms must be positive, got {}",
                self.avg_boat_speed_ms
            )));
        }
        if !self.start.is_valid() || !self.end.is_valid() {
            return Err(ValidationError::InvalidCourse(format!(
                "coordinates out of range for course {:?}",
                self.name
            )));
        }

        let drift = angular_difference(self.azimuth_deg, self.geodesic_bearing());
        if self.start != self.end && drift > AZIMUTH_TOLERANCE_DEG {
            warn!(
                "Course {:?}: azimuth {}° differs from start→end bearing by {:.1}°",
                self.name, self.azimuth_deg, drift
            );
        }
        Ok(())
    }

    /// Straight-line course length in metres.
    pub fn length_m(&self) -> f64 {
        haversine_distance_m(self.start, self.end)
    }

    /// Bearing implied by the course endpoints.
    pub fn geodesic_bearing(&self) -> f64 {
        initial_bearing(self.start, self.end)
    }
}

impl Config {
    /// Load configuration from rowing-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!("Loaded configuration for course: {}", config.course.name);
                    config
                }
                Err(e) => {
                    warn!("Invalid config file format: {}", e);
                    warn!("Using default configuration (reference course)");
                    Self::default()
                }
            },
            Err(_) => {
                info!(
                    "No config file at {}, using default configuration (reference course)",
                    path.as_ref().display()
                );
                Self::default()
            }
        }
    }

    /// Check every section. The engine refuses to start on an invalid config.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.course.validate()?;
        self.thresholds.validate()?;
        self.pace.validate()?;
        self.tides.validate()?;
        self.slots.catalogue()?;
        self.scoring.validate()?;
        Ok(())
    }

    /// Save current configuration to the given path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}
