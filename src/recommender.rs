//! # Time-Slot Recommender
//!
//! Scores a fixed catalogue of candidate start times (an early-morning band
//! and a late-afternoon band, half an hour apart) against the forecast for
//! each slot, and returns them best first.
//!
//! ## Scoring
//!
//! ```text
//! score = favorability_weight(wind)
//!       + water_state_weight(wind)
//!       - chop_penalty            (only when chop is flagged)
//!       - pace_per_second * pace_delta_seconds
//! ```
//!
//! A helping current has a negative delta and so raises the score. Ties are
//! broken by the earlier start time, which makes the output totally ordered
//! and deterministic for identical inputs.
//!
//! Tide data never changes the score. Each slot carries a [`TideOutlook`]
//! instead, `Unknown` when the date is not in the tide table.

use crate::classifier::{
    classify_vector, classify_wind, ConditionVerdict, Favorability, Thresholds, WaterState,
};
use crate::config::{Config, CourseConfig};
use crate::pace::{estimate_for_current, PaceEstimate, PaceSettings};
use crate::tide_data::{is_high_tide, DayBoundary, TideTable};
use crate::{TimeOfDay, ValidationError, Vector2D};
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// `[slots]` config section: two contiguous bands of candidate start times.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotSettings {
    pub morning_start: TimeOfDay,
    pub morning_end: TimeOfDay,
    pub afternoon_start: TimeOfDay,
    pub afternoon_end: TimeOfDay,
    pub step_minutes: u32,
}

impl Default for SlotSettings {
    fn default() -> Self {
        SlotSettings {
            morning_start: TimeOfDay::hm(6, 0),
            morning_end: TimeOfDay::hm(8, 30),
            afternoon_start: TimeOfDay::hm(17, 0),
            afternoon_end: TimeOfDay::hm(19, 30),
            step_minutes: 30,
        }
    }
}

impl SlotSettings {
    /// Expand the two bands into the ordered list of candidate times.
    pub fn catalogue(&self) -> Result<SlotCatalogue, ValidationError> {
        if self.step_minutes == 0 {
            return Err(ValidationError::InvalidThresholds(
                "slot step_minutes must be positive".to_string(),
            ));
        }
        if self.morning_start > self.morning_end || self.afternoon_start > self.afternoon_end {
            return Err(ValidationError::InvalidThresholds(
                "slot band ends before it starts".to_string(),
            ));
        }
        if self.morning_end >= self.afternoon_start {
            return Err(ValidationError::InvalidThresholds(format!(
                "morning band (ends {}) overlaps afternoon band (starts {})",
                self.morning_end, self.afternoon_start
            )));
        }

        let mut times = Vec::new();
        for (start, end) in [
            (self.morning_start, self.morning_end),
            (self.afternoon_start, self.afternoon_end),
        ] {
            let mut t = start;
            while t <= end {
                times.push(t);
                match t.checked_add_minutes(self.step_minutes) {
                    Some(next) => t = next,
                    None => break,
                }
            }
        }
        Ok(SlotCatalogue { times })
    }
}

/// Ordered candidate start times.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotCatalogue {
    times: Vec<TimeOfDay>,
}

impl SlotCatalogue {
    pub fn times(&self) -> &[TimeOfDay] {
        &self.times
    }

    pub fn contains(&self, time: TimeOfDay) -> bool {
        self.times.binary_search(&time).is_ok()
    }
}

/// `[scoring]` config section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub favorable: f64,
    pub neutral: f64,
    pub difficult: f64,
    pub mirror: f64,
    pub ripple: f64,
    pub chaotic: f64,
    /// Subtracted when the wind raises lateral chop
    pub chop_penalty: f64,
    /// Score per second of split improvement
    pub pace_per_second: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            favorable: 3.0,
            neutral: 1.5,
            difficult: 0.0,
            mirror: 3.0,
            ripple: 2.0,
            chaotic: 0.0,
            chop_penalty: 1.0,
            pace_per_second: 0.1,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let all = [
            self.favorable,
            self.neutral,
            self.difficult,
            self.mirror,
            self.ripple,
            self.chaotic,
            self.chop_penalty,
            self.pace_per_second,
        ];
        if all.iter().any(|w| !w.is_finite()) {
            return Err(ValidationError::InvalidThresholds(
                "score weights must be finite".to_string(),
            ));
        }
        if !(self.favorable >= self.neutral && self.neutral >= self.difficult) {
            return Err(ValidationError::InvalidThresholds(
                "favorability weights must satisfy favorable >= neutral >= difficult".to_string(),
            ));
        }
        if !(self.mirror >= self.chaotic && self.ripple >= self.chaotic) {
            return Err(ValidationError::InvalidThresholds(
                "water-state weights must rank mirror and ripple above chaotic".to_string(),
            ));
        }
        if self.chop_penalty < 0.0 || self.pace_per_second < 0.0 {
            return Err(ValidationError::InvalidThresholds(
                "chop_penalty and pace_per_second must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    fn favorability(&self, f: Favorability) -> f64 {
        match f {
            Favorability::Favorable => self.favorable,
            Favorability::Neutral => self.neutral,
            Favorability::Difficult => self.difficult,
        }
    }

    fn water_state(&self, w: WaterState) -> f64 {
        match w {
            WaterState::Mirror => self.mirror,
            WaterState::Ripple => self.ripple,
            WaterState::Chaotic => self.chaotic,
        }
    }

    pub fn score(&self, verdict: &ConditionVerdict, pace: &PaceEstimate) -> f64 {
        let chop = if verdict.chop { self.chop_penalty } else { 0.0 };
        self.favorability(verdict.favorability) + self.water_state(verdict.water_state)
            - chop
            - self.pace_per_second * pace.delta_seconds
    }
}

/// Forecast for one start time. Current observations are often missing; a
/// slot without one gets a neutral pace estimate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub time: TimeOfDay,
    pub wind: Vector2D,
    #[serde(default)]
    pub current: Option<Vector2D>,
}

/// Tide context for a slot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TideOutlook {
    /// No tide data for the date
    Unknown,
    Known {
        /// Next tide after the slot, if any under the day-boundary policy
        next_time: Option<TimeOfDay>,
        next_date: Option<NaiveDate>,
        next_height_m: Option<f64>,
        /// Heading for high water
        rising: Option<bool>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRecommendation {
    pub time: TimeOfDay,
    pub verdict: ConditionVerdict,
    pub pace: PaceEstimate,
    pub tide: TideOutlook,
    pub score: f64,
}

/// Everything the ranking needs, borrowed from the engine's configuration.
#[derive(Clone, Debug)]
pub struct Recommender<'a> {
    course: &'a CourseConfig,
    thresholds: &'a Thresholds,
    pace: &'a PaceSettings,
    weights: &'a ScoreWeights,
    mean_level_m: f64,
    day_boundary: DayBoundary,
    catalogue: SlotCatalogue,
}

impl<'a> Recommender<'a> {
    pub fn new(config: &'a Config) -> Result<Self, ValidationError> {
        Ok(Recommender {
            course: &config.course,
            thresholds: &config.thresholds,
            pace: &config.pace,
            weights: &config.scoring,
            mean_level_m: config.tides.mean_level_m,
            day_boundary: config.tides.day_boundary,
            catalogue: config.slots.catalogue()?,
        })
    }

    pub fn catalogue(&self) -> &SlotCatalogue {
        &self.catalogue
    }

    /// Score one slot.
    pub fn evaluate(
        &self,
        date: NaiveDate,
        tides: &TideTable,
        sample: &ForecastSample,
    ) -> Result<SlotRecommendation, ValidationError> {
        let verdict = classify_wind(self.course, &sample.wind, self.thresholds)?;
        let pace = match &sample.current {
            Some(current) => {
                let current_verdict = classify_vector(self.course, current, self.thresholds)?;
                estimate_for_current(&current_verdict, self.course, self.pace)?
            }
            None => PaceEstimate::neutral(),
        };
        let score = self.weights.score(&verdict, &pace);
        debug!(
            "Slot {} {}: {} / {} chop={} pace {:+.1}s → score {:.2}",
            date,
            sample.time,
            verdict.favorability,
            verdict.water_state,
            verdict.chop,
            pace.delta_seconds,
            score
        );

        Ok(SlotRecommendation {
            time: sample.time,
            verdict,
            pace,
            tide: self.tide_outlook(date, tides, sample.time),
            score,
        })
    }

    fn tide_outlook(&self, date: NaiveDate, tides: &TideTable, time: TimeOfDay) -> TideOutlook {
        if tides.lookup(date).is_none() {
            return TideOutlook::Unknown;
        }
        let next = tides.next_tide(date, time, self.day_boundary);
        TideOutlook::Known {
            next_time: next.map(|n| n.entry.time),
            next_date: next.map(|n| n.date),
            next_height_m: next.map(|n| n.entry.height),
            rising: next.map(|n| is_high_tide(n.entry.height, self.mean_level_m)),
        }
    }

    /// Score every catalogue slot that has a forecast and rank them.
    ///
    /// Samples at times outside the catalogue are ignored, as are repeated
    /// samples for a time already seen. Catalogue slots with no sample are
    /// left out of the result.
    pub fn recommend(
        &self,
        date: NaiveDate,
        tides: &TideTable,
        samples: &[ForecastSample],
    ) -> Result<Vec<SlotRecommendation>, ValidationError> {
        let mut by_time: BTreeMap<TimeOfDay, &ForecastSample> = BTreeMap::new();
        for sample in samples {
            if !self.catalogue.contains(sample.time) {
                debug!("Forecast sample at {} is not a candidate slot", sample.time);
                continue;
            }
            match by_time.entry(sample.time) {
                Entry::Vacant(slot) => {
                    slot.insert(sample);
                }
                Entry::Occupied(_) => {
                    warn!("Duplicate forecast sample at {}, keeping the first", sample.time);
                }
            }
        }

        let mut ranked = Vec::with_capacity(by_time.len());
        for &time in self.catalogue.times() {
            if let Some(sample) = by_time.get(&time) {
                ranked.push(self.evaluate(date, tides, sample)?);
            }
        }

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.time.cmp(&b.time)));
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn tides() -> TideTable {
        TideTable::from_json_str(
            r#"{ "2025-6": { "year": 2025, "month": 6, "days": [
                { "day": 1, "weekday": "Sun", "tides": [
                    { "time": "03:20", "height": 3.1 },
                    { "time": "09:36", "height": 0.8 },
                    { "time": "15:48", "height": 3.3 },
                    { "time": "21:58", "height": 0.6 } ] } ] } }"#,
        )
        .unwrap()
    }

    fn sample(
        time: &str,
        wind_speed: f64,
        wind_dir: f64,
        current: Option<(f64, f64)>,
    ) -> ForecastSample {
        ForecastSample {
            time: t(time),
            wind: Vector2D::new(wind_speed, wind_dir).unwrap(),
            current: current.map(|(s, d)| Vector2D::new(s, d).unwrap()),
        }
    }

    #[test]
    fn default_catalogue_has_two_half_hour_bands() {
        let catalogue = SlotSettings::default().catalogue().unwrap();
        let labels: Vec<String> = catalogue.times().iter().map(|t| t.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "06:00", "06:30", "07:00", "07:30", "08:00", "08:30", "17:00", "17:30", "18:00",
                "18:30", "19:00", "19:30"
            ]
        );
    }

    #[test]
    fn overlapping_bands_rejected() {
        let settings = SlotSettings {
            morning_end: t("18:00"),
            ..SlotSettings::default()
        };
        assert!(settings.catalogue().is_err());
        let zero_step = SlotSettings {
            step_minutes: 0,
            ..SlotSettings::default()
        };
        assert!(zero_step.catalogue().is_err());
    }

    #[test]
    fn oversized_step_yields_band_starts_only() {
        let settings = SlotSettings {
            step_minutes: u32::MAX,
            ..SlotSettings::default()
        };
        let catalogue = settings.catalogue().unwrap();
        assert_eq!(catalogue.times(), &[t("06:00"), t("17:00")]);
    }

    #[test]
    fn ranks_calm_tailwind_first() {
        let config = Config::default();
        let recommender = Recommender::new(&config).unwrap();
        let samples = vec![
            // 0.0: difficult, chaotic
            sample("06:00", 8.0, 135.0, None),
            // 6.0 + 2.04: favorable, mirror, helping current
            sample("06:30", 1.0, 315.0, Some((0.5, 315.0))),
            // 3.5: neutral, mirror, chop
            sample("07:00", 1.0, 45.0, None),
            // 5.0 - 2.04: favorable, ripple, opposing current
            sample("17:00", 4.0, 315.0, Some((0.5, 135.0))),
        ];
        let ranked = recommender.recommend(date(), &tides(), &samples).unwrap();
        let order: Vec<String> = ranked.iter().map(|r| r.time.to_string()).collect();
        assert_eq!(order, vec!["06:30", "07:00", "17:00", "06:00"]);
        assert!(ranked[0].pace.helped);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn ties_break_by_earliest_time() {
        let config = Config::default();
        let recommender = Recommender::new(&config).unwrap();
        let samples = vec![
            sample("18:00", 1.0, 315.0, None),
            sample("06:00", 1.0, 315.0, None),
            sample("07:30", 1.0, 315.0, None),
        ];
        let ranked = recommender.recommend(date(), &tides(), &samples).unwrap();
        let order: Vec<String> = ranked.iter().map(|r| r.time.to_string()).collect();
        assert_eq!(order, vec!["06:00", "07:30", "18:00"]);
    }

    #[test]
    fn deterministic_for_identical_input() {
        let config = Config::default();
        let recommender = Recommender::new(&config).unwrap();
        let samples: Vec<ForecastSample> = SlotSettings::default()
            .catalogue()
            .unwrap()
            .times()
            .iter()
            .enumerate()
            .map(|(i, time)| ForecastSample {
                time: *time,
                wind: Vector2D::new((i % 5) as f64 * 2.0, (i * 37 % 360) as f64).unwrap(),
                current: Some(Vector2D::new(0.3, (i * 53 % 360) as f64).unwrap()),
            })
            .collect();
        let first = recommender.recommend(date(), &tides(), &samples).unwrap();
        let second = recommender.recommend(date(), &tides(), &samples).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 12);
    }

    #[test]
    fn off_catalogue_and_duplicate_samples() {
        let config = Config::default();
        let recommender = Recommender::new(&config).unwrap();
        let samples = vec![
            sample("12:00", 1.0, 315.0, None),
            sample("06:00", 1.0, 315.0, None),
            sample("06:00", 9.0, 135.0, None),
        ];
        let ranked = recommender.recommend(date(), &tides(), &samples).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].verdict.water_state, WaterState::Mirror);
    }

    #[test]
    fn tide_outlook_known_and_unknown() {
        let config = Config::default();
        let recommender = Recommender::new(&config).unwrap();
        let samples = vec![sample("07:00", 1.0, 315.0, None)];

        let ranked = recommender.recommend(date(), &tides(), &samples).unwrap();
        match ranked[0].tide {
            TideOutlook::Known {
                next_time, rising, ..
            } => {
                assert_eq!(next_time, Some(t("09:36")));
                assert_eq!(rising, Some(false));
            }
            TideOutlook::Unknown => panic!("tide data is loaded for this date"),
        }

        let missing = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let ranked = recommender.recommend(missing, &tides(), &samples).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].tide, TideOutlook::Unknown);
    }

    #[test]
    fn evening_slot_with_no_later_tide() {
        let config = Config::default();
        let recommender = Recommender::new(&config).unwrap();
        let samples = vec![sample("19:30", 1.0, 315.0, None)];
        let ranked = recommender.recommend(date(), &tides(), &samples).unwrap();
        assert!(matches!(
            ranked[0].tide,
            TideOutlook::Known { next_time: Some(_), .. }
        ));

        let late = SlotSettings {
            afternoon_end: t("22:30"),
            ..SlotSettings::default()
        };
        let config = Config {
            slots: late,
            ..Config::default()
        };
        let recommender = Recommender::new(&config).unwrap();
        let samples = vec![sample("22:30", 1.0, 315.0, None)];
        let ranked = recommender.recommend(date(), &tides(), &samples).unwrap();
        assert!(matches!(
            ranked[0].tide,
            TideOutlook::Known { next_time: None, rising: None, .. }
        ));
    }

    #[test]
    fn empty_forecast_gives_empty_ranking() {
        let config = Config::default();
        let recommender = Recommender::new(&config).unwrap();
        assert!(recommender.recommend(date(), &tides(), &[]).unwrap().is_empty());
    }

    #[test]
    fn invalid_sample_is_rejected() {
        let config = Config::default();
        let recommender = Recommender::new(&config).unwrap();
        let bad = ForecastSample {
            time: t("06:00"),
            wind: Vector2D {
                speed_ms: -3.0,
                direction_deg: 0.0,
            },
            current: None,
        };
        assert!(recommender.recommend(date(), &tides(), &[bad]).is_err());
    }

    #[test]
    fn weight_validation() {
        assert!(ScoreWeights::default().validate().is_ok());
        let inverted = ScoreWeights {
            difficult: 5.0,
            ..ScoreWeights::default()
        };
        assert!(inverted.validate().is_err());
    }
}
