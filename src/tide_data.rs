//! # Tide Table Repository
//!
//! This module holds the tide tables the rest of the engine reads: one entry
//! per calendar day, each with that day's high and low water times and
//! heights. Tables are loaded once from a static JSON dataset and then only
//! read, except for whole-table hot swaps.
//!
//! ## Dataset Format
//!
//! ```json
//! {
//!   "2025-6": {
//!     "year": 2025,
//!     "month": 6,
//!     "days": [
//!       { "day": 1, "weekday": "Sun",
//!         "tides": [ { "time": "03:12", "height": 3.1 },
//!                    { "time": "09:30", "height": 0.6 } ] }
//!     ]
//!   }
//! }
//! ```
//!
//! Keys are `<year>-<month>`; zero-padded months are accepted. Loading
//! validates every invariant the lookups depend on:
//! - the key matches the body's `year`/`month`
//! - each month and each day appears at most once
//! - the day exists in that month
//! - tides within a day are non-decreasing by time
//! - heights are non-negative
//!
//! ## Lookups
//!
//! A date outside the loaded dataset is an ordinary condition, so lookups
//! return `Option` rather than an error.
//!
//! ## Day Boundary
//!
//! [`DayBoundary`] decides what "next tide" means when no later tide exists
//! on the queried day: [`DayBoundary::SameDay`] reports none,
//! [`DayBoundary::RollOver`] returns the first tide of the following day when
//! that day is loaded.

use crate::error::TideError;
use crate::{TimeOfDay, ValidationError};
use chrono::{Datelike, NaiveDate, Weekday};
use log::{info, warn};
use parking_lot::RwLock;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// One high or low water.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideEntry {
    /// Local time of the extreme
    pub time: TimeOfDay,
    /// Height above chart datum, metres
    pub height: f64,
}

/// All tides for one calendar day, ordered by time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DayTide {
    pub day: u32,
    pub weekday: Weekday,
    pub tides: Vec<TideEntry>,
}

/// All days loaded for one month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthTide {
    pub year: i32,
    pub month: u32,
    pub days: Vec<DayTide>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TideKind {
    High,
    Low,
}

/// What "next tide" does at the end of a day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayBoundary {
    /// Report none when the queried day has no later tide
    #[default]
    SameDay,
    /// Continue with the first tide of the next day
    RollOver,
}

/// A tide found by a "next tide" query, with the day it falls on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NextTide {
    pub date: NaiveDate,
    pub entry: TideEntry,
}

/// `[tides]` config section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TideSettings {
    /// JSON tide dataset
    pub dataset_path: PathBuf,
    /// Mean sea level at the reference port, metres above chart datum
    pub mean_level_m: f64,
    pub day_boundary: DayBoundary,
}

impl Default for TideSettings {
    fn default() -> Self {
        TideSettings {
            dataset_path: PathBuf::from("data/tides.json"),
            mean_level_m: 1.29,
            day_boundary: DayBoundary::SameDay,
        }
    }
}

impl TideSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.mean_level_m.is_finite() {
            return Err(ValidationError::InvalidThresholds(format!(
                "mean_level_m must be finite, got {}",
                self.mean_level_m
            )));
        }
        Ok(())
    }

    pub fn is_high_tide(&self, height_m: f64) -> bool {
        is_high_tide(height_m, self.mean_level_m)
    }
}

/// A height strictly above mean level is high water; a tie is low.
pub fn is_high_tide(height_m: f64, mean_level_m: f64) -> bool {
    height_m > mean_level_m
}

/// Parse `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

impl DayTide {
    /// First tide strictly after `time`.
    pub fn next_after(&self, time: TimeOfDay) -> Option<&TideEntry> {
        self.tides.iter().find(|entry| entry.time > time)
    }

    /// Tag each tide high or low against the given mean level.
    pub fn extremes(&self, mean_level_m: f64) -> Vec<(TideEntry, TideKind)> {
        self.tides
            .iter()
            .map(|entry| {
                let kind = if is_high_tide(entry.height, mean_level_m) {
                    TideKind::High
                } else {
                    TideKind::Low
                };
                (*entry, kind)
            })
            .collect()
    }
}

/// `"year-month"` table key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = TideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TideError::InvalidMonthKey(s.to_string());
        // rsplit so a negative year cannot be mistaken for the separator
        let (year, month) = s.trim().rsplit_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(MonthKey { year, month })
    }
}

/// Validated, immutable tide table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TideTable {
    months: BTreeMap<MonthKey, MonthTide>,
}

impl TideTable {
    /// Build a table from month bodies, checking every invariant.
    pub fn from_months<I>(months: I) -> Result<Self, TideError>
    where
        I: IntoIterator<Item = MonthTide>,
    {
        let mut table = BTreeMap::new();
        for mut month in months {
            let key = MonthKey {
                year: month.year,
                month: month.month,
            };
            validate_month(&mut month)?;
            if table.insert(key, month).is_some() {
                return Err(TideError::DuplicateMonth {
                    year: key.year,
                    month: key.month,
                });
            }
        }
        Ok(TideTable { months: table })
    }

    /// Parse the keyed JSON dataset.
    pub fn from_json_str(json: &str) -> Result<Self, TideError> {
        let KeyedMonths(raw) = serde_json::from_str(json)?;
        let mut months = Vec::with_capacity(raw.len());
        for (key, body) in raw {
            let parsed: MonthKey = key.parse()?;
            if parsed.year != body.year || parsed.month != body.month {
                return Err(TideError::KeyMismatch {
                    key,
                    year: body.year,
                    month: body.month,
                });
            }
            months.push(body);
        }
        Self::from_months(months)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, TideError> {
        let json = fs::read_to_string(&path)?;
        let table = Self::from_json_str(&json)?;
        info!(
            "Loaded tide table from {}: {} months, {} days",
            path.as_ref().display(),
            table.months.len(),
            table.day_count()
        );
        Ok(table)
    }

    /// Serialize back to the keyed JSON dataset format.
    pub fn to_json_string(&self) -> Result<String, TideError> {
        let keyed: BTreeMap<String, &MonthTide> = self
            .months
            .iter()
            .map(|(key, month)| (key.to_string(), month))
            .collect();
        Ok(serde_json::to_string_pretty(&keyed)?)
    }

    pub fn day_count(&self) -> usize {
        self.months.values().map(|m| m.days.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Tides for a calendar date, or `None` when the date is not loaded.
    pub fn lookup(&self, date: NaiveDate) -> Option<&DayTide> {
        let month = self.months.get(&MonthKey::of(date))?;
        // days are sorted by validate_month
        month
            .days
            .binary_search_by_key(&date.day(), |d| d.day)
            .ok()
            .map(|index| &month.days[index])
    }

    /// First tide strictly after `time` on `date`, following `boundary` when
    /// the day has none left.
    pub fn next_tide(
        &self,
        date: NaiveDate,
        time: TimeOfDay,
        boundary: DayBoundary,
    ) -> Option<NextTide> {
        if let Some(entry) = self.lookup(date).and_then(|day| day.next_after(time)) {
            return Some(NextTide {
                date,
                entry: *entry,
            });
        }
        match boundary {
            DayBoundary::SameDay => None,
            DayBoundary::RollOver => {
                let next_date = date.succ_opt()?;
                let entry = self.lookup(next_date)?.tides.first()?;
                Some(NextTide {
                    date: next_date,
                    entry: *entry,
                })
            }
        }
    }
}

/// Dataset top level in document order. A JSON object with a repeated key
/// would otherwise keep only the last body.
struct KeyedMonths(Vec<(String, MonthTide)>);

impl<'de> Deserialize<'de> for KeyedMonths {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyedMonthsVisitor;

        impl<'de> Visitor<'de> for KeyedMonthsVisitor {
            type Value = KeyedMonths;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of \"<year>-<month>\" keys to month bodies")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut seen = HashSet::new();
                let mut months = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(key) = map.next_key::<String>()? {
                    if !seen.insert(key.clone()) {
                        return Err(de::Error::custom(format!(
                            "month key {:?} appears more than once",
                            key
                        )));
                    }
                    let body: MonthTide = map.next_value()?;
                    months.push((key, body));
                }
                Ok(KeyedMonths(months))
            }
        }

        deserializer.deserialize_map(KeyedMonthsVisitor)
    }
}

fn validate_month(month: &mut MonthTide) -> Result<(), TideError> {
    let (year, m) = (month.year, month.month);
    if NaiveDate::from_ymd_opt(year, m, 1).is_none() {
        return Err(TideError::InvalidMonthKey(format!("{}-{}", year, m)));
    }

    month.days.sort_by_key(|d| d.day);
    for pair in month.days.windows(2) {
        if pair[0].day == pair[1].day {
            return Err(TideError::DuplicateDay {
                year,
                month: m,
                day: pair[0].day,
            });
        }
    }

    for day in &month.days {
        let Some(date) = NaiveDate::from_ymd_opt(year, m, day.day) else {
            return Err(TideError::InvalidDay {
                year,
                month: m,
                day: day.day,
            });
        };
        if date.weekday() != day.weekday {
            warn!(
                "Tide dataset lists {} as {:?}, calendar says {:?}",
                date,
                day.weekday,
                date.weekday()
            );
        }
        if day.tides.windows(2).any(|w| w[0].time > w[1].time) {
            return Err(TideError::UnsortedTides {
                year,
                month: m,
                day: day.day,
            });
        }
        if let Some(entry) = day
            .tides
            .iter()
            .find(|e| !e.height.is_finite() || e.height < 0.0)
        {
            return Err(TideError::NegativeHeight {
                year,
                month: m,
                day: day.day,
                height: entry.height,
            });
        }
    }
    Ok(())
}

/// Shared, read-mostly holder for the current tide table.
///
/// Readers take a cheap [`Arc`] snapshot; [`TideRepository::replace`] swaps
/// the whole table at once, so a reader never sees a half-loaded dataset.
#[derive(Debug)]
pub struct TideRepository {
    table: RwLock<Arc<TideTable>>,
    settings: TideSettings,
}

impl TideRepository {
    pub fn new(table: TideTable, settings: TideSettings) -> Self {
        TideRepository {
            table: RwLock::new(Arc::new(table)),
            settings,
        }
    }

    /// Load the dataset named in `settings`.
    pub fn load(settings: TideSettings) -> Result<Self, TideError> {
        let table = TideTable::load_from_path(&settings.dataset_path)?;
        Ok(Self::new(table, settings))
    }

    pub fn settings(&self) -> &TideSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> Arc<TideTable> {
        self.table.read().clone()
    }

    pub fn replace(&self, table: TideTable) {
        let days = table.day_count();
        *self.table.write() = Arc::new(table);
        info!("Tide table replaced ({} days)", days);
    }

    /// Re-read the configured dataset and swap it in. On failure the old
    /// table stays in place.
    pub fn reload(&self) -> Result<(), TideError> {
        let table = TideTable::load_from_path(&self.settings.dataset_path)?;
        self.replace(table);
        Ok(())
    }

    pub fn lookup(&self, date: NaiveDate) -> Option<DayTide> {
        self.snapshot().lookup(date).cloned()
    }

    pub fn is_high_tide(&self, height_m: f64) -> bool {
        self.settings.is_high_tide(height_m)
    }

    /// Next tide using the configured day-boundary policy.
    pub fn next_tide(&self, date: NaiveDate, time: TimeOfDay) -> Option<NextTide> {
        self.snapshot().next_tide(date, time, self.settings.day_boundary)
    }
}
