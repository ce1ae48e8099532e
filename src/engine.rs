//! # Conditions Engine
//!
//! The service handed to the presentation layer. It owns the validated
//! configuration, the tide repository and two TTL caches, and exposes the
//! classification and recommendation operations over them.
//!
//! Fetching raw forecasts and tide tables from upstream services is someone
//! else's job: callers plug that in through [`ForecastProvider`] and
//! [`TideProvider`], and the engine only decides when to call them.

use crate::cache::{Clock, SystemClock, TtlCache};
use crate::classifier::{classify, classify_vector, Classification, ClassificationRequest};
use crate::config::Config;
use crate::error::{EngineError, TideError};
use crate::pace::{estimate_for_current, PaceEstimate};
use crate::recommender::{ForecastSample, Recommender, SlotRecommendation};
use crate::tide_data::{DayBoundary, DayTide, MonthKey, MonthTide, TideRepository, TideTable};
use crate::{ValidationError, Vector2D};
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Upstream source of per-slot wind/current forecasts.
pub trait ForecastProvider {
    fn forecast(&self, date: NaiveDate) -> anyhow::Result<Vec<ForecastSample>>;
}

/// Upstream source of tide tables for dates the local dataset lacks.
pub trait TideProvider {
    fn day_tide(&self, date: NaiveDate) -> anyhow::Result<Option<DayTide>>;
}

#[derive(Debug)]
pub struct ConditionsEngine {
    config: Config,
    tides: TideRepository,
    forecasts: TtlCache<NaiveDate, Vec<ForecastSample>>,
    upstream_tides: TtlCache<NaiveDate, Option<DayTide>>,
}

impl ConditionsEngine {
    /// Validate `config` and wrap an already loaded tide table.
    pub fn new(config: Config, tides: TideTable) -> Result<Self, EngineError> {
        Self::with_clock(config, tides, Arc::new(SystemClock))
    }

    /// Like [`ConditionsEngine::new`] with an explicit cache clock.
    pub fn with_clock(
        config: Config,
        tides: TideTable,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let repository = TideRepository::new(tides, config.tides.clone());
        Ok(Self::assemble(config, repository, clock))
    }

    /// Validate `config` and load the tide dataset it points at.
    pub fn from_config(config: Config) -> Result<Self, EngineError> {
        config.validate()?;
        let repository = TideRepository::load(config.tides.clone())?;
        Ok(Self::assemble(config, repository, Arc::new(SystemClock)))
    }

    fn assemble(config: Config, tides: TideRepository, clock: Arc<dyn Clock>) -> Self {
        let max_entries = config.cache.max_entries;
        info!(
            "Conditions engine ready for {} (azimuth {}°)",
            config.course.name, config.course.azimuth_deg
        );
        ConditionsEngine {
            tides,
            forecasts: TtlCache::with_clock(max_entries, Arc::clone(&clock)),
            upstream_tides: TtlCache::with_clock(max_entries, clock),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tides(&self) -> &TideRepository {
        &self.tides
    }

    /// Classify whichever vectors the request carries.
    pub fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<Classification, ValidationError> {
        classify(&self.config.course, request, &self.config.thresholds)
    }

    /// Split change caused by a current.
    pub fn estimate_pace(&self, current: &Vector2D) -> Result<PaceEstimate, ValidationError> {
        let verdict = classify_vector(&self.config.course, current, &self.config.thresholds)?;
        estimate_for_current(&verdict, &self.config.course, &self.config.pace)
    }

    /// Rank slots for `date` from forecast samples already in hand, using the
    /// loaded tide table.
    pub fn recommend(
        &self,
        date: NaiveDate,
        samples: &[ForecastSample],
    ) -> Result<Vec<SlotRecommendation>, ValidationError> {
        let tides = self.tides.snapshot();
        Recommender::new(&self.config)?.recommend(date, &tides, samples)
    }

    /// Forecast for `date`, served from cache while fresh.
    pub fn forecast(
        &self,
        date: NaiveDate,
        provider: &dyn ForecastProvider,
    ) -> Result<Vec<ForecastSample>, EngineError> {
        let samples = self
            .forecasts
            .with_cache(date, self.config.cache.weather_ttl_secs, || {
                debug!("Fetching forecast for {}", date);
                provider.forecast(date)
            })?;
        Ok(samples)
    }

    /// Tides for `date`: the loaded table first, then the upstream provider
    /// (cached) when one is given.
    pub fn day_tide(
        &self,
        date: NaiveDate,
        provider: Option<&dyn TideProvider>,
    ) -> Result<Option<DayTide>, EngineError> {
        if let Some(day) = self.tides.lookup(date) {
            return Ok(Some(day));
        }
        let Some(provider) = provider else {
            return Ok(None);
        };
        let day = self
            .upstream_tides
            .with_cache(date, self.config.cache.tide_ttl_secs, || {
                debug!("Fetching upstream tides for {}", date);
                provider.day_tide(date)
            })?;
        Ok(day)
    }

    /// Fetch (or reuse) the forecast and rank the day's slots.
    ///
    /// When the loaded table has no tides for `date` and a tide provider is
    /// given, the upstream day is used for the slots' tide outlook. Under
    /// [`DayBoundary::RollOver`] the following day is fetched the same way,
    /// so late slots can still see the next morning's tide.
    pub fn recommend_for_date(
        &self,
        date: NaiveDate,
        forecasts: &dyn ForecastProvider,
        tides: Option<&dyn TideProvider>,
    ) -> Result<Vec<SlotRecommendation>, EngineError> {
        let samples = self.forecast(date, forecasts)?;
        let recommender = Recommender::new(&self.config)?;

        let snapshot = self.tides.snapshot();
        if snapshot.lookup(date).is_some() {
            return Ok(recommender.recommend(date, &snapshot, &samples)?);
        }

        let mut days = Vec::new();
        if let Some(day) = self.day_tide(date, tides)? {
            days.push((date, day));
            if self.tides.settings().day_boundary == DayBoundary::RollOver {
                if let Some(next_date) = date.succ_opt() {
                    if let Some(next) = self.day_tide(next_date, tides)? {
                        days.push((next_date, next));
                    }
                }
            }
        }
        let table = table_of_days(days)?;
        Ok(recommender.recommend(date, &table, &samples)?)
    }

    /// Drop cached forecasts and upstream tides.
    pub fn clear_caches(&self) {
        self.forecasts.clear();
        self.upstream_tides.clear();
    }
}

/// Tide table holding just the given days.
fn table_of_days(days: Vec<(NaiveDate, DayTide)>) -> Result<TideTable, TideError> {
    let mut months: BTreeMap<MonthKey, MonthTide> = BTreeMap::new();
    for (date, day) in days {
        let key = MonthKey::of(date);
        months
            .entry(key)
            .or_insert_with(|| MonthTide {
                year: key.year,
                month: key.month,
                days: Vec::new(),
            })
            .days
            .push(day);
    }
    TideTable::from_months(months.into_values())
}
