//! # Rowing Conditions Command Line
//!
//! Thin wrapper over the conditions engine for checking a course from a
//! terminal: classify a wind/current reading, rank the day's start times from
//! a forecast file, or list the day's tides.
//!
//! ```text
//! rowing-conditions [--config PATH] classify --wind SPEED@DIR [--current SPEED@DIR]
//!                   [--kmh|--knots]
//! rowing-conditions [--config PATH] recommend --date YYYY-MM-DD --forecast FILE.json
//! rowing-conditions [--config PATH] tides --date YYYY-MM-DD
//! ```

// Test modules
#[cfg(test)]
mod tests;

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use rowing_conditions_lib::classifier::ClassificationRequest;
use rowing_conditions_lib::config::{Config, DEFAULT_CONFIG_PATH};
use rowing_conditions_lib::engine::{ConditionsEngine, ForecastProvider};
use rowing_conditions_lib::recommender::ForecastSample;
use rowing_conditions_lib::tide_data::{parse_date, TideTable};
use rowing_conditions_lib::units::SpeedUnit;
use rowing_conditions_lib::{report, Vector2D};
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Parsed command line.
#[derive(Debug, PartialEq)]
struct Cli {
    config_path: PathBuf,
    command: Command,
}

#[derive(Debug, PartialEq)]
enum Command {
    Classify {
        wind: Option<Vector2D>,
        current: Option<Vector2D>,
    },
    Recommend {
        date: NaiveDate,
        forecast: PathBuf,
    },
    Tides {
        date: NaiveDate,
    },
}

/// Forecast samples read from a local JSON file.
struct FileForecasts {
    path: PathBuf,
}

impl ForecastProvider for FileForecasts {
    fn forecast(&self, _date: NaiveDate) -> anyhow::Result<Vec<ForecastSample>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading forecast {}", self.path.display()))?;
        let samples = serde_json::from_str(&raw)
            .with_context(|| format!("parsing forecast {}", self.path.display()))?;
        Ok(samples)
    }
}

/// Parse `SPEED@DIRECTION`, e.g. `3.5@270`, converting the speed to m/s.
fn parse_vector(raw: &str, unit: SpeedUnit) -> anyhow::Result<Vector2D> {
    let (speed, direction) = raw
        .split_once('@')
        .ok_or_else(|| anyhow!("expected SPEED@DIRECTION, got {:?}", raw))?;
    let speed: f64 = speed
        .trim()
        .parse()
        .with_context(|| format!("invalid speed in {:?}", raw))?;
    let direction: f64 = direction
        .trim()
        .parse()
        .with_context(|| format!("invalid direction in {:?}", raw))?;
    Ok(Vector2D::new(unit.to_ms(speed), direction)?)
}

fn parse_args<I>(args: I) -> anyhow::Result<Cli>
where
    I: IntoIterator<Item = String>,
{
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut subcommand = None;
    let mut wind = None;
    let mut current = None;
    let mut date = None;
    let mut forecast = None;
    let mut unit = SpeedUnit::MetresPerSecond;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .ok_or_else(|| anyhow!("{} needs a value", name))
        };
        match arg.as_str() {
            "--config" => config_path = PathBuf::from(value("--config")?),
            "--wind" => wind = Some(value("--wind")?),
            "--current" => current = Some(value("--current")?),
            "--date" => date = Some(parse_date(&value("--date")?)?),
            "--forecast" => forecast = Some(PathBuf::from(value("--forecast")?)),
            "--kmh" => unit = SpeedUnit::KilometresPerHour,
            "--knots" => unit = SpeedUnit::Knots,
            "classify" | "recommend" | "tides" if subcommand.is_none() => {
                subcommand = Some(arg.clone())
            }
            other => bail!("unexpected argument {:?}", other),
        }
    }

    let command = match subcommand.as_deref() {
        Some("classify") => {
            let wind = wind.map(|w| parse_vector(&w, unit)).transpose()?;
            let current = current.map(|c| parse_vector(&c, unit)).transpose()?;
            if wind.is_none() && current.is_none() {
                bail!("classify needs --wind and/or --current");
            }
            Command::Classify { wind, current }
        }
        Some("recommend") => Command::Recommend {
            date: date.ok_or_else(|| anyhow!("recommend needs --date"))?,
            forecast: forecast.ok_or_else(|| anyhow!("recommend needs --forecast"))?,
        },
        Some("tides") => Command::Tides {
            date: date.ok_or_else(|| anyhow!("tides needs --date"))?,
        },
        _ => bail!("usage: rowing-conditions [--config PATH] <classify|recommend|tides> ..."),
    };

    Ok(Cli {
        config_path,
        command,
    })
}

/// Run one command and return the text to print.
fn run(cli: Cli) -> anyhow::Result<String> {
    let config = Config::load_from_path(&cli.config_path);

    match cli.command {
        Command::Classify { wind, current } => {
            // classification never touches tides
            let engine = ConditionsEngine::new(config, TideTable::default())?;
            let result = engine.classify(&ClassificationRequest { wind, current })?;
            let mut text = report::format_classification(&engine.config().course, &result);
            if let Some(current) = &current {
                let pace = engine.estimate_pace(current)?;
                text.push_str(&format!(
                    "Pace:    {:+.1}s per {} m ({})\n",
                    pace.delta_seconds,
                    engine.config().pace.reference_distance_m,
                    if pace.helped { "helped" } else { "not helped" }
                ));
            }
            Ok(text)
        }
        Command::Recommend { date, forecast } => {
            let engine = ConditionsEngine::from_config(config)
                .context("starting conditions engine")?;
            let provider = FileForecasts { path: forecast };
            let ranked = engine.recommend_for_date(date, &provider, None)?;
            Ok(report::format_recommendations(date, &ranked))
        }
        Command::Tides { date } => {
            let engine = ConditionsEngine::from_config(config)
                .context("starting conditions engine")?;
            let day = engine.tides().lookup(date);
            Ok(report::format_day_tides(
                date,
                day.as_ref(),
                engine.config().tides.mean_level_m,
            ))
        }
    }
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args(env::args().skip(1))?;
    let output = run(cli)?;
    print!("{}", output);
    Ok(())
}
