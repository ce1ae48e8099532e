//! # End-to-End Tests for the Command Line
//!
//! These tests drive the binary's argument parsing and command execution
//! against real files on disk (configuration, tide dataset, forecast),
//! written to temporary locations so they run independently.

use std::fs;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};

use rowing_conditions_lib::config::Config;
use rowing_conditions_lib::recommender::ForecastSample;
use rowing_conditions_lib::tide_data::TideTable;
use rowing_conditions_lib::units::knots_to_ms;

// Import the items we're testing
use crate::{parse_args, parse_vector, run, Command};
use rowing_conditions_lib::units::SpeedUnit;

const DATASET: &str = r#"{
    "2025-6": {
        "year": 2025, "month": 6,
        "days": [
            { "day": 1, "weekday": "Sun", "tides": [
                { "time": "03:20", "height": 3.1 },
                { "time": "09:36", "height": 0.8 },
                { "time": "15:48", "height": 3.3 },
                { "time": "21:58", "height": 0.6 } ] }
        ]
    }
}"#;

const FORECAST: &str = r#"[
    { "time": "06:00", "wind": { "speed_ms": 8.5, "direction_deg": 135.0 } },
    { "time": "06:30", "wind": { "speed_ms": 1.2, "direction_deg": 320.0 },
      "current": { "speed_ms": 0.4, "direction_deg": 315.0 } },
    { "time": "17:30", "wind": { "speed_ms": 3.0, "direction_deg": 45.0 } }
]"#;

fn args(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Write a config pointing at a dataset inside `dir`.
fn write_fixture(dir: &Path) -> std::path::PathBuf {
    let dataset = dir.join("tides.json");
    fs::write(&dataset, DATASET).expect("Should write dataset");

    let mut config = Config::default();
    config.tides.dataset_path = dataset;
    let config_path = dir.join("rowing-config.toml");
    config.save(&config_path).expect("Should write config");
    config_path
}

/// The bundled dataset must load and satisfy every table invariant.
#[test]
fn bundled_dataset_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/tides.json");
    let table = TideTable::load_from_path(&path).expect("Bundled dataset should load");
    assert!(table.day_count() > 0);
}

/// The bundled config must parse and validate.
#[test]
fn bundled_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("rowing-config.toml");
    let raw = fs::read_to_string(&path).expect("Bundled config should exist");
    let config: Config = toml::from_str(&raw).expect("Bundled config should parse");
    assert!(config.validate().is_ok());
}

#[test]
fn bundled_forecast_parses() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/forecast-sample.json");
    let raw = fs::read_to_string(&path).expect("Sample forecast should exist");
    let samples: Vec<ForecastSample> =
        serde_json::from_str(&raw).expect("Sample forecast should parse");
    assert!(!samples.is_empty());
}

#[test]
fn parse_vector_converts_units() {
    let v = parse_vector("10@90", SpeedUnit::Knots).unwrap();
    assert!((v.speed_ms - knots_to_ms(10.0)).abs() < 1e-12);
    assert_eq!(v.direction_deg, 90.0);

    let v = parse_vector("18@0", SpeedUnit::KilometresPerHour).unwrap();
    assert!((v.speed_ms - 5.0).abs() < 1e-12);

    assert!(parse_vector("10", SpeedUnit::MetresPerSecond).is_err());
    assert!(parse_vector("-1@90", SpeedUnit::MetresPerSecond).is_err());
    assert!(parse_vector("1@361", SpeedUnit::MetresPerSecond).is_err());
}

#[test]
fn parse_args_recognises_commands() {
    let cli = parse_args(args("classify --wind 1@315")).unwrap();
    assert!(matches!(
        cli.command,
        Command::Classify {
            wind: Some(_),
            current: None
        }
    ));

    let cli = parse_args(args("--config other.toml tides --date 2025-06-01")).unwrap();
    assert_eq!(cli.config_path, Path::new("other.toml"));
    assert!(matches!(cli.command, Command::Tides { .. }));

    assert!(parse_args(args("recommend --date 2025-06-01")).is_err());
    assert!(parse_args(args("tides --date 01/06/2025")).is_err());
    assert!(parse_args(args("classify")).is_err());
    assert!(parse_args(args("launch")).is_err());
    assert!(parse_args(Vec::new()).is_err());
}

#[test]
fn classify_command_reports_verdicts_and_pace() {
    let cli = parse_args(args(
        "--config /nonexistent/config.toml classify --wind 1@315 --current 0.5@315",
    ))
    .unwrap();
    let text = run(cli).unwrap();
    assert!(text.contains("FAVORABLE"));
    assert!(text.contains("MIRROR"));
    assert!(text.contains("helped"));
}

#[test]
fn recommend_command_ranks_forecast_file() {
    let dir = TempDir::new().expect("Should create temp dir");
    let config_path = write_fixture(dir.path());

    let forecast = NamedTempFile::new().expect("Should create temp file");
    fs::write(forecast.path(), FORECAST).expect("Should write forecast");

    let cli = parse_args(vec![
        "--config".to_string(),
        config_path.display().to_string(),
        "recommend".to_string(),
        "--date".to_string(),
        "2025-06-01".to_string(),
        "--forecast".to_string(),
        forecast.path().display().to_string(),
    ])
    .unwrap();
    let text = run(cli).unwrap();

    // calm favorable morning first, chaotic headwind last
    let best = text.find("06:30").expect("06:30 should be listed");
    let middle = text.find("17:30").expect("17:30 should be listed");
    let worst = text.find("06:00").expect("06:00 should be listed");
    assert!(best < middle && middle < worst, "{}", text);
    assert!(text.contains("next 09:36"));
}

#[test]
fn recommend_for_unknown_date_does_not_fail() {
    let dir = TempDir::new().expect("Should create temp dir");
    let config_path = write_fixture(dir.path());
    let forecast = dir.path().join("forecast.json");
    fs::write(&forecast, FORECAST).expect("Should write forecast");

    let cli = parse_args(vec![
        "--config".to_string(),
        config_path.display().to_string(),
        "recommend".to_string(),
        "--date".to_string(),
        "2025-03-15".to_string(),
        "--forecast".to_string(),
        forecast.display().to_string(),
    ])
    .unwrap();
    let text = run(cli).unwrap();
    assert!(text.contains("tide unknown"));
}

#[test]
fn tides_command_lists_high_and_low() {
    let dir = TempDir::new().expect("Should create temp dir");
    let config_path = write_fixture(dir.path());

    let cli = parse_args(vec![
        "--config".to_string(),
        config_path.display().to_string(),
        "tides".to_string(),
        "--date".to_string(),
        "2025-06-01".to_string(),
    ])
    .unwrap();
    let text = run(cli).unwrap();
    assert_eq!(text.matches("HIGH").count(), 2);
    assert!(text.contains("21:58"));
}

#[test]
fn missing_dataset_is_an_error() {
    let dir = TempDir::new().expect("Should create temp dir");
    let mut config = Config::default();
    config.tides.dataset_path = dir.path().join("missing.json");
    let config_path = dir.path().join("rowing-config.toml");
    config.save(&config_path).expect("Should write config");

    let cli = parse_args(vec![
        "--config".to_string(),
        config_path.display().to_string(),
        "tides".to_string(),
        "--date".to_string(),
        "2025-06-01".to_string(),
    ])
    .unwrap();
    assert!(run(cli).is_err());
}

#[cfg(test)]
mod performance_tests {
    use rowing_conditions_lib::config::Config;
    use rowing_conditions_lib::recommender::{ForecastSample, Recommender};
    use rowing_conditions_lib::tide_data::TideTable;
    use rowing_conditions_lib::Vector2D;
    use std::time::Instant;

    /// Ranking a full catalogue is pure arithmetic and should be instant.
    #[test]
    fn full_catalogue_ranking_is_fast() {
        let config = Config::default();
        let recommender = Recommender::new(&config).unwrap();
        let samples: Vec<ForecastSample> = recommender
            .catalogue()
            .times()
            .iter()
            .map(|time| ForecastSample {
                time: *time,
                wind: Vector2D::new(3.0, 300.0).unwrap(),
                current: Some(Vector2D::new(0.2, 120.0).unwrap()),
            })
            .collect();
        let date = chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let table = TideTable::default();

        let start = Instant::now();
        for _ in 0..1000 {
            let ranked = recommender.recommend(date, &table, &samples).unwrap();
            assert_eq!(ranked.len(), samples.len());
        }
        assert!(
            start.elapsed().as_secs() < 5,
            "Ranking took too long: {:?}",
            start.elapsed()
        );
    }
}
