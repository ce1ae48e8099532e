//! # Plain-Text Reports
//!
//! Renders classifications, ranked slots and tide days as fixed-width text
//! for the terminal. This is the development output of the binary; the real
//! presentation layer consumes the typed results directly.

use crate::classifier::Classification;
use crate::config::CourseConfig;
use crate::recommender::{SlotRecommendation, TideOutlook};
use crate::tide_data::{DayTide, TideKind};
use chrono::NaiveDate;
use std::fmt::Write;

/// Format a split delta with an explicit sign, e.g. `-3.2s`.
fn format_delta(seconds: f64) -> String {
    if seconds == 0.0 {
        " 0.0s".to_string()
    } else {
        format!("{:+.1}s", seconds)
    }
}

fn format_outlook(outlook: &TideOutlook) -> String {
    match outlook {
        TideOutlook::Unknown => "tide unknown".to_string(),
        TideOutlook::Known {
            next_time: Some(time),
            next_height_m: Some(height),
            rising,
            ..
        } => {
            let arrow = match rising {
                Some(true) => "↑",
                Some(false) => "↓",
                None => " ",
            };
            format!("{} next {} {:.2}m", arrow, time, height)
        }
        TideOutlook::Known { .. } => "no later tide".to_string(),
    }
}

/// One block describing a classification against `course`.
pub fn format_classification(course: &CourseConfig, result: &Classification) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Course: {} ({}°)", course.name, course.azimuth_deg);

    match &result.wind {
        Some(wind) => {
            let _ = writeln!(
                out,
                "Wind:    {:<9} {:<7} angle {:>5.1}°{}",
                wind.favorability,
                wind.water_state,
                wind.angle_to_bow_deg,
                if wind.chop { "  ⚠ lateral chop" } else { "" }
            );
        }
        None => {
            let _ = writeln!(out, "Wind:    no data");
        }
    }

    match &result.current {
        Some(current) => {
            let _ = writeln!(
                out,
                "Current: {:<9} {:.2} m/s angle {:>5.1}°",
                current.favorability,
                current.speed_ms,
                current.angle_to_bow_deg
            );
        }
        None => {
            let _ = writeln!(out, "Current: no data");
        }
    }
    out
}

/// Ranked slot table, best first.
pub fn format_recommendations(date: NaiveDate, ranked: &[SlotRecommendation]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Recommended start times for {}", date);
    if ranked.is_empty() {
        let _ = writeln!(out, "  (no forecast for any candidate slot)");
        return out;
    }
    let _ = writeln!(
        out,
        "  #  time   score  favorability water    chop  pace/500m  tide"
    );
    for (rank, slot) in ranked.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {}  {:>5.2}  {:<12} {:<8} {:<4}  {:>9}  {}",
            rank + 1,
            slot.time,
            slot.score,
            slot.verdict.favorability,
            slot.verdict.water_state,
            if slot.verdict.chop { "yes" } else { "no" },
            format_delta(slot.pace.delta_seconds),
            format_outlook(&slot.tide)
        );
    }
    out
}

/// The day's tides tagged high or low.
pub fn format_day_tides(date: NaiveDate, day: Option<&DayTide>, mean_level_m: f64) -> String {
    let mut out = String::new();
    let Some(day) = day else {
        let _ = writeln!(out, "No tide data for {}", date);
        return out;
    };
    let _ = writeln!(out, "Tides for {} ({:?})", date, day.weekday);
    for (entry, kind) in day.extremes(mean_level_m) {
        let label = match kind {
            TideKind::High => "HIGH",
            TideKind::Low => "low ",
        };
        let _ = writeln!(out, "  {}  {}  {:.2} m", entry.time, label, entry.height);
    }
    out
}
