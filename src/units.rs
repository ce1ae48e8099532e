//! Speed unit conversions.
//!
//! Upstream feeds report wind in km/h and currents in knots, while every
//! threshold in this crate is expressed in metres per second. These are total
//! functions: negative inputs convert like any other real, rejecting them is
//! the caller's job.

/// Metres per second in one knot.
pub const MS_PER_KNOT: f64 = 0.514444;

const KMH_PER_MS: f64 = 3.6;

pub fn kmh_to_ms(kmh: f64) -> f64 {
    kmh / KMH_PER_MS
}

pub fn ms_to_kmh(ms: f64) -> f64 {
    ms * KMH_PER_MS
}

pub fn knots_to_ms(knots: f64) -> f64 {
    knots * MS_PER_KNOT
}

pub fn ms_to_knots(ms: f64) -> f64 {
    ms / MS_PER_KNOT
}

/// Unit a raw speed reading arrives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SpeedUnit {
    #[default]
    MetresPerSecond,
    KilometresPerHour,
    Knots,
}

impl SpeedUnit {
    /// Convert a reading in this unit to m/s.
    pub fn to_ms(self, value: f64) -> f64 {
        match self {
            SpeedUnit::MetresPerSecond => value,
            SpeedUnit::KilometresPerHour => kmh_to_ms(value),
            SpeedUnit::Knots => knots_to_ms(value),
        }
    }
}
