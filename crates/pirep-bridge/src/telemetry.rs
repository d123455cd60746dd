//! Telemetry datagram decoding.
//!
//! The simulator plugin sends one JSON object per UDP datagram. Only
//! `status` is mandatory; every other field may be omitted and decodes to
//! `None` rather than a zero value, so "not reported" stays distinguishable
//! from "reported as zero".

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single telemetry snapshot decoded from one datagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Flight-phase code, e.g. `ENR`.
    pub status: String,

    /// Aircraft position, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    /// Remaining fuel in kilograms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel: Option<f64>,

    /// Elapsed flight time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_time: Option<f64>,
}

/// Aircraft position and motion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    /// Longitude in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,

    /// Altitude above mean sea level, feet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_msl: Option<f64>,

    /// Altitude above ground level, feet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_agl: Option<f64>,

    /// Ground speed, knots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gs: Option<f64>,

    /// Simulator clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sim_time: Option<SimClock>,

    /// Distance flown, nautical miles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,

    /// Heading, degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,

    /// Indicated airspeed, knots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ias: Option<f64>,

    /// Vertical speed, feet per minute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vs: Option<f64>,
}

/// Simulator clock as sent by the plugin.
///
/// Older plugin builds send a preformatted string, newer ones send epoch
/// seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SimClock {
    /// Seconds since the Unix epoch.
    Epoch(f64),
    /// Preformatted timestamp.
    Text(String),
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epoch(secs) if secs.fract() == 0.0 => write!(f, "{secs:.0}"),
            Self::Epoch(secs) => write!(f, "{secs}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl Position {
    /// Latitude and longitude, if both were reported.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

impl TelemetrySample {
    /// Distance flown, if a position with a distance was reported.
    #[must_use]
    pub fn distance(&self) -> Option<f64> {
        self.position.as_ref().and_then(|p| p.distance)
    }
}

/// Decode a datagram payload.
///
/// # Errors
///
/// Returns an error if the payload is not valid JSON or lacks `status`.
pub fn decode(payload: &[u8]) -> serde_json::Result<TelemetrySample> {
    serde_json::from_slice(payload)
}

/// Encode a sample in the datagram wire format.
///
/// # Errors
///
/// Returns an error if serialization fails (non-finite numbers).
pub fn encode(sample: &TelemetrySample) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(sample)
}
