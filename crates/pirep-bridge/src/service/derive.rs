//! Pure validation and derivation helpers used by the flight service.

use crate::api::{FileRequest, FlightUpdateRequest, PositionUpdateRequest};
use crate::error::{Error, Result};
use crate::state::FlightPhase;
use crate::telemetry::Position;

/// Pounds per kilogram.
pub const LBS_PER_KG: f64 = 2.20462;

/// Check a flight-phase code against the known vocabulary.
///
/// # Errors
///
/// Returns `InvalidStatus` for unknown codes.
pub fn validate_status(status: &str) -> Result<FlightPhase> {
    status.parse()
}

/// Check latitude and longitude bounds. Both ends are inclusive; a
/// coordinate that wasn't reported is not checked.
///
/// # Errors
///
/// Returns `InvalidPosition` when a reported coordinate is out of range or
/// not a number.
pub fn validate_position(position: &Position) -> Result<()> {
    let lat_ok = position.lat.map_or(true, |lat| (-90.0..=90.0).contains(&lat));
    let lon_ok = position
        .lon
        .map_or(true, |lon| (-180.0..=180.0).contains(&lon));
    if lat_ok && lon_ok {
        Ok(())
    } else {
        Err(Error::InvalidPosition {
            lat: position.lat,
            lon: position.lon,
        })
    }
}

/// Fuel burned since the baseline, never negative.
#[must_use]
pub fn fuel_used_kg(baseline_kg: i64, remaining_kg: i64) -> i64 {
    baseline_kg.saturating_sub(remaining_kg).max(0)
}

/// Convert kilograms to pounds, rounding up.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn kg_to_lbs_ceil(kg: i64) -> i64 {
    (kg as f64 * LBS_PER_KG).ceil() as i64
}

/// Round a telemetry reading to the nearest integer. Absent or non-finite
/// readings become zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round(value: Option<f64>) -> i64 {
    match value {
        Some(v) if v.is_finite() => v.round() as i64,
        _ => 0,
    }
}

/// Build the flight-update body for a sample.
#[must_use]
pub fn flight_update(
    phase: FlightPhase,
    distance_nm: Option<f64>,
    baseline_kg: i64,
    remaining_kg: i64,
    flight_time_min: Option<f64>,
) -> FlightUpdateRequest {
    FlightUpdateRequest {
        status: phase.code().to_string(),
        distance: round(distance_nm),
        fuel_used_lbs: kg_to_lbs_ceil(fuel_used_kg(baseline_kg, remaining_kg)),
        flight_time: round(flight_time_min),
    }
}

/// Build the position body for a sample, or `None` if the position lacks
/// either coordinate.
#[must_use]
pub fn position_update(position: &Position) -> Option<PositionUpdateRequest> {
    let (lat, lon) = position.coordinates()?;
    Some(PositionUpdateRequest {
        lat,
        lon,
        altitude_msl: round(position.altitude_msl),
        altitude_agl: round(position.altitude_agl),
        gs: round(position.gs),
        sim_time: position
            .sim_time
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        distance: round(position.distance),
        heading: round(position.heading),
        ias: round(position.ias),
        vs: round(position.vs),
    })
}

/// Build the file body from the block fuel entered at prefile and the last
/// telemetry readings.
///
/// # Errors
///
/// Returns `InvalidInput` if no fuel reading has been received yet or if
/// the readings show no fuel burned.
pub fn file_request_from_telemetry(
    block_fuel_kg: i64,
    last_fuel_kg: Option<f64>,
    last_flight_time_min: Option<f64>,
    last_distance_nm: Option<f64>,
) -> Result<FileRequest> {
    let last_fuel = match last_fuel_kg {
        Some(fuel) if fuel.is_finite() && fuel != 0.0 => round(Some(fuel)),
        _ => return Err(Error::invalid_input("fuel", "no last fuel level")),
    };

    let used = fuel_used_kg(block_fuel_kg, last_fuel);
    if used == 0 {
        return Err(Error::invalid_input("fuel", "no fuel used"));
    }

    Ok(FileRequest {
        flight_time: round(last_flight_time_min),
        fuel_used_lbs: kg_to_lbs_ceil(used),
        distance: round(last_distance_nm),
    })
}
