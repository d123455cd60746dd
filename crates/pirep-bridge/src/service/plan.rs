//! Flight plans and prefile payload construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::models::SimBriefOfp;
use crate::api::PrefileRequest;
use crate::error::{Error, Result};

/// Flight type sent with every prefile (scheduled passenger).
pub const FLIGHT_TYPE: &str = "J";

/// Source code identifying an ACARS client.
pub const SOURCE: i64 = 1;

/// Source name shown by the site.
pub const SOURCE_NAME: &str = "vmsacars";

/// Simulator named in the report's custom fields.
pub const SIMULATOR: &str = "X-Plane 12";

/// What the pilot intends to fly, before a report exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightPlan {
    /// Flight number without the airline prefix.
    pub flight_number: String,
    /// Departure ICAO.
    pub departure: String,
    /// Arrival ICAO.
    pub arrival: String,
    /// Alternate ICAO, may be empty.
    pub alternate: String,
    /// Filed route string.
    pub route: String,
    /// Cruise level in feet.
    pub level: i64,
    /// Planned distance in nautical miles.
    pub planned_distance: i64,
    /// Planned time en route in minutes.
    pub planned_flight_time: i64,
    /// Block fuel in kilograms.
    pub block_fuel: i64,
}

impl FlightPlan {
    /// Build the prefile body for this plan.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if departure or arrival is missing or no
    /// aircraft is selected.
    pub fn to_prefile(
        &self,
        airline_id: u32,
        aircraft_id: u32,
        callsign: &str,
    ) -> Result<PrefileRequest> {
        if aircraft_id == 0 {
            return Err(Error::invalid_input("aircraft", "aircraft required"));
        }
        if self.departure.trim().is_empty() {
            return Err(Error::invalid_input("departure", "airport required"));
        }
        if self.arrival.trim().is_empty() {
            return Err(Error::invalid_input("arrival", "airport required"));
        }

        let fields: BTreeMap<String, Value> = [
            ("Simulator", SIMULATOR),
            ("Unlimited Fuel", "Off"),
            ("Network Online", "VATSIM"),
            ("Network Callsign Check", "0"),
            ("Network Callsign Used", callsign),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();

        Ok(PrefileRequest {
            airline_id: i64::from(airline_id),
            aircraft_id: i64::from(aircraft_id),
            flight_type: FLIGHT_TYPE.to_string(),
            flight_number: self.flight_number.clone(),
            departure_airport_id: self.departure.to_uppercase(),
            arrival_airport_id: self.arrival.to_uppercase(),
            alternate_airport_id: self.alternate.to_uppercase(),
            route: self.route.clone(),
            level: self.level,
            planned_distance: self.planned_distance,
            planned_flight_time: self.planned_flight_time,
            block_fuel: self.block_fuel,
            source: SOURCE,
            source_name: SOURCE_NAME.to_string(),
            fields,
        })
    }
}

fn parse_number(field: &'static str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_input(field, format!("not a number: {value:?}")))
}

impl SimBriefOfp {
    /// Extract a flight plan from the OFP.
    ///
    /// SimBrief reports time en route in seconds; the plan carries minutes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a numeric field doesn't parse.
    pub fn to_plan(&self) -> Result<FlightPlan> {
        let planned_distance = parse_number("route distance", &self.general.route_distance)?;
        let level = parse_number("initial altitude", &self.general.initial_altitude)?;
        let block_fuel = parse_number("block fuel", &self.fuel.plan_ramp)?;
        let enroute_secs = parse_number("flight time", &self.times.est_time_enroute)?;

        Ok(FlightPlan {
            flight_number: self.general.flight_number.clone(),
            departure: self.origin.icao_code.as_str().to_string(),
            arrival: self.destination.icao_code.as_str().to_string(),
            alternate: self.alternate.icao_code.as_str().to_string(),
            route: self.general.route.clone(),
            level,
            planned_distance,
            planned_flight_time: enroute_secs / 60,
            block_fuel,
        })
    }

    /// Callsign built from the airline ICAO and flight number.
    #[must_use]
    pub fn callsign(&self) -> String {
        format!(
            "{}{}",
            self.general.icao_airline.as_str(),
            self.general.flight_number
        )
    }
}
