//! Request and response bodies for the phpVMS and SimBrief APIs.
//!
//! Field names follow the remote contracts exactly. Response types default
//! missing fields so that optional or newer server attributes don't break
//! decoding.

// Field names mirror the remote contract.
#![allow(missing_docs)]

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::state::ReportState;

/// Envelope used by single-object and list responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse<T> {
    /// The payload.
    pub data: T,
}

/// Envelope used by paginated list responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Navigation links.
    #[serde(default)]
    pub links: PageLinks,
    /// Page metadata.
    #[serde(default)]
    pub meta: PageMeta,
}

/// Links section of a paginated response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLinks {
    pub first: Option<String>,
    pub last: Option<String>,
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// Meta section of a paginated response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMeta {
    pub current_page: i64,
    pub from: Option<i64>,
    pub last_page: i64,
    pub path: String,
    pub per_page: i64,
    pub to: Option<i64>,
    pub total: i64,
    pub prev_page: Option<String>,
    pub next_page: Option<String>,
}

/// Body of `POST /api/pireps/prefile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefileRequest {
    pub airline_id: i64,
    pub aircraft_id: i64,
    pub flight_type: String,
    pub flight_number: String,
    #[serde(rename = "dpt_airport_id")]
    pub departure_airport_id: String,
    #[serde(rename = "arr_airport_id")]
    pub arrival_airport_id: String,
    #[serde(rename = "alt_airport_id")]
    pub alternate_airport_id: String,
    pub route: String,
    pub level: i64,
    pub planned_distance: i64,
    pub planned_flight_time: i64,
    pub block_fuel: i64,
    pub source: i64,
    pub source_name: String,
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Body of `PUT /api/pireps/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightUpdateRequest {
    pub status: String,
    pub distance: i64,
    /// Fuel used so far, pounds.
    #[serde(rename = "fuel_used")]
    pub fuel_used_lbs: i64,
    pub flight_time: i64,
}

/// One entry of `POST /api/pireps/{id}/acars/position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdateRequest {
    pub lat: f64,
    pub lon: f64,
    pub altitude_msl: i64,
    pub altitude_agl: i64,
    pub gs: i64,
    pub sim_time: String,
    pub distance: i64,
    pub heading: i64,
    pub ias: i64,
    pub vs: i64,
}

/// Wrapper the position endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct PositionBatch<'a> {
    pub positions: [&'a PositionUpdateRequest; 1],
}

/// Body of `POST /api/pireps/{id}/file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRequest {
    pub flight_time: i64,
    /// Fuel used, pounds.
    #[serde(rename = "fuel_used")]
    pub fuel_used_lbs: i64,
    pub distance: i64,
}

/// Distance in several units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Distances {
    pub m: f64,
    pub km: f64,
    pub mi: f64,
    pub nmi: f64,
}

/// Weight in several units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub kg: f64,
    pub lbs: f64,
}

/// Airport as embedded in a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Airport {
    pub id: String,
    pub iata: String,
    pub icao: String,
    pub name: String,
    pub location: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>,
    pub hub: bool,
    pub notes: Option<String>,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    /// Sites disagree on string or number here.
    pub elevation: serde_json::Value,
    pub ground_handling_cost: Option<i64>,
    pub fuel_100ll_cost: Option<i64>,
    pub fuel_jeta_cost: Option<i64>,
    pub fuel_mogas_cost: Option<i64>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// Airline summary embedded in a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PirepAirline {
    pub id: i64,
    pub icao: String,
    pub iata: String,
    pub name: String,
    pub country: String,
    pub logo: String,
}

/// Aircraft detail embedded in a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PirepAircraft {
    pub id: i64,
    pub subfleet_id: i64,
    pub icao: String,
    pub iata: String,
    pub airport_id: Option<String>,
    pub hub_id: Option<String>,
    pub landing_time: Option<DateTime<Utc>>,
    pub name: String,
    pub registration: String,
    pub fin: Option<String>,
    pub hex_code: Option<String>,
    pub selcal: Option<String>,
    pub dow: Weights,
    pub mtow: Weights,
    pub mlw: Weights,
    pub zfw: Weights,
    pub simbrief_type: Option<String>,
    pub fuel_onboard: Weights,
    pub flight_time: i64,
    pub status: Option<String>,
    pub state: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub ident: String,
}

/// A report as returned by prefile and list calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListedPirep {
    pub id: String,
    pub user_id: i64,
    pub airline_id: i64,
    pub aircraft_id: i64,
    pub event_id: Option<String>,
    pub flight_id: Option<String>,
    pub flight_number: String,
    pub route_code: Option<String>,
    pub route_leg: Option<String>,
    pub flight_type: String,
    pub dpt_airport_id: String,
    pub arr_airport_id: String,
    pub alt_airport_id: Option<String>,
    pub level: Option<i64>,
    pub distance: Distances,
    pub planned_distance: Distances,
    pub flight_time: i64,
    pub planned_flight_time: Option<i64>,
    pub zfw: Option<i64>,
    pub block_fuel: Weights,
    pub fuel_used: Weights,
    pub landing_rate: Option<f64>,
    pub score: Option<i64>,
    pub route: String,
    pub notes: Option<String>,
    pub source: i64,
    pub source_name: Option<String>,
    pub state: ReportState,
    pub status: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub block_off_time: Option<DateTime<Utc>>,
    pub block_on_time: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub airline: PirepAirline,
    pub dpt_airport: Airport,
    pub arr_airport: Airport,
    pub ident: String,
    pub phase: String,
    pub status_text: String,
    pub aircraft: PirepAircraft,
    pub fields: serde_json::Value,
}

/// An airline configured on the site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Airline {
    pub id: i64,
    pub icao: String,
    pub iata: String,
    pub name: String,
    pub country: String,
    pub logo: String,
}

/// A single airframe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Aircraft {
    pub id: i64,
    pub registration: String,
    pub icao: String,
    pub name: String,
}

/// A subfleet and its airframes, from `GET /api/user/fleet`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AircraftFleet {
    pub id: i64,
    pub airline_id: i64,
    pub hub_id: Option<String>,
    #[serde(rename = "type")]
    pub fleet_type: String,
    pub simbrief_type: Option<String>,
    pub name: String,
    pub cost_block_hour: Option<String>,
    pub cost_delay_minute: Option<String>,
    pub fuel_type: i64,
    pub ground_handling_multiplier: i64,
    pub cargo_capacity: Option<String>,
    pub fuel_capacity: Option<String>,
    pub gross_weight: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub fares: Vec<serde_json::Value>,
    pub aircraft: Vec<Aircraft>,
}

/// A SimBrief value that is either a string or an empty object.
///
/// SimBrief's XML-to-JSON conversion renders empty elements as `{}`; those
/// decode to an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlexibleField(pub String);

impl FlexibleField {
    /// The string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for FlexibleField {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(Self(s)),
            serde_json::Value::Object(_) => Ok(Self::default()),
            other => Err(serde::de::Error::custom(format!(
                "field is neither a string nor an object: {other}"
            ))),
        }
    }
}

/// The parts of a SimBrief OFP used to prefile a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimBriefOfp {
    pub general: OfpGeneral,
    pub origin: OfpAirport,
    pub destination: OfpAirport,
    pub alternate: OfpAirport,
    pub fuel: OfpFuel,
    pub times: OfpTimes,
}

/// `general` section of an OFP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OfpGeneral {
    pub icao_airline: FlexibleField,
    pub flight_number: String,
    pub initial_altitude: String,
    pub route_distance: String,
    pub route: String,
}

/// Airport section of an OFP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OfpAirport {
    pub icao_code: FlexibleField,
    pub iata_code: FlexibleField,
    pub name: String,
    pub plan_rwy: String,
}

/// `fuel` section of an OFP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OfpFuel {
    pub plan_ramp: String,
}

/// `times` section of an OFP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OfpTimes {
    /// Estimated time en route, seconds.
    pub est_time_enroute: String,
}
