//! Listener observability counters.
//!
//! Each counter and slot is updated on its own. A snapshot may mix values
//! from neighbouring packets, which is fine for diagnostics.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::service::SampleOutcome;
use crate::telemetry::{Position, TelemetrySample};

/// Shown in an outcome slot before the first attempt.
pub const NO_OUTCOME: &str = "(none)";

/// Number of leading bytes kept from an undecodable datagram.
const HEAD_BYTES: usize = 8;

#[derive(Debug)]
struct Slot<T>(Mutex<T>);

impl<T: Clone> Slot<T> {
    fn new(value: T) -> Self {
        Self(Mutex::new(value))
    }

    fn set(&self, value: T) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    fn get(&self) -> T {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Counters and last-seen values shared between the listener and readers.
#[derive(Debug)]
pub struct ListenerMetrics {
    packets_any: AtomicU64,
    packets_err: AtomicU64,
    last_sender: Slot<Option<SocketAddr>>,
    last_packet_time: Slot<Option<DateTime<Utc>>>,
    last_non_json_head: Slot<Option<String>>,
    last_status: Slot<Option<String>>,
    last_position: Slot<Option<Position>>,
    last_fuel: Slot<Option<f64>>,
    last_flight_time: Slot<Option<f64>>,
    last_distance: Slot<Option<f64>>,
    flight_update: Slot<String>,
    position_update: Slot<String>,
}

impl Default for ListenerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerMetrics {
    /// Fresh metrics with both outcome slots set to [`NO_OUTCOME`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            packets_any: AtomicU64::new(0),
            packets_err: AtomicU64::new(0),
            last_sender: Slot::new(None),
            last_packet_time: Slot::new(None),
            last_non_json_head: Slot::new(None),
            last_status: Slot::new(None),
            last_position: Slot::new(None),
            last_fuel: Slot::new(None),
            last_flight_time: Slot::new(None),
            last_distance: Slot::new(None),
            flight_update: Slot::new(NO_OUTCOME.to_string()),
            position_update: Slot::new(NO_OUTCOME.to_string()),
        }
    }

    /// Count a received datagram.
    pub fn record_packet(&self, from: SocketAddr) {
        self.packets_any.fetch_add(1, Ordering::Relaxed);
        self.last_sender.set(Some(from));
        self.last_packet_time.set(Some(Utc::now()));
    }

    /// Count a datagram that didn't decode, keeping its first bytes as hex.
    pub fn record_decode_error(&self, payload: &[u8]) {
        self.packets_err.fetch_add(1, Ordering::Relaxed);
        if !payload.is_empty() {
            let head: String = payload
                .iter()
                .take(HEAD_BYTES)
                .map(|b| format!("{b:02x}"))
                .collect();
            self.last_non_json_head.set(Some(head));
        }
    }

    /// Keep the readings carried by a decoded sample. Readings the sample
    /// omits keep their previous value.
    pub fn record_sample(&self, sample: &TelemetrySample) {
        self.last_status.set(Some(sample.status.clone()));
        if let Some(position) = &sample.position {
            self.last_position.set(Some(position.clone()));
        }
        if let Some(distance) = sample.distance() {
            self.last_distance.set(Some(distance));
        }
        if let Some(fuel) = sample.fuel {
            self.last_fuel.set(Some(fuel));
        }
        if let Some(flight_time) = sample.flight_time {
            self.last_flight_time.set(Some(flight_time));
        }
    }

    /// Store the per-channel outcomes of a handled sample.
    pub fn record_outcome(&self, outcome: &SampleOutcome) {
        self.flight_update.set(outcome.flight_update.to_string());
        self.position_update.set(outcome.position_update.to_string());
    }

    /// Store one failure message in both outcome slots.
    pub fn record_failure(&self, message: &str) {
        self.flight_update.set(message.to_string());
        self.position_update.set(message.to_string());
    }

    /// Datagrams received so far.
    #[must_use]
    pub fn packets_any(&self) -> u64 {
        self.packets_any.load(Ordering::Relaxed)
    }

    /// Datagrams that failed to decode.
    #[must_use]
    pub fn packets_err(&self) -> u64 {
        self.packets_err.load(Ordering::Relaxed)
    }

    /// Copy every counter and slot.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_any: self.packets_any(),
            packets_err: self.packets_err(),
            last_sender: self.last_sender.get().map(|a| a.to_string()),
            last_packet_time: self.last_packet_time.get(),
            last_non_json_head: self.last_non_json_head.get(),
            last_status: self.last_status.get(),
            last_position: self.last_position.get(),
            last_fuel: self.last_fuel.get(),
            last_flight_time: self.last_flight_time.get(),
            last_distance: self.last_distance.get(),
            flight_update: self.flight_update.get(),
            position_update: self.position_update.get(),
        }
    }
}

/// Serializable copy of [`ListenerMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Datagrams received.
    pub packets_any: u64,
    /// Datagrams that failed to decode.
    pub packets_err: u64,
    /// Address of the most recent sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sender: Option<String>,
    /// When the most recent datagram arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_packet_time: Option<DateTime<Utc>>,
    /// Hex of the first bytes of the last undecodable datagram.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_non_json_head: Option<String>,
    /// Last flight-phase code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status: Option<String>,
    /// Last reported position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_position: Option<Position>,
    /// Last remaining fuel, kilograms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fuel: Option<f64>,
    /// Last elapsed flight time, minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_flight_time: Option<f64>,
    /// Last distance flown, nautical miles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_distance: Option<f64>,
    /// Outcome of the last flight update.
    pub flight_update: String,
    /// Outcome of the last position update.
    pub position_update: String,
}
