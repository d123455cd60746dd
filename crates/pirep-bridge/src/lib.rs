//! `pirep-bridge` - X-Plane to phpVMS ACARS bridge
//!
//! This library receives flight telemetry from the simulator over UDP, tracks
//! the pilot's active report through its lifecycle and relays updates to a
//! phpVMS virtual airline.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod listener;
pub mod logging;
pub mod preferences;
pub mod service;
pub mod state;
pub mod telemetry;

pub use api::{HttpReportClient, ReportApi};
pub use config::Config;
pub use error::{Error, Result};
pub use listener::{DatagramListener, ListenerMetrics, SampleHandler};
pub use logging::init_logging;
pub use preferences::Preferences;
pub use service::FlightService;
pub use state::{FlightPhase, ReportState, StateMachine};
pub use telemetry::TelemetrySample;
