//! Error types for pirep-bridge.
//!
//! This module defines the error types used throughout the crate. Every error
//! raised by the flight report core is recoverable: it is returned to the
//! caller as a typed value and never terminates the process.

use std::path::PathBuf;
use thiserror::Error;

use crate::api::ApiError;
use crate::state::ReportState;

/// The main error type for pirep-bridge operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Report Lifecycle Errors ===
    /// A report is already being tracked.
    #[error("there is already an active PIREP (ID: {id})")]
    AlreadyActive {
        /// Identifier of the report currently tracked.
        id: String,
    },

    /// No report is being tracked.
    #[error("no active PIREP")]
    NoActiveReport,

    /// The operation is not legal in the current lifecycle state.
    #[error("PIREP cannot be {operation} in current state: {state}")]
    PreconditionFailed {
        /// The operation that was attempted, in past tense ("filed").
        operation: &'static str,
        /// The state the report was in.
        state: ReportState,
    },

    /// The report is in a read-only state and accepts no further mutation.
    #[error("PIREP is in read-only state: {state}")]
    ReadOnly {
        /// The state the report was in.
        state: ReportState,
    },

    // === Validation Errors ===
    /// The flight-phase code is not part of the known vocabulary.
    #[error("invalid status: {0:?}")]
    InvalidStatus(String),

    /// Latitude or longitude is out of range.
    #[error("invalid position coordinates: lat={}, lon={}", coord(.lat), coord(.lon))]
    InvalidPosition {
        /// Latitude in degrees, if reported.
        lat: Option<f64>,
        /// Longitude in degrees, if reported.
        lon: Option<f64>,
    },

    /// A user-supplied or derived value is unusable.
    #[error("invalid {field}: {message}")]
    InvalidInput {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    // === Remote Errors ===
    /// The remote API call failed.
    #[error("remote call failed: {0}")]
    Remote(#[from] ApiError),

    /// The remote API call succeeded but returned an unusable body.
    #[error("invalid response from remote service: {0}")]
    InvalidResponse(String),

    /// There is no in-progress report on the server to adopt.
    #[error("no pending PIREP: {0}")]
    NoPendingReport(String),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system or socket operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to bind the telemetry socket.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    SocketBind {
        /// Address that couldn't be bound.
        addr: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for pirep-bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

fn coord(value: &Option<f64>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Create a precondition failure for `operation` in `state`.
    #[must_use]
    pub fn precondition(operation: &'static str, state: ReportState) -> Self {
        Self::PreconditionFailed { operation, state }
    }

    /// Check if the operation was illegal in the current lifecycle state.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::AlreadyActive { .. }
                | Self::NoActiveReport
                | Self::PreconditionFailed { .. }
                | Self::ReadOnly { .. }
        )
    }

    /// Check if a single sample or command was rejected as malformed.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidStatus(_) | Self::InvalidPosition { .. } | Self::InvalidInput { .. }
        )
    }

    /// Check if the failure came from the remote service.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Remote(_) | Self::InvalidResponse(_) | Self::NoPendingReport(_)
        )
    }
}
