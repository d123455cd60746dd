//! phpVMS API client.
//!
//! [`ReportApi`] is the seam the flight service talks through. The real
//! implementation is [`HttpReportClient`]; tests substitute an in-memory
//! fake.

mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod models;

use thiserror::Error;

pub use client::{HttpReportClient, DEFAULT_TIMEOUT, USER_AGENT};
pub use models::{
    Aircraft, AircraftFleet, Airline, DataResponse, FileRequest, FlightUpdateRequest,
    ListedPirep, Paginated, PositionUpdateRequest, PrefileRequest, SimBriefOfp,
};

/// Errors raised by the transport layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or timed out.
    #[error("request failed: {0}")]
    Http(String),

    /// The server answered with a non-2xx status.
    #[error("API error: {url} (status {status})")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response from {url}: {message}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Decoder message.
        message: String,
    },

    /// The client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Operations offered by the virtual-airline API and the flight-plan service.
#[async_trait::async_trait]
pub trait ReportApi: Send + Sync {
    /// Create a new report before departure.
    async fn prefile(&self, request: &PrefileRequest) -> Result<ListedPirep>;

    /// Push status, distance, fuel and time for a report.
    async fn update(&self, id: &str, request: &FlightUpdateRequest) -> Result<()>;

    /// Append an ACARS position to a report.
    async fn post_position(&self, id: &str, position: &PositionUpdateRequest) -> Result<()>;

    /// Submit a report for review.
    async fn file(&self, id: &str, request: &FileRequest) -> Result<()>;

    /// Cancel a report.
    async fn cancel(&self, id: &str) -> Result<()>;

    /// List the pilot's reports, most recent first.
    async fn list_reports(&self) -> Result<Paginated<ListedPirep>>;

    /// Fetch the subfleets available to the pilot.
    async fn user_fleet(&self) -> Result<Vec<AircraftFleet>>;

    /// Fetch the airlines configured on the site.
    async fn airlines(&self) -> Result<Paginated<Airline>>;

    /// Fetch the latest SimBrief operational flight plan for a user.
    async fn flight_plan(&self, user_id: &str) -> Result<SimBriefOfp>;
}
