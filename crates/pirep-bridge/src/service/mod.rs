//! Flight report service.
//!
//! [`FlightService`] is the only owner of the active report: its identifier,
//! the fuel baseline and the lifecycle [`StateMachine`] live together behind
//! one async mutex, so the telemetry path and the command path always see a
//! consistent triple.
//!
//! Lifecycle commands (prefile, file, cancel, reset, adopt, sync) hold the
//! guard across their remote call, which serialises them against each other
//! and against sample bookkeeping. The telemetry path only holds the guard
//! while it reads and updates the triple; its two remote calls run
//! afterwards and concurrently, and their outcomes are reported
//! independently.
//!
//! A sample's sends hold a read lease on a second lock taken while the guard
//! is still held. Commands take the write side after the guard, so a command
//! that wins the guard after a sample waits for that sample's sends to
//! finish, and a file or cancel is always the last call made for a report.

pub mod derive;
pub mod plan;

use std::fmt;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::api::{
    Aircraft, Airline, FileRequest, FlightUpdateRequest, ListedPirep, PositionUpdateRequest,
    PrefileRequest, ReportApi, SimBriefOfp,
};
use crate::error::{Error, Result};
use crate::listener::SampleHandler;
use crate::state::{ReportState, StateMachine};
use crate::telemetry::TelemetrySample;

pub use plan::FlightPlan;

/// Why a telemetry channel was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// No report is being tracked.
    NoActiveReport,
    /// This sample set the fuel baseline.
    BaselineCaptured,
    /// The sample carried no fuel reading.
    NoFuelReading,
    /// The sample carried no position.
    NoPosition,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoActiveReport => "no active PIREP",
            Self::BaselineCaptured => "fuel baseline captured",
            Self::NoFuelReading => "no fuel reading",
            Self::NoPosition => "no position",
        };
        f.write_str(text)
    }
}

/// Result of one telemetry-driven remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ChannelOutcome {
    /// The call succeeded.
    Sent,
    /// The call was not made.
    Skipped(SkipReason),
    /// The call was made and failed.
    Failed(String),
}

impl ChannelOutcome {
    /// True if the call was made and succeeded.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

impl fmt::Display for ChannelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => f.write_str("OK"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Failed(message) => f.write_str(message),
        }
    }
}

/// Outcomes of the two independent calls made for one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleOutcome {
    /// Status/distance/fuel/time update.
    pub flight_update: ChannelOutcome,
    /// ACARS position report.
    pub position_update: ChannelOutcome,
}

impl SampleOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            flight_update: ChannelOutcome::Skipped(reason),
            position_update: ChannelOutcome::Skipped(reason),
        }
    }
}

/// Point-in-time view of the active report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSnapshot {
    /// Identifier of the tracked report.
    pub id: Option<String>,
    /// Local lifecycle state.
    pub state: ReportState,
    /// Fuel baseline in kilograms.
    pub fuel_baseline_kg: Option<i64>,
}

#[derive(Debug, Default)]
struct ActiveReport {
    id: Option<String>,
    fuel_baseline_kg: Option<i64>,
    machine: StateMachine,
}

impl ActiveReport {
    fn require_id(&self) -> Result<String> {
        self.id.clone().ok_or(Error::NoActiveReport)
    }

    fn clear(&mut self) {
        self.id = None;
        self.fuel_baseline_kg = None;
    }
}

/// Orchestrates the report lifecycle against a [`ReportApi`].
#[derive(Debug)]
pub struct FlightService<A> {
    api: A,
    active: Mutex<ActiveReport>,
    sends: RwLock<()>,
}

impl<A: ReportApi> FlightService<A> {
    /// Create a service with no active report.
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            api,
            active: Mutex::new(ActiveReport::default()),
            sends: RwLock::new(()),
        }
    }

    /// The underlying API.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Consistent view of (identifier, state, baseline).
    pub async fn snapshot(&self) -> ReportSnapshot {
        let active = self.active.lock().await;
        ReportSnapshot {
            id: active.id.clone(),
            state: active.machine.current(),
            fuel_baseline_kg: active.fuel_baseline_kg,
        }
    }

    /// Create a report on the server and start tracking it.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyActive` if a report is tracked, `Remote` if the call
    /// fails and `InvalidResponse` if the server returns no identifier.
    pub async fn prefile(&self, request: &PrefileRequest) -> Result<String> {
        let mut active = self.active.lock().await;
        let _sends = self.sends.write().await;
        if let Some(id) = &active.id {
            return Err(Error::AlreadyActive { id: id.clone() });
        }

        let pirep = self.api.prefile(request).await?;
        if pirep.id.is_empty() {
            return Err(Error::InvalidResponse(
                "failed to get PIREP ID from response".to_string(),
            ));
        }

        active.id = Some(pirep.id.clone());
        active.fuel_baseline_kg = None;
        active.machine.prefile();
        info!(pirep_id = %pirep.id, flight = %request.flight_number, "PIREP prefiled");
        Ok(pirep.id)
    }

    /// Apply one telemetry sample.
    ///
    /// Returns immediately with both channels skipped when no report is
    /// tracked. The first sample of a report sets the fuel baseline and sends
    /// no flight update; its position is still sent. A position without both
    /// coordinates is not sent.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` if the report accepts no updates, `InvalidStatus`
    /// or `InvalidPosition` if the sample is malformed. A rejected sample
    /// leaves the baseline untouched. Remote failures are not errors; they
    /// are reported per channel in the outcome.
    pub async fn apply_sample(&self, sample: &TelemetrySample) -> Result<SampleOutcome> {
        let (id, flight, position, _sending) = {
            let mut active = self.active.lock().await;
            let Some(id) = active.id.clone() else {
                debug!("No active PIREP, skipping sample");
                return Ok(SampleOutcome::skipped(SkipReason::NoActiveReport));
            };
            active.machine.check_update()?;

            let phase = derive::validate_status(&sample.status)?;
            if let Some(position) = &sample.position {
                derive::validate_position(position)?;
            }

            let flight = match (sample.fuel, active.fuel_baseline_kg) {
                (None, _) => Err(SkipReason::NoFuelReading),
                (Some(fuel), None) => {
                    let baseline = derive::round(Some(fuel));
                    active.fuel_baseline_kg = Some(baseline);
                    info!(pirep_id = %id, baseline_kg = baseline, "Fuel baseline captured");
                    Err(SkipReason::BaselineCaptured)
                }
                (Some(fuel), Some(baseline)) => Ok(derive::flight_update(
                    phase,
                    sample.distance(),
                    baseline,
                    derive::round(Some(fuel)),
                    sample.flight_time,
                )),
            };
            let position = sample
                .position
                .as_ref()
                .and_then(derive::position_update)
                .ok_or(SkipReason::NoPosition);

            (id, flight, position, self.sends.read().await)
        };

        let (flight_update, position_update) = tokio::join!(
            self.send_flight_update(&id, flight),
            self.send_position(&id, position),
        );

        Ok(SampleOutcome {
            flight_update,
            position_update,
        })
    }

    async fn send_flight_update(
        &self,
        id: &str,
        request: std::result::Result<FlightUpdateRequest, SkipReason>,
    ) -> ChannelOutcome {
        let request = match request {
            Ok(request) => request,
            Err(reason) => return ChannelOutcome::Skipped(reason),
        };
        match self.api.update(id, &request).await {
            Ok(()) => ChannelOutcome::Sent,
            Err(e) => {
                warn!(pirep_id = %id, error = %e, "Failed to update PIREP");
                ChannelOutcome::Failed(format!("failed to update PIREP: {e}"))
            }
        }
    }

    async fn send_position(
        &self,
        id: &str,
        position: std::result::Result<PositionUpdateRequest, SkipReason>,
    ) -> ChannelOutcome {
        let position = match position {
            Ok(position) => position,
            Err(reason) => return ChannelOutcome::Skipped(reason),
        };
        match self.api.post_position(id, &position).await {
            Ok(()) => ChannelOutcome::Sent,
            Err(e) => {
                warn!(pirep_id = %id, error = %e, "Failed to send ACARS position");
                ChannelOutcome::Failed(format!("failed to send ACARS position: {e}"))
            }
        }
    }

    /// Submit the tracked report for review and stop tracking it.
    ///
    /// On success the report passes through `Pending` and the service returns
    /// to `InProgress` with no active report.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveReport`, `PreconditionFailed` if the state can't be
    /// filed, or `Remote` (local state unchanged).
    pub async fn file(&self, request: &FileRequest) -> Result<()> {
        let mut active = self.active.lock().await;
        let _sends = self.sends.write().await;
        let id = active.require_id()?;
        active.machine.check_file()?;

        self.api.file(&id, request).await?;

        active.machine.file()?;
        active.clear();
        active.machine.reset();
        info!(pirep_id = %id, "PIREP filed");
        Ok(())
    }

    /// Cancel the tracked report on the server and stop tracking it.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveReport`, `PreconditionFailed` if the state can't be
    /// cancelled, or `Remote` (local state unchanged).
    pub async fn cancel(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        let _sends = self.sends.write().await;
        let id = active.require_id()?;
        active.machine.check_cancel()?;

        self.api.cancel(&id).await?;

        active.machine.cancel()?;
        active.clear();
        info!(pirep_id = %id, "PIREP cancelled");
        Ok(())
    }

    /// Forget the tracked report without contacting the server.
    pub async fn reset_active(&self) {
        let mut active = self.active.lock().await;
        let _sends = self.sends.write().await;
        if let Some(id) = &active.id {
            info!(pirep_id = %id, "Active PIREP reset");
        }
        active.clear();
        active.machine.reset();
    }

    /// Adopt the most recent report on the server if it is in progress.
    ///
    /// Any local report and baseline are replaced, and the local state is
    /// forced to `InProgress`.
    ///
    /// # Errors
    ///
    /// Returns `NoPendingReport` if there are no reports or the latest one is
    /// not in progress, or `Remote` if listing fails.
    pub async fn adopt_existing(&self) -> Result<ListedPirep> {
        let mut active = self.active.lock().await;
        let _sends = self.sends.write().await;
        let page = self.api.list_reports().await?;

        let Some(latest) = page.data.into_iter().next() else {
            return Err(Error::NoPendingReport("no active PIREPs found".to_string()));
        };
        if latest.state != ReportState::InProgress {
            return Err(Error::NoPendingReport(format!(
                "latest PIREP not in progress ({})",
                latest.state
            )));
        }
        if latest.id.is_empty() {
            return Err(Error::InvalidResponse("listed PIREP has no ID".to_string()));
        }

        active.id = Some(latest.id.clone());
        active.fuel_baseline_kg = None;
        active.machine.adopt();
        info!(pirep_id = %latest.id, "Adopted existing PIREP");
        Ok(latest)
    }

    /// Record the server-side state of the tracked report.
    ///
    /// Returns the observed state, or `None` if the server no longer lists
    /// the report.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveReport` or `Remote` if listing fails.
    pub async fn sync_remote_state(&self) -> Result<Option<ReportState>> {
        let mut active = self.active.lock().await;
        let _sends = self.sends.write().await;
        let id = active.require_id()?;
        let page = self.api.list_reports().await?;

        let Some(remote) = page.data.iter().find(|p| p.id == id) else {
            warn!(pirep_id = %id, "Active PIREP not listed by server");
            return Ok(None);
        };
        active.machine.observe(remote.state);
        Ok(Some(remote.state))
    }

    /// Reports listed by the server, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `Remote` if the call fails.
    pub async fn list_reports(&self) -> Result<Vec<ListedPirep>> {
        Ok(self.api.list_reports().await?.data)
    }

    /// Airlines configured on the site.
    ///
    /// # Errors
    ///
    /// Returns `Remote` if the call fails.
    pub async fn airlines(&self) -> Result<Vec<Airline>> {
        Ok(self.api.airlines().await?.data)
    }

    /// Airframes in the pilot's first subfleet.
    ///
    /// # Errors
    ///
    /// Returns `InvalidResponse` if the pilot has no subfleet, or `Remote`.
    pub async fn aircraft(&self) -> Result<Vec<Aircraft>> {
        self.api
            .user_fleet()
            .await?
            .into_iter()
            .next()
            .map(|fleet| fleet.aircraft)
            .ok_or_else(|| Error::InvalidResponse("no aircraft found".to_string()))
    }

    /// Latest SimBrief flight plan for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty user, or `Remote`.
    pub async fn flight_plan(&self, user_id: &str) -> Result<SimBriefOfp> {
        if user_id.trim().is_empty() {
            return Err(Error::invalid_input("simbrief user", "not configured"));
        }
        Ok(self.api.flight_plan(user_id).await?)
    }
}

#[async_trait::async_trait]
impl<A: ReportApi> SampleHandler for FlightService<A> {
    async fn handle_sample(&self, sample: &TelemetrySample) -> Result<SampleOutcome> {
        self.apply_sample(sample).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::api::fake::{Call, FakeApi};
    use crate::api::models::AircraftFleet;
    use crate::telemetry::Position;

    fn request() -> PrefileRequest {
        FlightPlan {
            flight_number: "412".to_string(),
            departure: "YSSY".to_string(),
            arrival: "YMML".to_string(),
            level: 35000,
            planned_distance: 385,
            planned_flight_time: 70,
            block_fuel: 6800,
            ..FlightPlan::default()
        }
        .to_prefile(1, 70, "QFA412")
        .unwrap()
    }

    fn sample(status: &str, fuel: Option<f64>, lat: f64) -> TelemetrySample {
        TelemetrySample {
            status: status.to_string(),
            position: Some(Position {
                lat: Some(lat),
                lon: Some(151.2),
                altitude_msl: Some(12000.0),
                altitude_agl: Some(500.0),
                gs: Some(320.0),
                sim_time: None,
                distance: Some(217.4),
                heading: Some(255.0),
                ias: Some(250.0),
                vs: Some(-500.0),
            }),
            fuel,
            flight_time: Some(83.0),
        }
    }

    fn listed(id: &str, state: ReportState) -> ListedPirep {
        ListedPirep {
            id: id.to_string(),
            state,
            ..ListedPirep::default()
        }
    }

    async fn active_service() -> FlightService<FakeApi> {
        let service = FlightService::new(FakeApi::new());
        service.prefile(&request()).await.unwrap();
        service.api().take_calls();
        service
    }

    async fn force_state(service: &FlightService<FakeApi>, state: ReportState) {
        *service.api().reports.lock().unwrap() = vec![listed("pirep-1", state)];
        assert_eq!(service.sync_remote_state().await.unwrap(), Some(state));
        service.api().take_calls();
    }

    #[tokio::test]
    async fn test_prefile_tracks_report() {
        let service = FlightService::new(FakeApi::new());
        let id = service.prefile(&request()).await.unwrap();
        assert_eq!(id, "pirep-1");

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.id.as_deref(), Some("pirep-1"));
        assert_eq!(snapshot.state, ReportState::InProgress);
        assert_eq!(snapshot.fuel_baseline_kg, None);
    }

    #[tokio::test]
    async fn test_prefile_when_active_fails() {
        let service = active_service().await;
        *service.api().next_id.lock().unwrap() = "pirep-2".to_string();

        let err = service.prefile(&request()).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyActive { ref id } if id == "pirep-1"));
        assert!(service.api().calls().is_empty());
        assert_eq!(service.snapshot().await.id.as_deref(), Some("pirep-1"));
    }

    #[tokio::test]
    async fn test_prefile_without_id_is_invalid_response() {
        let service = FlightService::new(FakeApi::new());
        service.api().next_id.lock().unwrap().clear();

        let err = service.prefile(&request()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
        assert!(service.snapshot().await.id.is_none());
    }

    #[tokio::test]
    async fn test_prefile_remote_failure_leaves_no_report() {
        let service = FlightService::new(FakeApi::new());
        service.api().fail("prefile");

        let err = service.prefile(&request()).await.unwrap_err();
        assert!(err.is_remote());
        assert!(service.snapshot().await.id.is_none());
    }

    #[tokio::test]
    async fn test_sample_without_report_is_noop() {
        let service = FlightService::new(FakeApi::new());
        let outcome = service
            .apply_sample(&sample("ENR", Some(5000.0), 10.0))
            .await
            .unwrap();

        assert_eq!(
            outcome.flight_update,
            ChannelOutcome::Skipped(SkipReason::NoActiveReport)
        );
        assert!(service.api().calls().is_empty());
    }

    #[tokio::test]
    async fn test_first_sample_sets_baseline() {
        let service = active_service().await;
        let outcome = service
            .apply_sample(&sample("TXI", Some(5000.0), 10.0))
            .await
            .unwrap();

        assert_eq!(
            outcome.flight_update,
            ChannelOutcome::Skipped(SkipReason::BaselineCaptured)
        );
        assert_eq!(outcome.position_update, ChannelOutcome::Sent);
        assert_eq!(service.snapshot().await.fuel_baseline_kg, Some(5000));
        assert_eq!(service.api().count("update"), 0);
        assert_eq!(service.api().count("position"), 1);
    }

    #[tokio::test]
    async fn test_second_sample_reports_fuel_used() {
        let service = active_service().await;
        service
            .apply_sample(&sample("TXI", Some(5000.0), 10.0))
            .await
            .unwrap();
        service.api().take_calls();

        let outcome = service
            .apply_sample(&sample("ENR", Some(4950.0), 10.0))
            .await
            .unwrap();
        assert!(outcome.flight_update.is_sent());

        let update = service
            .api()
            .calls()
            .into_iter()
            .find_map(|c| match c {
                Call::Update(id, body) => Some((id, body)),
                _ => None,
            })
            .unwrap();
        assert_eq!(update.0, "pirep-1");
        assert_eq!(update.1.fuel_used_lbs, 111);
        assert_eq!(update.1.status, "ENR");
        assert_eq!(update.1.distance, 217);
        assert_eq!(update.1.flight_time, 83);
    }

    #[tokio::test]
    async fn test_baseline_set_once() {
        let service = active_service().await;
        for fuel in [5000.0, 4900.0, 5100.0] {
            service
                .apply_sample(&sample("ENR", Some(fuel), 10.0))
                .await
                .unwrap();
        }
        assert_eq!(service.snapshot().await.fuel_baseline_kg, Some(5000));

        let used: Vec<i64> = service
            .api()
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update(_, body) => Some(body.fuel_used_lbs),
                _ => None,
            })
            .collect();
        assert_eq!(used, vec![221, 0]);
    }

    #[tokio::test]
    async fn test_invalid_status_rejected() {
        let service = active_service().await;
        let err = service
            .apply_sample(&sample("XYZ", Some(5000.0), 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStatus(ref s) if s == "XYZ"));
        assert!(service.api().calls().is_empty());
        assert_eq!(service.snapshot().await.fuel_baseline_kg, None);

        assert!(service
            .apply_sample(&sample("ENR", Some(5000.0), 10.0))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_position_bounds() {
        let service = active_service().await;
        let err = service
            .apply_sample(&sample("ENR", Some(5000.0), 95.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPosition { .. }));
        assert_eq!(service.snapshot().await.fuel_baseline_kg, None);

        let outcome = service
            .apply_sample(&sample("ENR", Some(5000.0), 90.0))
            .await
            .unwrap();
        assert!(outcome.position_update.is_sent());
    }

    #[tokio::test]
    async fn test_missing_fuel_and_position_skip() {
        let service = active_service().await;
        let outcome = service
            .apply_sample(&TelemetrySample {
                status: "INI".to_string(),
                position: None,
                fuel: None,
                flight_time: None,
            })
            .await
            .unwrap();

        assert_eq!(
            outcome.flight_update,
            ChannelOutcome::Skipped(SkipReason::NoFuelReading)
        );
        assert_eq!(
            outcome.position_update,
            ChannelOutcome::Skipped(SkipReason::NoPosition)
        );
        assert_eq!(service.snapshot().await.fuel_baseline_kg, None);
    }

    #[tokio::test]
    async fn test_position_without_coordinates_skips_position() {
        let service = active_service().await;
        let outcome = service
            .apply_sample(&TelemetrySample {
                status: "ENR".to_string(),
                position: Some(Position {
                    gs: Some(320.0),
                    ..Position::default()
                }),
                fuel: Some(4500.0),
                flight_time: None,
            })
            .await
            .unwrap();

        assert_eq!(
            outcome.flight_update,
            ChannelOutcome::Skipped(SkipReason::BaselineCaptured)
        );
        assert_eq!(
            outcome.position_update,
            ChannelOutcome::Skipped(SkipReason::NoPosition)
        );
        assert_eq!(service.snapshot().await.fuel_baseline_kg, Some(4500));
        assert_eq!(service.api().count("position"), 0);
    }

    #[tokio::test]
    async fn test_extreme_fuel_readings_saturate() {
        let service = active_service().await;
        service
            .apply_sample(&sample("ENR", Some(1e300), 10.0))
            .await
            .unwrap();
        let outcome = service
            .apply_sample(&sample("ENR", Some(-1e300), 10.0))
            .await
            .unwrap();
        assert!(outcome.flight_update.is_sent());

        let used = service.api().calls().into_iter().find_map(|c| match c {
            Call::Update(_, body) => Some(body.fuel_used_lbs),
            _ => None,
        });
        assert_eq!(used, Some(i64::MAX));
    }

    #[tokio::test]
    async fn test_channels_fail_independently() {
        let service = active_service().await;
        service
            .apply_sample(&sample("TXI", Some(5000.0), 10.0))
            .await
            .unwrap();

        service.api().fail("position");
        let outcome = service
            .apply_sample(&sample("ENR", Some(4990.0), 10.0))
            .await
            .unwrap();
        assert!(outcome.flight_update.is_sent());
        assert!(matches!(outcome.position_update, ChannelOutcome::Failed(ref m) if m.contains("500")));

        service.api().recover("position");
        service.api().fail("update");
        let outcome = service
            .apply_sample(&sample("ENR", Some(4980.0), 10.0))
            .await
            .unwrap();
        assert!(matches!(outcome.flight_update, ChannelOutcome::Failed(_)));
        assert!(outcome.position_update.is_sent());
    }

    #[tokio::test]
    async fn test_read_only_skips_sample() {
        let service = active_service().await;
        force_state(&service, ReportState::Accepted).await;

        let err = service
            .apply_sample(&sample("ENR", Some(5000.0), 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReadOnly { state: ReportState::Accepted }));
        assert!(service.api().calls().is_empty());
    }

    #[tokio::test]
    async fn test_file_clears_report() {
        let service = active_service().await;
        service
            .apply_sample(&sample("TXI", Some(5000.0), 10.0))
            .await
            .unwrap();

        let body = FileRequest {
            flight_time: 83,
            fuel_used_lbs: 111,
            distance: 217,
        };
        service.file(&body).await.unwrap();

        assert!(service
            .api()
            .calls()
            .contains(&Call::File("pirep-1".to_string(), body)));
        let snapshot = service.snapshot().await;
        assert!(snapshot.id.is_none());
        assert!(snapshot.fuel_baseline_kg.is_none());
        assert_eq!(snapshot.state, ReportState::InProgress);
    }

    #[tokio::test]
    async fn test_file_without_report() {
        let service = FlightService::new(FakeApi::new());
        let err = service
            .file(&FileRequest {
                flight_time: 1,
                fuel_used_lbs: 1,
                distance: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoActiveReport));
    }

    #[tokio::test]
    async fn test_file_when_accepted_fails() {
        let service = active_service().await;
        force_state(&service, ReportState::Accepted).await;

        let err = service
            .file(&FileRequest {
                flight_time: 1,
                fuel_used_lbs: 1,
                distance: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PreconditionFailed {
                operation: "filed",
                state: ReportState::Accepted
            }
        ));
        assert_eq!(service.snapshot().await.state, ReportState::Accepted);
        assert_eq!(service.api().count("file"), 0);
    }

    #[tokio::test]
    async fn test_file_remote_failure_keeps_report() {
        let service = active_service().await;
        service.api().fail("file");

        let err = service
            .file(&FileRequest {
                flight_time: 1,
                fuel_used_lbs: 1,
                distance: 1,
            })
            .await
            .unwrap_err();
        assert!(err.is_remote());
        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.id.as_deref(), Some("pirep-1"));
        assert_eq!(snapshot.state, ReportState::InProgress);
    }

    #[tokio::test]
    async fn test_cancel_then_sample_is_noop() {
        let service = active_service().await;
        service
            .apply_sample(&sample("TXI", Some(5000.0), 10.0))
            .await
            .unwrap();
        service.cancel().await.unwrap();

        let snapshot = service.snapshot().await;
        assert!(snapshot.id.is_none());
        assert!(snapshot.fuel_baseline_kg.is_none());
        assert_eq!(snapshot.state, ReportState::Cancelled);
        service.api().take_calls();

        let outcome = service
            .apply_sample(&sample("ENR", Some(4900.0), 10.0))
            .await
            .unwrap();
        assert_eq!(
            outcome.position_update,
            ChannelOutcome::Skipped(SkipReason::NoActiveReport)
        );
        assert!(service.api().calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_read_only_fails() {
        let service = active_service().await;
        force_state(&service, ReportState::Rejected).await;

        let err = service.cancel().await.unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(service.api().count("cancel"), 0);
    }

    #[tokio::test]
    async fn test_prefile_after_cancel() {
        let service = active_service().await;
        service.cancel().await.unwrap();
        *service.api().next_id.lock().unwrap() = "pirep-2".to_string();

        assert_eq!(service.prefile(&request()).await.unwrap(), "pirep-2");
        assert_eq!(service.snapshot().await.state, ReportState::InProgress);
    }

    #[tokio::test]
    async fn test_reset_always_succeeds() {
        for state in ReportState::ALL {
            let service = active_service().await;
            force_state(&service, state).await;
            service.reset_active().await;

            let snapshot = service.snapshot().await;
            assert!(snapshot.id.is_none(), "{state}");
            assert!(snapshot.fuel_baseline_kg.is_none());
            assert_eq!(snapshot.state, ReportState::InProgress);
            assert!(service.api().calls().is_empty());
        }

        let idle = FlightService::new(FakeApi::new());
        idle.reset_active().await;
        assert_eq!(idle.snapshot().await.state, ReportState::InProgress);
    }

    #[tokio::test]
    async fn test_adopt_existing() {
        let service = active_service().await;
        service
            .apply_sample(&sample("TXI", Some(5000.0), 10.0))
            .await
            .unwrap();
        force_state(&service, ReportState::Paused).await;
        *service.api().reports.lock().unwrap() = vec![
            listed("remote-9", ReportState::InProgress),
            listed("old", ReportState::Accepted),
        ];

        let adopted = service.adopt_existing().await.unwrap();
        assert_eq!(adopted.id, "remote-9");

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.id.as_deref(), Some("remote-9"));
        assert_eq!(snapshot.state, ReportState::InProgress);
        assert_eq!(snapshot.fuel_baseline_kg, None);
    }

    #[tokio::test]
    async fn test_adopt_requires_in_progress() {
        let service = FlightService::new(FakeApi::new());
        let err = service.adopt_existing().await.unwrap_err();
        assert!(matches!(err, Error::NoPendingReport(_)));

        *service.api().reports.lock().unwrap() = vec![listed("p", ReportState::Paused)];
        let err = service.adopt_existing().await.unwrap_err();
        assert!(err.to_string().contains("not in progress"));
        assert!(service.snapshot().await.id.is_none());
    }

    #[tokio::test]
    async fn test_sync_unlisted_report() {
        let service = active_service().await;
        assert_eq!(service.sync_remote_state().await.unwrap(), None);
        assert_eq!(service.snapshot().await.state, ReportState::InProgress);

        let idle = FlightService::new(FakeApi::new());
        assert!(matches!(
            idle.sync_remote_state().await,
            Err(Error::NoActiveReport)
        ));
    }

    #[tokio::test]
    async fn test_catalog_reads() {
        let service = FlightService::new(FakeApi::new());
        assert!(matches!(
            service.aircraft().await,
            Err(Error::InvalidResponse(_))
        ));

        *service.api().fleet.lock().unwrap() = vec![AircraftFleet {
            aircraft: vec![Aircraft {
                id: 70,
                registration: "VH-VXA".to_string(),
                icao: "B738".to_string(),
                name: "737-800".to_string(),
            }],
            ..AircraftFleet::default()
        }];
        assert_eq!(service.aircraft().await.unwrap()[0].id, 70);

        *service.api().airlines.lock().unwrap() = vec![Airline {
            id: 1,
            icao: "QFA".to_string(),
            ..Airline::default()
        }];
        assert_eq!(service.airlines().await.unwrap()[0].icao, "QFA");

        assert!(service.flight_plan(" ").await.unwrap_err().is_validation());
        assert!(service.flight_plan("42").await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_samples_and_commands_stay_consistent() {
        let service = Arc::new(active_service().await);

        let mut tasks = Vec::new();
        for i in 0..50u32 {
            let service = Arc::clone(&service);
            tasks.push(tokio::spawn(async move {
                let fuel = 5000.0 - f64::from(i);
                let _ = service.apply_sample(&sample("ENR", Some(fuel), 10.0)).await;
                if i == 25 {
                    service.reset_active().await;
                }
                let snapshot = service.snapshot().await;
                assert!(snapshot.id.is_some() || snapshot.fuel_baseline_kg.is_none());
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let snapshot = service.snapshot().await;
        assert!(snapshot.id.is_none());
        assert!(snapshot.fuel_baseline_kg.is_none());
    }

    #[tokio::test]
    async fn test_file_waits_for_in_flight_sample() {
        let service = Arc::new(active_service().await);
        service
            .apply_sample(&sample("TXI", Some(5000.0), 10.0))
            .await
            .unwrap();
        service.api().take_calls();
        service.api().slow("update", Duration::from_millis(100));

        let in_flight = {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .apply_sample(&sample("ENR", Some(4900.0), 10.0))
                    .await
            })
        };
        while service.api().count("update") == 0 {
            tokio::task::yield_now().await;
        }

        let body = FileRequest {
            flight_time: 83,
            fuel_used_lbs: 221,
            distance: 217,
        };
        service.file(&body).await.unwrap();
        assert!(in_flight.is_finished());

        let outcome = in_flight.await.unwrap().unwrap();
        assert!(outcome.flight_update.is_sent());
        assert!(outcome.position_update.is_sent());
        assert_eq!(
            service.api().calls().last(),
            Some(&Call::File("pirep-1".to_string(), body))
        );

        service.api().take_calls();
        let outcome = service
            .apply_sample(&sample("ENR", Some(4800.0), 10.0))
            .await
            .unwrap();
        assert_eq!(
            outcome.flight_update,
            ChannelOutcome::Skipped(SkipReason::NoActiveReport)
        );
        assert!(service.api().calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_waits_for_in_flight_sample() {
        let service = Arc::new(active_service().await);
        service.api().slow("position", Duration::from_millis(100));

        let in_flight = {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .apply_sample(&sample("TXI", Some(5000.0), 10.0))
                    .await
            })
        };
        while service.api().count("position") == 0 {
            tokio::task::yield_now().await;
        }

        service.cancel().await.unwrap();
        assert!(in_flight.is_finished());
        assert_eq!(
            service.api().calls().last(),
            Some(&Call::Cancel("pirep-1".to_string()))
        );
        assert!(in_flight.await.unwrap().unwrap().position_update.is_sent());
    }
}
