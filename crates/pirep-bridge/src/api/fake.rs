//! In-memory [`ReportApi`] used by tests.

#![allow(missing_docs)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::models::{
    AircraftFleet, Airline, FileRequest, FlightUpdateRequest, ListedPirep, PageLinks, PageMeta,
    Paginated, PositionUpdateRequest, PrefileRequest, SimBriefOfp,
};
use super::{ApiError, ReportApi, Result};

/// A recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Prefile(PrefileRequest),
    Update(String, FlightUpdateRequest),
    Position(String, PositionUpdateRequest),
    File(String, FileRequest),
    Cancel(String),
    ListReports,
    UserFleet,
    Airlines,
    FlightPlan(String),
}

impl Call {
    fn name(&self) -> &'static str {
        match self {
            Self::Prefile(_) => "prefile",
            Self::Update(..) => "update",
            Self::Position(..) => "position",
            Self::File(..) => "file",
            Self::Cancel(_) => "cancel",
            Self::ListReports => "list",
            Self::UserFleet => "fleet",
            Self::Airlines => "airlines",
            Self::FlightPlan(_) => "flight_plan",
        }
    }
}

/// Records every call and answers from canned data. Operations named in
/// `fail` return a 500 status error; operations named in `slow` answer after
/// a delay.
#[derive(Debug)]
pub struct FakeApi {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<&'static str>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    pub next_id: Mutex<String>,
    pub reports: Mutex<Vec<ListedPirep>>,
    pub fleet: Mutex<Vec<AircraftFleet>>,
    pub airlines: Mutex<Vec<Airline>>,
    pub ofp: Mutex<SimBriefOfp>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            calls: Mutex::default(),
            failing: Mutex::default(),
            delays: Mutex::default(),
            next_id: Mutex::new("pirep-1".to_string()),
            reports: Mutex::default(),
            fleet: Mutex::default(),
            airlines: Mutex::default(),
            ofp: Mutex::default(),
        }
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().unwrap().remove(operation);
    }

    pub fn slow(&self, operation: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(operation, delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.name() == operation)
            .count()
    }

    async fn record(&self, call: Call) -> Result<()> {
        let name = call.name();
        self.calls.lock().unwrap().push(call);
        let delay = self.delays.lock().unwrap().get(name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(name) {
            Err(ApiError::Status {
                url: format!("fake://{name}"),
                status: 500,
            })
        } else {
            Ok(())
        }
    }

    fn page<T: Clone>(items: &Mutex<Vec<T>>) -> Paginated<T> {
        Paginated {
            data: items.lock().unwrap().clone(),
            links: PageLinks::default(),
            meta: PageMeta::default(),
        }
    }
}

#[async_trait::async_trait]
impl ReportApi for FakeApi {
    async fn prefile(&self, request: &PrefileRequest) -> Result<ListedPirep> {
        self.record(Call::Prefile(request.clone())).await?;
        Ok(ListedPirep {
            id: self.next_id.lock().unwrap().clone(),
            flight_number: request.flight_number.clone(),
            ..ListedPirep::default()
        })
    }

    async fn update(&self, id: &str, request: &FlightUpdateRequest) -> Result<()> {
        self.record(Call::Update(id.to_string(), request.clone())).await
    }

    async fn post_position(&self, id: &str, position: &PositionUpdateRequest) -> Result<()> {
        self.record(Call::Position(id.to_string(), position.clone())).await
    }

    async fn file(&self, id: &str, request: &FileRequest) -> Result<()> {
        self.record(Call::File(id.to_string(), request.clone())).await
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        self.record(Call::Cancel(id.to_string())).await
    }

    async fn list_reports(&self) -> Result<Paginated<ListedPirep>> {
        self.record(Call::ListReports).await?;
        Ok(Self::page(&self.reports))
    }

    async fn user_fleet(&self) -> Result<Vec<AircraftFleet>> {
        self.record(Call::UserFleet).await?;
        Ok(self.fleet.lock().unwrap().clone())
    }

    async fn airlines(&self) -> Result<Paginated<Airline>> {
        self.record(Call::Airlines).await?;
        Ok(Self::page(&self.airlines))
    }

    async fn flight_plan(&self, user_id: &str) -> Result<SimBriefOfp> {
        self.record(Call::FlightPlan(user_id.to_string())).await?;
        Ok(self.ofp.lock().unwrap().clone())
    }
}
