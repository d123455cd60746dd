//! `reqwest`-backed implementation of [`ReportApi`].

use std::time::Duration;

use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use super::models::{
    AircraftFleet, Airline, DataResponse, FileRequest, FlightUpdateRequest, ListedPirep,
    Paginated, PositionBatch, PositionUpdateRequest, PrefileRequest, SimBriefOfp,
};
use super::{ApiError, ReportApi, Result};

/// Default timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("pirep-bridge/", env!("CARGO_PKG_VERSION"));

/// HTTP client for a phpVMS site.
///
/// Every call to the site carries the `X-API-Key` header. The SimBrief
/// request goes to a third-party host and is sent without it.
#[derive(Debug, Clone)]
pub struct HttpReportClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    simbrief_url: String,
}

impl HttpReportClient {
    /// Create a client for the site at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        simbrief_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::Build(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            simbrief_url: simbrief_url.into(),
        })
    }

    /// The site base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        authenticated: bool,
    ) -> Result<Response> {
        debug!(%method, url, has_body = body.is_some(), "API request");

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if authenticated {
            request = request.header("X-API-Key", &self.api_key);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(%method, url, status = status.as_u16(), "API response");
        Ok(response)
    }

    async fn decode<R: DeserializeOwned>(url: &str, response: Response) -> Result<R> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        trace!(url, len = bytes.len(), "Decoding response body");
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let url = self.endpoint(path);
        let response = self.send::<()>(Method::GET, &url, None, true).await?;
        Self::decode(&url, response).await
    }

    async fn send_only<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<()> {
        let url = self.endpoint(path);
        self.send(method, &url, body, true).await.map(drop)
    }
}

#[async_trait::async_trait]
impl ReportApi for HttpReportClient {
    async fn prefile(&self, request: &PrefileRequest) -> Result<ListedPirep> {
        let url = self.endpoint("/api/pireps/prefile");
        let response = self.send(Method::POST, &url, Some(request), true).await?;
        let envelope: DataResponse<ListedPirep> = Self::decode(&url, response).await?;
        Ok(envelope.data)
    }

    async fn update(&self, id: &str, request: &FlightUpdateRequest) -> Result<()> {
        self.send_only(Method::PUT, &format!("/api/pireps/{id}"), Some(request))
            .await
    }

    async fn post_position(&self, id: &str, position: &PositionUpdateRequest) -> Result<()> {
        let batch = PositionBatch {
            positions: [position],
        };
        self.send_only(
            Method::POST,
            &format!("/api/pireps/{id}/acars/position"),
            Some(&batch),
        )
        .await
    }

    async fn file(&self, id: &str, request: &FileRequest) -> Result<()> {
        self.send_only(Method::POST, &format!("/api/pireps/{id}/file"), Some(request))
            .await
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        self.send_only::<()>(Method::DELETE, &format!("/api/pireps/{id}/cancel"), None)
            .await
    }

    async fn list_reports(&self) -> Result<Paginated<ListedPirep>> {
        self.get_json("/api/pireps").await
    }

    async fn user_fleet(&self) -> Result<Vec<AircraftFleet>> {
        let envelope: DataResponse<Vec<AircraftFleet>> = self.get_json("/api/user/fleet").await?;
        Ok(envelope.data)
    }

    async fn airlines(&self) -> Result<Paginated<Airline>> {
        self.get_json("/api/airlines").await
    }

    async fn flight_plan(&self, user_id: &str) -> Result<SimBriefOfp> {
        let url = reqwest::Url::parse_with_params(
            &self.simbrief_url,
            &[("userid", user_id), ("json", "1")],
        )
        .map_err(|e| ApiError::Http(e.to_string()))?;
        let url = url.as_str();
        let response = self.send::<()>(Method::GET, url, None, false).await?;
        Self::decode(url, response).await
    }
}
