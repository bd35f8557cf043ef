//! HTTP backend over a blocking reqwest client

use std::time::Duration;

use chrono::NaiveDate;
use doorflow_api::paths::{self, Endpoint, Method};
use doorflow_api::{
    ApiErrorBody, CompleteDoorRequest, CompleteJobRequest, DispatchDay, DispatchRequest,
    FieldJobSummary, FieldSummary, Job, LineItemRequest, MediaUploadRequest, ScheduleRequest,
    StartJobRequest, User, IDEMPOTENCY_HEADER,
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{Backend, BackendError, BackendResult};

/// HTTP backend configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API root, e.g. `https://dispatch.example.com/api`
    pub base_url: String,
    /// Bearer token, if the backend requires auth
    pub token: Option<String>,
    /// Whole-request timeout in seconds
    pub timeout_seconds: u64,
    /// TCP connect timeout in seconds
    pub connect_timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            token: None,
            timeout_seconds: 30,
            connect_timeout_seconds: 5,
        }
    }
}

/// Backend talking JSON over HTTP
pub struct HttpBackend {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &HttpConfig) -> BackendResult<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(config.base_url.clone()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .user_agent(concat!("doorflow-field/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::Connection(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            token: config.token.clone(),
        })
    }

    /// Join endpoint segments onto the base URL, percent-encoding each.
    fn url(&self, endpoint: &Endpoint) -> BackendResult<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BackendError::InvalidUrl(self.base.to_string()))?;
            segments.pop_if_empty();
            segments.extend(endpoint.segments.iter());
        }
        if !endpoint.query.is_empty() {
            url.query_pairs_mut().extend_pairs(endpoint.query.iter());
        }
        Ok(url)
    }

    fn request(&self, endpoint: &Endpoint, key: Option<&str>) -> BackendResult<RequestBuilder> {
        let url = self.url(endpoint)?;
        let mut builder = match endpoint.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
        };
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(key) = key {
            builder = builder.header(IDEMPOTENCY_HEADER, key);
        }
        Ok(builder)
    }

    fn execute(&self, endpoint: &Endpoint, builder: RequestBuilder) -> BackendResult<Response> {
        debug!(%endpoint, "backend request");
        let response = builder
            .send()
            .map_err(|e| map_transport_error(endpoint, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .ok()
            .and_then(|body| body.summary())
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "request failed".to_string());

        Err(BackendError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    fn get_json<R: DeserializeOwned>(&self, endpoint: Endpoint) -> BackendResult<R> {
        let builder = self.request(&endpoint, None)?;
        let response = self.execute(&endpoint, builder)?;
        response.json::<R>().map_err(|e| BackendError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    fn send_json<T: Serialize>(&self, endpoint: Endpoint, body: &T, key: Option<&str>) -> BackendResult<()> {
        let builder = self.request(&endpoint, key)?.json(body);
        self.execute(&endpoint, builder)?;
        Ok(())
    }
}

fn map_transport_error(endpoint: &Endpoint, error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout(endpoint.to_string())
    } else if error.is_decode() {
        BackendError::Decode {
            endpoint: endpoint.to_string(),
            message: error.to_string(),
        }
    } else {
        BackendError::Connection(format!("{}: {}", endpoint, error))
    }
}

impl Backend for HttpBackend {
    fn ping(&self) -> BackendResult<()> {
        let endpoint = paths::connectivity_test();
        let builder = self.request(&endpoint, None)?;
        self.execute(&endpoint, builder)?;
        Ok(())
    }

    fn jobs(&self) -> BackendResult<Vec<FieldJobSummary>> {
        self.get_json(paths::jobs())
    }

    fn schedule_job(&self, job_id: &str, request: &ScheduleRequest) -> BackendResult<()> {
        self.send_json(paths::schedule_job(job_id), request, None)
    }

    fn field_jobs(&self, date: Option<NaiveDate>) -> BackendResult<Vec<FieldJobSummary>> {
        self.get_json(paths::field_jobs(date))
    }

    fn field_job(&self, job_id: &str) -> BackendResult<Job> {
        self.get_json(paths::field_job(job_id))
    }

    fn field_summary(&self) -> BackendResult<FieldSummary> {
        self.get_json(paths::field_summary())
    }

    fn start_job(&self, job_id: &str, request: &StartJobRequest, key: &str) -> BackendResult<()> {
        self.send_json(paths::start_job(job_id), request, Some(key))
    }

    fn complete_door(
        &self,
        job_id: &str,
        door_id: &str,
        request: &CompleteDoorRequest,
        key: &str,
    ) -> BackendResult<()> {
        self.send_json(paths::complete_door(job_id, door_id), request, Some(key))
    }

    fn complete_job(&self, job_id: &str, request: &CompleteJobRequest, key: &str) -> BackendResult<()> {
        self.send_json(paths::complete_job(job_id), request, Some(key))
    }

    fn set_line_item(
        &self,
        job_id: &str,
        door_id: &str,
        line_item_id: &str,
        request: LineItemRequest,
        key: &str,
    ) -> BackendResult<()> {
        self.send_json(paths::line_item(job_id, door_id, line_item_id), &request, Some(key))
    }

    fn upload_media(
        &self,
        job_id: &str,
        door_id: &str,
        request: &MediaUploadRequest,
        key: &str,
    ) -> BackendResult<()> {
        self.send_json(paths::door_media(job_id, door_id, request.kind), request, Some(key))
    }

    fn dispatch(&self, date: NaiveDate) -> BackendResult<DispatchDay> {
        self.get_json(paths::dispatch(date))
    }

    fn save_dispatch(&self, request: &DispatchRequest) -> BackendResult<()> {
        self.send_json(paths::save_dispatch(), request, None)
    }

    fn users(&self) -> BackendResult<Vec<User>> {
        self.get_json(paths::users())
    }
}
