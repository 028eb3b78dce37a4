//! reqwest implementation of `QueueService`.

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;

use super::error::ApiError;
use super::{paths, QueueService};
use crate::models::queue::{records_from_value, CallNextRequest};
use crate::models::{CallNextResponse, QueueSnapshot, QueueStatus, ServerRecord, StaffProfile};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 30;

// ═══════════════════════════════════════════════════════════
// RestClient: shared request plumbing
// ═══════════════════════════════════════════════════════════

/// Base URL + bearer token + one pooled reqwest client.
#[derive(Clone)]
pub struct RestClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl RestClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        self.execute(self.request(Method::GET, path)).await
    }

    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        self.execute(self.request(method, path).json(body)).await
    }

    pub async fn send_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<Value, ApiError> {
        self.execute(self.request(Method::POST, path).multipart(form))
            .await
    }

    /// Send and read the body. An empty success body reads as `null`.
    async fn execute(&self, builder: RequestBuilder) -> Result<Value, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, &self.base_url))?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(e, &self.base_url))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════
// HttpQueueService
// ═══════════════════════════════════════════════════════════

/// Staff API client.
#[derive(Clone)]
pub struct HttpQueueService {
    rest: RestClient,
}

impl HttpQueueService {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        Ok(Self {
            rest: RestClient::new(base_url, token)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.rest.base_url()
    }

    pub fn has_token(&self) -> bool {
        self.rest.has_token()
    }

    async fn list(&self, path: &str, keys: &[&str]) -> Result<Vec<ServerRecord>, ApiError> {
        let value = self.rest.get_json(path).await?;
        Ok(records_from_value(value, keys))
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

impl QueueService for HttpQueueService {
    async fn fetch_profile(&self) -> Result<StaffProfile, ApiError> {
        let value = self.rest.get_json(paths::PROFILE).await?;
        StaffProfile::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn fetch_queue(&self) -> Result<QueueSnapshot, ApiError> {
        let value = self.rest.get_json(paths::NURSE_QUEUE).await?;
        Ok(QueueSnapshot::from_value(value))
    }

    async fn fetch_schedules(&self) -> Result<Vec<ServerRecord>, ApiError> {
        self.list(paths::QUEUE_SCHEDULES, &["schedules", "results"])
            .await
    }

    async fn fetch_inventory(&self) -> Result<Vec<ServerRecord>, ApiError> {
        self.list(paths::MEDICINE_INVENTORY, &["medicines", "results"])
            .await
    }

    async fn fetch_notifications(&self) -> Result<Vec<ServerRecord>, ApiError> {
        self.list(paths::NOTIFICATIONS, &["notifications", "results"])
            .await
    }

    async fn fetch_queue_status(&self) -> Result<QueueStatus, ApiError> {
        let value = self.rest.get_json(paths::QUEUE_STATUS).await?;
        if value.is_null() {
            return Ok(QueueStatus::default());
        }
        decode(value)
    }

    async fn fetch_free_doctors(&self) -> Result<Vec<ServerRecord>, ApiError> {
        self.list(paths::FREE_DOCTORS, &["doctors"]).await
    }

    async fn start_processing(&self, department: &str) -> Result<CallNextResponse, ApiError> {
        let value = self
            .rest
            .send_json(
                Method::POST,
                paths::START_PROCESSING,
                &CallNextRequest { department },
            )
            .await?;
        decode(value)
    }

    async fn fetch_nurse_patients(&self) -> Result<Vec<ServerRecord>, ApiError> {
        self.list(paths::NURSE_PATIENTS, &["patients"]).await
    }

    async fn create_assessment(&self, payload: &Value) -> Result<Value, ApiError> {
        self.rest
            .send_json(Method::POST, paths::NURSE_PATIENTS, payload)
            .await
    }

    async fn update_assessment(&self, patient_id: i64, payload: &Value) -> Result<Value, ApiError> {
        self.rest
            .send_json(Method::PUT, &paths::nurse_patient(patient_id), payload)
            .await
    }
}
