//! Client for the Limner proxy service
//!
//! The proxy fronts both services behind one bearer token:
//! - `POST /v1/plan` returns a placement plan
//! - `POST /v1/image/create` starts an image job
//! - `GET /v1/image/status/{jobId}` reports on it
//!
//! Error responses carry `{"error": {"code", "message", "retryable"}}`.

use async_trait::async_trait;
use limner_config::{ConnectionConfig, ImageStyle, Language};
use limner_core::{
    ImageJobApi, ImageJobRequest, JobHandle, JobStatus, Plan, PlanItem, PlanRequest, Planner,
    PollableJob, ServiceError, ServiceResult,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::http::{check_status, clamp_progress, download, read_json, transport};

const SERVICE: &str = "Proxy";

/// Planner and image job client for the proxy
pub struct ProxyClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    timeout: Duration,
}

impl ProxyClient {
    /// Create a new proxy client
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            token: token.into(),
            timeout,
        }
    }

    /// Create a client from connection settings
    pub fn from_config(config: &ConnectionConfig, token: impl Into<String>) -> Self {
        Self::new(config.proxy_url(), token, config.timeout())
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ServiceResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url = %url, "proxy POST");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        read_json(SERVICE, response).await
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, endpoint: &str) -> ServiceResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url = %url, "proxy GET");
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        read_json(SERVICE, response).await
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanBody<'a> {
    note_content: &'a str,
    settings: PlanSettings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanSettings {
    image_count: u32,
    style: ImageStyle,
    language: Language,
}

#[derive(Debug, Deserialize)]
struct PlanResponse {
    #[serde(default)]
    items: Option<Vec<PlanItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    estimated_wait_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    #[serde(default)]
    job_id: Option<String>,
    status: JobStatus,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    progress: Option<f64>,
}

#[async_trait]
impl Planner for ProxyClient {
    async fn plan(&self, request: &PlanRequest) -> ServiceResult<Plan> {
        let body = PlanBody {
            note_content: &request.excerpt,
            settings: PlanSettings {
                image_count: request.image_count,
                style: request.style,
                language: request.language,
            },
        };
        let response: PlanResponse = self.post("/v1/plan", &body).await?;
        let items = response
            .items
            .ok_or_else(|| ServiceError::invalid_response("Plan response has no items"))?;
        Ok(Plan { items })
    }

    fn name(&self) -> &str {
        "proxy"
    }
}

#[async_trait]
impl ImageJobApi for ProxyClient {
    async fn create_job(&self, request: &ImageJobRequest) -> ServiceResult<JobHandle> {
        let response: CreateResponse = self.post("/v1/image/create", request).await?;
        let job_id = response
            .job_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ServiceError::invalid_response("No jobId in response"))?;
        Ok(JobHandle {
            job_id,
            estimated_wait: response.estimated_wait_seconds.map(Duration::from_secs),
        })
    }

    async fn job_status(&self, handle: &JobHandle) -> ServiceResult<PollableJob> {
        let endpoint = format!(
            "/v1/image/status/{}",
            urlencoding::encode(&handle.job_id)
        );
        let response: StatusResponse = self.get(&endpoint).await?;
        Ok(PollableJob {
            job_id: response.job_id.unwrap_or_else(|| handle.job_id.clone()),
            status: response.status,
            result_ref: response.image_url,
            error_message: response.error_message,
            progress: clamp_progress(response.progress),
        })
    }

    async fn fetch_result(&self, result_ref: &str) -> ServiceResult<Vec<u8>> {
        download(&self.client, result_ref, self.timeout).await
    }
}
