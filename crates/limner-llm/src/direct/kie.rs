//! kie.ai image job client
//!
//! Jobs run on the `nano-banana-pro` model. The prompt is wrapped in the
//! style modifier before it is sent, since kie.ai has no style parameter.

use async_trait::async_trait;
use limner_config::ConnectionConfig;
use limner_core::{
    ImageJobApi, ImageJobRequest, JobHandle, JobStatus, PollableJob, ServiceError, ServiceResult,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::http::{check_status, clamp_progress, download, read_json, transport};
use crate::style::enhance_prompt;

const SERVICE: &str = "kie.ai";

/// Image model requested from kie.ai
pub const KIE_MODEL: &str = "nano-banana-pro";

/// Direct kie.ai image job client
pub struct KieClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl KieClient {
    /// Create a new kie.ai client
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Create a client from connection settings
    pub fn from_config(config: &ConnectionConfig, api_key: impl Into<String>) -> Self {
        Self::new(api_key, config.kie_endpoint(), config.timeout())
    }
}

#[derive(Debug, Serialize)]
struct CreateTaskBody<'a> {
    model: &'a str,
    input: TaskInput,
}

#[derive(Debug, Serialize)]
struct TaskInput {
    prompt: String,
    aspect_ratio: &'static str,
    resolution: &'static str,
    output_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct CreateTaskResponse {
    #[serde(default)]
    job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    #[serde(default)]
    job_id: Option<String>,
    status: JobStatus,
    #[serde(default)]
    output: Option<JobOutput>,
    #[serde(default)]
    error: Option<JobFailure>,
    #[serde(default)]
    progress: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct JobOutput {
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobFailure {
    #[serde(default)]
    message: Option<String>,
}

fn task_body(request: &ImageJobRequest) -> CreateTaskBody<'static> {
    CreateTaskBody {
        model: KIE_MODEL,
        input: TaskInput {
            prompt: enhance_prompt(&request.prompt, request.style),
            aspect_ratio: request.aspect_ratio.as_str(),
            resolution: request.resolution.as_str(),
            output_format: request.output_format.as_str(),
        },
    }
}

#[async_trait]
impl ImageJobApi for KieClient {
    async fn create_job(&self, request: &ImageJobRequest) -> ServiceResult<JobHandle> {
        let url = format!("{}/jobs/createTask", self.base_url);
        debug!(url = %url, style = %request.style, "creating kie.ai task");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&task_body(request))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let created: CreateTaskResponse = read_json(SERVICE, response).await?;

        created
            .job_id
            .filter(|id| !id.trim().is_empty())
            .map(JobHandle::new)
            .ok_or_else(|| ServiceError::invalid_response("No job_id in response"))
    }

    async fn job_status(&self, handle: &JobHandle) -> ServiceResult<PollableJob> {
        let url = format!(
            "{}/jobs/{}",
            self.base_url,
            urlencoding::encode(&handle.job_id)
        );
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;
        let job: JobResponse = read_json(SERVICE, response).await?;

        Ok(PollableJob {
            job_id: job.job_id.unwrap_or_else(|| handle.job_id.clone()),
            status: job.status,
            result_ref: job.output.and_then(|o| o.image_url),
            error_message: job.error.and_then(|e| e.message),
            progress: clamp_progress(job.progress),
        })
    }

    async fn fetch_result(&self, result_ref: &str) -> ServiceResult<Vec<u8>> {
        download(&self.client, result_ref, self.timeout).await
    }
}
