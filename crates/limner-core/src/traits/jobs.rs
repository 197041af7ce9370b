//! Asynchronous image job API abstraction

use async_trait::async_trait;
use limner_config::{AspectRatio, GenerationConfig, ImageResolution, ImageStyle, OutputFormat};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ServiceResult;

/// Job lifecycle state as reported by the status call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Queued
    Pending,
    /// Running
    Processing,
    /// Finished with a result
    Completed,
    /// Finished with an error
    Failed,
}

impl JobStatus {
    /// `Completed` and `Failed` are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Short user-facing message
    pub fn message(&self) -> &'static str {
        match self {
            Self::Pending => "Waiting in queue...",
            Self::Processing => "Generating image...",
            Self::Completed => "Image generated!",
            Self::Failed => "Generation failed",
        }
    }
}

/// Opaque handle returned by the create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Job identifier
    pub job_id: String,
    /// Service estimate of the wait, if given
    pub estimated_wait: Option<Duration>,
}

impl JobHandle {
    /// Handle without a wait estimate
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            estimated_wait: None,
        }
    }
}

/// Snapshot of a job from one status call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollableJob {
    /// Job identifier
    pub job_id: String,
    /// Current state
    pub status: JobStatus,
    /// Where the result can be fetched once completed
    pub result_ref: Option<String>,
    /// Failure reason once failed
    pub error_message: Option<String>,
    /// Service-side progress estimate (0-100)
    pub progress: Option<u8>,
}

impl PollableJob {
    /// Snapshot with only a status
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            result_ref: None,
            error_message: None,
            progress: None,
        }
    }

    /// Completed snapshot with a result
    pub fn completed(job_id: impl Into<String>, result_ref: impl Into<String>) -> Self {
        Self {
            result_ref: Some(result_ref.into()),
            ..Self::new(job_id, JobStatus::Completed)
        }
    }

    /// Failed snapshot with a reason
    pub fn failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::new(job_id, JobStatus::Failed)
        }
    }
}

/// Image generation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageJobRequest {
    /// Prompt text
    pub prompt: String,
    /// Visual style preset
    pub style: ImageStyle,
    /// Output aspect ratio
    pub aspect_ratio: AspectRatio,
    /// Output resolution tier
    pub resolution: ImageResolution,
    /// Encoded image format
    pub output_format: OutputFormat,
}

impl ImageJobRequest {
    /// Build a request from generation settings
    pub fn new(prompt: impl Into<String>, settings: &GenerationConfig) -> Self {
        Self {
            prompt: prompt.into(),
            style: settings.style,
            aspect_ratio: settings.aspect_ratio,
            resolution: settings.resolution,
            output_format: settings.output_format,
        }
    }
}

/// Create-then-poll image generation service
#[async_trait]
pub trait ImageJobApi: Send + Sync {
    /// Start a job
    async fn create_job(&self, request: &ImageJobRequest) -> ServiceResult<JobHandle>;

    /// Check a job's status once
    async fn job_status(&self, handle: &JobHandle) -> ServiceResult<PollableJob>;

    /// Download a completed job's image
    async fn fetch_result(&self, result_ref: &str) -> ServiceResult<Vec<u8>>;
}
