//! Bounded polling of asynchronous image jobs
//!
//! `create` is called once, then up to `max_attempts` rounds of
//! "sleep `interval`, poll once". Exactly one status call is outstanding at a
//! time. The worst-case wait is `interval * max_attempts`.
//!
//! There is no cancellation token: a caller that stops awaiting simply
//! abandons the job, and nothing is sent to the service.

use limner_config::PollingConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{JobError, JobResult, ServiceResult};
use crate::traits::{ImageJobApi, ImageJobRequest, JobHandle, JobStatus, PollableJob};

/// Interval and attempt budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each status call
    pub interval: Duration,
    /// Status calls before giving up
    pub max_attempts: u32,
}

impl PollPolicy {
    /// Longest a job can run before timing out: `interval * max_attempts`
    pub fn worst_case(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollPolicy {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            max_attempts: config.max_attempts,
        }
    }
}

/// Reported after every non-terminal status call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollProgress {
    /// Status call number, starting at 1
    pub attempt: u32,
    /// Attempt budget
    pub max_attempts: u32,
    /// Last reported status (pending or processing)
    pub status: JobStatus,
    /// Service-side estimate, if any
    pub server_progress: Option<u8>,
}

impl PollProgress {
    /// `attempt / max_attempts * 100`
    pub fn percent(&self) -> u8 {
        if self.max_attempts == 0 {
            return 0;
        }
        (u64::from(self.attempt) * 100 / u64::from(self.max_attempts)).min(100) as u8
    }

    /// Short status message
    pub fn message(&self) -> &'static str {
        self.status.message()
    }
}

/// Drives one job from creation to a terminal state
#[derive(Debug, Clone, Default)]
pub struct JobPoller {
    policy: PollPolicy,
}

impl JobPoller {
    /// Poller with the given budget
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    /// The budget in use
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Create a job and poll it until it completes, fails or times out
    ///
    /// Returns the result reference of the completed job. Transport errors
    /// from `create` or `poll` end the loop immediately.
    pub async fn await_completion<C, CF, P, PF, R>(
        &self,
        create: C,
        mut poll: P,
        mut on_progress: R,
    ) -> JobResult<String>
    where
        C: FnOnce() -> CF,
        CF: Future<Output = ServiceResult<JobHandle>>,
        P: FnMut(JobHandle) -> PF,
        PF: Future<Output = ServiceResult<PollableJob>>,
        R: FnMut(PollProgress),
    {
        let handle = create().await?;
        debug!(job_id = %handle.job_id, estimated_wait = ?handle.estimated_wait, "job created");

        for attempt in 1..=self.policy.max_attempts {
            tokio::time::sleep(self.policy.interval).await;
            let job = poll(handle.clone()).await?;

            if !job.status.is_terminal() {
                on_progress(PollProgress {
                    attempt,
                    max_attempts: self.policy.max_attempts,
                    status: job.status,
                    server_progress: job.progress,
                });
                continue;
            }

            if job.status == JobStatus::Failed {
                return Err(JobError::Failed {
                    job_id: handle.job_id,
                    message: job
                        .error_message
                        .unwrap_or_else(|| "Unknown error".to_string()),
                });
            }
            return match job.result_ref.filter(|r| !r.trim().is_empty()) {
                Some(result_ref) => {
                    debug!(job_id = %handle.job_id, attempt, "job completed");
                    Ok(result_ref)
                }
                None => Err(JobError::MissingResult {
                    job_id: handle.job_id,
                }),
            };
        }

        warn!(job_id = %handle.job_id, attempts = self.policy.max_attempts, "job timed out");
        Err(JobError::Timeout {
            job_id: handle.job_id,
            attempts: self.policy.max_attempts,
            waited: self.policy.worst_case(),
        })
    }

    /// Run one image job against `api` and download the result
    pub async fn generate_image<R>(
        &self,
        api: &dyn ImageJobApi,
        request: &ImageJobRequest,
        on_progress: R,
    ) -> JobResult<Vec<u8>>
    where
        R: FnMut(PollProgress),
    {
        let result_ref = self
            .await_completion(
                || api.create_job(request),
                |handle| async move { api.job_status(&handle).await },
                on_progress,
            )
            .await?;
        Ok(api.fetch_result(&result_ref).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(5),
            max_attempts,
        }
    }

    async fn create_ok() -> ServiceResult<JobHandle> {
        Ok(JobHandle::new("job-1"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_after_k_processing_polls() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut progress = Vec::new();
        let k = 3;

        let counter = calls.clone();
        let result = JobPoller::new(policy(10))
            .await_completion(
                create_ok,
                move |handle: JobHandle| {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if n <= k {
                            Ok::<_, ServiceError>(PollableJob::new(
                                handle.job_id,
                                JobStatus::Processing,
                            ))
                        } else {
                            Ok(PollableJob::completed(handle.job_id, "https://img/1.png"))
                        }
                    }
                },
                |p| progress.push(p),
            )
            .await
            .unwrap();

        assert_eq!(result, "https://img/1.png");
        assert_eq!(calls.load(Ordering::SeqCst), k + 1);
        assert_eq!(progress.len(), k as usize);
        let attempts: Vec<_> = progress.iter().map(|p| p.attempt).collect();
        assert_eq!(attempts, [1, 2, 3]);
        assert_eq!(progress[2].percent(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let started = tokio::time::Instant::now();

        let err = JobPoller::new(policy(4))
            .await_completion(
                create_ok,
                move |handle: JobHandle| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async move { Ok::<_, ServiceError>(PollableJob::new(handle.job_id, JobStatus::Pending)) }
                },
                |_| {},
            )
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(err.code(), "JOB_TIMEOUT");
        match err {
            JobError::Timeout { attempts, waited, .. } => {
                assert_eq!(attempts, 4);
                assert_eq!(waited, policy(4).worst_case());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(started.elapsed() >= policy(4).worst_case());
        assert!(started.elapsed() < Duration::from_secs(21));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = JobPoller::new(policy(10))
            .await_completion(
                create_ok,
                move |handle: JobHandle| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        Ok::<_, ServiceError>(PollableJob::failed(handle.job_id, "content policy"))
                    }
                },
                |_| {},
            )
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match err {
            JobError::Failed { message, .. } => assert_eq!(message, "content policy"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_without_result_is_missing_result() {
        let err = JobPoller::new(policy(3))
            .await_completion(
                create_ok,
                |handle: JobHandle| async move {
                    let mut job = PollableJob::completed(handle.job_id, "");
                    job.result_ref = Some("  ".into());
                    Ok::<_, ServiceError>(job)
                },
                |_| {},
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MISSING_RESULT");
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_ends_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = JobPoller::new(policy(10))
            .await_completion(
                create_ok,
                move |_handle: JobHandle| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async move { Err::<PollableJob, _>(ServiceError::transport("connection reset")) }
                },
                |_| {},
            )
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, JobError::Service(ServiceError::Transport(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_failure_skips_polling() {
        let polled = Arc::new(AtomicU32::new(0));
        let counter = polled.clone();

        let err = JobPoller::new(policy(10))
            .await_completion(
                || async { Err::<JobHandle, _>(ServiceError::api("INVALID_TOKEN", "bad token", false)) },
                move |handle: JobHandle| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async move { Ok::<_, ServiceError>(PollableJob::new(handle.job_id, JobStatus::Pending)) }
                },
                |_| {},
            )
            .await
            .unwrap_err();

        assert_eq!(polled.load(Ordering::SeqCst), 0);
        assert_eq!(err.code(), "INVALID_TOKEN");
    }

    #[test]
    fn test_percent() {
        let progress = PollProgress {
            attempt: 30,
            max_attempts: 60,
            status: JobStatus::Pending,
            server_progress: None,
        };
        assert_eq!(progress.percent(), 50);
        assert_eq!(progress.message(), "Waiting in queue...");
    }
}
