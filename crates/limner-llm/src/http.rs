//! Shared request plumbing for the service clients

use limner_core::{ServiceError, ServiceResult};
use reqwest::{header::RETRY_AFTER, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Structured error body: `{"error": {"code", "message", "retryable", "retryAfter"}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(default)]
    retryable: Option<bool>,
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Map a reqwest failure to a transport error
pub(crate) fn transport(service: &str, err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::transport(format!("{} request timed out", service))
    } else {
        ServiceError::transport(format!("{} request failed: {}", service, err))
    }
}

/// Pass successful responses through; turn the rest into `ServiceError::Api`
pub(crate) async fn check_status(service: &str, response: Response) -> ServiceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let header_wait = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    debug!(service, %status, body = %text, "service returned an error");

    Err(response_error(service, status, &text, header_wait))
}

/// Build the error for a non-success status and its body
pub(crate) fn response_error(
    service: &str,
    status: StatusCode,
    body: &str,
    header_wait: Option<u64>,
) -> ServiceError {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let ErrorBody {
            code,
            message,
            retryable,
            retry_after,
        } = envelope.error;
        return ServiceError::Api {
            retryable: retryable.unwrap_or_else(|| status_is_retryable(status)),
            retry_after: retry_after.or(header_wait),
            code,
            message,
        };
    }

    ServiceError::Api {
        code: status_code_name(status).to_string(),
        message: format!("{} API error ({}): {}", service, status, body.trim()),
        retryable: status_is_retryable(status),
        retry_after: header_wait,
    }
}

fn status_code_name(status: StatusCode) -> &'static str {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "UNAUTHORIZED",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::TOO_MANY_REQUESTS => "RATE_LIMITED",
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => "INVALID_REQUEST",
        s if s.is_server_error() => "SERVER_ERROR",
        _ => "HTTP_ERROR",
    }
}

fn status_is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Decode a JSON body
pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &str,
    response: Response,
) -> ServiceResult<T> {
    response.json::<T>().await.map_err(|e| {
        ServiceError::invalid_response(format!("Failed to parse {} response: {}", service, e))
    })
}

/// Download raw bytes from a result URL
pub(crate) async fn download(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> ServiceResult<Vec<u8>> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| transport("Image download", e))?;
    let response = check_status("Image download", response).await?;

    let bytes = response
        .bytes()
        .await
        .map_err(|e| transport("Image download", e))?;
    if bytes.is_empty() {
        return Err(ServiceError::invalid_response("Downloaded image is empty"));
    }
    Ok(bytes.to_vec())
}

/// Clamp a service progress value into 0-100
pub(crate) fn clamp_progress(progress: Option<f64>) -> Option<u8> {
    progress
        .filter(|p| p.is_finite())
        .map(|p| p.clamp(0.0, 100.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_error_body() {
        let body = r#"{"error":{"code":"RATE_LIMITED","message":"slow down","retryable":true,"retryAfter":30}}"#;
        let err = response_error("Proxy", StatusCode::TOO_MANY_REQUESTS, body, None);
        match err {
            ServiceError::Api {
                code,
                message,
                retryable,
                retry_after,
            } => {
                assert_eq!(code, "RATE_LIMITED");
                assert_eq!(message, "slow down");
                assert!(retryable);
                assert_eq!(retry_after, Some(30));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_plain_error_body_uses_status() {
        let err = response_error("kie.ai", StatusCode::BAD_GATEWAY, "upstream down", Some(5));
        assert_eq!(err.code(), "SERVER_ERROR");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("kie.ai API error (502 Bad Gateway): upstream down"));

        let err = response_error("kie.ai", StatusCode::UNAUTHORIZED, "", None);
        assert_eq!(err.code(), "UNAUTHORIZED");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_defaults_from_status() {
        let body = r#"{"error":{"code":"INTERNAL","message":"boom"}}"#;
        let err = response_error("Proxy", StatusCode::INTERNAL_SERVER_ERROR, body, Some(7));
        assert!(err.is_retryable());
        assert!(matches!(err, ServiceError::Api { retry_after: Some(7), .. }));
    }

    #[test]
    fn test_clamp_progress() {
        assert_eq!(clamp_progress(None), None);
        assert_eq!(clamp_progress(Some(42.4)), Some(42));
        assert_eq!(clamp_progress(Some(250.0)), Some(100));
        assert_eq!(clamp_progress(Some(-3.0)), Some(0));
        assert_eq!(clamp_progress(Some(f64::NAN)), None);
    }
}
