//! Retry policy sourced from a gRPC service-config document.
//!
//! The document is the standard service-config JSON shape; only the
//! `retryPolicy` of the first method config carrying one is honored. Without
//! a document the client never retries.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tonic::Code;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    pub retryable_status_codes: Vec<Code>,
}

#[derive(Deserialize)]
struct ServiceConfig {
    #[serde(rename = "methodConfig", default)]
    method_config: Vec<MethodConfig>,
}

#[derive(Deserialize)]
struct MethodConfig {
    #[serde(rename = "retryPolicy")]
    retry_policy: Option<RawRetryPolicy>,
}

#[derive(Deserialize)]
struct RawRetryPolicy {
    #[serde(rename = "maxAttempts")]
    max_attempts: u32,
    #[serde(rename = "initialBackoff")]
    initial_backoff: String,
    #[serde(rename = "maxBackoff")]
    max_backoff: String,
    #[serde(rename = "backoffMultiplier")]
    backoff_multiplier: f64,
    #[serde(rename = "retryableStatusCodes")]
    retryable_status_codes: Vec<String>,
}

impl RetryPolicy {
    /// Read and parse a service-config document. Returns `Ok(None)` when the
    /// document carries no retry policy.
    pub(crate) fn load(path: &Path) -> Result<Option<Self>> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Configuration(format!(
                "failed to read service config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    pub(crate) fn from_json(doc: &str) -> Result<Option<Self>> {
        let config: ServiceConfig = serde_json::from_str(doc)
            .map_err(|e| ClientError::Configuration(format!("malformed service config: {}", e)))?;

        let raw = match config
            .method_config
            .into_iter()
            .find_map(|mc| mc.retry_policy)
        {
            Some(raw) => raw,
            None => return Ok(None),
        };

        if raw.max_attempts < 2 {
            return Err(ClientError::Configuration(
                "retry policy maxAttempts must be at least 2".to_string(),
            ));
        }
        if raw.backoff_multiplier <= 0.0 {
            return Err(ClientError::Configuration(
                "retry policy backoffMultiplier must be positive".to_string(),
            ));
        }
        if raw.retryable_status_codes.is_empty() {
            return Err(ClientError::Configuration(
                "retry policy has no retryableStatusCodes".to_string(),
            ));
        }

        Ok(Some(Self {
            max_attempts: raw.max_attempts,
            initial_backoff: parse_seconds(&raw.initial_backoff)?,
            max_backoff: parse_seconds(&raw.max_backoff)?,
            backoff_multiplier: raw.backoff_multiplier,
            retryable_status_codes: raw
                .retryable_status_codes
                .iter()
                .map(|name| parse_code(name))
                .collect::<Result<Vec<_>>>()?,
        }))
    }

    pub fn is_retryable(&self, code: Code) -> bool {
        self.retryable_status_codes.contains(&code)
    }

    /// The backoff to sleep after the one just slept.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        current.mul_f64(self.backoff_multiplier).min(self.max_backoff)
    }
}

/// Durations in service configs are decimal seconds with an `s` suffix.
fn parse_seconds(value: &str) -> Result<Duration> {
    let digits = value.strip_suffix('s').ok_or_else(|| {
        ClientError::Configuration(format!("backoff '{}' is missing the 's' suffix", value))
    })?;
    let seconds: f64 = digits.parse().map_err(|_| {
        ClientError::Configuration(format!("backoff '{}' is not a number of seconds", value))
    })?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ClientError::Configuration(format!(
            "backoff '{}' is out of range",
            value
        )));
    }
    Ok(Duration::from_secs_f64(seconds))
}

fn parse_code(name: &str) -> Result<Code> {
    Ok(match name {
        "CANCELLED" => Code::Cancelled,
        "UNKNOWN" => Code::Unknown,
        "INVALID_ARGUMENT" => Code::InvalidArgument,
        "DEADLINE_EXCEEDED" => Code::DeadlineExceeded,
        "NOT_FOUND" => Code::NotFound,
        "ALREADY_EXISTS" => Code::AlreadyExists,
        "PERMISSION_DENIED" => Code::PermissionDenied,
        "RESOURCE_EXHAUSTED" => Code::ResourceExhausted,
        "FAILED_PRECONDITION" => Code::FailedPrecondition,
        "ABORTED" => Code::Aborted,
        "OUT_OF_RANGE" => Code::OutOfRange,
        "UNIMPLEMENTED" => Code::Unimplemented,
        "INTERNAL" => Code::Internal,
        "UNAVAILABLE" => Code::Unavailable,
        "DATA_LOSS" => Code::DataLoss,
        "UNAUTHENTICATED" => Code::Unauthenticated,
        other => {
            return Err(ClientError::Configuration(format!(
                "unknown status code '{}' in retry policy",
                other
            )))
        }
    })
}
