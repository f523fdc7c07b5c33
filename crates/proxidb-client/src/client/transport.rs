//! Shared call layer for the admin and data clients.
//!
//! One transport per client instance: it owns the channel, the closed flag,
//! the retry policy from the service-config document, and the pre-encoded
//! authorization metadata. Both client flavors and both service stubs funnel
//! every RPC through [`Transport::invoke`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use base64::engine::general_purpose;
use base64::Engine;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::Channel;
use tonic::Request;

use crate::channel::build_channel;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::retry::RetryPolicy;

#[derive(Debug)]
pub(crate) struct Transport {
    channel: Channel,
    closed: AtomicBool,
    retry: Option<RetryPolicy>,
    default_timeout: Option<Duration>,
    auth: Option<AsciiMetadataValue>,
}

impl Transport {
    pub(crate) async fn connect(config: &ClientConfig) -> Result<Self> {
        // Configuration problems (TLS material, service config) surface here,
        // before any RPC is attempted.
        let retry = match &config.service_config_path {
            Some(path) => RetryPolicy::load(path)?,
            None => None,
        };
        let channel = build_channel(config).await?;
        let auth = match &config.credentials {
            Some(credentials) => {
                let token = general_purpose::STANDARD
                    .encode(format!("{}:{}", credentials.username, credentials.password));
                let value = AsciiMetadataValue::try_from(format!("Basic {}", token))
                    .map_err(|e| {
                        ClientError::Configuration(format!("invalid credentials: {}", e))
                    })?;
                Some(value)
            }
            None => None,
        };
        Ok(Self {
            channel,
            closed: AtomicBool::new(false),
            retry,
            default_timeout: config.default_timeout,
            auth,
        })
    }

    pub(crate) fn channel(&self) -> Channel {
        self.channel.clone()
    }

    /// Mark the client closed. Safe to call repeatedly and concurrently.
    pub(crate) fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            log::info!("client closed");
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(ClientError::Closed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn effective_timeout(&self, timeout: Option<Duration>) -> Option<Duration> {
        timeout.or(self.default_timeout)
    }

    /// Wrap a message into a request carrying the auth metadata and the
    /// per-call gRPC deadline.
    pub(crate) fn prepare<T>(&self, message: T, timeout: Option<Duration>) -> Request<T> {
        let mut request = Request::new(message);
        if let Some(auth) = &self.auth {
            request.metadata_mut().insert("authorization", auth.clone());
        }
        if let Some(timeout) = self.effective_timeout(timeout) {
            request.set_timeout(timeout);
        }
        request
    }

    /// Run one RPC: closed-flag guard, then the attempt (with retries when a
    /// policy is configured), all bounded by the per-call deadline.
    ///
    /// The deadline is enforced locally as well as sent to the server, so a
    /// dead peer cannot hang the caller.
    pub(crate) async fn invoke<T, F, Fut>(&self, timeout: Option<Duration>, attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<tonic::Response<T>, tonic::Status>>,
    {
        self.ensure_open()?;
        match self.effective_timeout(timeout) {
            Some(deadline) => tokio::time::timeout(deadline, self.run_attempts(attempt))
                .await
                .unwrap_or_else(|_| {
                    Err(ClientError::Server(tonic::Status::deadline_exceeded(
                        "deadline exceeded before the call completed",
                    )))
                }),
            None => self.run_attempts(attempt).await,
        }
    }

    async fn run_attempts<T, F, Fut>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<tonic::Response<T>, tonic::Status>>,
    {
        let policy = match &self.retry {
            Some(policy) => policy,
            None => return Ok(attempt().await?.into_inner()),
        };

        let mut attempts = 1u32;
        let mut backoff = policy.initial_backoff;
        loop {
            match attempt().await {
                Ok(response) => return Ok(response.into_inner()),
                Err(status)
                    if attempts < policy.max_attempts && policy.is_retryable(status.code()) =>
                {
                    log::warn!(
                        "attempt {}/{} failed with {:?}, retrying in {:?}",
                        attempts,
                        policy.max_attempts,
                        status.code(),
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = policy.next_backoff(backoff);
                    attempts += 1;
                }
                Err(status) => return Err(status.into()),
            }
        }
    }
}
