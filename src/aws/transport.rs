//! Shared HTTP transport for AWS calls.
//!
//! Owns the timeout and the retry policy. Callers hand it a closure that
//! builds (and signs) a fresh request per attempt.

use std::time::Duration;

use rand::RngExt;
use reqwest::header::HeaderMap;
use tracing::{debug, warn};

use crate::config::TransportSettings;
use crate::error::AwsError;

const BASE_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(20);

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct Transport {
    client: reqwest::Client,
    timeout: Duration,
    max_attempts: u32,
    base_backoff: Duration,
}

impl Transport {
    pub fn new(timeout: Duration, max_attempts: u32) -> Result<Self, AwsError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            timeout,
            max_attempts: max_attempts.max(1),
            base_backoff: BASE_BACKOFF,
        })
    }

    pub fn from_settings(settings: &TransportSettings) -> Result<Self, AwsError> {
        Self::new(settings.timeout(), settings.max_attempts)
    }

    /// Override the first backoff step. Later steps double from here.
    pub fn with_base_backoff(mut self, base: Duration) -> Self {
        self.base_backoff = base;
        self
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Send with retries. Connection failures, timeouts, throttling and 5xx
    /// are retried; the last attempt's result is returned as-is.
    pub async fn send<F>(&self, build: F) -> Result<HttpResponse, AwsError>
    where
        F: Fn(&reqwest::Client) -> Result<reqwest::RequestBuilder, AwsError>,
    {
        let mut attempt = 1;
        loop {
            let result = self.send_once(build(&self.client)?).await;
            let last = attempt >= self.max_attempts;

            let retry = match &result {
                Ok(resp) => !last && is_retryable_status(resp.status),
                Err(err) => !last && is_retryable_error(err),
            };
            if !retry {
                return result;
            }
            match &result {
                Ok(resp) => warn!(status = resp.status, attempt, "retryable response"),
                Err(err) => warn!(error = %err, attempt, "retryable transport error"),
            }

            let delay = self.backoff(attempt);
            debug!(?delay, attempt, "backing off before retry");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn send_once(&self, request: reqwest::RequestBuilder) -> Result<HttpResponse, AwsError> {
        let resp = request.send().await.map_err(|e| self.map_error(e))?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(|e| self.map_error(e))?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> AwsError {
        if err.is_timeout() {
            AwsError::Timeout(self.timeout)
        } else {
            AwsError::Transport(err)
        }
    }

    /// Exponential backoff with full jitter, capped.
    fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self
            .base_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .min(MAX_BACKOFF);
        let mut rng = rand::rng();
        let factor: f64 = rng.random();
        ceiling.mul_f64(factor)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &AwsError) -> bool {
    match err {
        AwsError::Timeout(_) => true,
        AwsError::Transport(e) => e.is_connect() || e.is_request() || e.is_body(),
        AwsError::MissingCredentials(_) | AwsError::InvalidRequest(_) => false,
    }
}
