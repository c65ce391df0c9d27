//! Minimal AWS plumbing: credentials, SigV4 signing and a retrying transport.

pub mod credentials;
pub mod sigv4;
pub mod transport;

pub use credentials::Credentials;
pub use transport::{HttpResponse, Transport};

use chrono::Utc;
use reqwest::Url;

use crate::error::AwsError;

/// A resolved service endpoint: where to connect and what to sign as `host`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Scheme + authority, no trailing slash.
    pub base: String,
    pub host: String,
}

impl Endpoint {
    /// Parse an endpoint override such as `http://localhost:4566`.
    pub fn parse(url: &str) -> Result<Self, AwsError> {
        let parsed =
            Url::parse(url).map_err(|e| AwsError::InvalidRequest(format!("bad endpoint {url:?}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| AwsError::InvalidRequest(format!("endpoint {url:?} has no host")))?;
        let host = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Self {
            base: format!("{}://{}", parsed.scheme(), host),
            host,
        })
    }

    /// Standard HTTPS endpoint for a host name.
    pub fn https(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            base: format!("https://{host}"),
            host,
        }
    }
}

/// Everything needed to sign requests for one service.
#[derive(Debug, Clone)]
pub struct SigningTarget {
    pub endpoint: Endpoint,
    pub region: String,
    pub service: &'static str,
    pub credentials: Credentials,
}

impl SigningTarget {
    /// Sign and build a request for `path` (already percent-encoded).
    pub fn request(
        &self,
        client: &reqwest::Client,
        method: reqwest::Method,
        path: &str,
        headers: &[(&str, String)],
        body: &[u8],
    ) -> reqwest::RequestBuilder {
        let payload_hash = sigv4::sha256_hex(body);
        let mut all_headers: Vec<(&str, String)> = headers.to_vec();
        all_headers.push(("x-amz-content-sha256", payload_hash.clone()));

        let signed = sigv4::sign(
            &sigv4::SignableRequest {
                method: method.as_str(),
                host: &self.endpoint.host,
                path,
                query: "",
                headers: &all_headers,
                payload_hash: &payload_hash,
            },
            &sigv4::SigningParams {
                credentials: &self.credentials,
                region: &self.region,
                service: self.service,
                time: Utc::now(),
            },
        );

        let mut request = client
            .request(method, format!("{}{}", self.endpoint.base, path))
            .body(body.to_vec());
        for (name, value) in all_headers {
            request = request.header(name, value);
        }
        for (name, value) in signed {
            request = request.header(name, value);
        }
        request
    }
}
