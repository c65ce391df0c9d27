use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Method;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

use super::{Artifact, BlobStore, PutOutput};
use crate::aws::sigv4::uri_encode;
use crate::aws::{Credentials, Endpoint, SigningTarget, Transport};
use crate::error::{AwsError, PublishError};

const SERVICE: &str = "s3";

/// S3 `PutObject` over the shared transport.
///
/// Uses virtual-hosted addressing against AWS and path-style addressing
/// against an endpoint override (LocalStack, MinIO).
pub struct S3Store {
    transport: Arc<Transport>,
    credentials: Credentials,
    region: String,
    endpoint: Option<Endpoint>,
}

impl S3Store {
    pub fn new(
        transport: Arc<Transport>,
        credentials: Credentials,
        region: &str,
        endpoint_url: Option<&str>,
    ) -> Result<Self, AwsError> {
        let endpoint = endpoint_url.map(Endpoint::parse).transpose()?;
        Ok(Self {
            transport,
            credentials,
            region: region.to_string(),
            endpoint,
        })
    }

    /// Endpoint and request path for an object.
    pub fn locate(&self, bucket: &str, key: &str) -> (Endpoint, String) {
        let key = uri_encode(key, false);
        match &self.endpoint {
            Some(endpoint) => (endpoint.clone(), format!("/{}/{key}", uri_encode(bucket, true))),
            None => (
                Endpoint::https(format!("{bucket}.s3.{}.amazonaws.com", self.region)),
                format!("/{key}"),
            ),
        }
    }
}

/// Pull `<tag>value</tag>` out of an S3 XML error document.
fn xml_tag<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;
    Some(xml[start..end].trim())
}

/// The URL parser folds `.` and `..` segments, so a key containing them
/// would be sent to a different path than the one signed.
fn check_wire_path(endpoint: &Endpoint, path: &str) -> Result<(), PublishError> {
    let url = reqwest::Url::parse(&format!("{}{path}", endpoint.base))
        .map_err(|e| PublishError::Unexpected(format!("bad object url: {e}")))?;
    if url.path() != path {
        return Err(PublishError::Client {
            status: 400,
            code: "InvalidKey".to_string(),
            message: format!("key resolves to a different path: {path:?}"),
        });
    }
    Ok(())
}

fn client_error(status: u16, body: &str) -> PublishError {
    PublishError::Client {
        status,
        code: xml_tag(body, "Code").unwrap_or("Unknown").to_string(),
        message: xml_tag(body, "Message").unwrap_or(body.trim()).to_string(),
    }
}

#[async_trait]
impl BlobStore for S3Store {
    async fn put_object(&self, artifact: &Artifact) -> Result<PutOutput, PublishError> {
        let (endpoint, path) = self.locate(&artifact.bucket, &artifact.key);
        check_wire_path(&endpoint, &path)?;
        let target = SigningTarget {
            endpoint,
            region: self.region.clone(),
            service: SERVICE,
            credentials: self.credentials.clone(),
        };
        let headers = [
            ("content-type", artifact.content_type.clone()),
            ("x-amz-checksum-sha256", STANDARD.encode(Sha256::digest(&artifact.body))),
        ];

        debug!(bucket = %artifact.bucket, key = %artifact.key, "putting object");
        let resp = self
            .transport
            .send(|client| Ok(target.request(client, Method::PUT, &path, &headers, &artifact.body)))
            .await?;

        if resp.status >= 400 {
            return Err(client_error(resp.status, &resp.text()));
        }
        Ok(PutOutput {
            status: resp.status,
        })
    }
}
