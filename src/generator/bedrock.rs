use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::ModelInvoker;
use crate::aws::sigv4::uri_encode;
use crate::aws::{Credentials, Endpoint, SigningTarget, Transport};
use crate::error::{AwsError, GenerateError};

const SERVICE: &str = "bedrock";
const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

/// Bedrock runtime `InvokeModel` over the shared transport.
pub struct BedrockRuntime {
    transport: Arc<Transport>,
    target: SigningTarget,
}

impl BedrockRuntime {
    /// `endpoint_url` replaces `https://bedrock-runtime.{region}.amazonaws.com`.
    pub fn new(
        transport: Arc<Transport>,
        credentials: Credentials,
        region: &str,
        endpoint_url: Option<&str>,
    ) -> Result<Self, AwsError> {
        let endpoint = match endpoint_url {
            Some(url) => Endpoint::parse(url)?,
            None => Endpoint::https(format!("bedrock-runtime.{region}.amazonaws.com")),
        };
        Ok(Self {
            transport,
            target: SigningTarget {
                endpoint,
                region: region.to_string(),
                service: SERVICE,
                credentials,
            },
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.target.endpoint
    }

    /// `/model/{modelId}/invoke`, with the id encoded as one path segment.
    pub fn invoke_path(model_id: &str) -> String {
        format!("/model/{}/invoke", uri_encode(model_id, true))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Best-effort human message from a Bedrock error response.
fn error_message(error_type: Option<&str>, body: &[u8]) -> String {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
    match error_type {
        // Header looks like `ValidationException:http://internal.amazon.com/...`
        Some(kind) => {
            let kind = kind.split(':').next().unwrap_or(kind);
            format!("{kind}: {message}")
        }
        None => message,
    }
}

#[async_trait]
impl ModelInvoker for BedrockRuntime {
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, GenerateError> {
        let path = Self::invoke_path(model_id);
        let headers = [
            ("content-type", "application/json".to_string()),
            ("accept", "application/json".to_string()),
        ];

        debug!(model_id, endpoint = %self.target.endpoint.base, "invoking model");
        let resp = self
            .transport
            .send(|client| Ok(self.target.request(client, Method::POST, &path, &headers, &body)))
            .await?;

        if !resp.is_success() {
            let error_type = resp
                .headers
                .get(ERROR_TYPE_HEADER)
                .and_then(|v| v.to_str().ok());
            return Err(GenerateError::Remote {
                status: resp.status,
                message: error_message(error_type, &resp.body),
            });
        }

        Ok(resp.body)
    }
}
