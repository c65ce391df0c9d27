//! The request-to-artifact pipeline and its inbound/outbound shapes.
//!
//! The external contract always acknowledges: generation and publish
//! failures only show up in logs and in [`PipelineOutcome`]. A malformed
//! inbound request is the one failure returned to the caller.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::aws::{Credentials, Transport};
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::consts::{ACK_MESSAGE, ACK_STATUS};
use crate::error::{AwsError, HandlerError};
use crate::generator::Generator;
use crate::generator::bedrock::BedrockRuntime;
use crate::publisher::fs::FsStore;
use crate::publisher::s3::S3Store;
use crate::publisher::{BlobStore, PublishOutcome, Publisher};

/// An API-gateway style invocation. Only `body` is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationEvent {
    /// JSON text (the usual proxy shape) or an inline JSON object.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl InvocationEvent {
    /// Wrap a topic the way an HTTP caller would send it.
    pub fn for_topic(topic: &str) -> Self {
        let body = serde_json::json!({ "blog_topic": topic }).to_string();
        Self {
            body: Some(serde_json::Value::String(body)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogRequest {
    pub blog_topic: String,
}

impl BlogRequest {
    pub fn from_event(event: &InvocationEvent) -> Result<Self, HandlerError> {
        let parsed = match &event.body {
            None | Some(serde_json::Value::Null) => {
                return Err(HandlerError::MalformedRequest(
                    "request has no body".to_string(),
                ));
            }
            Some(serde_json::Value::String(text)) => serde_json::from_str::<BlogRequest>(text),
            Some(value) => serde_json::from_value::<BlogRequest>(value.clone()),
        };
        let request = parsed.map_err(|e| HandlerError::MalformedRequest(e.to_string()))?;

        if request.blog_topic.is_empty() {
            return Err(HandlerError::MalformedRequest(
                "blog_topic cannot be empty".to_string(),
            ));
        }
        Ok(request)
    }
}

/// What the caller gets back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON-encoded payload.
    pub body: String,
}

impl Response {
    /// The fixed acknowledgment, sent whatever happened downstream.
    pub fn acknowledged() -> Self {
        Self {
            status_code: ACK_STATUS,
            body: serde_json::Value::from(ACK_MESSAGE).to_string(),
        }
    }
}

/// What one pipeline run actually did.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Generation produced no text, so nothing was written.
    NotGenerated,
    Published(PublishOutcome),
}

pub struct Pipeline {
    generator: Generator,
    publisher: Publisher,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(generator: Generator, publisher: Publisher, clock: Arc<dyn Clock>) -> Self {
        Self {
            generator,
            publisher,
            clock,
        }
    }

    /// Wire the real clients from settings. With `out_dir`, artifacts go to
    /// that directory instead of S3.
    pub fn from_settings(
        settings: &Settings,
        credentials: Credentials,
        out_dir: Option<&Path>,
    ) -> Result<Self, AwsError> {
        let transport = Arc::new(Transport::from_settings(&settings.transport)?);

        let runtime = BedrockRuntime::new(
            Arc::clone(&transport),
            credentials.clone(),
            &settings.region,
            settings.generation.endpoint_url.as_deref(),
        )?;
        let generator = Generator::from_settings(Arc::new(runtime), &settings.generation);

        let store: Arc<dyn BlobStore> = match out_dir {
            Some(dir) => Arc::new(FsStore::new(dir)),
            None => Arc::new(S3Store::new(
                transport,
                credentials,
                &settings.region,
                settings.storage.endpoint_url.as_deref(),
            )?),
        };
        let publisher = Publisher::from_settings(store, &settings.storage);

        Ok(Self::new(generator, publisher, Arc::new(SystemClock)))
    }

    /// Generate for `topic`; store the text iff there is any.
    pub async fn run(&self, topic: &str) -> PipelineOutcome {
        let text = self.generator.produce(topic).await;
        if text.is_empty() {
            warn!(topic, "blog was not generated");
            return PipelineOutcome::NotGenerated;
        }

        let timestamp = self.clock.timestamp();
        PipelineOutcome::Published(self.publisher.publish(topic, &timestamp, &text).await)
    }

    /// Handle one invocation. Always acknowledges a well-formed request.
    pub async fn handle(&self, event: &InvocationEvent) -> Result<Response, HandlerError> {
        let request = BlogRequest::from_event(event)?;
        info!(topic = %request.blog_topic, "handling blog request");

        let outcome = self.run(&request.blog_topic).await;
        info!(?outcome, "pipeline finished");

        Ok(Response::acknowledged())
    }

    /// Handle a raw JSON invocation event.
    pub async fn handle_json(&self, raw: &str) -> Result<Response, HandlerError> {
        let event: InvocationEvent = serde_json::from_str(raw)
            .map_err(|e| HandlerError::MalformedRequest(format!("invalid event: {e}")))?;
        self.handle(&event).await
    }
}
