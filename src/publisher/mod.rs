//! Persisting generated text as an object in a blob store.
//!
//! [`Publisher`] derives the artifact, performs a single write through a
//! [`BlobStore`] and classifies what happened. Nothing is retried here and
//! nothing propagates past [`Publisher::store`].

pub mod fs;
pub mod memory;
pub mod s3;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::StorageSettings;
use crate::consts::CONTENT_TYPE;
use crate::error::PublishError;

/// Status a successful write reports.
pub const SUCCESS_STATUS: u16 = 200;

/// Text plus everything needed to store it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
}

impl Artifact {
    /// Build a `text/plain` artifact. `None` for empty text: empty artifacts
    /// are never written.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        Some(Self {
            bucket: bucket.into(),
            key: key.into(),
            body: text.as_bytes().to_vec(),
            content_type: CONTENT_TYPE.to_string(),
        })
    }

    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// `{prefix}/{topic}_{timestamp}.txt`. The topic is used verbatim.
pub fn object_key(prefix: &str, topic: &str, timestamp: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("{topic}_{timestamp}.txt")
    } else {
        format!("{prefix}/{topic}_{timestamp}.txt")
    }
}

/// What the store said about a write that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOutput {
    pub status: u16,
}

/// Where artifacts go. Could be S3, a local directory, or memory.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_object(&self, artifact: &Artifact) -> Result<PutOutput, PublishError>;
}

/// How a publish attempt ended.
#[derive(Debug)]
pub enum PublishOutcome {
    Stored { uri: String },
    /// The store answered without an error, but not with the success status.
    UnexpectedStatus { uri: String, status: u16 },
    Failed { uri: String, error: PublishError },
    /// Nothing to write.
    Skipped,
}

impl PublishOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, PublishOutcome::Stored { .. })
    }
}

pub struct Publisher {
    store: Arc<dyn BlobStore>,
    bucket: String,
    key_prefix: String,
}

impl Publisher {
    pub fn new(store: Arc<dyn BlobStore>, bucket: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            key_prefix: key_prefix.into(),
        }
    }

    pub fn from_settings(store: Arc<dyn BlobStore>, settings: &StorageSettings) -> Self {
        Self::new(store, settings.bucket.clone(), settings.key_prefix.clone())
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The key `text` for `topic` at `timestamp` would be stored under.
    pub fn key_for(&self, topic: &str, timestamp: &str) -> String {
        object_key(&self.key_prefix, topic, timestamp)
    }

    /// Write `text` once and report the outcome. Every outcome is logged.
    pub async fn publish(&self, topic: &str, timestamp: &str, text: &str) -> PublishOutcome {
        let Some(artifact) = Artifact::new(&self.bucket, self.key_for(topic, timestamp), text) else {
            warn!(topic, "refusing to store an empty artifact");
            return PublishOutcome::Skipped;
        };
        let uri = artifact.uri();

        match self.store.put_object(&artifact).await {
            Ok(PutOutput { status }) if status == SUCCESS_STATUS => {
                info!(%uri, bytes = artifact.body.len(), "text content uploaded successfully");
                PublishOutcome::Stored { uri }
            }
            Ok(PutOutput { status }) => {
                warn!(%uri, status, "failed to upload text content");
                PublishOutcome::UnexpectedStatus { uri, status }
            }
            Err(error @ PublishError::Client { .. }) => {
                error!(%uri, %error, "store client error occurred");
                PublishOutcome::Failed { uri, error }
            }
            Err(error) => {
                error!(%uri, %error, "unexpected error occurred while storing");
                PublishOutcome::Failed { uri, error }
            }
        }
    }

    /// Fire-and-forget form of [`publish`](Self::publish).
    pub async fn store(&self, topic: &str, timestamp: &str, text: &str) {
        let _ = self.publish(topic, timestamp, text).await;
    }
}
