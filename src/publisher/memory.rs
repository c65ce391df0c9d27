use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

use super::{Artifact, BlobStore, PutOutput, SUCCESS_STATUS};
use crate::error::PublishError;

/// How a [`MemoryStore`] answers writes.
#[derive(Debug, Clone)]
pub enum Behavior {
    Status(u16),
    ClientError {
        status: u16,
        code: String,
        message: String,
    },
    Unexpected(String),
}

/// An in-memory store that records every write attempt.
pub struct MemoryStore {
    behavior: Behavior,
    writes: Mutex<Vec<Artifact>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Accepts every write with the success status.
    pub fn new() -> Self {
        Self::with_behavior(Behavior::Status(SUCCESS_STATUS))
    }

    pub fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Every artifact `put_object` was called with, in order.
    pub fn writes(&self) -> Vec<Artifact> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn put_object(&self, artifact: &Artifact) -> Result<PutOutput, PublishError> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).push(artifact.clone());
        match &self.behavior {
            Behavior::Status(status) => Ok(PutOutput { status: *status }),
            Behavior::ClientError {
                status,
                code,
                message,
            } => Err(PublishError::Client {
                status: *status,
                code: code.clone(),
                message: message.clone(),
            }),
            Behavior::Unexpected(msg) => Err(PublishError::Unexpected(msg.clone())),
        }
    }
}
