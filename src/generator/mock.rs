use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::ModelInvoker;
use crate::error::{AwsError, GenerateError};

/// One scripted answer from [`MockInvoker`].
#[derive(Debug, Clone)]
pub enum Reply {
    /// A well-formed response carrying this text.
    Text(String),
    /// An arbitrary JSON response.
    Json(serde_json::Value),
    /// A raw, possibly unparseable body.
    Raw(String),
    /// The service answered with an error status.
    Remote { status: u16, message: String },
    /// The call timed out.
    Timeout,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

/// A scripted invoker for tests. Returns pre-defined replies in order and
/// records every request.
pub struct MockInvoker {
    replies: Vec<Reply>,
    index: AtomicUsize,
    requests: Mutex<Vec<(String, serde_json::Value)>>,
}

impl MockInvoker {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            index: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// How many times `invoke` was called.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `(model_id, parsed body)` for each call, in order.
    pub fn requests(&self) -> Vec<(String, serde_json::Value)> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl ModelInvoker for MockInvoker {
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, GenerateError> {
        let parsed = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((model_id.to_string(), parsed));

        let i = self.index.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.get(i).ok_or_else(|| GenerateError::Remote {
            status: 500,
            message: format!("MockInvoker: no more replies (called {} times)", i + 1),
        })?;

        match reply {
            Reply::Text(text) => Ok(serde_json::to_vec(&serde_json::json!({
                "generation": text,
                "prompt_token_count": 20,
                "generation_token_count": 200,
                "stop_reason": "stop",
            }))?),
            Reply::Json(value) => Ok(serde_json::to_vec(value)?),
            Reply::Raw(raw) => Ok(raw.as_bytes().to_vec()),
            Reply::Remote { status, message } => Err(GenerateError::Remote {
                status: *status,
                message: message.clone(),
            }),
            Reply::Timeout => Err(AwsError::Timeout(Duration::from_secs(300)).into()),
        }
    }
}
