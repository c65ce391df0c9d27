pub mod bedrock;
pub mod mock;
pub mod prompt;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::GenerationSettings;
use crate::error::GenerateError;

/// Field of the model response that carries the generated text.
pub const GENERATION_FIELD: &str = "generation";

/// The remote text-generation service. Could be Bedrock, a local stub, or a test script.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Send a JSON request body to `model_id`, return the raw response body.
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, GenerateError>;
}

/// Fixed sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParams {
    pub max_gen_len: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl From<&GenerationSettings> for GenerationParams {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            max_gen_len: settings.max_gen_len,
            temperature: settings.temperature,
            top_p: settings.top_p,
        }
    }
}

#[derive(Serialize)]
struct InvokeBody<'a> {
    prompt: &'a str,
    #[serde(flatten)]
    params: GenerationParams,
}

/// Turns a topic into blog text via a [`ModelInvoker`].
pub struct Generator {
    invoker: Arc<dyn ModelInvoker>,
    model_id: String,
    params: GenerationParams,
}

impl Generator {
    pub fn new(invoker: Arc<dyn ModelInvoker>, model_id: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            invoker,
            model_id: model_id.into(),
            params,
        }
    }

    pub fn from_settings(invoker: Arc<dyn ModelInvoker>, settings: &GenerationSettings) -> Self {
        Self::new(invoker, settings.model_id.clone(), settings.into())
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// JSON body for the generation request.
    pub fn request_body(&self, topic: &str) -> Result<Vec<u8>, GenerateError> {
        let prompt = prompt::build_blog_prompt(topic);
        Ok(serde_json::to_vec(&InvokeBody {
            prompt: &prompt,
            params: self.params,
        })?)
    }

    /// Generate text for `topic`, keeping the failure reason.
    /// A present-but-empty generation is `Ok("")`.
    pub async fn generate(&self, topic: &str) -> Result<String, GenerateError> {
        let body = self.request_body(topic)?;
        let raw = self.invoker.invoke(&self.model_id, body).await?;
        parse_generation(&raw)
    }

    /// Generate text for `topic`. Every failure is logged and becomes `""`.
    pub async fn produce(&self, topic: &str) -> String {
        match self.generate(topic).await {
            Ok(text) => text,
            Err(e) => {
                error!(topic, model_id = %self.model_id, error = %e, "error generating the blog");
                String::new()
            }
        }
    }
}

/// Pull the generated text out of a raw response body.
pub fn parse_generation(raw: &[u8]) -> Result<String, GenerateError> {
    let response: serde_json::Value = serde_json::from_slice(raw)?;
    debug!(response = %response, "generation response");

    let text = response
        .get(GENERATION_FIELD)
        .and_then(|v| v.as_str())
        .ok_or(GenerateError::MissingField(GENERATION_FIELD))?;

    let count = |field: &str| response.get(field).and_then(|v| v.as_u64());
    info!(
        prompt_tokens = count("prompt_token_count"),
        generation_tokens = count("generation_token_count"),
        stop_reason = response.get("stop_reason").and_then(|v| v.as_str()),
        "generation complete"
    );

    Ok(text.to_string())
}
