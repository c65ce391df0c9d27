//! Project-wide constants.

use std::path::PathBuf;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Default AWS region for both Bedrock and S3.
pub const DEFAULT_REGION: &str = "us-east-2";

/// Default Bedrock model / inference-profile identifier.
pub const DEFAULT_MODEL_ID: &str = "us.meta.llama3-2-1b-instruct-v1:0";

/// Default destination bucket.
pub const DEFAULT_BUCKET: &str = "aws-bedrock-content-generation";

/// Logical prefix every artifact key lives under.
pub const DEFAULT_KEY_PREFIX: &str = "blog-output";

pub const DEFAULT_MAX_GEN_LEN: u32 = 512;
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
pub const DEFAULT_TOP_P: f32 = 0.9;

/// Read timeout for remote calls, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Total transport attempts per remote call (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Content type for stored artifacts.
pub const CONTENT_TYPE: &str = "text/plain";

/// Status code the handler always answers with.
pub const ACK_STATUS: u16 = 200;

/// Acknowledgment message, JSON-encoded into the response body.
pub const ACK_MESSAGE: &str = "Blog Generated";

/// Default config file: `~/.blogsmith/config.toml`.
/// `None` when the home directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".blogsmith").join("config.toml"))
}
