//! Process-wide settings, resolved once at startup.
//!
//! Sources, lowest to highest priority: built-in defaults, a TOML file,
//! `BLOGSMITH_*` environment variables, then CLI flags (applied by the
//! binary). Every field has a default, so an absent file is not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_BUCKET, DEFAULT_KEY_PREFIX, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_GEN_LEN,
    DEFAULT_MODEL_ID, DEFAULT_REGION, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS, DEFAULT_TOP_P,
    default_config_path,
};
use crate::error::ConfigError;
use crate::logging::LoggingConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "BLOGSMITH_CONFIG";

/// Upper bound Bedrock accepts for Llama `max_gen_len`.
const MAX_GEN_LEN_LIMIT: u32 = 2048;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// AWS region used for both the generation service and the store.
    pub region: String,
    pub generation: GenerationSettings,
    pub storage: StorageSettings,
    pub transport: TransportSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Model or inference-profile identifier passed to `InvokeModel`.
    pub model_id: String,
    /// Override for the runtime endpoint, e.g. a local emulator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    pub max_gen_len: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub bucket: String,
    pub key_prefix: String,
    /// Override for the store endpoint. Switches to path-style addressing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub timeout_secs: u64,
    /// Total attempts per call, first try included.
    pub max_attempts: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            generation: GenerationSettings::default(),
            storage: StorageSettings::default(),
            transport: TransportSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            endpoint_url: None,
            max_gen_len: DEFAULT_MAX_GEN_LEN,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            endpoint_url: None,
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl TransportSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Parse settings from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Render the settings as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Read settings from a file that must exist.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolve the configuration from file and process environment.
    /// Not validated: the caller applies its own overrides first.
    ///
    /// An explicit `path` (or `BLOGSMITH_CONFIG`) must exist. The default
    /// `~/.blogsmith/config.toml` is only read when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().filter(|p| !p.is_empty()).map(PathBuf::from));

        let mut settings = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Overlay values from environment-style lookups. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(region) = get("BLOGSMITH_REGION").or_else(|| get("AWS_REGION")) {
            self.region = region;
        }
        if let Some(model_id) = get("BLOGSMITH_MODEL_ID") {
            self.generation.model_id = model_id;
        }
        if let Some(bucket) = get("BLOGSMITH_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Some(prefix) = get("BLOGSMITH_KEY_PREFIX") {
            self.storage.key_prefix = prefix;
        }
        if let Some(url) = get("BLOGSMITH_BEDROCK_ENDPOINT") {
            self.generation.endpoint_url = Some(url);
        }
        if let Some(url) = get("BLOGSMITH_S3_ENDPOINT") {
            self.storage.endpoint_url = Some(url);
        }
    }

    /// Reject settings the remote services would refuse anyway.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.region.trim().is_empty() {
            return invalid("region cannot be empty");
        }
        if self.generation.model_id.trim().is_empty() {
            return invalid("generation.model_id cannot be empty");
        }
        if self.storage.bucket.trim().is_empty() {
            return invalid("storage.bucket cannot be empty");
        }
        if !(1..=MAX_GEN_LEN_LIMIT).contains(&self.generation.max_gen_len) {
            return Err(ConfigError::Invalid(format!(
                "generation.max_gen_len must be between 1 and {MAX_GEN_LEN_LIMIT}"
            )));
        }
        if !(0.0..=1.0).contains(&self.generation.temperature) {
            return invalid("generation.temperature must be between 0 and 1");
        }
        if !(0.0..=1.0).contains(&self.generation.top_p) {
            return invalid("generation.top_p must be between 0 and 1");
        }
        if self.transport.timeout_secs == 0 {
            return invalid("transport.timeout_secs must be positive");
        }
        if self.transport.max_attempts == 0 {
            return invalid("transport.max_attempts must be at least 1");
        }
        Ok(())
    }
}
