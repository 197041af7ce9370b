//! Configuration structures

use crate::{
    AspectRatio, ConfigError, ConfigResult, ConnectionMode, ImageResolution, ImageStyle,
    Language, OutputFormat,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default proxy endpoint
pub const DEFAULT_PROXY_URL: &str = "https://gemini-image-proxy.your-domain.workers.dev";
/// Default Gemini API base
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default planning model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
/// Default kie.ai API base
pub const DEFAULT_KIE_ENDPOINT: &str = "https://api.kie.ai/api/v1";
/// Default HTTP timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Upper bound for images per note
pub const MAX_IMAGE_COUNT: u32 = 8;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimnerConfig {
    /// Service endpoints and credentials
    pub connection: ConnectionConfig,
    /// What to generate
    pub generation: GenerationConfig,
    /// Where generated files and backups go
    pub storage: StorageConfig,
    /// Job polling budget
    pub polling: PollingConfig,
}

impl LimnerConfig {
    /// Check that the configuration is usable for the selected connection mode
    pub fn validate(&self) -> ConfigResult<()> {
        self.connection.validate()?;
        self.generation.validate()?;
        self.polling.validate()?;
        if self.storage.attachment_folder.trim().is_empty() {
            return Err(ConfigError::invalid("storage.attachment_folder is empty"));
        }
        Ok(())
    }
}

/// How to reach the planning and image services
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    /// Direct (user keys) or proxy (bearer token)
    #[serde(default)]
    pub mode: ConnectionMode,
    /// Proxy base URL
    pub proxy_url: Option<String>,
    /// Proxy bearer token
    pub proxy_token: Option<String>,
    /// Gemini API key for planning in direct mode
    pub gemini_api_key: Option<String>,
    /// Gemini model name
    pub gemini_model: Option<String>,
    /// Gemini API base URL
    pub gemini_endpoint: Option<String>,
    /// kie.ai API key for images in direct mode
    pub kie_api_key: Option<String>,
    /// kie.ai API base URL
    pub kie_endpoint: Option<String>,
    /// HTTP timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::Direct,
            proxy_url: None,
            proxy_token: None,
            gemini_api_key: None,
            gemini_model: None,
            gemini_endpoint: None,
            kie_api_key: None,
            kie_endpoint: None,
            timeout_secs: None,
        }
    }
}

impl ConnectionConfig {
    /// Proxy base URL without a trailing slash
    pub fn proxy_url(&self) -> String {
        trim_base(self.proxy_url.as_deref().unwrap_or(DEFAULT_PROXY_URL))
    }

    /// Gemini API base URL without a trailing slash
    pub fn gemini_endpoint(&self) -> String {
        trim_base(
            self.gemini_endpoint
                .as_deref()
                .unwrap_or(DEFAULT_GEMINI_ENDPOINT),
        )
    }

    /// Gemini model, using default if not specified
    pub fn gemini_model(&self) -> String {
        self.gemini_model
            .clone()
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string())
    }

    /// kie.ai API base URL without a trailing slash
    pub fn kie_endpoint(&self) -> String {
        trim_base(self.kie_endpoint.as_deref().unwrap_or(DEFAULT_KIE_ENDPOINT))
    }

    /// HTTP timeout, using default if not specified
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    fn validate(&self) -> ConfigResult<()> {
        match self.mode {
            ConnectionMode::Proxy => {
                if is_blank(&self.proxy_token) {
                    return Err(ConfigError::MissingCredential("proxy_token", "proxy"));
                }
            }
            ConnectionMode::Direct => {
                if is_blank(&self.gemini_api_key) {
                    return Err(ConfigError::MissingCredential("gemini_api_key", "direct"));
                }
                if is_blank(&self.kie_api_key) {
                    return Err(ConfigError::MissingCredential("kie_api_key", "direct"));
                }
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::invalid("connection.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Generation settings sent to the planner and image service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Number of images to plan per note
    pub image_count: u32,
    /// Visual style preset
    pub style: ImageStyle,
    /// Output aspect ratio
    pub aspect_ratio: AspectRatio,
    /// Output resolution tier
    pub resolution: ImageResolution,
    /// Encoded image format
    pub output_format: OutputFormat,
    /// Language for titles and captions
    pub language: Language,
    /// Character budget for the note excerpt sent to the planner
    pub max_characters: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            image_count: 4,
            style: ImageStyle::default(),
            aspect_ratio: AspectRatio::default(),
            resolution: ImageResolution::default(),
            output_format: OutputFormat::default(),
            language: Language::default(),
            max_characters: 30_000,
        }
    }
}

impl GenerationConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !(1..=MAX_IMAGE_COUNT).contains(&self.image_count) {
            return Err(ConfigError::invalid(format!(
                "generation.image_count must be between 1 and {}, got {}",
                MAX_IMAGE_COUNT, self.image_count
            )));
        }
        if self.max_characters == 0 {
            return Err(ConfigError::invalid("generation.max_characters must be > 0"));
        }
        Ok(())
    }
}

/// Attachment and backup storage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Vault-relative folder for generated images
    pub attachment_folder: String,
    /// Save the note before injecting
    pub create_backup: bool,
    /// Backups kept across notes, newest first
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            attachment_folder: "attachments/ai-summary".to_string(),
            create_backup: true,
            max_backups: 5,
        }
    }
}

/// Image job polling budget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds to wait before each status check
    pub interval_secs: u64,
    /// Status checks before giving up
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            max_attempts: 60,
        }
    }
}

impl PollingConfig {
    /// Delay between status checks
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.interval_secs == 0 {
            return Err(ConfigError::invalid("polling.interval_secs must be > 0"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("polling.max_attempts must be > 0"));
        }
        Ok(())
    }
}
