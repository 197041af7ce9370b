//! Configuration loading from files and the environment

use crate::{ConfigError, ConfigResult, LimnerConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding `connection.proxy_url`
pub const ENV_PROXY_URL: &str = "LIMNER_PROXY_URL";
/// Environment variable overriding `connection.proxy_token`
pub const ENV_PROXY_TOKEN: &str = "LIMNER_PROXY_TOKEN";
/// Environment variable overriding `connection.gemini_api_key`
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
/// Environment variable overriding `connection.kie_api_key`
pub const ENV_KIE_API_KEY: &str = "KIE_API_KEY";

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// YAML
    Yaml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Loads [`LimnerConfig`] from disk and applies environment overrides
pub struct ConfigLoader;

impl ConfigLoader {
    /// Default config location: `{config_dir}/limner/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("limner").join("config.toml"))
    }

    /// Parse config text in the given format
    pub fn parse_str(content: &str, format: ConfigFormat) -> ConfigResult<LimnerConfig> {
        match format {
            #[cfg(feature = "toml")]
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::parse(e.to_string()))
            }
            #[cfg(not(feature = "toml"))]
            ConfigFormat::Toml => Err(ConfigError::UnsupportedFormat("toml".into())),
            #[cfg(feature = "yaml")]
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| ConfigError::parse(e.to_string()))
            }
            #[cfg(not(feature = "yaml"))]
            ConfigFormat::Yaml => Err(ConfigError::UnsupportedFormat("yaml".into())),
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::parse(e.to_string()))
            }
        }
    }

    /// Load a config file, choosing the format from its extension
    pub async fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<LimnerConfig> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), ?format, "Parsing config file");
        Self::parse_str(&content, format)
    }

    /// Load the default config, or defaults if the file does not exist
    pub async fn load_default() -> ConfigResult<LimnerConfig> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_file(&path).await,
            _ => {
                debug!("No config file found, using defaults");
                Ok(LimnerConfig::default())
            }
        }
    }

    /// Load from an explicit path (which must exist) or the default location,
    /// then apply environment overrides
    pub async fn load(path: Option<&Path>) -> ConfigResult<LimnerConfig> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path).await?,
            None => Self::load_default().await?,
        };
        apply_env_overrides(&mut config);
        info!(mode = ?config.connection.mode, "Configuration loaded");
        Ok(config)
    }
}

/// Apply `LIMNER_*` and provider key variables from the process environment
pub fn apply_env_overrides(config: &mut LimnerConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides using an arbitrary lookup; empty values are ignored
pub fn apply_overrides_from<F>(config: &mut LimnerConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let connection = &mut config.connection;

    if let Some(url) = get(ENV_PROXY_URL) {
        debug!(var = ENV_PROXY_URL, "Overriding proxy URL from environment");
        connection.proxy_url = Some(url);
    }
    if let Some(token) = get(ENV_PROXY_TOKEN) {
        connection.proxy_token = Some(token);
    }
    if let Some(key) = get(ENV_GEMINI_API_KEY) {
        connection.gemini_api_key = Some(key);
    }
    if let Some(key) = get(ENV_KIE_API_KEY) {
        connection.kie_api_key = Some(key);
    }
}
