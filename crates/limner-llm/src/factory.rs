//! Client selection from connection settings

use limner_config::{ConfigError, ConfigResult, ConnectionConfig, ConnectionMode};
use limner_core::{ImageJobApi, Planner};
use std::sync::Arc;
use tracing::info;

use crate::direct::{GeminiPlanner, KieClient};
use crate::proxy::ProxyClient;

/// The planner and image job client for one connection mode
#[derive(Clone)]
pub struct ServiceClients {
    /// Placement planner
    pub planner: Arc<dyn Planner>,
    /// Image job service
    pub images: Arc<dyn ImageJobApi>,
}

impl std::fmt::Debug for ServiceClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClients")
            .field("planner", &self.planner.name())
            .finish_non_exhaustive()
    }
}

fn credential(
    value: &Option<String>,
    name: &'static str,
    mode: &'static str,
) -> ConfigResult<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::MissingCredential(name, mode))
}

/// Create the clients for the configured connection mode
pub fn create_clients(config: &ConnectionConfig) -> ConfigResult<ServiceClients> {
    match config.mode {
        ConnectionMode::Proxy => {
            let token = credential(&config.proxy_token, "proxy_token", "proxy")?;
            let proxy = Arc::new(ProxyClient::from_config(config, token));
            info!(url = %proxy.base_url(), "using proxy connection");
            Ok(ServiceClients {
                planner: proxy.clone(),
                images: proxy,
            })
        }
        ConnectionMode::Direct => {
            let gemini_key = credential(&config.gemini_api_key, "gemini_api_key", "direct")?;
            let kie_key = credential(&config.kie_api_key, "kie_api_key", "direct")?;
            let planner = GeminiPlanner::from_config(config, gemini_key);
            info!(model = %planner.model(), "using direct connection");
            Ok(ServiceClients {
                planner: Arc::new(planner),
                images: Arc::new(KieClient::from_config(config, kie_key)),
            })
        }
    }
}
