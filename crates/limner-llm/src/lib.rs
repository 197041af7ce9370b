//! # Limner LLM
//!
//! HTTP clients for the services Limner depends on.
//!
//! ## Clients
//!
//! - [`ProxyClient`]: planning and image jobs through the Limner proxy
//! - [`GeminiPlanner`]: direct planning against a Gemini text model
//! - [`KieClient`]: direct image jobs on kie.ai
//!
//! All of them implement the `Planner` / `ImageJobApi` traits from
//! `limner-core`, so the pipeline does not care which mode is active.
//!
//! ## Example
//!
//! ```rust,no_run
//! use limner_config::ConfigLoader;
//! use limner_llm::create_clients;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load(None).await?;
//!     let clients = create_clients(&config.connection)?;
//!     println!("planning with {}", clients.planner.name());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod direct;
pub mod factory;
mod http;
pub mod proxy;
pub mod style;

// Re-export commonly used types at crate root
pub use direct::{GeminiPlanner, KieClient};
pub use factory::{create_clients, ServiceClients};
pub use proxy::ProxyClient;
pub use style::{enhance_prompt, style_modifier, StyleModifier};
