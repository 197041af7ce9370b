//! # Limner Configuration Library
//!
//! Type-safe configuration for the Limner tools: how to reach the planning and
//! image services, what to generate, where to store attachments and backups,
//! and how patiently to poll image jobs.
//!
//! ## Features
//!
//! - Multi-format support (TOML, YAML, JSON)
//! - Environment overrides for endpoints and credentials
//! - Validation per connection mode
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use limner_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load(None).await?;
//!     config.validate()?;
//!     println!("polling every {:?}", config.polling.interval());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod loader;
mod types;

pub use config::*;
pub use error::*;
pub use loader::*;
pub use types::*;
