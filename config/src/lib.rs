//! Tenant Gateway Configuration
//!
//! Provides unified YAML-based configuration for the gateway server.
//!
//! # Configuration Loading Priority
//!
//! 1. Compiled-in defaults
//! 2. `/etc/tenant-gateway/gateway.yaml` (system-wide)
//! 3. `~/.config/tenant-gateway/gateway.yaml` (user)
//! 4. `./gateway.yaml` (project-local)
//! 5. `GATEWAY_CONFIG=/path/to/config.yaml` (explicit)
//! 6. Environment variables (highest priority)
//!
//! # Example Configuration
//!
//! ```yaml
//! server:
//!   host: "0.0.0.0"
//!   port: 8080
//!
//! store:
//!   url: "http://localhost:8093"
//!   username: "gateway"
//!   password: "${GATEWAY_STORE_PASSWORD}"
//!   bucket: "healthcare"
//!
//! dispatcher:
//!   idle_timeout_secs: 600
//!   response_pool_size: 5
//!
//! logging:
//!   level: info
//! ```

#![allow(missing_docs)]

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::*;

/// Load configuration from default locations.
///
/// Searches for config files in order and merges them.
/// Environment variables override file values.
pub fn load() -> Result<GatewayConfig, ConfigError> {
    ConfigLoader::new().load()
}

/// Load configuration from a specific file.
pub fn load_from_file(path: &str) -> Result<GatewayConfig, ConfigError> {
    ConfigLoader::new().with_file(path).load()
}
