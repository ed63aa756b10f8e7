use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub management: ManagementConfig,
    pub identity: IdentityConfig,
    pub dispatcher: DispatcherConfig,
    pub pagination: PaginationConfig,
    pub provisioning: ProvisioningConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub log_shipper: LogShipperConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            management: ManagementConfig::default(),
            identity: IdentityConfig::default(),
            dispatcher: DispatcherConfig::default(),
            pagination: PaginationConfig::default(),
            provisioning: ProvisioningConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            log_shipper: LogShipperConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-request handler deadline in seconds. Default: 30.
    pub request_timeout_secs: u64,
    pub max_concurrent_requests: usize,
    pub max_body_size_bytes: usize,
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            max_concurrent_requests: 1000,
            max_body_size_bytes: 2 * 1024 * 1024,
            shutdown_timeout_secs: 30,
        }
    }
}

/// Connection info for the external document store (KV + query).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub bucket: String,
    /// Name of the shared, pre-ingested template scope.
    pub template_scope: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8093".to_string(),
            username: String::new(),
            password: String::new(),
            bucket: "healthcare".to_string(),
            template_scope: "template".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

/// Connection info for the store's administrative API (scope/collection/index
/// creation lives on a separate management plane).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementConfig {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8091".to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}

/// The upstream identity provider used only for the unauthenticated
/// `/auth/*` pass-through endpoints (token issuance is an external
/// collaborator, not something this gateway implements itself).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
        }
    }
}

/// Per-tenant dispatcher tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Idle timeout before a dispatcher goes pseudo-closed. Default: 600s (10min).
    pub idle_timeout_secs: u64,
    /// Size of the response rendezvous slot pool. Default: 5.
    pub response_pool_size: usize,
    /// Handler-side deadline waiting for a response. Default: 30s.
    pub request_timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 600,
            response_pool_size: 5,
            request_timeout_secs: 30,
        }
    }
}

/// List pagination policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_count: u32,
    pub max_count: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_count: 10,
            max_count: 100,
        }
    }
}

/// Tenant namespace provisioning tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    pub poll_interval_secs: u64,
    pub ready_timeout_secs: u64,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 1,
            ready_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            filter: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

/// Log shipping destination. The gateway itself never ships logs directly;
/// this only records where `tracing` output is expected to be scraped from
/// by the deployment's log shipper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogShipperConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub index_prefix: String,
}

impl Default for LogShipperConfig {
    fn default() -> Self {
        Self {
            url: None,
            index_prefix: "tenant-gateway".to_string(),
        }
    }
}
