use crate::{ConfigError, GatewayConfig};
use regex::Regex;
use std::path::PathBuf;

pub struct ConfigLoader {
    explicit_file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            search_paths.push(home.join(".config/tenant-gateway/gateway.yaml"));
        }
        search_paths.push(PathBuf::from("./gateway.yaml"));

        #[cfg(unix)]
        search_paths.insert(0, PathBuf::from("/etc/tenant-gateway/gateway.yaml"));

        Self {
            explicit_file: None,
            search_paths,
        }
    }

    pub fn with_file(mut self, path: &str) -> Self {
        self.explicit_file = Some(PathBuf::from(path));
        self
    }

    pub fn load(&self) -> Result<GatewayConfig, ConfigError> {
        let mut config = GatewayConfig::default();

        if let Ok(env_path) = std::env::var("GATEWAY_CONFIG") {
            let content =
                std::fs::read_to_string(&env_path).map_err(|e| ConfigError::ReadFile {
                    path: PathBuf::from(&env_path),
                    source: e,
                })?;
            config = self.parse_yaml(&content)?;
        } else if let Some(ref explicit) = self.explicit_file {
            let content = std::fs::read_to_string(explicit).map_err(|e| ConfigError::ReadFile {
                path: explicit.clone(),
                source: e,
            })?;
            config = self.parse_yaml(&content)?;
        } else {
            for path in &self.search_paths {
                if path.exists() {
                    if let Ok(content) = std::fs::read_to_string(path) {
                        config = self.merge_yaml(&config, &content)?;
                    }
                }
            }
        }

        self.apply_env_overrides(&mut config);
        Ok(config)
    }

    fn parse_yaml(&self, content: &str) -> Result<GatewayConfig, ConfigError> {
        let expanded = self.expand_env_vars(content);
        Ok(serde_yaml::from_str(&expanded)?)
    }

    fn merge_yaml(&self, base: &GatewayConfig, content: &str) -> Result<GatewayConfig, ConfigError> {
        let expanded = self.expand_env_vars(content);
        let overlay: GatewayConfig = serde_yaml::from_str(&expanded)?;
        Ok(self.merge_configs(base, &overlay))
    }

    fn merge_configs(&self, base: &GatewayConfig, overlay: &GatewayConfig) -> GatewayConfig {
        let default = GatewayConfig::default();
        let mut result = base.clone();

        if overlay.server.host != default.server.host {
            result.server.host = overlay.server.host.clone();
        }
        if overlay.server.port != default.server.port {
            result.server.port = overlay.server.port;
        }
        if overlay.store.url != default.store.url {
            result.store = overlay.store.clone();
        }
        if overlay.management.host != default.management.host {
            result.management = overlay.management.clone();
        }
        if overlay.identity.base_url.is_some() {
            result.identity = overlay.identity.clone();
        }
        if overlay.dispatcher.idle_timeout_secs != default.dispatcher.idle_timeout_secs
            || overlay.dispatcher.response_pool_size != default.dispatcher.response_pool_size
        {
            result.dispatcher = overlay.dispatcher.clone();
        }
        if overlay.pagination.default_count != default.pagination.default_count
            || overlay.pagination.max_count != default.pagination.max_count
        {
            result.pagination = overlay.pagination.clone();
        }
        if overlay.logging.level != default.logging.level {
            result.logging = overlay.logging.clone();
        }
        if overlay.log_shipper.url.is_some() {
            result.log_shipper = overlay.log_shipper.clone();
        }

        result
    }

    fn expand_env_vars(&self, content: &str) -> String {
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_default()
        })
        .to_string()
    }

    fn apply_env_overrides(&self, config: &mut GatewayConfig) {
        if let Ok(host) = std::env::var("GATEWAY_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("GATEWAY_PORT") {
            if let Ok(p) = port.parse() {
                config.server.port = p;
            }
        }
        if let Ok(url) = std::env::var("GATEWAY_STORE_URL") {
            config.store.url = url;
        }
        if let Ok(user) = std::env::var("GATEWAY_STORE_USERNAME") {
            config.store.username = user;
        }
        if let Ok(pass) = std::env::var("GATEWAY_STORE_PASSWORD") {
            config.store.password = pass;
        }
        if let Ok(bucket) = std::env::var("GATEWAY_STORE_BUCKET") {
            config.store.bucket = bucket;
        }
        if let Ok(host) = std::env::var("GATEWAY_MANAGEMENT_HOST") {
            config.management.host = host;
        }
        if let Ok(user) = std::env::var("GATEWAY_MANAGEMENT_USERNAME") {
            config.management.username = user;
        }
        if let Ok(pass) = std::env::var("GATEWAY_MANAGEMENT_PASSWORD") {
            config.management.password = pass;
        }
        if let Ok(url) = std::env::var("GATEWAY_IDENTITY_URL") {
            if !url.is_empty() {
                config.identity.base_url = Some(url);
            }
        }
        if let Ok(level) = std::env::var("GATEWAY_LOG_LEVEL") {
            if let Ok(l) = serde_yaml::from_str(&level) {
                config.logging.level = l;
            }
        }
        if let Ok(url) = std::env::var("GATEWAY_LOG_SHIPPER_URL") {
            if !url.is_empty() {
                config.log_shipper.url = Some(url);
            }
        }
        if let Ok(prefix) = std::env::var("GATEWAY_LOG_SHIPPER_INDEX_PREFIX") {
            if !prefix.is_empty() {
                config.log_shipper.index_prefix = prefix;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_env_vars_works() {
        std::env::set_var("TEST_VAR_123", "hello");
        let loader = ConfigLoader::new();
        let result = loader.expand_env_vars("value: ${TEST_VAR_123}");
        assert_eq!(result, "value: hello");
        std::env::remove_var("TEST_VAR_123");
    }

    #[test]
    fn missing_env_var_becomes_empty() {
        let loader = ConfigLoader::new();
        let result = loader.expand_env_vars("value: ${NONEXISTENT_VAR_XYZ}");
        assert_eq!(result, "value: ");
    }

    #[test]
    fn env_overrides_config() {
        std::env::set_var("GATEWAY_PORT", "8888");
        let mut config = GatewayConfig::default();
        let loader = ConfigLoader::new();
        loader.apply_env_overrides(&mut config);
        assert_eq!(config.server.port, 8888);
        std::env::remove_var("GATEWAY_PORT");
    }

    #[test]
    fn merge_keeps_base_when_overlay_is_default() {
        let loader = ConfigLoader::new();
        let base = GatewayConfig::default();
        let overlay = GatewayConfig::default();
        let merged = loader.merge_configs(&base, &overlay);
        assert_eq!(merged.server.port, base.server.port);
    }

    #[test]
    fn merge_takes_overlay_pagination_when_changed() {
        let loader = ConfigLoader::new();
        let base = GatewayConfig::default();
        let mut overlay = GatewayConfig::default();
        overlay.pagination.default_count = 25;
        let merged = loader.merge_configs(&base, &overlay);
        assert_eq!(merged.pagination.default_count, 25);
    }

    #[test]
    fn with_file_loads_yaml_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.yaml");
        std::fs::write(
            &path,
            "server:\n  host: 0.0.0.0\n  port: 9090\npagination:\n  default_count: 20\n  max_count: 200\n",
        )
        .unwrap();

        let loader = ConfigLoader::new().with_file(path.to_str().unwrap());
        let config = loader.load().unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.pagination.default_count, 20);
        assert_eq!(config.pagination.max_count, 200);
    }

    #[test]
    fn with_file_expands_env_vars_in_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.yaml");
        std::fs::write(&path, "store:\n  url: ${TEST_STORE_URL_789}\n").unwrap();
        std::env::set_var("TEST_STORE_URL_789", "http://store.internal:8091");

        let loader = ConfigLoader::new().with_file(path.to_str().unwrap());
        let config = loader.load().unwrap();

        std::env::remove_var("TEST_STORE_URL_789");
        assert_eq!(config.store.url, "http://store.internal:8091");
    }

    #[test]
    fn gateway_config_env_var_takes_priority_over_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let explicit_path = dir.path().join("explicit.yaml");
        std::fs::write(&explicit_path, "server:\n  port: 1111\n").unwrap();
        let env_path = dir.path().join("from-env.yaml");
        std::fs::write(&env_path, "server:\n  port: 2222\n").unwrap();
        std::env::set_var("GATEWAY_CONFIG", env_path.to_str().unwrap());

        let loader = ConfigLoader::new().with_file(explicit_path.to_str().unwrap());
        let config = loader.load().unwrap();

        std::env::remove_var("GATEWAY_CONFIG");
        assert_eq!(config.server.port, 2222);
    }

    #[test]
    fn missing_explicit_file_is_a_read_error() {
        let loader = ConfigLoader::new().with_file("/nonexistent/gateway.yaml");
        let err = loader.load().unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn search_paths_are_skipped_when_absent_and_default_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = ConfigLoader::new();
        loader.search_paths = vec![dir.path().join("does-not-exist.yaml")];

        let config = loader.load().unwrap();
        assert_eq!(config.server.port, GatewayConfig::default().server.port);
    }
}
