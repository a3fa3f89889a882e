//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::OperationName;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dispatch behavior
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Upstream tool server for operations without a native implementation
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Override values from environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override values from any key lookup (environment, tests).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(operation) = lookup("GATEWAY_DEFAULT_OPERATION") {
            self.gateway.default_operation = operation;
        }
        if let Some(secs) = lookup("OPERATION_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.gateway.operation_timeout_secs = secs;
        }
        if let Some(secs) = lookup("CRAWL_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.crawler.timeout_secs = secs;
        }
        if let Some(n) = lookup("MAX_CONCURRENT").and_then(|v| v.parse().ok()) {
            self.crawler.max_concurrent = n;
        }
        if let Some(agent) = lookup("USER_AGENT") {
            self.crawler.user_agent = agent;
        }
        if let Some(endpoint) = lookup("UPSTREAM_ENDPOINT") {
            self.upstream.endpoint = Some(endpoint).filter(|e| !e.trim().is_empty());
        }
        if let Some(key) = lookup("UPSTREAM_API_KEY") {
            self.upstream.api_key = Some(key).filter(|k| !k.trim().is_empty());
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self
            .gateway
            .default_operation
            .parse::<OperationName>()
            .is_err()
        {
            return Err(AppError::validation(format!(
                "gateway.default_operation '{}' is not a known operation",
                self.gateway.default_operation
            )));
        }
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.crawler.max_pages_limit == 0 {
            return Err(AppError::validation("crawler.max_pages_limit must be > 0"));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(AppError::validation("upstream.timeout_secs must be > 0"));
        }
        if let Some(endpoint) = &self.upstream.endpoint {
            url::Url::parse(endpoint).map_err(|e| {
                AppError::validation(format!("upstream.endpoint '{endpoint}' is invalid: {e}"))
            })?;
        }
        Ok(())
    }
}

/// Dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Operation used when an event names none
    #[serde(default = "defaults::default_operation")]
    pub default_operation: String,

    /// Deadline per operation in seconds (0 disables it)
    #[serde(default)]
    pub operation_timeout_secs: u64,

    /// Upper bound on private scheduler shutdown
    #[serde(default = "defaults::teardown_grace")]
    pub teardown_grace_ms: u64,
}

impl GatewaySettings {
    pub fn operation_deadline(&self) -> Option<Duration> {
        (self.operation_timeout_secs > 0).then(|| Duration::from_secs(self.operation_timeout_secs))
    }

    pub fn teardown_grace(&self) -> Duration {
        Duration::from_millis(self.teardown_grace_ms)
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            default_operation: defaults::default_operation(),
            operation_timeout_secs: 0,
            teardown_grace_ms: defaults::teardown_grace(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Hard cap on pages visited by one deep crawl
    #[serde(default = "defaults::max_pages_limit")]
    pub max_pages_limit: u32,

    /// Responses larger than this are truncated
    #[serde(default = "defaults::max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            max_pages_limit: defaults::max_pages_limit(),
            max_body_bytes: defaults::max_body_bytes(),
        }
    }
}

/// Upstream tool server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL, e.g. `https://tools.internal:8000`
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token sent with every call
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "defaults::upstream_timeout")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: defaults::upstream_timeout(),
        }
    }
}

mod defaults {
    // Gateway defaults
    pub fn default_operation() -> String {
        "crawl_url".into()
    }
    pub fn teardown_grace() -> u64 {
        1000
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; crawl-gateway/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        5
    }
    pub fn max_pages_limit() -> u32 {
        50
    }
    pub fn max_body_bytes() -> usize {
        10 * 1024 * 1024
    }

    // Upstream defaults
    pub fn upstream_timeout() -> u64 {
        120
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_unknown_default_operation() {
        let mut config = Config::default();
        config.gateway.default_operation = "batch_operations".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.crawler.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_upstream_endpoint() {
        let mut config = Config::default();
        config.upstream.endpoint = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_partial_toml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[gateway]\noperation_timeout_secs = 45\n\n[upstream]\nendpoint = \"http://localhost:8000\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.gateway.default_operation, "crawl_url");
        assert_eq!(
            config.gateway.operation_deadline(),
            Some(Duration::from_secs(45))
        );
        assert_eq!(config.crawler.timeout_secs, 30);
        assert_eq!(
            config.upstream.endpoint.as_deref(),
            Some("http://localhost:8000")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_or_default_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("missing.toml"));
        assert_eq!(config.crawler.max_concurrent, 5);
        assert!(config.gateway.operation_deadline().is_none());
    }

    #[test]
    fn overrides_replace_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("GATEWAY_DEFAULT_OPERATION", "deep_crawl_site"),
            ("OPERATION_TIMEOUT_SECS", "12"),
            ("MAX_CONCURRENT", "not-a-number"),
            ("UPSTREAM_ENDPOINT", ""),
        ]);
        let mut config = Config::default();
        config.upstream.endpoint = Some("http://old".into());
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.gateway.default_operation, "deep_crawl_site");
        assert_eq!(config.gateway.operation_timeout_secs, 12);
        assert_eq!(config.crawler.max_concurrent, 5);
        assert!(config.upstream.endpoint.is_none());
    }
}
