//! Application configuration.
//!
//! Every field is optional with a default ("every environment
//! variable is optional; when missing the affected subsystem degrades").
//! Loaded with `clap`'s `env` derive feature for both the server binary's
//! flags and the CLI binary's flags.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default cache time-to-live, in days.
pub const DEFAULT_CACHE_TTL_DAYS: i64 = 30;

/// Default per-request HTTP timeout, in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Default headless-fetch timeout, in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Process-wide configuration, built once at startup and handed to `App`.
#[derive(Parser, Debug, Clone)]
#[command(name = "eol-sentinel", about = "End-of-life intelligence service")]
pub struct AppConfig {
    /// Path to the persistent cache's `SQLite` database file.
    #[arg(long, env = "EOL_CACHE_DB_PATH", default_value = "eol_cache.db")]
    pub cache_db_path: PathBuf,

    /// Cache entry time-to-live, in days.
    #[arg(long, env = "EOL_CACHE_TTL_DAYS", default_value_t = DEFAULT_CACHE_TTL_DAYS)]
    pub cache_ttl_days: i64,

    /// Per-request HTTP timeout, in seconds.
    #[arg(long, env = "EOL_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout_secs: u64,

    /// Headless-fetch timeout, in seconds (fallback agent).
    #[arg(long, env = "EOL_FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_secs: u64,

    /// Enable the optional LLM-assisted date-extraction path.
    #[arg(long, env = "LLM_EXTRACTION", default_value_t = false)]
    pub llm_extraction: bool,

    /// Optional LLM endpoint base URL.
    #[arg(long, env = "EOL_LLM_ENDPOINT")]
    pub llm_endpoint: Option<String>,

    /// Optional LLM deployment/model name.
    #[arg(long, env = "EOL_LLM_DEPLOYMENT")]
    pub llm_deployment: Option<String>,

    /// Optional LLM API version string.
    #[arg(long, env = "EOL_LLM_API_VERSION")]
    pub llm_api_version: Option<String>,

    /// HTTP bind address for the `eol-sentineld` server.
    #[arg(long, env = "EOL_BIND_ADDR", default_value = "127.0.0.1:8080")]
    pub bind_addr: SocketAddr,

    /// Emit structured logs as JSON instead of human-readable text.
    #[arg(long, env = "EOL_LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_db_path: PathBuf::from("eol_cache.db"),
            cache_ttl_days: DEFAULT_CACHE_TTL_DAYS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            llm_extraction: false,
            llm_endpoint: None,
            llm_deployment: None,
            llm_api_version: None,
            bind_addr: "127.0.0.1:8080".parse().expect("valid default bind addr"),
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Whether the optional LLM-assisted extraction path is both enabled
    /// and has enough configuration to be usable.
    #[must_use]
    pub fn llm_configured(&self) -> bool {
        self.llm_extraction && self.llm_endpoint.is_some() && self.llm_deployment.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_every_subsystem_degrade_gracefully() {
        let config = AppConfig::default();
        assert!(!config.llm_configured());
        assert_eq!(config.cache_ttl_days, DEFAULT_CACHE_TTL_DAYS);
        assert_eq!(config.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
    }

    #[test]
    fn llm_configured_requires_endpoint_and_deployment() {
        let mut config = AppConfig::default();
        config.llm_extraction = true;
        assert!(!config.llm_configured());
        config.llm_endpoint = Some("https://example.test".to_string());
        assert!(!config.llm_configured());
        config.llm_deployment = Some("gpt-4".to_string());
        assert!(config.llm_configured());
    }
}
