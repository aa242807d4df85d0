//! Configuration management for the Linkstash services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Permanent storage network configuration
    pub permastore: PermaStoreConfig,

    /// Page scraping configuration
    pub scrape: ScrapeConfig,

    /// LLM chat configuration
    pub chat: ChatConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PermaStoreConfig {
    /// Base URL of the storage network gateway
    #[serde(default = "default_permastore_url")]
    pub base_url: String,

    /// API key used to obtain bearer tokens
    pub api_key: Option<String>,

    /// Token endpoint (defaults to {base_url}/auth/token)
    pub token_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_permastore_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScrapeConfig {
    /// Fetch timeout in seconds
    #[serde(default = "default_scrape_timeout")]
    pub timeout_secs: u64,

    /// User agent sent on page fetches
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Cap on extracted content length in characters
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Chat completions API base URL
    #[serde(default = "default_chat_api_base")]
    pub api_base: String,

    /// API key for the chat provider
    pub api_key: Option<String>,

    /// Model to use
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,

    /// Number of context entries retrieved per chat message
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT secret for token signing
    pub jwt_secret: Option<String>,

    /// JWT expiration in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,

    /// One-time code time-to-live in seconds
    #[serde(default = "default_otp_ttl")]
    pub otp_ttl_secs: u64,

    /// Verification attempts allowed per issued code
    #[serde(default = "default_otp_max_attempts")]
    pub otp_max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_permastore_url() -> String { "https://node.arweave.net".to_string() }
fn default_permastore_timeout() -> u64 { 30 }
fn default_scrape_timeout() -> u64 { 15 }
fn default_user_agent() -> String {
    format!("linkstash/{}", env!("CARGO_PKG_VERSION"))
}
fn default_max_content_chars() -> usize { 50_000 }
fn default_chat_api_base() -> String { "https://api.openai.com/v1".to_string() }
fn default_chat_model() -> String { "gpt-4o-mini".to_string() }
fn default_chat_timeout() -> u64 { 60 }
fn default_context_limit() -> usize { 5 }
fn default_jwt_expiration() -> u64 { 86_400 }
fn default_otp_ttl() -> u64 { 600 }
fn default_otp_max_attempts() -> u32 { 5 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "linkstash".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Token endpoint of the storage network (falls back to {base_url}/auth/token)
    pub fn permastore_token_url(&self) -> String {
        self.permastore
            .token_url
            .clone()
            .unwrap_or_else(|| format!("{}/auth/token", self.permastore.base_url))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            permastore: PermaStoreConfig {
                base_url: default_permastore_url(),
                api_key: None,
                token_url: None,
                timeout_secs: default_permastore_timeout(),
            },
            scrape: ScrapeConfig {
                timeout_secs: default_scrape_timeout(),
                user_agent: default_user_agent(),
                max_content_chars: default_max_content_chars(),
            },
            chat: ChatConfig {
                api_base: default_chat_api_base(),
                api_key: None,
                model: default_chat_model(),
                timeout_secs: default_chat_timeout(),
                context_limit: default_context_limit(),
            },
            auth: AuthConfig {
                jwt_secret: None,
                jwt_expiration_secs: default_jwt_expiration(),
                otp_ttl_secs: default_otp_ttl(),
                otp_max_attempts: default_otp_max_attempts(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
        }
    }
}
