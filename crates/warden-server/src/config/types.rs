//! Server configuration types.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use warden_auth::{AuthSettings, RetryPolicy};
use warden_common_log::{LogConfig, LogFormat, LogLevel};

/// Main server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server binding configuration.
    pub server: ServerBindConfig,
    /// Token, session and role settings.
    pub auth: AuthSettings,
    /// Session store backend.
    #[serde(default)]
    pub session_store: SessionStoreConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Address to listen on.
    pub fn socket_addr(&self) -> SocketAddr {
        self.server.socket_addr()
    }
}

/// Server binding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerBindConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

impl ServerBindConfig {
    /// Socket address. A host that is not an IP address binds all interfaces.
    pub fn socket_addr(&self) -> SocketAddr {
        let ip = self
            .host
            .parse::<IpAddr>()
            .unwrap_or(IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerBindConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Which session store backs the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    #[default]
    Memory,
    Redis,
}

/// Session store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStoreConfig {
    /// Backend type.
    #[serde(default)]
    pub backend: SessionBackend,
    /// Redis URL (required for the redis backend).
    pub redis_url: Option<String>,
    /// Key namespace in Redis.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Timeout for a single store round trip.
    #[serde(default = "default_op_timeout")]
    pub op_timeout_ms: u64,
    /// Attempts for liveness reads, including the first.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_initial_delay")]
    pub retry_initial_delay_ms: u64,
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_ms: u64,
    /// How often expired sessions are purged. 0 disables the sweeper.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_key_prefix() -> String {
    "warden".to_string()
}

fn default_op_timeout() -> u64 {
    2000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_initial_delay() -> u64 {
    50
}

fn default_retry_max_delay() -> u64 {
    1000
}

fn default_sweep_interval() -> u64 {
    60
}

impl SessionStoreConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Backoff for liveness reads.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_initial_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            redis_url: None,
            key_prefix: default_key_prefix(),
            op_timeout_ms: default_op_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay(),
            retry_max_delay_ms: default_retry_max_delay(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty, compact or json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl LoggingConfig {
    /// Subscriber settings. `WARDEN_LOG_LEVEL` and `WARDEN_LOG_FORMAT` win
    /// over the file values.
    pub fn to_log_config(&self) -> LogConfig {
        let env = LogConfig::from_env();
        let level = std::env::var("WARDEN_LOG_LEVEL")
            .ok()
            .as_deref()
            .and_then(LogLevel::parse)
            .or_else(|| LogLevel::parse(&self.level))
            .unwrap_or_default();
        let format = match std::env::var("WARDEN_LOG_FORMAT") {
            Ok(format) => LogFormat::parse(&format),
            Err(_) => LogFormat::parse(&self.format),
        };

        LogConfig {
            level,
            format,
            ..env
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
