//! Configuration management for Turnstile.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Result, TurnstileError};
use crate::http::IdentitySource;
use crate::ratelimit::LimiterConfig;

/// Prefix for environment variable overrides, e.g. `TURNSTILE__SERVER__HTTP_ADDR`.
const ENV_PREFIX: &str = "TURNSTILE";

/// Main configuration for the Turnstile service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,

    /// Deployment environment name
    #[serde(default = "default_env")]
    pub env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            env: default_env(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_env() -> String {
    "development".to_string()
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Whether admission control is active at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Requests admitted per caller per window
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u64,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// How often idle counters are swept, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Windows an expired counter is retained before eviction
    #[serde(default = "default_retention_windows")]
    pub retention_windows: u32,

    /// Where caller identity comes from
    #[serde(default)]
    pub identity_source: IdentitySource,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            requests_per_window: default_requests_per_window(),
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval(),
            retention_windows: default_retention_windows(),
            identity_source: IdentitySource::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_requests_per_window() -> u64 {
    20
}

fn default_window_secs() -> u64 {
    5
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_retention_windows() -> u32 {
    1
}

impl RateLimitingConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// The limiter configuration described by these settings.
    pub fn limiter_config(&self) -> LimiterConfig {
        LimiterConfig {
            limit: self.requests_per_window,
            window: self.window(),
            enabled: self.enabled,
            retention_windows: self.retention_windows,
        }
    }

    /// Reject values that would leave the limiter unusable.
    pub fn validate(&self) -> Result<()> {
        self.limiter_config().validate()?;

        if self.sweep_interval_secs == 0 {
            return Err(TurnstileError::Config(
                "sweep interval must be longer than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl ServiceConfig {
    /// Load configuration from an optional YAML file layered under
    /// `TURNSTILE__*` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::with_name(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        let config: ServiceConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| TurnstileError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ServiceConfig = serde_yaml::from_str(yaml)
            .map_err(|e| TurnstileError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.rate_limiting.validate()
    }
}
