use serde::Deserialize;

use crate::error::{RelayError, RelayResult};

/// Root application configuration. Loaded from environment variables
/// with the prefix `CONVERSION_RELAY__`, e.g. `CONVERSION_RELAY__META__ACCESS_TOKEN`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub event_log: EventLogConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub meta: MetaConfig,
    #[serde(default)]
    pub tiktok: TikTokConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventLogConfig {
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Applied independently to every outbound destination call.
    #[serde(default = "default_dispatch_timeout_ms")]
    pub timeout_ms: u64,
}

/// Social-ads Conversions API. Its credential is mandatory.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_meta_pixel_id")]
    pub pixel_id: String,
    #[serde(default = "default_graph_api_url")]
    pub graph_api_url: String,
}

/// Short-video Events API. Disabled when `access_token` is empty.
#[derive(Debug, Clone, Deserialize)]
pub struct TikTokConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub pixel_id: String,
    #[serde(default = "default_tiktok_events_api_url")]
    pub events_api_url: String,
}

/// Discussion-platform Conversions API. Disabled when `access_token` is empty.
#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    #[serde(default)]
    pub access_token: String,
    /// Ad account id the conversions are posted under.
    #[serde(default)]
    pub pixel_id: String,
    #[serde(default = "default_reddit_conversions_api_url")]
    pub conversions_api_url: String,
}

// Default functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8000
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_log_capacity() -> usize {
    100
}
fn default_dispatch_timeout_ms() -> u64 {
    10_000
}
fn default_meta_pixel_id() -> String {
    "2881174115331441".to_string()
}
fn default_graph_api_url() -> String {
    "https://graph.facebook.com/v24.0".to_string()
}
fn default_tiktok_events_api_url() -> String {
    "https://business-api.tiktok.com/open_api/v1.3/pixel/track/".to_string()
}
fn default_reddit_conversions_api_url() -> String {
    "https://ads-api.reddit.com/api/v2.0/conversions/events".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            capacity: default_log_capacity(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_dispatch_timeout_ms(),
        }
    }
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            pixel_id: default_meta_pixel_id(),
            graph_api_url: default_graph_api_url(),
        }
    }
}

impl Default for TikTokConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            pixel_id: String::new(),
            events_api_url: default_tiktok_events_api_url(),
        }
    }
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            pixel_id: String::new(),
            conversions_api_url: default_reddit_conversions_api_url(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            event_log: EventLogConfig::default(),
            dispatch: DispatchConfig::default(),
            meta: MetaConfig::default(),
            tiktok: TikTokConfig::default(),
            reddit: RedditConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("CONVERSION_RELAY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// The relay cannot run without the primary destination's credential.
    pub fn validate(&self) -> RelayResult<()> {
        if self.meta.access_token.trim().is_empty() {
            return Err(RelayError::Config("META_ACCESS_TOKEN is not set".into()));
        }
        if self.event_log.capacity == 0 {
            return Err(RelayError::Config(
                "event_log.capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
