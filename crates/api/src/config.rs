use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use domain::services::{FanoutConfig, UnknownDevicePolicy};

/// Upper bound on `ingestion.alarm_cooldown_secs` (one day).
pub const MAX_ALARM_COOLDOWN_SECS: u64 = 86_400;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Firebase Cloud Messaging credentials, used when `notifications.provider = "fcm"`.
    #[serde(default)]
    pub fcm: FcmConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Pool settings for the persistence layer.
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// What the webhook does with a device id it has never seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownDevicePolicyKind {
    #[default]
    FirstAvailable,
    DefaultAccount,
    Reject,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestionConfig {
    #[serde(default)]
    pub unknown_device_policy: UnknownDevicePolicyKind,

    /// Target account for the `default_account` policy.
    #[serde(default)]
    pub default_account: Option<String>,

    /// Minimum spacing between two smoke alarms of one device. 0 disables it.
    #[serde(default)]
    pub alarm_cooldown_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationProvider {
    Fcm,
    /// Log notifications instead of sending them.
    #[default]
    Log,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub provider: NotificationProvider,

    /// Per-token send timeout in milliseconds.
    #[serde(default = "default_notification_timeout_ms")]
    pub timeout_ms: u64,

    /// Upper bound on sends in flight for one fan-out.
    #[serde(default = "default_notification_concurrency")]
    pub max_concurrency: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            provider: NotificationProvider::default(),
            timeout_ms: default_notification_timeout_ms(),
            max_concurrency: default_notification_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FcmConfig {
    /// Firebase project id.
    #[serde(default)]
    pub project_id: String,

    /// Service account JSON, inline or as a file path.
    #[serde(default)]
    pub credentials: String,

    /// Send with high priority on Android and APNs.
    #[serde(default = "default_fcm_high_priority")]
    pub high_priority: bool,

    #[serde(default = "default_fcm_api_base_url")]
    pub api_base_url: String,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            credentials: String::new(),
            high_priority: default_fcm_high_priority(),
            api_base_url: default_fcm_api_base_url(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    1_048_576
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_notification_timeout_ms() -> u64 {
    8000
}
fn default_notification_concurrency() -> usize {
    8
}
fn default_fcm_high_priority() -> bool {
    true
}
fn default_fcm_api_base_url() -> String {
    "https://fcm.googleapis.com".to_string()
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with SW__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("SW").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// This method creates a config entirely from defaults and overrides,
    /// without relying on config files (which may not be accessible during tests).
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            max_body_size = 1048576

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []

            [ingestion]
            unknown_device_policy = "first_available"
            alarm_cooldown_secs = 0

            [notifications]
            provider = "log"
            timeout_ms = 8000
            max_concurrency = 8
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SW__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.ingestion.unknown_device_policy == UnknownDevicePolicyKind::DefaultAccount
            && self
                .ingestion
                .default_account
                .as_deref()
                .map_or(true, |a| a.trim().is_empty())
        {
            return Err(ConfigValidationError::MissingRequired(
                "ingestion.default_account must be set for the default_account policy"
                    .to_string(),
            ));
        }

        if self.notifications.max_concurrency == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "notifications.max_concurrency must be at least 1".to_string(),
            ));
        }

        if self.notifications.timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "notifications.timeout_ms must be positive".to_string(),
            ));
        }

        // The request timeout drops the handler, and with it any sends still in flight.
        if self.notifications.timeout_ms >= self.server.request_timeout_secs.saturating_mul(1000) {
            return Err(ConfigValidationError::InvalidValue(
                "notifications.timeout_ms must be less than server.request_timeout_secs".to_string(),
            ));
        }

        if self.ingestion.alarm_cooldown_secs > MAX_ALARM_COOLDOWN_SECS {
            return Err(ConfigValidationError::InvalidValue(format!(
                "ingestion.alarm_cooldown_secs must be at most {}",
                MAX_ALARM_COOLDOWN_SECS
            )));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ConfigValidationError::InvalidValue(format!("Invalid socket address: {}", e)))
    }

    /// Unknown-device policy with its target account resolved.
    pub fn unknown_device_policy(&self) -> UnknownDevicePolicy {
        match self.ingestion.unknown_device_policy {
            UnknownDevicePolicyKind::FirstAvailable => UnknownDevicePolicy::FirstAvailable,
            UnknownDevicePolicyKind::DefaultAccount => UnknownDevicePolicy::DefaultAccount(
                self.ingestion
                    .default_account
                    .clone()
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
            ),
            UnknownDevicePolicyKind::Reject => UnknownDevicePolicy::Reject,
        }
    }

    /// Settings for the ingestion pipeline.
    pub fn pipeline_config(&self) -> domain::services::IngestionConfig {
        domain::services::IngestionConfig {
            unknown_device_policy: self.unknown_device_policy(),
            alarm_cooldown_secs: self.ingestion.alarm_cooldown_secs,
            fanout: FanoutConfig {
                send_timeout: Duration::from_millis(self.notifications.timeout_ms),
                max_concurrency: self.notifications.max_concurrency,
            },
        }
    }
}
