use chrono::FixedOffset;
use serde::Deserialize;
use shared::jwt::{JwtConfig, JwtError};
use std::net::{AddrParseError, SocketAddr};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    /// JWT authentication configuration
    pub jwt: JwtAuthConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
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

    /// Send `Strict-Transport-Security`. Only enable behind TLS termination.
    #[serde(default)]
    pub hsts_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// `RS256` (PEM key pair) or `HS256` (shared secret)
    #[serde(default = "default_jwt_algorithm")]
    pub algorithm: String,

    /// RSA private key in PEM format. Optional; the API only validates tokens.
    #[serde(default)]
    pub private_key: String,

    /// RSA public key in PEM format for verifying tokens
    #[serde(default)]
    pub public_key: String,

    /// Shared secret for HS256
    #[serde(default)]
    pub secret: String,

    /// Access token expiration in seconds (default: 3600 = 1 hour)
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: i64,

    /// Leeway in seconds for clock skew tolerance (default: 30)
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

impl JwtAuthConfig {
    pub fn is_hs256(&self) -> bool {
        self.algorithm.eq_ignore_ascii_case("HS256")
    }

    /// Build the token validator for the configured algorithm.
    pub fn build(&self) -> Result<JwtConfig, JwtError> {
        if self.is_hs256() {
            JwtConfig::with_secret(&self.secret, self.access_token_expiry_secs, self.leeway_secs)
        } else {
            JwtConfig::with_rsa_keys(
                &self.private_key,
                &self.public_key,
                self.access_token_expiry_secs,
                self.leeway_secs,
            )
        }
    }
}

/// Subscription expiry scanning and notification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Minutes between periodic scans
    #[serde(default = "default_scan_interval")]
    pub scan_interval_minutes: u64,

    #[serde(default = "default_true")]
    pub periodic_scan_enabled: bool,

    /// Run a scan before serving notification list/count reads
    #[serde(default = "default_true")]
    pub scan_on_read: bool,

    /// Offset of the timezone that defines a "day" for deduplication
    #[serde(default)]
    pub reference_utc_offset_minutes: i32,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            scan_interval_minutes: default_scan_interval(),
            periodic_scan_enabled: true,
            scan_on_read: true,
            reference_utc_offset_minutes: 0,
        }
    }
}

impl NotificationsConfig {
    /// The reference timezone, or `None` when the offset is out of range.
    pub fn reference_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.reference_utc_offset_minutes.checked_mul(60)?)
    }
}

const MAX_UTC_OFFSET_MINUTES: u32 = 14 * 60;

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
fn default_jwt_algorithm() -> String {
    "RS256".to_string()
}
fn default_access_token_expiry() -> i64 {
    3600 // 1 hour
}
fn default_jwt_leeway() -> u64 {
    30
}
fn default_scan_interval() -> u64 {
    5
}
fn default_true() -> bool {
    true
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
    /// 3. Environment variables with SM__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("SM").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Defaults are embedded so tests do not depend on the working directory.
    /// Validation is skipped to allow partial configs.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "127.0.0.1"
            port = 8080
            request_timeout_secs = 30

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
            hsts_enabled = false

            [jwt]
            algorithm = "HS256"
            secret = "test-secret-please-change"
            access_token_expiry_secs = 3600
            leeway_secs = 30

            [notifications]
            scan_interval_minutes = 5
            periodic_scan_enabled = false
            scan_on_read = true
            reference_utc_offset_minutes = 0
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SM__DATABASE__URL environment variable must be set".to_string(),
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

        if self.notifications.scan_interval_minutes == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "notifications.scan_interval_minutes must be greater than 0".to_string(),
            ));
        }

        if self.notifications.reference_utc_offset_minutes.unsigned_abs()
            > MAX_UTC_OFFSET_MINUTES
        {
            return Err(ConfigValidationError::InvalidValue(format!(
                "notifications.reference_utc_offset_minutes must be within +/-{}",
                MAX_UTC_OFFSET_MINUTES
            )));
        }

        if self.jwt.is_hs256() {
            if self.jwt.secret.is_empty() {
                return Err(ConfigValidationError::MissingRequired(
                    "jwt.secret is required for HS256".to_string(),
                ));
            }
        } else if self.jwt.algorithm.eq_ignore_ascii_case("RS256") {
            if self.jwt.public_key.trim().is_empty() {
                return Err(ConfigValidationError::MissingRequired(
                    "jwt.public_key is required for RS256".to_string(),
                ));
            }
        } else {
            return Err(ConfigValidationError::InvalidValue(format!(
                "Unsupported jwt.algorithm: {}",
                self.jwt.algorithm
            )));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
