use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::credentials::DEFAULT_LOG_N;
use crate::services::storage::BackendKind;
use crate::services::tokens::DEFAULT_TOKEN_VALIDITY;

pub const DEV_JWT_SECRET: &str = "karigar-connect-dev-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            "test" => Some(Self::Test),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    /// Explicit backend choice; `None` picks postgres when a URL is set.
    pub storage_backend: Option<BackendKind>,
    pub database_url: Option<String>,
    pub data_file: PathBuf,
    pub db_connect_timeout_seconds: u64,
    pub db_max_connections: u32,
    pub request_timeout_seconds: u64,
    pub cors_origins: Vec<String>,
    pub auth_rate_limit_max: usize,
    pub auth_rate_limit_window_seconds: u64,
    pub scrypt_log_n: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            environment: Environment::Development,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expires_in: DEFAULT_TOKEN_VALIDITY,
            storage_backend: None,
            database_url: None,
            data_file: PathBuf::from("data/karigar-connect.json"),
            db_connect_timeout_seconds: 5,
            db_max_connections: 10,
            request_timeout_seconds: 30,
            cors_origins: vec!["*".to_string()],
            auth_rate_limit_max: 20,
            auth_rate_limit_window_seconds: 60,
            scrypt_log_n: DEFAULT_LOG_N,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unparseable values keep the
    /// default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(host) = var("HOST") {
            config.host = host;
        }

        if let Some(port) = var("PORT").and_then(|p| p.trim().parse::<u16>().ok()) {
            config.port = port;
        }

        if let Some(environment) = var("APP_ENV")
            .or_else(|| var("NODE_ENV"))
            .and_then(|raw| Environment::parse(&raw))
        {
            config.environment = environment;
        }

        if let Some(secret) = var("JWT_SECRET") {
            config.jwt_secret = secret;
        }

        if let Some(validity) = var("JWT_EXPIRES_IN").and_then(|raw| parse_duration(&raw)) {
            config.jwt_expires_in = validity;
        }

        match var("STORAGE_BACKEND").map(|raw| raw.parse::<BackendKind>()) {
            Some(Ok(kind)) => config.storage_backend = Some(kind),
            Some(Err(unknown)) => {
                tracing::warn!("Ignoring unknown STORAGE_BACKEND value: {}", unknown)
            }
            None => {}
        }

        config.database_url = var("DATABASE_URL");

        if let Some(path) = var("DATA_FILE") {
            config.data_file = PathBuf::from(path);
        }

        if let Some(timeout) = var("DB_CONNECT_TIMEOUT_SECONDS").and_then(|t| t.parse().ok()) {
            config.db_connect_timeout_seconds = timeout;
        }

        if let Some(max) = var("DB_MAX_CONNECTIONS").and_then(|m| m.parse().ok()) {
            config.db_max_connections = max;
        }

        if let Some(timeout) = var("REQUEST_TIMEOUT_SECONDS").and_then(|t| t.parse().ok()) {
            config.request_timeout_seconds = timeout;
        }

        if let Some(origins) = var("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(max) = var("AUTH_RATE_LIMIT_MAX").and_then(|m| m.parse().ok()) {
            config.auth_rate_limit_max = max;
        }

        if let Some(window) = var("AUTH_RATE_LIMIT_WINDOW_SECONDS").and_then(|w| w.parse().ok()) {
            config.auth_rate_limit_window_seconds = window;
        }

        if let Some(log_n) = var("SCRYPT_LOG_N").and_then(|n| n.parse().ok()) {
            config.scrypt_log_n = log_n;
        }

        config
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn db_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.db_connect_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Parses `7d`, `12h`, `30m`, `45s` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let value: u64 = number.parse().ok()?;

    let seconds = match unit.trim() {
        "" | "s" => value,
        "m" => value.checked_mul(60)?,
        "h" => value.checked_mul(60 * 60)?,
        "d" => value.checked_mul(24 * 60 * 60)?,
        _ => return None,
    };
    (seconds > 0).then(|| Duration::from_secs(seconds))
}
