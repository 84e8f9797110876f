use crate::study::locale::Locale;
use crate::study::recruitment::PeriodPolicy;
use chrono::Duration;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub study: StudyConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            Err(_) => LogFormat::Compact,
        };

        let study = StudyConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
                ansi: environment == AppEnvironment::Development,
            },
            study,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Output layout of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub ansi: bool,
}

/// Study-wide business settings shared by the services.
#[derive(Debug, Clone)]
pub struct StudyConfig {
    pub locale: Locale,
    pub period_policy: PeriodPolicy,
    /// Days after hospital creation before an incomplete form is urgent.
    pub urgency_days: i64,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            period_policy: PeriodPolicy::default(),
            urgency_days: 7,
        }
    }
}

impl StudyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let locale = match env::var("EPICQ_LOCALE") {
            Ok(raw) => Locale::parse(&raw).ok_or(ConfigError::InvalidLocale(raw))?,
            Err(_) => defaults.locale,
        };

        let period_policy = match env::var("EPICQ_PERIOD_RULES") {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "full" => PeriodPolicy::default(),
                "overlap_only" | "overlap-only" => PeriodPolicy::overlap_only(),
                _ => return Err(ConfigError::InvalidPeriodRules(raw)),
            },
            Err(_) => defaults.period_policy,
        };

        let urgency_days = match env::var("EPICQ_URGENCY_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|days| *days >= 0 && Duration::try_days(*days).is_some())
                .ok_or(ConfigError::InvalidUrgencyDays)?,
            Err(_) => defaults.urgency_days,
        };

        Ok(Self {
            locale,
            period_policy,
            urgency_days,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidLocale(String),
    InvalidPeriodRules(String),
    InvalidUrgencyDays,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'pretty' (got '{value}')")
            }
            ConfigError::InvalidLocale(value) => {
                write!(f, "EPICQ_LOCALE must be 'es' or 'en' (got '{value}')")
            }
            ConfigError::InvalidPeriodRules(value) => write!(
                f,
                "EPICQ_PERIOD_RULES must be 'full' or 'overlap_only' (got '{value}')"
            ),
            ConfigError::InvalidUrgencyDays => {
                write!(f, "EPICQ_URGENCY_DAYS must be a non-negative integer within range")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
