use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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

/// Top-level configuration for the screening service and CLI.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub classifier: ClassifierConfig,
    pub notification: NotificationConfig,
    pub sessions: SessionStoreConfig,
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
        let format = LogFormat::parse(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        )?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            classifier: ClassifierConfig::from_env()?,
            notification: NotificationConfig::from_env()?,
            sessions: SessionStoreConfig::from_env()?,
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

/// Output shape of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnknownLogFormat(other.to_string())),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

pub const DEFAULT_CLASSIFIER_URL: &str = "http://localhost:5001";
const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 5_000;

/// Remote predictor location. A missing base URL disables augmentation entirely.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl ClassifierConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = match env::var("CLASSIFIER_BASE_URL") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(value.trim().trim_end_matches('/').to_string()),
            Err(_) => Some(DEFAULT_CLASSIFIER_URL.to_string()),
        };

        let timeout_ms = match env::var("CLASSIFIER_TIMEOUT_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidClassifierTimeout)?,
            Err(_) => DEFAULT_CLASSIFIER_TIMEOUT_MS,
        };

        Ok(Self {
            base_url,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_CLASSIFIER_URL.to_string()),
            timeout: Duration::from_millis(DEFAULT_CLASSIFIER_TIMEOUT_MS),
        }
    }
}

const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 30 * 60;
const DEFAULT_SESSION_CAPACITY: usize = 10_000;

/// Retention limits for in-flight screening sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStoreConfig {
    /// Sessions untouched for longer than this are dropped on the next start.
    pub idle_ttl: Duration,
    /// Upper bound on stored sessions; the least recently touched go first.
    pub capacity: usize,
}

impl SessionStoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let idle_secs = match env::var("SESSION_IDLE_TTL_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidSessionRetention("SESSION_IDLE_TTL_SECS"))?,
            Err(_) => DEFAULT_SESSION_IDLE_TTL_SECS,
        };
        let capacity = match env::var("SESSION_CAPACITY") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|cap| *cap > 0)
                .ok_or(ConfigError::InvalidSessionRetention("SESSION_CAPACITY"))?,
            Err(_) => DEFAULT_SESSION_CAPACITY,
        };

        Ok(Self {
            idle_ttl: Duration::from_secs(idle_secs),
            capacity,
        })
    }
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(DEFAULT_SESSION_IDLE_TTL_SECS),
            capacity: DEFAULT_SESSION_CAPACITY,
        }
    }
}

/// Which notification sink receives completed reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStrategy {
    MailDraft,
    EmailJs,
    Disabled,
}

impl NotificationStrategy {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "mail_draft" | "mailto" | "draft" => Ok(Self::MailDraft),
            "emailjs" | "transactional" => Ok(Self::EmailJs),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            other => Err(ConfigError::UnknownNotificationStrategy(other.to_string())),
        }
    }
}

pub const DEFAULT_EMAILJS_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Credentials for the EmailJS REST endpoint.
#[derive(Debug, Clone)]
pub struct EmailJsConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
    pub endpoint: String,
}

/// Addressing and strategy for result notifications.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub strategy: NotificationStrategy,
    pub to_name: String,
    pub to_email: String,
    pub from_name: String,
    pub from_email: String,
    pub emailjs: Option<EmailJsConfig>,
}

impl NotificationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let strategy = NotificationStrategy::parse(
            &env::var("NOTIFY_STRATEGY").unwrap_or_else(|_| "mail_draft".to_string()),
        )?;

        let defaults = Self::default();
        let emailjs = match (
            env::var("EMAILJS_SERVICE_ID").ok(),
            env::var("EMAILJS_TEMPLATE_ID").ok(),
            env::var("EMAILJS_PUBLIC_KEY").ok(),
        ) {
            (Some(service_id), Some(template_id), Some(public_key)) => Some(EmailJsConfig {
                service_id,
                template_id,
                public_key,
                endpoint: env::var("EMAILJS_ENDPOINT")
                    .unwrap_or_else(|_| DEFAULT_EMAILJS_ENDPOINT.to_string()),
            }),
            _ => None,
        };

        let config = Self {
            strategy,
            to_name: env::var("NOTIFY_TO_NAME").unwrap_or(defaults.to_name),
            to_email: env::var("NOTIFY_TO_EMAIL").unwrap_or(defaults.to_email),
            from_name: env::var("NOTIFY_FROM_NAME").unwrap_or(defaults.from_name),
            from_email: env::var("NOTIFY_FROM_EMAIL").unwrap_or(defaults.from_email),
            emailjs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strategy == NotificationStrategy::EmailJs && self.emailjs.is_none() {
            return Err(ConfigError::MissingEmailJsCredentials);
        }
        if self.strategy != NotificationStrategy::Disabled && !self.to_email.contains('@') {
            return Err(ConfigError::InvalidRecipient(self.to_email.clone()));
        }
        Ok(())
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            strategy: NotificationStrategy::MailDraft,
            to_name: "Screening Results".to_string(),
            to_email: "results@autism-screening.demo".to_string(),
            from_name: "Autism Screening Bot".to_string(),
            from_email: "noreply@autism-screening.demo".to_string(),
            emailjs: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidClassifierTimeout,
    InvalidSessionRetention(&'static str),
    UnknownLogFormat(String),
    UnknownNotificationStrategy(String),
    MissingEmailJsCredentials,
    InvalidRecipient(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidClassifierTimeout => {
                write!(f, "CLASSIFIER_TIMEOUT_MS must be a positive integer")
            }
            ConfigError::InvalidSessionRetention(key) => {
                write!(f, "{key} must be a positive integer")
            }
            ConfigError::UnknownLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT '{value}' is not one of compact, json")
            }
            ConfigError::UnknownNotificationStrategy(value) => write!(
                f,
                "NOTIFY_STRATEGY '{value}' is not one of mail_draft, emailjs, disabled"
            ),
            ConfigError::MissingEmailJsCredentials => write!(
                f,
                "NOTIFY_STRATEGY=emailjs requires EMAILJS_SERVICE_ID, EMAILJS_TEMPLATE_ID and EMAILJS_PUBLIC_KEY"
            ),
            ConfigError::InvalidRecipient(value) => {
                write!(f, "NOTIFY_TO_EMAIL '{value}' is not an email address")
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
