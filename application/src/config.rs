//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::SecretString;
use serde::Deserialize;
use service::domain::event::DayBoundary;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// Secret the identity tokens are verified with.
    ///
    /// Tokens are issued by an external identity service sharing this
    /// secret.
    #[default(SecretString::from("secret"))]
    pub jwt_secret: SecretString,

    /// Moment of a date an event without a time-of-day is considered to
    /// start at.
    pub day_boundary: DayBoundary,

    /// Payment gateway configuration.
    pub payments: Payments,

    /// Demand estimation configuration.
    pub demand: Demand,

    /// Receipt mailer configuration.
    ///
    /// Receipts are not sent when omitted.
    pub mailer: Option<Mailer>,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl From<&Service> for service::Config {
    fn from(value: &Service) -> Self {
        Self {
            day_boundary: value.day_boundary,
            complete_elapsed_events:
                service::task::complete_elapsed_events::Config {
                    interval: value.tasks.complete_elapsed_events.interval,
                },
        }
    }
}

/// Payment gateway configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Payments {
    /// Secret key shared with the payment gateway.
    #[default(SecretString::from("secret"))]
    pub key_secret: SecretString,

    /// Indicator whether a payment proof is required for every booking.
    ///
    /// Disabled by default to allow trusted-mode bookings in development.
    pub required: bool,
}

impl From<&Payments> for service::infra::payments::Config {
    fn from(value: &Payments) -> Self {
        Self {
            key_secret: value.key_secret.clone(),
            required: value.required,
        }
    }
}

/// Demand estimation configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Demand {
    /// URL of the demand estimation endpoint.
    ///
    /// Estimation is disabled when omitted, making every booking use the
    /// neutral multiplier.
    pub url: Option<String>,

    /// Timeout of a single estimation request.
    #[default(time::Duration::from_secs(2))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,
}

impl From<&Demand> for service::infra::demand::Config {
    fn from(value: &Demand) -> Self {
        Self {
            url: value.url.clone(),
            timeout: value.timeout,
        }
    }
}

/// Receipt mailer configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Mailer {
    /// SMTP relay host.
    pub host: String,

    /// Username to authenticate on the relay with.
    pub username: String,

    /// Password to authenticate on the relay with.
    pub password: SecretString,

    /// Mailbox the receipts are sent from.
    pub from: String,
}

impl From<&Mailer> for service::infra::mailer::Config {
    fn from(value: &Mailer) -> Self {
        Self {
            host: value.host.clone(),
            username: value.username.clone(),
            password: value.password.clone(),
            from: value.from.clone(),
        }
    }
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `CompleteElapsedEvents` task configuration.
    pub complete_elapsed_events: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}
