//! Demand estimation collaborator.
//!
//! An external model scores the expected demand of an [`Event`] into a
//! price [`Multiplier`]. The collaborator may be unreachable, misbehave or
//! be disabled altogether; callers are expected to fall back to
//! [`Multiplier::default()`] on any [`Error`].

use std::time::Duration;

use common::{DateTime, Multiplier};
use derive_more::{Display, Error as StdError, From};
use serde::{Deserialize, Serialize};

use crate::domain::Event;

/// [`Estimator`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// URL of the demand estimation endpoint.
    ///
    /// [`None`] disables estimation entirely.
    pub url: Option<String>,

    /// Timeout of a single estimation request.
    pub timeout: Duration,
}

/// Client of the external demand estimation model.
#[derive(Clone, Debug)]
pub struct Estimator {
    /// HTTP client to call the model with.
    client: reqwest::Client,

    /// URL of the demand estimation endpoint, if enabled.
    url: Option<String>,
}

impl Estimator {
    /// Creates a new [`Estimator`] with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, CreationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(CreationError::Client)?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// Estimates the demand [`Multiplier`] of the provided [`Event`].
    ///
    /// # Errors
    ///
    /// If estimation is disabled, the model is unreachable, or returns an
    /// unusable value.
    pub async fn estimate(&self, event: &Event) -> Result<Multiplier, Error> {
        let Some(url) = self.url.as_deref() else {
            return Err(Error::Disabled);
        };

        let response = self
            .client
            .post(url)
            .json(&Features::of(event))
            .send()
            .await?
            .error_for_status()?
            .json::<Estimate>()
            .await?;

        Multiplier::from_f64(response.multiplier)
            .ok_or(Error::InvalidMultiplier(response.multiplier))
    }
}

/// Feature vector the demand model is scored with.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Features {
    /// Hour of the day the [`Event`] starts at.
    hour: u8,

    /// Indicator whether the [`Event`] takes place on a weekend.
    is_weekend: u8,

    /// Number of days until the [`Event`] starts, `0` for already started.
    days_until_event: u64,

    /// Share of booked seats across the [`Event`], in `0.0..=1.0`.
    occupancy_rate: f64,
}

impl Features {
    /// Default hour-of-day assumed when an [`Event`] has no time-of-day.
    const DEFAULT_HOUR: u8 = 18;

    /// Extracts the [`Features`] of the provided [`Event`].
    fn of(event: &Event) -> Self {
        const DAY_SECS: u64 = 60 * 60 * 24;

        let days_until_event = {
            let starts = DateTime::from_utc(
                event.schedule.date,
                event.schedule.time.unwrap_or(time::Time::MIDNIGHT),
            );
            let now = DateTime::now();
            if starts > now {
                (starts - now).as_secs().div_ceil(DAY_SECS)
            } else {
                0
            }
        };

        Self {
            hour: event
                .schedule
                .time
                .map_or(Self::DEFAULT_HOUR, |t| t.hour()),
            is_weekend: matches!(
                event.schedule.date.weekday(),
                time::Weekday::Saturday | time::Weekday::Sunday,
            )
            .into(),
            days_until_event,
            occupancy_rate: event.occupancy(),
        }
    }
}

/// Response of the demand model.
#[derive(Clone, Copy, Debug, Deserialize)]
struct Estimate {
    /// Estimated demand multiplier.
    multiplier: f64,
}

/// Error of a demand estimation.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Estimation is disabled by configuration.
    #[display("demand estimation is disabled")]
    Disabled,

    /// HTTP request to the model failed.
    #[display("demand model request failed: {_0}")]
    Http(reqwest::Error),

    /// Model returned a non-positive or non-finite multiplier.
    #[display("demand model returned invalid multiplier: {_0}")]
    InvalidMultiplier(#[error(not(source))] f64),
}

/// Error of creating a new [`Estimator`].
#[derive(Debug, Display, StdError)]
pub enum CreationError {
    /// HTTP client cannot be built.
    #[display("failed to build HTTP client: {_0}")]
    Client(reqwest::Error),
}
