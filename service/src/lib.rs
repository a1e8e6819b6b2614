//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::{convert::Infallible, error::Error};

use common::operations::{By, Perform, Start};
use tokio::sync::mpsc;

use crate::{
    domain::event,
    infra::{demand, mailer, payments, Realtime},
};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Moment of a date an [`Event`] without a time-of-day is considered to
    /// start at.
    ///
    /// [`Event`]: domain::Event
    pub day_boundary: event::DayBoundary,

    /// [`task::CompleteElapsedEvents`] configuration.
    pub complete_elapsed_events: task::complete_elapsed_events::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    ///
    /// [`Database`]: infra::Database
    database: Db,

    /// Payment verification [`Gateway`] of this [`Service`].
    ///
    /// [`Gateway`]: payments::Gateway
    payments: payments::Gateway,

    /// Demand [`Estimator`] of this [`Service`].
    ///
    /// [`Estimator`]: demand::Estimator
    demand: demand::Estimator,

    /// [`Realtime`] channel of this [`Service`].
    channel: Realtime,

    /// Receipt mailer of this [`Service`], if configured.
    mailer: Option<mailer::Smtp>,

    /// Queue of the [`task::NotifyBooking`] worker.
    ///
    /// Sending never blocks, so a committed booking is never held back by
    /// its own fan-out.
    notify: mpsc::UnboundedSender<task::NotifyBooking>,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    pub fn new(
        config: Config,
        database: Db,
        payments: payments::Gateway,
        demand: demand::Estimator,
        channel: Realtime,
        mailer: Option<mailer::Smtp>,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::CompleteElapsedEvents<Self>,
                        task::complete_elapsed_events::Config,
                    >,
                >,
                Ok = (),
                Err: Error + 'static,
            > + Task<Perform<task::NotifyBooking>, Ok = (), Err = Infallible>
            + Clone
            + 'static,
    {
        let (notify, mut notify_rx) = mpsc::unbounded_channel();

        let this = Service {
            config,
            database,
            payments,
            demand,
            channel,
            mailer,
            notify,
        };

        let mut bg = task::Background::default();

        let svc = this.clone();
        bg.spawn(async move {
            svc.execute(Start(By::new(
                svc.config().complete_elapsed_events,
            )))
            .await
        });

        let svc = this.clone();
        bg.spawn(async move {
            while let Some(notify) = notify_rx.recv().await {
                _ = svc.execute(Perform(notify)).await;
            }
            Ok::<_, Infallible>(())
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    ///
    /// [`Database`]: infra::Database
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns the payment verification [`Gateway`] of this [`Service`].
    ///
    /// [`Gateway`]: payments::Gateway
    #[must_use]
    pub fn payments(&self) -> &payments::Gateway {
        &self.payments
    }

    /// Returns the demand [`Estimator`] of this [`Service`].
    ///
    /// [`Estimator`]: demand::Estimator
    #[must_use]
    pub fn demand(&self) -> &demand::Estimator {
        &self.demand
    }

    /// Returns the [`Realtime`] channel of this [`Service`].
    #[must_use]
    pub fn channel(&self) -> &Realtime {
        &self.channel
    }

    /// Returns the receipt mailer of this [`Service`], if configured.
    #[must_use]
    pub fn mailer(&self) -> Option<&mailer::Smtp> {
        self.mailer.as_ref()
    }

    /// Enqueues the provided [`task::NotifyBooking`] for the fan-out
    /// worker.
    ///
    /// Never blocks the caller.
    ///
    /// # Errors
    ///
    /// If the worker is not running anymore.
    pub fn notify(
        &self,
        notify: task::NotifyBooking,
    ) -> Result<(), mpsc::error::SendError<task::NotifyBooking>> {
        self.notify.send(notify)
    }
}
