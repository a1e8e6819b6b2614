//! [`CompleteElapsedEvents`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Perform, Start, Update};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::event,
    infra::{database, Database},
    read, Service,
};
#[cfg(doc)]
use crate::domain::Event;

use super::Task;

/// Configuration for [`CompleteElapsedEvents`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between [`Event`] status sweeps.
    pub interval: time::Duration,
}

/// [`Task`] for marking [`Event`]s whose effective start has passed as
/// [`Completed`].
///
/// The transition is one-way: nothing ever reverts a [`Completed`] status
/// automatically.
///
/// [`Completed`]: event::Status::Completed
#[derive(Clone, Copy, Debug)]
pub struct CompleteElapsedEvents<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<CompleteElapsedEvents<Self>, Config>>> for Service<Db>
where
    CompleteElapsedEvents<Service<Db>>:
        Task<Perform<()>, Ok = u64, Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CompleteElapsedEvents<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CompleteElapsedEvents {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task
                .execute(Perform(()))
                .await
                .map(|completed| {
                    if completed > 0 {
                        log::info!("marked {completed} event(s) as completed");
                    }
                })
                .map_err(|e| {
                    log::error!("`task::CompleteElapsedEvents` failed: {e}");
                });
        }
    }
}

impl<Db> Task<Perform<()>> for CompleteElapsedEvents<Service<Db>>
where
    Db: Database<
        Update<By<read::event::Elapsed, event::DayBoundary>>,
        Ok = u64,
        Err = Traced<database::Error>,
    >,
{
    type Ok = u64;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let boundary = self.service.config().day_boundary;
        self.service
            .database()
            .execute(Update(By::new(boundary)))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Error of [`CompleteElapsedEvents`] execution.
pub type ExecutionError = Traced<database::Error>;
