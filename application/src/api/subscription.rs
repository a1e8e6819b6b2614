//! GraphQL [`Subscription`]s definitions.

use common::Money;
use futures::{
    stream::{self, BoxStream},
    StreamExt as _,
};
use juniper::{graphql_object, graphql_subscription};
use service::infra::channel;
use tokio::sync::broadcast;

use crate::{api, Context, Error};

/// Root of all GraphQL subscriptions.
#[derive(Clone, Copy, Debug)]
pub struct Subscription;

/// Turns a [`broadcast::Receiver`] into a GraphQL subscription stream.
///
/// Lagged receivers skip to the freshest payloads: seat-map deltas are
/// idempotent set unions, so dropped intermediate ones lose nothing a
/// re-read would not recover.
fn into_stream<T, O>(
    rx: broadcast::Receiver<T>,
    map: fn(T) -> O,
) -> BoxStream<'static, Result<O, Error>>
where
    T: Clone + Send + 'static,
    O: Send + 'static,
{
    stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(payload) => return Some((Ok(map(payload)), rx)),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

#[graphql_subscription(context = Context)]
impl Subscription {
    /// Streams deltas of newly booked seats of the specified `Event`.
    ///
    /// Deltas are idempotent set unions: applying one twice changes
    /// nothing, so clients may treat redelivery as a no-op.
    pub async fn seat_map(
        &self,
        event_id: api::event::Id,
        ctx: &Context,
    ) -> Result<BoxStream<'static, Result<SeatsDelta, Error>>, Error> {
        let rx = ctx.service().channel().subscribe_seats(event_id.into());
        Ok(into_stream(rx, Into::into))
    }

    /// Streams summaries of every new `Booking` across all `Event`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the caller is not authenticated;
    /// - `NOT_ADMIN` - the caller is not an administrator.
    pub async fn dashboard(
        &self,
        ctx: &Context,
    ) -> Result<BoxStream<'static, Result<DashboardUpdate, Error>>, Error>
    {
        _ = ctx.admin().await?;

        let rx = ctx.service().channel().subscribe_dashboard();
        Ok(into_stream(rx, Into::into))
    }
}

/// Delta of newly booked seats of one `Event`.
#[derive(Clone, Debug)]
pub struct SeatsDelta(channel::SeatsDelta);

impl From<channel::SeatsDelta> for SeatsDelta {
    fn from(delta: channel::SeatsDelta) -> Self {
        Self(delta)
    }
}

/// Delta of newly booked seats of one `Event`.
#[graphql_object(context = Context)]
impl SeatsDelta {
    /// ID of the `Event` the seats belong to.
    pub fn event_id(&self) -> api::event::Id {
        self.0.event_id.into()
    }

    /// Newly booked seats.
    pub fn seats(&self) -> Vec<BookedSeat> {
        self.0
            .seats
            .iter()
            .map(|&(section_id, seat)| BookedSeat {
                section_id: section_id.into(),
                seat: seat.into(),
            })
            .collect()
    }
}

/// One newly booked seat of a `Section`.
#[derive(Clone, Copy, Debug, juniper::GraphQLObject)]
#[graphql(context = Context)]
pub struct BookedSeat {
    /// ID of the `Section` the seat belongs to.
    pub section_id: api::event::SectionId,

    /// The booked seat.
    pub seat: api::event::Seat,
}

/// Summary of a new `Booking`, for dashboard consumers.
#[derive(Clone, Copy, Debug)]
pub struct DashboardUpdate(channel::DashboardEvent);

impl From<channel::DashboardEvent> for DashboardUpdate {
    fn from(event: channel::DashboardEvent) -> Self {
        Self(event)
    }
}

/// Summary of a new `Booking`, for dashboard consumers.
#[graphql_object(context = Context)]
impl DashboardUpdate {
    /// ID of the booked `Event`.
    pub fn event_id(&self) -> api::event::Id {
        let channel::DashboardEvent::NewBooking { event_id, .. } = self.0;
        event_id.into()
    }

    /// Total amount of the new `Booking`.
    pub fn amount(&self) -> Money {
        let channel::DashboardEvent::NewBooking { amount, .. } = self.0;
        amount
    }
}
