//! [`Booking`]-related definitions.

use common::{DateTime, Money, Multiplier};
use derive_more::{Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{
    graphql_object, GraphQLEnum, GraphQLInputObject, GraphQLScalar,
};
use service::{domain, query, Query as _};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    api::{self, event::Seat},
    AsError, Context, Error,
};

/// Committed reservation of seats for an `Event`.
#[derive(Clone, Debug)]
pub struct Booking {
    /// ID of this [`Booking`].
    pub id: Id,

    /// [`domain::Booking`] representing this [`Booking`].
    booking: OnceCell<domain::Booking>,
}

impl From<domain::Booking> for Booking {
    fn from(booking: domain::Booking) -> Self {
        Self {
            id: booking.id.into(),
            booking: OnceCell::new_with(Some(booking)),
        }
    }
}

impl Booking {
    /// Creates a new [`Booking`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Booking`] with the provided ID exists,
    /// otherwise accessing this [`Booking`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            booking: OnceCell::new(),
        }
    }

    /// Returns the [`domain::Booking`] representing this [`Booking`].
    ///
    /// # Errors
    ///
    /// Error if the [`domain::Booking`] doesn't exist.
    async fn booking(&self, ctx: &Context) -> Result<&domain::Booking, Error> {
        let id = self.id.into();
        self.booking
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::booking::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|b| {
                        futures::future::ready(b.ok_or_else(|| {
                            api::query::BookingError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// Committed reservation of seats for an `Event`.
#[graphql_object(context = Context)]
impl Booking {
    /// Unique identifier of this `Booking`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// `Event` this `Booking` reserves seats of.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.event",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn event(&self, ctx: &Context) -> Result<api::Event, Error> {
        let event_id = self.booking(ctx).await?.event_id;
        #[expect(
            unsafe_code,
            reason = "`Booking` references an existing `Event`"
        )]
        let event = unsafe { api::Event::new_unchecked(event_id) };
        Ok(event)
    }

    /// ID of the `User` who purchased this `Booking`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.purchaserId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn purchaser_id(
        &self,
        ctx: &Context,
    ) -> Result<api::user::Id, Error> {
        Ok(self.booking(ctx).await?.purchaser_id.into())
    }

    /// `Ticket` line items of this `Booking`, in request order.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.tickets",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn tickets(&self, ctx: &Context) -> Result<Vec<Ticket>, Error> {
        Ok(self
            .booking(ctx)
            .await?
            .tickets
            .iter()
            .cloned()
            .map(Into::into)
            .collect())
    }

    /// Total amount charged for this `Booking`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.totalAmount",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn total_amount(&self, ctx: &Context) -> Result<Money, Error> {
        Ok(self.booking(ctx).await?.total_amount)
    }

    /// Demand multiplier this `Booking` was priced with.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.multiplier",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn multiplier(&self, ctx: &Context) -> Result<Multiplier, Error> {
        Ok(self.booking(ctx).await?.multiplier)
    }

    /// Status of this `Booking`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn status(&self, ctx: &Context) -> Result<Status, Error> {
        Ok(self.booking(ctx).await?.status.into())
    }

    /// Reference to the verified payment, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.paymentRef",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn payment_ref(
        &self,
        ctx: &Context,
    ) -> Result<Option<String>, Error> {
        Ok(self
            .booking(ctx)
            .await?
            .payment_ref
            .as_ref()
            .map(ToString::to_string))
    }

    /// Entry-check code of this `Booking`, if generated already.
    ///
    /// Attached asynchronously after the `Booking` is created, so it may be
    /// absent right after booking.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.ticketCode",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn ticket_code(
        &self,
        ctx: &Context,
    ) -> Result<Option<String>, Error> {
        Ok(self
            .booking(ctx)
            .await?
            .ticket_code
            .as_ref()
            .map(ToString::to_string))
    }

    /// `DateTime` when this `Booking` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Booking.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.booking(ctx).await?.created_at.coerce())
    }
}

/// Unique identifier of a `Booking`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::booking::Id)]
#[into(domain::booking::Id)]
#[graphql(name = "BookingId", transparent)]
pub struct Id(Uuid);

/// Status of a `Booking`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "BookingStatus")]
pub enum Status {
    /// The `Booking` awaits payment confirmation.
    Pending,

    /// The `Booking` is paid (or trusted) and final.
    Confirmed,

    /// The `Booking` was cancelled.
    Cancelled,
}

impl From<domain::booking::Status> for Status {
    fn from(status: domain::booking::Status) -> Self {
        use domain::booking::Status as S;

        match status {
            S::Pending => Self::Pending,
            S::Confirmed => Self::Confirmed,
            S::Cancelled => Self::Cancelled,
        }
    }
}

/// Line item of a `Booking`.
#[derive(Clone, Debug, From, Into)]
pub struct Ticket(domain::booking::Ticket);

/// Line item of a `Booking`: one reserved seat with the price charged for
/// it.
#[graphql_object(context = Context)]
impl Ticket {
    /// ID of the `Section` the seat belongs to.
    pub fn section_id(&self) -> api::event::SectionId {
        self.0.section_id.into()
    }

    /// Name of the `Section` as it was at booking time.
    pub fn section_name(&self) -> api::event::SectionName {
        self.0.section_name.clone().into()
    }

    /// The reserved seat.
    pub fn seat(&self) -> Seat {
        self.0.seat.into()
    }

    /// Price charged for the seat.
    pub fn price(&self) -> Money {
        self.0.price
    }
}

/// One requested seat of a booking request.
#[derive(Clone, Copy, Debug, GraphQLInputObject)]
#[graphql(name = "TicketRequest")]
pub struct TicketRequest {
    /// ID of the `Section` the seat belongs to.
    pub section_id: api::event::SectionId,

    /// The requested seat.
    pub seat: Seat,
}

/// Proof of a payment completed on the gateway side.
#[derive(Clone, Debug, GraphQLInputObject)]
#[graphql(name = "PaymentProof")]
pub struct PaymentProof {
    /// ID of the gateway order the payment was made for.
    pub order_id: String,

    /// ID of the payment itself.
    pub payment_id: String,

    /// Hex-encoded signature of the order/payment pair.
    pub signature: String,
}

pub mod list {
    //! Definitions related to [`Booking`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::read;

    use crate::{api::scalar, Context};

    use super::{Booking, Id};

    /// Cursor for the `Booking` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::booking::list::Cursor)]
    #[graphql(
        name = "BookingListCursor",
        with = scalar::Via::<read::booking::list::Cursor>,
    )]
    pub struct Cursor(pub read::booking::list::Cursor);

    /// Edge in the [`Booking`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct Edge(read::booking::list::Edge);

    /// Edge in the `Booking` list.
    #[graphql_object(name = "BookingListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `BookingListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `BookingListEdge`.
        #[must_use]
        pub fn node(&self) -> Booking {
            #[expect(
                unsafe_code,
                reason = "`Edge` loaded from repository guarantees `Booking` \
                          existence"
            )]
            unsafe {
                Booking::new_unchecked(self.0.node)
            }
        }
    }

    /// Connection of the [`Booking`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Connection(read::booking::list::Connection);

    /// Connection of the `Booking` list.
    #[graphql_object(name = "BookingListConnection", context = Context)]
    impl Connection {
        /// Edges in this `BookingListConnection`.
        #[must_use]
        pub fn edges(&self) -> Vec<Edge> {
            self.0.edges.iter().copied().map(Into::into).collect()
        }

        /// Information about the page.
        #[must_use]
        pub fn page_info(&self) -> PageInfo {
            self.0.page_info().into()
        }
    }

    /// Information about a page in the [`Booking`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct PageInfo(read::booking::list::PageInfo);

    /// Information about a page in the `Booking` list.
    #[graphql_object(name = "BookingListPageInfo", context = Context)]
    impl PageInfo {
        /// Last cursor on this page.
        #[must_use]
        pub fn end_cursor(&self) -> Option<Cursor> {
            self.0.end_cursor.map(Into::into)
        }

        /// Indicator whether there is a next page.
        #[must_use]
        pub fn has_next_page(&self) -> bool {
            self.0.has_next_page
        }

        /// Indicator whether there is a previous page.
        #[must_use]
        pub fn has_previous_page(&self) -> bool {
            self.0.has_previous_page
        }
    }
}
