//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{domain::user, query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Event` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `EVENT_NOT_EXISTS` - the `Event` with the specified ID does not
    ///                        exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "event",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn event(
        id: api::event::Id,
        ctx: &Context,
    ) -> Result<api::Event, Error> {
        ctx.service()
            .execute(query::event::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| EventError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Fetches the page of `Event`s, optionally filtered by their status.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            gql.name = "events",
            last = ?last,
            otel.name = Self::SPAN_NAME,
            status = ?status,
        ),
    )]
    pub async fn events(
        first: Option<i32>,
        after: Option<api::event::list::Cursor>,
        last: Option<i32>,
        before: Option<api::event::list::Cursor>,
        status: Option<api::event::Status>,
        ctx: &Context,
    ) -> Result<api::event::list::Connection, Error> {
        const DEFAULT_PAGE_SIZE: i32 = 10;

        let arguments = read::event::list::Arguments::new(
            first,
            after.map(Into::into),
            last,
            before.map(Into::into),
            DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::Ambiguous.into())
        .map_err(ctx.error())?;

        ctx.service()
            .execute(query::events::List::by(read::event::list::Selector {
                arguments,
                filter: read::event::list::Filter {
                    status: status.map(Into::into),
                },
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the total count of `Event`s.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "eventsTotalCount",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn events_total_count(ctx: &Context) -> Result<i32, Error> {
        ctx.service()
            .execute(query::events::TotalCount::by(()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Booking` with the specified ID.
    ///
    /// Available to the purchaser of the `Booking` and to administrators.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the caller is not authenticated;
    /// - `BOOKING_NOT_EXISTS` - the `Booking` with the specified ID does not
    ///                          exist, or the caller may not see it.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "booking",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn booking(
        id: api::booking::Id,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let identity = ctx.identity().await?;

        let booking = ctx
            .service()
            .execute(query::booking::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| BookingError::NotExists.into())
            .map_err(ctx.error())?;

        // Hide foreign bookings rather than acknowledging their existence.
        if booking.purchaser_id != identity.user_id
            && identity.role != user::Role::Admin
        {
            return Err(ctx.error()(BookingError::NotExists.into()));
        }

        Ok(booking.into())
    }

    /// Fetches the page of the authenticated `User`'s `Booking`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the caller is not authenticated;
    /// - `AMBIGUOUS_PAGINATION_ARGUMENTS` - the pagination arguments are
    ///                                      ambiguous.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            before = ?before,
            first = ?first,
            gql.name = "myBookings",
            last = ?last,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_bookings(
        first: Option<i32>,
        after: Option<api::booking::list::Cursor>,
        last: Option<i32>,
        before: Option<api::booking::list::Cursor>,
        ctx: &Context,
    ) -> Result<api::booking::list::Connection, Error> {
        const DEFAULT_PAGE_SIZE: i32 = 10;

        let identity = ctx.identity().await?;

        let arguments = read::booking::list::Arguments::new(
            first,
            after.map(Into::into),
            last,
            before.map(Into::into),
            DEFAULT_PAGE_SIZE,
        )
        .ok_or_else(|| api::PaginationError::Ambiguous.into())
        .map_err(ctx.error())?;

        ctx.service()
            .execute(query::bookings::List::by(
                read::booking::list::Selector {
                    arguments,
                    filter: read::booking::list::Filter {
                        purchaser_id: identity.user_id,
                    },
                },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum EventError {
        #[code = "EVENT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Event` with the provided ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum BookingError {
        #[code = "BOOKING_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Booking` with the provided ID does not exist"]
        NotExists,
    }
}
