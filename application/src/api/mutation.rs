//! GraphQL [`Mutation`]s definitions.

use common::Money;
use juniper::graphql_object;
use service::{
    command, domain::event, infra::payments, Command as _,
};
use time::macros::format_description;

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Books the requested seats of an `Event` for the authenticated `User`.
    ///
    /// Returns the committed `Booking` with one priced `Ticket` per
    /// requested seat.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the caller is not authenticated;
    /// - `EVENT_NOT_EXISTS` - the `Event` does not exist;
    /// - `PAYMENT_REJECTED` - the payment proof failed verification or is
    ///                        required but missing;
    /// - `BOOKING_CLOSED` - the `Event` has started, ended or is cancelled;
    /// - `INVALID_SECTION` - a requested `Section` does not belong to the
    ///                       `Event`;
    /// - `SEAT_UNAVAILABLE` - a requested seat is already booked (the
    ///                        message names it);
    /// - `NO_SEATS_REQUESTED` - the seat list is empty.
    #[tracing::instrument(
        skip_all,
        fields(
            event_id = %event_id,
            gql.name = "bookTickets",
            otel.name = Self::SPAN_NAME,
            tickets = tickets.len(),
        ),
    )]
    pub async fn book_tickets(
        event_id: api::event::Id,
        tickets: Vec<api::booking::TicketRequest>,
        payment: Option<api::booking::PaymentProof>,
        ctx: &Context,
    ) -> Result<api::Booking, Error> {
        let identity = ctx.identity().await?;

        ctx.service()
            .execute(command::SubmitBooking {
                event_id: event_id.into(),
                purchaser_id: identity.user_id,
                seats: tickets
                    .into_iter()
                    .map(|t| (t.section_id.into(), t.seat.into()))
                    .collect(),
                payment: payment.map(|p| payments::Proof {
                    order_id: p.order_id,
                    payment_id: p.payment_id,
                    signature: p.signature,
                }),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a new `Event` with the provided seating layout.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the caller is not authenticated;
    /// - `NOT_ADMIN` - the caller is not an administrator;
    /// - `INVALID_SCHEDULE` - the provided date or time cannot be parsed;
    /// - `INVALID_SECTION_LAYOUT` - a section grid or base price is
    ///                              unusable.
    #[tracing::instrument(
        skip_all,
        fields(
            date = %date,
            gql.name = "createEvent",
            otel.name = Self::SPAN_NAME,
            title = %title,
        ),
    )]
    #[expect(clippy::too_many_arguments, reason = "still readable")]
    pub async fn create_event(
        title: api::event::Title,
        description: Option<api::event::Description>,
        category: Option<api::event::Category>,
        location: api::event::Location,
        date: String,
        time: Option<String>,
        sections: Vec<NewSection>,
        ctx: &Context,
    ) -> Result<api::Event, Error> {
        let identity = ctx.admin().await?;

        let date = time::Date::parse(
            &date,
            format_description!("[year]-[month]-[day]"),
        )
        .map_err(|_| Error::from(MutationError::InvalidSchedule))
        .map_err(ctx.error())?;
        let time = time
            .map(|t| {
                time::Time::parse(&t, format_description!("[hour]:[minute]"))
            })
            .transpose()
            .map_err(|_| Error::from(MutationError::InvalidSchedule))
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateEvent {
                title: title.into(),
                description: description.map(Into::into),
                category: category.map(Into::into),
                location: location.into(),
                schedule: event::Schedule { date, time },
                sections: sections
                    .into_iter()
                    .map(|s| {
                        Ok(command::create_event::NewSection {
                            name: s.name.into(),
                            rows: u8::try_from(s.rows).map_err(|_| {
                                MutationError::InvalidSectionLayout
                            })?,
                            cols: u16::try_from(s.cols).map_err(|_| {
                                MutationError::InvalidSectionLayout
                            })?,
                            base_price: s.base_price,
                        })
                    })
                    .collect::<Result<_, MutationError>>()
                    .map_err(Error::from)
                    .map_err(ctx.error())?,
                created_by: identity.user_id,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

/// Layout of one `Section` of a new `Event`.
#[derive(Clone, Debug, juniper::GraphQLInputObject)]
#[graphql(name = "NewSection")]
pub struct NewSection {
    /// Name of the `Section`.
    pub name: api::event::SectionName,

    /// Number of seat rows in the `Section`.
    pub rows: i32,

    /// Number of seat columns in the `Section`.
    pub cols: i32,

    /// Base price of one seat of the `Section`.
    pub base_price: Money,
}

define_error! {
    enum MutationError {
        #[code = "INVALID_SCHEDULE"]
        #[status = BAD_REQUEST]
        #[message = "Provided date or time cannot be parsed"]
        InvalidSchedule,

        #[code = "INVALID_SECTION_LAYOUT"]
        #[status = BAD_REQUEST]
        #[message = "Provided section layout is unusable"]
        InvalidSectionLayout,
    }
}

impl AsError for command::submit_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::submit_booking::ExecutionError as E;

        let (code, status_code) = match self {
            E::Db(e) => return e.try_as_error(),
            E::BookingClosed(_) => {
                ("BOOKING_CLOSED", http::StatusCode::BAD_REQUEST)
            }
            E::EventNotExists(_) => {
                ("EVENT_NOT_EXISTS", http::StatusCode::NOT_FOUND)
            }
            E::NoSeatsRequested => {
                ("NO_SEATS_REQUESTED", http::StatusCode::BAD_REQUEST)
            }
            E::PaymentRejected => {
                ("PAYMENT_REJECTED", http::StatusCode::PAYMENT_REQUIRED)
            }
            E::SeatUnavailable(_) => {
                ("SEAT_UNAVAILABLE", http::StatusCode::CONFLICT)
            }
            E::SectionNotInEvent(_) => {
                ("INVALID_SECTION", http::StatusCode::BAD_REQUEST)
            }
            E::UserNotExists(_) => {
                ("USER_NOT_EXISTS", http::StatusCode::NOT_FOUND)
            }
        };

        Some(Error {
            code,
            status_code,
            message: self.to_string(),
            backtrace: None,
        })
    }
}

impl AsError for command::create_event::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::create_event::ExecutionError as E;

        let code = match self {
            E::Db(e) => return e.try_as_error(),
            E::InvalidBasePrice(_) | E::InvalidGrid { .. } => {
                "INVALID_SECTION_LAYOUT"
            }
            E::NoSections => "NO_SECTIONS",
        };

        Some(Error {
            code,
            status_code: http::StatusCode::BAD_REQUEST,
            message: self.to_string(),
            backtrace: None,
        })
    }
}
