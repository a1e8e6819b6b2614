//! [`Event`]-related definitions.

use common::{DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query, Query as _};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A bookable `Event` of the system.
#[derive(Clone, Debug)]
pub struct Event {
    /// ID of this [`Event`].
    pub id: Id,

    /// [`domain::Event`] representing this [`Event`].
    event: OnceCell<domain::Event>,
}

impl From<domain::Event> for Event {
    fn from(event: domain::Event) -> Self {
        Self {
            id: event.id.into(),
            event: OnceCell::new_with(Some(event)),
        }
    }
}

impl Event {
    /// Creates a new [`Event`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Event`] with the provided ID exists,
    /// otherwise accessing this [`Event`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            event: OnceCell::new(),
        }
    }

    /// Returns the [`domain::Event`] representing this [`Event`].
    ///
    /// # Errors
    ///
    /// Error if the [`domain::Event`] doesn't exist.
    async fn event(&self, ctx: &Context) -> Result<&domain::Event, Error> {
        let id = self.id.into();
        self.event
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::event::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|e| {
                        futures::future::ready(e.ok_or_else(|| {
                            api::query::EventError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// A bookable `Event` of the system.
#[graphql_object(context = Context)]
impl Event {
    /// Unique identifier of this `Event`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Event.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Title of this `Event`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Event.title",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn title(&self, ctx: &Context) -> Result<Title, Error> {
        Ok(self.event(ctx).await?.title.clone().into())
    }

    /// Description of this `Event`, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Event.description",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn description(
        &self,
        ctx: &Context,
    ) -> Result<Option<Description>, Error> {
        Ok(self.event(ctx).await?.description.clone().map(Into::into))
    }

    /// Category of this `Event`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Event.category",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn category(&self, ctx: &Context) -> Result<Category, Error> {
        Ok(self.event(ctx).await?.category.clone().into())
    }

    /// Location this `Event` takes place at.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Event.location",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn location(&self, ctx: &Context) -> Result<Location, Error> {
        Ok(self.event(ctx).await?.location.clone().into())
    }

    /// Date this `Event` starts at, in `YYYY-MM-DD` format.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Event.date",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn date(&self, ctx: &Context) -> Result<String, Error> {
        Ok(self.event(ctx).await?.schedule.date.to_string())
    }

    /// Time-of-day this `Event` starts at, in `HH:MM` format, if known.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Event.time",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn time(&self, ctx: &Context) -> Result<Option<String>, Error> {
        Ok(self
            .event(ctx)
            .await?
            .schedule
            .time
            .map(|t| format!("{:02}:{:02}", t.hour(), t.minute())))
    }

    /// Lifecycle status of this `Event`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Event.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn status(&self, ctx: &Context) -> Result<Status, Error> {
        Ok(self.event(ctx).await?.status.into())
    }

    /// Seating `Section`s of this `Event`, in display order.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Event.sections",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn sections(&self, ctx: &Context) -> Result<Vec<Section>, Error> {
        Ok(self
            .event(ctx)
            .await?
            .sections
            .iter()
            .cloned()
            .map(Into::into)
            .collect())
    }

    /// Total number of seats sold for this `Event`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Event.soldCount",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn sold_count(&self, ctx: &Context) -> Result<i32, Error> {
        Ok(i32::try_from(self.event(ctx).await?.sold_count)
            .unwrap_or(i32::MAX))
    }

    /// Total amount of all confirmed `Booking`s of this `Event`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN` - the current `User` is not an administrator.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Event.revenue",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn revenue(&self, ctx: &Context) -> Result<Option<Money>, Error> {
        _ = ctx.admin().await?;

        ctx.service()
            .execute(query::booking::Revenue::by(self.id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|r| r.0)
    }

    /// `DateTime` when this `Event` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Event.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.event(ctx).await?.created_at.coerce())
    }
}

/// Unique identifier of an `Event`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::event::Id)]
#[into(domain::event::Id)]
#[graphql(name = "EventId", transparent)]
pub struct Id(Uuid);

/// Title of an `Event`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "EventTitle",
    with = scalar::Via::<domain::event::Title>,
)]
pub struct Title(domain::event::Title);

/// Description of an `Event`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "EventDescription",
    with = scalar::Via::<domain::event::Description>,
)]
pub struct Description(domain::event::Description);

/// Category of an `Event`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "EventCategory",
    with = scalar::Via::<domain::event::Category>,
)]
pub struct Category(domain::event::Category);

/// Location of an `Event`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "EventLocation",
    with = scalar::Via::<domain::event::Location>,
)]
pub struct Location(domain::event::Location);

/// Single bookable seat of a `Section`, in `{row-letter}{column}` format
/// (e.g. `A1`).
#[derive(
    AsRef,
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    From,
    GraphQLScalar,
    Into,
    PartialEq,
)]
#[graphql(
    name = "Seat",
    with = scalar::Via::<domain::event::Seat>,
)]
pub struct Seat(domain::event::Seat);

/// Lifecycle status of an `Event`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "EventStatus")]
pub enum Status {
    /// The `Event` is scheduled and has not started yet.
    Upcoming,

    /// The `Event` is currently in progress.
    Ongoing,

    /// The `Event` has passed its scheduled start.
    Completed,

    /// The `Event` was cancelled.
    Cancelled,
}

impl From<domain::event::Status> for Status {
    fn from(status: domain::event::Status) -> Self {
        use domain::event::Status as S;

        match status {
            S::Upcoming => Self::Upcoming,
            S::Ongoing => Self::Ongoing,
            S::Completed => Self::Completed,
            S::Cancelled => Self::Cancelled,
        }
    }
}

impl From<Status> for domain::event::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Upcoming => Self::Upcoming,
            Status::Ongoing => Self::Ongoing,
            Status::Completed => Self::Completed,
            Status::Cancelled => Self::Cancelled,
        }
    }
}

/// Seating block of an `Event`.
#[derive(Clone, Debug, From, Into)]
pub struct Section(domain::event::Section);

/// Seating block of an `Event` with its own grid and price.
#[graphql_object(context = Context)]
impl Section {
    /// Unique identifier of this `Section`.
    pub fn id(&self) -> SectionId {
        self.0.id.into()
    }

    /// Name of this `Section`.
    pub fn name(&self) -> SectionName {
        self.0.name.clone().into()
    }

    /// Number of seat rows in this `Section`.
    pub fn rows(&self) -> i32 {
        i32::from(self.0.rows)
    }

    /// Number of seat columns in this `Section`.
    pub fn cols(&self) -> i32 {
        i32::from(self.0.cols)
    }

    /// Price a seat of this `Section` is sold for before demand adjustment.
    pub fn base_price(&self) -> Money {
        self.0.base_price
    }

    /// Seats of this `Section` booked already.
    pub fn booked_seats(&self) -> Vec<Seat> {
        self.0.booked.iter().copied().map(Into::into).collect()
    }

    /// Total number of seats in the grid of this `Section`.
    pub fn capacity(&self) -> i32 {
        i32::try_from(self.0.capacity()).unwrap_or(i32::MAX)
    }
}

/// Unique identifier of a `Section`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::event::section::Id)]
#[into(domain::event::section::Id)]
#[graphql(name = "SectionId", transparent)]
pub struct SectionId(Uuid);

/// Name of a `Section`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "SectionName",
    with = scalar::Via::<domain::event::section::Name>,
)]
pub struct SectionName(domain::event::section::Name);

pub mod list {
    //! Definitions related to [`Event`] list.

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLScalar};
    use service::read;

    use crate::{api::scalar, Context};

    use super::{Event, Id};

    /// Cursor for the `Event` list.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[from(Id, read::event::list::Cursor)]
    #[graphql(
        name = "EventListCursor",
        with = scalar::Via::<read::event::list::Cursor>,
    )]
    pub struct Cursor(pub read::event::list::Cursor);

    /// Edge in the [`Event`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct Edge(read::event::list::Edge);

    /// Edge in the `Event` list.
    #[graphql_object(name = "EventListEdge", context = Context)]
    impl Edge {
        /// Cursor of this `EventListEdge`.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Node of this `EventListEdge`.
        #[must_use]
        pub fn node(&self) -> Event {
            #[expect(
                unsafe_code,
                reason = "`Edge` loaded from repository guarantees `Event` \
                          existence"
            )]
            unsafe {
                Event::new_unchecked(self.0.node)
            }
        }
    }

    /// Connection of the [`Event`] list.
    #[derive(Clone, Debug, From, Into)]
    pub struct Connection(read::event::list::Connection);

    /// Connection of the `Event` list.
    #[graphql_object(name = "EventListConnection", context = Context)]
    impl Connection {
        /// Edges in this `EventListConnection`.
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

    /// Information about a page in the [`Event`] list.
    #[derive(Clone, Copy, Debug, From, Into)]
    pub struct PageInfo(read::event::list::PageInfo);

    /// Information about a page in the `Event` list.
    #[graphql_object(name = "EventListPageInfo", context = Context)]
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
