//! [`Command`] for creating a new [`Event`].

use std::collections::BTreeSet;

use common::{operations::Insert, DateTime, Money};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        event::{self, Section, MAX_ROWS},
        user, Event,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Event`].
#[derive(Clone, Debug)]
pub struct CreateEvent {
    /// [`Title`] of a new [`Event`].
    ///
    /// [`Title`]: event::Title
    pub title: event::Title,

    /// [`Description`] of a new [`Event`].
    ///
    /// [`Description`]: event::Description
    pub description: Option<event::Description>,

    /// [`Category`] of a new [`Event`].
    ///
    /// [`Category`]: event::Category
    pub category: Option<event::Category>,

    /// [`Location`] of a new [`Event`].
    ///
    /// [`Location`]: event::Location
    pub location: event::Location,

    /// [`Schedule`] of a new [`Event`].
    ///
    /// [`Schedule`]: event::Schedule
    pub schedule: event::Schedule,

    /// [`Section`] layouts of a new [`Event`].
    pub sections: Vec<NewSection>,

    /// ID of the [`User`] creating the [`Event`].
    ///
    /// [`User`]: crate::domain::User
    pub created_by: user::Id,
}

/// Layout of one [`Section`] of a new [`Event`].
#[derive(Clone, Debug)]
pub struct NewSection {
    /// [`Name`] of the [`Section`].
    ///
    /// [`Name`]: event::section::Name
    pub name: event::section::Name,

    /// Number of seat rows in the [`Section`].
    pub rows: u8,

    /// Number of seat columns in the [`Section`].
    pub cols: u16,

    /// Base price of one seat of the [`Section`].
    pub base_price: Money,
}

impl<Db> Command<CreateEvent> for Service<Db>
where
    Db: Database<Insert<Event>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Event;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateEvent) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateEvent {
            title,
            description,
            category,
            location,
            schedule,
            sections,
            created_by,
        } = cmd;

        if sections.is_empty() {
            return Err(tracerr::new!(E::NoSections));
        }

        // All sections of one event are priced in a single currency, which
        // keeps booking totals well-defined.
        let currency = sections[0].base_price.currency;

        let sections = sections
            .into_iter()
            .map(|s| {
                let NewSection {
                    name,
                    rows,
                    cols,
                    base_price,
                } = s;

                if rows == 0 || rows > MAX_ROWS || cols == 0 {
                    return Err(tracerr::new!(E::InvalidGrid {
                        rows,
                        cols,
                    }));
                }
                if base_price.amount.is_sign_negative()
                    || base_price.currency != currency
                {
                    return Err(tracerr::new!(E::InvalidBasePrice(
                        base_price,
                    )));
                }

                Ok(Section {
                    id: event::section::Id::new(),
                    name,
                    rows,
                    cols,
                    base_price,
                    booked: BTreeSet::new(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let event = Event {
            id: event::Id::new(),
            title,
            description,
            category: category.unwrap_or_default(),
            location,
            schedule,
            status: event::Status::Upcoming,
            sections,
            sold_count: 0,
            created_by,
            created_at: DateTime::now().coerce(),
        };

        self.database()
            .execute(Insert(event.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(event)
    }
}

/// Error of [`CreateEvent`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Provided [`Section`] base price is unusable.
    #[display("invalid base price `{_0}`")]
    InvalidBasePrice(#[error(not(source))] Money),

    /// Provided [`Section`] grid shape is unusable.
    #[display("invalid `{rows} x {cols}` section grid")]
    InvalidGrid {
        /// Requested number of rows.
        rows: u8,

        /// Requested number of columns.
        cols: u16,
    },

    /// No [`Section`]s provided.
    #[display("an `Event` must have at least one section")]
    NoSections,
}
