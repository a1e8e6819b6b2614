//! [`Query`] collection related to [`Event`]s listing.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::domain::Event;

use super::DatabaseQuery;

/// Queries a [`read::event::list::Page`] of [`Event`]s.
pub type List =
    DatabaseQuery<By<read::event::list::Page, read::event::list::Selector>>;

/// Queries the total count of [`Event`]s.
pub type TotalCount = DatabaseQuery<By<read::event::list::TotalCount, ()>>;
