//! [`Query`] collection related to [`Booking`]s listing.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::domain::Booking;

use super::DatabaseQuery;

/// Queries a [`read::booking::list::Page`] of [`Booking`]s.
pub type List =
    DatabaseQuery<By<read::booking::list::Page, read::booking::list::Selector>>;
