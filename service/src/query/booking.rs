//! [`Query`] collection related to a single [`Booking`].

use common::operations::By;

use crate::{
    domain::{booking, event, Booking},
    read,
};
#[cfg(doc)]
use crate::domain::Event;

use super::DatabaseQuery;

/// Queries a [`Booking`] by its [`booking::Id`].
pub type ById = DatabaseQuery<By<Option<Booking>, booking::Id>>;

/// Queries the [`read::booking::Revenue`] of one [`Event`].
pub type Revenue = DatabaseQuery<By<read::booking::Revenue, event::Id>>;
