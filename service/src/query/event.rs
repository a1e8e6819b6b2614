//! [`Query`] collection related to a single [`Event`].

use common::operations::By;

use crate::domain::{event, Event};

use super::DatabaseQuery;

/// Queries an [`Event`] by its [`event::Id`].
pub type ById = DatabaseQuery<By<Option<Event>, event::Id>>;
