//! [`Event`] read model definitions.

#[cfg(doc)]
use crate::domain::Event;

/// Marker selecting [`Event`]s whose effective start has passed while their
/// status still claims otherwise.
#[derive(Clone, Copy, Debug)]
pub struct Elapsed;

/// Sold-seat counter of an [`Event`].
///
/// Updated by atomic increments, so concurrent bookings never have to agree
/// on the absolute value.
#[derive(Clone, Copy, Debug)]
pub struct SoldCount;

pub mod list {
    //! [`Event`]s list definitions.

    use common::define_pagination;
    use derive_more::{From, Into};

    use crate::domain::event;
    #[cfg(doc)]
    use crate::domain::Event;

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = event::Id;

    /// Cursor pointing to a specific [`Event`] in a list.
    pub type Cursor = event::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// [`event::Status`] to select [`Event`]s with.
        pub status: Option<event::Status>,
    }

    /// Total count of [`Event`]s.
    #[derive(Clone, Copy, Debug, Eq, From, Hash, Into, PartialEq)]
    pub struct TotalCount(i32);
}
