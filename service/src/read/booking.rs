//! [`Booking`] read model definitions.

use common::Money;

#[cfg(doc)]
use crate::domain::{Booking, Event};

/// Total amount of all confirmed [`Booking`]s of one [`Event`].
///
/// [`None`] means the [`Event`] has no confirmed [`Booking`]s yet.
#[derive(Clone, Copy, Debug)]
pub struct Revenue(pub Option<Money>);

pub mod list {
    //! [`Booking`]s list definitions.

    use common::define_pagination;

    use crate::domain::{booking, user};
    #[cfg(doc)]
    use crate::domain::{Booking, User};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = booking::Id;

    /// Cursor pointing to a specific [`Booking`] in a list.
    pub type Cursor = booking::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// ID of the [`User`] whose [`Booking`]s to select.
        pub purchaser_id: user::Id,
    }
}
