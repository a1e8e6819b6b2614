//! [`Command`] definition.

pub mod create_event;
pub mod submit_booking;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    create_event::CreateEvent, submit_booking::SubmitBooking,
};
