//! Background [`Task`]s definitions.

mod background;
pub mod complete_elapsed_events;
pub mod notify_booking;

pub use common::Handler as Task;

pub use self::{
    background::Background, complete_elapsed_events::CompleteElapsedEvents,
    notify_booking::NotifyBooking,
};
