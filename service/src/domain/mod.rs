//! Domain definitions.

pub mod booking;
pub mod event;
pub mod user;

pub use self::{booking::Booking, event::Event, user::User};
