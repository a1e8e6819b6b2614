//! Infrastructure layer.

pub mod channel;
pub mod database;
pub mod demand;
pub mod mailer;
pub mod payments;

pub use self::{channel::Realtime, database::Database};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
