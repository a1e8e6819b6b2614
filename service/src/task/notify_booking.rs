//! [`NotifyBooking`] [`Task`].

use std::convert::Infallible;

use common::operations::{Perform, Update};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        booking::{TicketCode, Ticket},
        event, user, Booking,
    },
    infra::{
        channel::{DashboardEvent, SeatsDelta},
        database,
        mailer::Receipt,
        Database,
    },
    Service,
};

use super::Task;

/// [`Task`] fanning a durably committed [`Booking`] out to all interested
/// parties.
///
/// Every action here is best-effort: failures are logged and swallowed, and
/// none of them can invalidate the [`Booking`]. The actions carry no
/// ordering or mutual dependency.
#[derive(Clone, Debug)]
pub struct NotifyBooking {
    /// The committed [`Booking`].
    pub booking: Booking,

    /// Title of the booked [`Event`] at commit time.
    ///
    /// [`Event`]: crate::domain::Event
    pub event_title: event::Title,

    /// Name of the purchaser.
    pub purchaser_name: user::Name,

    /// Email of the purchaser, if known.
    pub purchaser_email: Option<user::Email>,
}

impl<Db> Task<Perform<NotifyBooking>> for Service<Db>
where
    Db: Database<Update<Booking>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Perform(notify): Perform<NotifyBooking>,
    ) -> Result<Self::Ok, Self::Err> {
        let NotifyBooking {
            mut booking,
            event_title,
            purchaser_name,
            purchaser_email,
        } = notify;

        // Seat-map delta for subscribers of the event.
        self.channel().publish_seats(SeatsDelta {
            event_id: booking.event_id,
            seats: booking
                .tickets
                .iter()
                .map(|Ticket { section_id, seat, .. }| (*section_id, *seat))
                .collect(),
        });

        // Summary for dashboard subscribers.
        self.channel().publish_dashboard(DashboardEvent::NewBooking {
            event_id: booking.event_id,
            amount: booking.total_amount,
        });

        // Ticket code: the booking stays valid and readable without it, and
        // a backfill can attach it later.
        match TicketCode::generate(&booking, &event_title, &purchaser_name) {
            Ok(code) => {
                booking.ticket_code = Some(code);
                if let Err(e) =
                    self.database().execute(Update(booking.clone())).await
                {
                    log::error!(
                        "failed to attach `TicketCode` to \
                         `Booking(id: {})`: {e}",
                        booking.id,
                    );
                    booking.ticket_code = None;
                }
            }
            Err(e) => {
                log::error!(
                    "failed to generate `TicketCode` for \
                     `Booking(id: {})`: {e}",
                    booking.id,
                );
            }
        }

        // Email receipt.
        match (self.mailer(), &purchaser_email) {
            (Some(mailer), Some(email)) => {
                let receipt =
                    Receipt::new(&booking, event_title, purchaser_name);
                if let Err(e) = mailer.send_receipt(email, &receipt).await {
                    log::error!(
                        "failed to send receipt for `Booking(id: {})`: {e}",
                        booking.id,
                    );
                }
            }
            (None, _) => {
                log::debug!("receipt mailer is not configured, skipping");
            }
            (_, None) => {
                log::debug!(
                    "purchaser of `Booking(id: {})` has no email, skipping \
                     receipt",
                    booking.id,
                );
            }
        }

        Ok(())
    }
}
