//! [`Booking`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money, Multiplier};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    event::{section, Seat},
    user,
};
#[cfg(doc)]
use crate::domain::{event::Section, Event, User};

/// Committed reservation of [`Seat`]s for an [`Event`].
#[derive(Clone, Debug)]
pub struct Booking {
    /// ID of this [`Booking`].
    pub id: Id,

    /// ID of the [`Event`] this [`Booking`] reserves seats of.
    pub event_id: crate::domain::event::Id,

    /// ID of the [`User`] who purchased this [`Booking`].
    pub purchaser_id: user::Id,

    /// [`Ticket`] line items of this [`Booking`], in request order.
    pub tickets: Vec<Ticket>,

    /// Total amount charged for this [`Booking`].
    ///
    /// Always equals the sum of its [`Ticket`] prices.
    pub total_amount: Money,

    /// Demand [`Multiplier`] applied when this [`Booking`] was committed.
    pub multiplier: Multiplier,

    /// [`Status`] of this [`Booking`].
    pub status: Status,

    /// Reference to the verified payment, if any.
    pub payment_ref: Option<PaymentRef>,

    /// [`TicketCode`] attached to this [`Booking`] after its creation, if
    /// generated already.
    pub ticket_code: Option<TicketCode>,

    /// [`DateTime`] when this [`Booking`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`Booking`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Status of a [`Booking`]."]
    enum Status {
        #[doc = "The [`Booking`] awaits payment confirmation."]
        Pending = 1,

        #[doc = "The [`Booking`] is paid (or trusted) and final."]
        Confirmed = 2,

        #[doc = "The [`Booking`] was cancelled."]
        Cancelled = 3,
    }
}

/// Line item of a [`Booking`]: one reserved [`Seat`] with the price charged
/// for it.
#[derive(Clone, Debug)]
pub struct Ticket {
    /// ID of the [`Section`] the [`Seat`] belongs to.
    pub section_id: section::Id,

    /// Name of the [`Section`] as it was at commit time.
    pub section_name: section::Name,

    /// Reserved [`Seat`].
    pub seat: Seat,

    /// Price charged for the [`Seat`] at commit time.
    pub price: Money,
}

/// Opaque reference to a payment verified by the payment gateway.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct PaymentRef(String);

impl PaymentRef {
    /// Creates a new [`PaymentRef`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `reference` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Creates a new [`PaymentRef`] if the given `reference` is valid.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Option<Self> {
        let reference = reference.into();
        Self::check(&reference).then_some(Self(reference))
    }

    /// Checks whether the given `reference` is a valid [`PaymentRef`].
    fn check(reference: impl AsRef<str>) -> bool {
        let reference = reference.as_ref();
        !reference.is_empty() && reference.len() <= 256
    }
}

impl FromStr for PaymentRef {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `PaymentRef`")
    }
}

/// Entry-check payload of a [`Booking`], rendered as a QR code at the venue.
///
/// Generated after the [`Booking`] is committed, so a [`Booking`] is valid
/// and readable before (and without) it.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[as_ref(forward)]
pub struct TicketCode(String);

impl TicketCode {
    /// Generates a new [`TicketCode`] for the provided [`Booking`].
    ///
    /// # Errors
    ///
    /// If the payload cannot be serialized.
    pub fn generate(
        booking: &Booking,
        event_title: &crate::domain::event::Title,
        purchaser_name: &user::Name,
    ) -> Result<Self, serde_json::Error> {
        #[derive(Serialize)]
        struct Payload<'a> {
            booking_id: Id,
            event: &'a str,
            seats: Vec<String>,
            purchaser: &'a str,
        }

        serde_json::to_string(&Payload {
            booking_id: booking.id,
            event: event_title.as_ref(),
            seats: booking
                .tickets
                .iter()
                .map(|t| t.seat.to_string())
                .collect(),
            purchaser: purchaser_name.as_ref(),
        })
        .map(Self)
    }
}

/// [`DateTime`] when a [`Booking`] was created.
pub type CreationDateTime = DateTimeOf<(Booking, unit::Creation)>;

/// Dedicated record of one reserved [`Seat`].
///
/// Persisted with a `(event, section, seat)` uniqueness guarantee, making it
/// impossible for two concurrent [`Booking`]s to commit the same [`Seat`],
/// whatever server instance they run on.
#[derive(Clone, Copy, Debug)]
pub struct Reservation {
    /// ID of the [`Event`] the [`Seat`] belongs to.
    pub event_id: crate::domain::event::Id,

    /// ID of the [`Section`] the [`Seat`] belongs to.
    pub section_id: section::Id,

    /// Reserved [`Seat`].
    pub seat: Seat,

    /// ID of the [`Booking`] which reserved the [`Seat`].
    pub booking_id: Id,
}

pub mod reservation {
    //! [`Reservation`]-related definitions.

    use crate::domain::event::{section, Seat};
    #[cfg(doc)]
    use crate::domain::event::Section;

    #[cfg(doc)]
    use super::Reservation;

    /// Outcome of applying a batch of [`Reservation`]s.
    #[derive(Clone, Copy, Debug)]
    pub enum Outcome {
        /// Every [`Reservation`] of the batch was applied.
        Applied,

        /// A concurrent writer won the named [`Seat`]; nothing from the
        /// batch must remain applied.
        Conflict {
            /// ID of the [`Section`] the contended [`Seat`] belongs to.
            section_id: section::Id,

            /// The contended [`Seat`].
            seat: Seat,
        },
    }
}

#[cfg(test)]
mod spec {
    use common::{money::Currency, Money, Multiplier};

    use crate::domain::{event, user};

    use super::{Booking, Status, Ticket, TicketCode};

    #[test]
    fn ticket_code_lists_all_seats() {
        let booking = Booking {
            id: super::Id::new(),
            event_id: event::Id::new(),
            purchaser_id: user::Id::new(),
            tickets: ["A1", "A2"]
                .into_iter()
                .map(|seat| Ticket {
                    section_id: event::section::Id::new(),
                    section_name: "Gold".parse().unwrap(),
                    seat: seat.parse().unwrap(),
                    price: Money {
                        amount: "625".parse().unwrap(),
                        currency: Currency::Inr,
                    },
                })
                .collect(),
            total_amount: Money {
                amount: "1250".parse().unwrap(),
                currency: Currency::Inr,
            },
            multiplier: Multiplier::default(),
            status: Status::Confirmed,
            payment_ref: None,
            ticket_code: None,
            created_at: super::CreationDateTime::now(),
        };

        let code = TicketCode::generate(
            &booking,
            &"Rock A Blast".parse().unwrap(),
            &"Jane".parse().unwrap(),
        )
        .unwrap();

        let payload: serde_json::Value =
            serde_json::from_str(code.as_ref()).unwrap();
        assert_eq!(payload["event"], "Rock A Blast");
        assert_eq!(payload["purchaser"], "Jane");
        assert_eq!(payload["seats"][0], "A1");
        assert_eq!(payload["seats"][1], "A2");
    }
}
