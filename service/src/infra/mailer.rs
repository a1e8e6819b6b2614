//! SMTP receipt mailer collaborator.

use common::{Money, Multiplier};
use derive_more::{Debug, Display, Error as StdError, From};
use itertools::Itertools as _;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport as _, Message, Tokio1Executor,
};
use secrecy::{ExposeSecret as _, SecretString};

use crate::domain::{
    booking::Ticket,
    event,
    user,
    Booking,
};

/// [`Smtp`] mailer configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// SMTP relay host.
    pub host: String,

    /// Username to authenticate on the relay with.
    pub username: String,

    /// Password to authenticate on the relay with.
    #[debug(skip)]
    pub password: SecretString,

    /// Mailbox the receipts are sent from.
    pub from: String,
}

/// SMTP mailer delivering booking receipts.
#[derive(Clone, Debug)]
pub struct Smtp {
    /// SMTP transport to send [`Message`]s with.
    #[debug(skip)]
    transport: AsyncSmtpTransport<Tokio1Executor>,

    /// Mailbox the receipts are sent from.
    from: lettre::message::Mailbox,
}

impl Smtp {
    /// Creates a new [`Smtp`] mailer with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If the [`Config`] is invalid.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let transport =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.expose_secret().to_owned(),
                ))
                .build();

        Ok(Self {
            transport,
            from: config.from.parse()?,
        })
    }

    /// Sends the provided [`Receipt`] to the given [`user::Email`].
    ///
    /// # Errors
    ///
    /// If the receipt cannot be composed or handed over to the relay.
    pub async fn send_receipt(
        &self,
        to: &user::Email,
        receipt: &Receipt,
    ) -> Result<(), Error> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(AsRef::<str>::as_ref(to).parse()?)
            .subject(format!("Booking Confirmed: {}", receipt.event_title))
            .header(ContentType::TEXT_PLAIN)
            .body(receipt.to_string())?;

        self.transport.send(message).await.map(drop).map_err(Into::into)
    }
}

/// Plain-text receipt of a committed [`Booking`].
#[derive(Clone, Debug, Display)]
#[display(
    "Hi {purchaser_name},\n\
     \n\
     Your tickets for \"{event_title}\" are booked.\n\
     \n\
     Seats: {}\n\
     Multiplier applied: {multiplier}x\n\
     Total amount: {total_amount}\n\
     \n\
     Please show the ticket code attached to your booking at the entry.",
    seats.iter().format(", "),
)]
pub struct Receipt {
    /// Name of the purchaser.
    pub purchaser_name: user::Name,

    /// Title of the booked event.
    pub event_title: event::Title,

    /// Booked seats.
    pub seats: Vec<event::Seat>,

    /// Demand multiplier the seats were priced with.
    pub multiplier: Multiplier,

    /// Total amount charged.
    pub total_amount: Money,
}

impl Receipt {
    /// Composes a new [`Receipt`] of the provided [`Booking`].
    #[must_use]
    pub fn new(
        booking: &Booking,
        event_title: event::Title,
        purchaser_name: user::Name,
    ) -> Self {
        Self {
            purchaser_name,
            event_title,
            seats: booking.tickets.iter().map(|Ticket { seat, .. }| *seat)
                .collect(),
            multiplier: booking.multiplier,
            total_amount: booking.total_amount,
        }
    }
}

/// Error of sending a receipt.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Mailbox address cannot be parsed.
    #[display("invalid mailbox address: {_0}")]
    Address(lettre::address::AddressError),

    /// Receipt [`Message`] cannot be composed.
    #[display("failed to compose receipt: {_0}")]
    Message(lettre::error::Error),

    /// SMTP transport failure.
    #[display("SMTP transport failed: {_0}")]
    Smtp(lettre::transport::smtp::Error),
}

#[cfg(test)]
mod spec {
    use common::{money::Currency, Money, Multiplier};

    use super::Receipt;

    #[test]
    fn receipt_mentions_seats_and_total() {
        let receipt = Receipt {
            purchaser_name: "Jane".parse().unwrap(),
            event_title: "Rock A Blast".parse().unwrap(),
            seats: vec!["A1".parse().unwrap(), "A2".parse().unwrap()],
            multiplier: Multiplier::default(),
            total_amount: Money {
                amount: "1250".parse().unwrap(),
                currency: Currency::Inr,
            },
        };

        let text = receipt.to_string();
        assert!(text.contains("Rock A Blast"));
        assert!(text.contains("A1, A2"));
        assert!(text.contains("1250INR"));
    }
}
