//! Payment gateway collaborator.
//!
//! The gateway itself (order creation, checkout) lives outside of this
//! system; only the signature of a completed payment is verified here,
//! before any booking state is touched.

use derive_more::Debug;
use hmac::{Hmac, Mac as _};
use secrecy::{ExposeSecret as _, SecretString};
use sha2::Sha256;

#[cfg(doc)]
use crate::domain::Booking;

/// [`Gateway`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Secret key shared with the payment gateway.
    #[debug(skip)]
    pub key_secret: SecretString,

    /// Indicator whether a [`Proof`] is required for every booking.
    ///
    /// When disabled, bookings without a [`Proof`] proceed in a trusted
    /// mode.
    pub required: bool,
}

/// Client of the payment verification gateway.
#[derive(Clone, Debug)]
pub struct Gateway {
    /// Secret key shared with the payment gateway.
    #[debug(skip)]
    key_secret: SecretString,

    /// Indicator whether a [`Proof`] is required for every booking.
    required: bool,
}

impl Gateway {
    /// Creates a new [`Gateway`] with the provided [`Config`].
    #[must_use]
    pub fn new(config: Config) -> Self {
        let Config {
            key_secret,
            required,
        } = config;
        Self {
            key_secret,
            required,
        }
    }

    /// Indicates whether a [`Proof`] is required for every booking.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Verifies the provided [`Proof`] against the gateway secret.
    ///
    /// The expected signature is an HMAC-SHA256 over
    /// `"{order_id}|{payment_id}"`, hex-encoded.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn verify(&self, proof: &Proof) -> bool {
        let Proof {
            order_id,
            payment_id,
            signature,
        } = proof;

        let Ok(signature) = hex::decode(signature) else {
            return false;
        };

        let mut mac = Hmac::<Sha256>::new_from_slice(
            self.key_secret.expose_secret().as_bytes(),
        )
        .expect("HMAC accepts any key length");
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        mac.verify_slice(&signature).is_ok()
    }
}

/// Proof of a payment completed on the gateway side.
#[derive(Clone, Debug)]
pub struct Proof {
    /// ID of the gateway order the payment was made for.
    pub order_id: String,

    /// ID of the payment itself.
    pub payment_id: String,

    /// Hex-encoded signature of the `order_id`/`payment_id` pair.
    pub signature: String,
}

#[cfg(test)]
mod spec {
    use hmac::{Hmac, Mac as _};
    use sha2::Sha256;

    use super::{Config, Gateway, Proof};

    fn gateway(secret: &str) -> Gateway {
        Gateway::new(Config {
            key_secret: secret.to_owned().into(),
            required: false,
        })
    }

    fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let gw = gateway("test-secret");

        assert!(gw.verify(&Proof {
            order_id: "order_1".to_owned(),
            payment_id: "pay_1".to_owned(),
            signature: sign("test-secret", "order_1", "pay_1"),
        }));
    }

    #[test]
    fn rejects_tampered_proof() {
        let gw = gateway("test-secret");

        // Signature of a different payment.
        assert!(!gw.verify(&Proof {
            order_id: "order_1".to_owned(),
            payment_id: "pay_2".to_owned(),
            signature: sign("test-secret", "order_1", "pay_1"),
        }));

        // Signature by a different secret.
        assert!(!gw.verify(&Proof {
            order_id: "order_1".to_owned(),
            payment_id: "pay_1".to_owned(),
            signature: sign("other-secret", "order_1", "pay_1"),
        }));

        // Garbage instead of hex.
        assert!(!gw.verify(&Proof {
            order_id: "order_1".to_owned(),
            payment_id: "pay_1".to_owned(),
            signature: "not-hex".to_owned(),
        }));
    }
}
