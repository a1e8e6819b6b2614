//! [`Multiplier`]-related definitions.

use std::str::FromStr;

use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::{prelude::FromPrimitive as _, Decimal};

/// Demand multiplier applied to a base price.
///
/// `1.0` means no adjustment.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Multiplier(Decimal);

impl Multiplier {
    /// Creates a new [`Multiplier`] by checking the provided value is
    /// strictly positive.
    #[must_use]
    pub fn new(val: Decimal) -> Option<Self> {
        (val > Decimal::ZERO).then_some(Self(val))
    }

    /// Creates a new [`Multiplier`] from the provided [`f64`].
    ///
    /// [`None`] is returned if the value is non-positive or non-finite.
    #[must_use]
    pub fn from_f64(val: f64) -> Option<Self> {
        val.is_finite()
            .then(|| Decimal::from_f64(val))
            .flatten()
            .and_then(Self::new)
    }

    /// Returns the inner [`Decimal`] value of this [`Multiplier`].
    #[must_use]
    pub fn as_decimal(self) -> Decimal {
        self.0
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Self(Decimal::ONE)
    }
}

impl FromStr for Multiplier {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .ok()
            .and_then(Self::new)
            .ok_or("invalid multiplier value")
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Strictly positive decimal demand multiplier.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Multiplier = super::Multiplier;

    impl Multiplier {
        fn to_output<S: ScalarValue>(m: &Multiplier) -> Value<S> {
            Value::scalar(m.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Multiplier` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Multiplier` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use super::Multiplier;

    #[test]
    fn accepts_positive_values_only() {
        assert!(Multiplier::new("1.25".parse().unwrap()).is_some());
        assert!(Multiplier::new(Decimal::ONE).is_some());

        assert!(Multiplier::new(Decimal::ZERO).is_none());
        assert!(Multiplier::new("-0.5".parse().unwrap()).is_none());
    }

    #[test]
    fn rejects_non_finite_floats() {
        assert!(Multiplier::from_f64(f64::NAN).is_none());
        assert!(Multiplier::from_f64(f64::INFINITY).is_none());
        assert!(Multiplier::from_f64(f64::NEG_INFINITY).is_none());
        assert!(Multiplier::from_f64(-1.0).is_none());
        assert!(Multiplier::from_f64(0.0).is_none());

        assert!(Multiplier::from_f64(1.2).is_some());
    }

    #[test]
    fn defaults_to_one() {
        assert_eq!(
            Multiplier::default().as_decimal(),
            Decimal::ONE,
        );
    }
}
