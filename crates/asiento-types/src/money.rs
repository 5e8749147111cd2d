use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::MoneyError;

/// Number of decimal places every amount is held at.
pub const SCALE: u32 = 2;

/// Monetary amount in currency units, held at 2 decimal places.
///
/// Serialized as decimal text (`"1500.00"`); deserializes from text or a
/// JSON number and rounds half away from zero to cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Money(Decimal);

/// Largest debit/credit mismatch still considered balanced is strictly below this.
pub fn balance_tolerance() -> Money {
    Money(Decimal::new(1, SCALE))
}

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        let mut rounded =
            amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(SCALE);
        Self(rounded)
    }

    /// Amount from integer cents.
    pub fn from_minor(minor: i64) -> Self {
        Self(Decimal::new(minor, SCALE))
    }

    /// Parse user-entered decimal text.
    ///
    /// Accepts surrounding whitespace, a leading `$`, and a comma as the
    /// decimal separator when no dot is present (`"1500,50"`).
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let trimmed = input.trim().trim_start_matches('$').trim();
        if trimmed.is_empty() {
            return Err(MoneyError::Empty);
        }

        let normalized = if trimmed.contains(',') && !trimmed.contains('.') {
            trimmed.replace(',', ".")
        } else {
            trimmed.to_string()
        };

        Decimal::from_str(&normalized)
            .map(Self::new)
            .map_err(|_| MoneyError::Invalid {
                input: input.to_string(),
            })
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// `self * factor`, rounded back to cents.
    pub fn scale_by(&self, factor: Decimal) -> Self {
        Self::new(self.0 * factor)
    }

    /// Arithmetic results go through here so that zero never prints as `-0.00`.
    fn normalized(mut value: Decimal) -> Self {
        if value.is_zero() {
            value.set_sign_positive(true);
        }
        Self(value)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        <Decimal as Deserialize>::deserialize(deserializer).map(Money::new)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money::normalized(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money::normalized(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}
