use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// Field a proposed movement must carry before it can be validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    Account,
    ThirdParty,
}

impl std::fmt::Display for RequiredField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequiredField::Account => write!(f, "account"),
            RequiredField::ThirdParty => write!(f, "third party"),
        }
    }
}

/// Structural or arithmetic failure of a proposed transaction.
///
/// Always recoverable by the caller correcting its input; a transaction that
/// fails with one of these is never persisted.
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BalanceError {
    #[error("a transaction needs at least 2 movements, got {count}")]
    TooFewMovements { count: usize },

    #[error("movement {index} is missing its {field}")]
    MissingRequiredField { index: usize, field: RequiredField },

    #[error("movement {index} has an invalid amount: {reason}")]
    InvalidAmount { index: usize, reason: String },

    #[error(
        "transaction does not balance: debit {total_debit} != credit {total_credit} (difference {difference})"
    )]
    Unbalanced {
        total_debit: Money,
        total_credit: Money,
        difference: Money,
    },
}

impl BalanceError {
    /// Absolute debit/credit mismatch, when that is the failure.
    pub fn difference(&self) -> Option<Money> {
        match self {
            BalanceError::Unbalanced { difference, .. } => Some(*difference),
            _ => None,
        }
    }
}

/// Decimal text that could not be turned into [`Money`].
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount is empty")]
    Empty,

    #[error("amount '{input}' is not a decimal number")]
    Invalid { input: String },
}

/// Colombian tax identifier (NIT) validation failure.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum NitError {
    #[error("NIT is empty")]
    Empty,

    #[error("NIT is too short ({len} digits, at least 9 required)")]
    TooShort { len: usize },

    #[error("NIT is too long ({len} digits, at most 10 allowed)")]
    TooLong { len: usize },

    #[error("wrong check digit {found}, expected {expected}")]
    CheckDigit { expected: u8, found: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn unbalanced_display_shows_both_totals() {
        let err = BalanceError::Unbalanced {
            total_debit: Money::new(dec!(100)),
            total_credit: Money::new(dec!(80)),
            difference: Money::new(dec!(20)),
        };
        let s = err.to_string();
        assert!(s.contains("100.00"));
        assert!(s.contains("80.00"));
        assert!(s.contains("20.00"));
        assert_eq!(err.difference(), Some(Money::new(dec!(20))));
    }

    #[test]
    fn missing_field_display() {
        let err = BalanceError::MissingRequiredField {
            index: 1,
            field: RequiredField::ThirdParty,
        };
        assert_eq!(err.to_string(), "movement 1 is missing its third party");
        assert_eq!(err.difference(), None);
    }

    #[test]
    fn balance_error_serializes_with_kind_tag() {
        let err = BalanceError::TooFewMovements { count: 1 };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "too_few_movements");
        assert_eq!(json["count"], 1);
    }
}
