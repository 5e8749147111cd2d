//! Double-entry balance check over proposed movement lines.

use asiento_types::{balance_tolerance, BalanceError, Money, MovementDraft, RequiredField};
use serde::{Deserialize, Serialize};

/// Totals of a transaction that passed [`validate_balance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub total_debit: Money,
    pub total_credit: Money,
}

/// `|debit − credit| < 0.01`.
pub fn is_balanced(total_debit: Money, total_credit: Money) -> bool {
    (total_debit - total_credit).abs() < balance_tolerance()
}

/// Check count, then each line, then totals. The first failure wins.
pub fn validate_balance(movements: &[MovementDraft]) -> Result<BalanceSummary, BalanceError> {
    if movements.len() < 2 {
        return Err(BalanceError::TooFewMovements {
            count: movements.len(),
        });
    }

    for (index, line) in movements.iter().enumerate() {
        check_line(index, line)?;
    }

    let total_debit: Money = movements.iter().map(|m| m.debit).sum();
    let total_credit: Money = movements.iter().map(|m| m.credit).sum();
    if !is_balanced(total_debit, total_credit) {
        return Err(BalanceError::Unbalanced {
            total_debit,
            total_credit,
            difference: (total_debit - total_credit).abs(),
        });
    }

    Ok(BalanceSummary {
        total_debit,
        total_credit,
    })
}

fn check_line(index: usize, line: &MovementDraft) -> Result<(), BalanceError> {
    if line.account.is_none() {
        return Err(BalanceError::MissingRequiredField {
            index,
            field: RequiredField::Account,
        });
    }
    if line.third_party.is_none() {
        return Err(BalanceError::MissingRequiredField {
            index,
            field: RequiredField::ThirdParty,
        });
    }

    let reason = if line.debit.is_negative() || line.credit.is_negative() {
        "amounts must not be negative"
    } else if !line.debit.is_zero() && !line.credit.is_zero() {
        "a movement is either a debit or a credit, not both"
    } else if line.debit.is_zero() && line.credit.is_zero() {
        "a movement needs a debit or a credit amount"
    } else {
        return Ok(());
    };

    Err(BalanceError::InvalidAmount {
        index,
        reason: reason.to_string(),
    })
}
