//! Applies a detector's correction plan to proposed movement lines.

use asiento_types::MovementDraft;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::detector::MovementCorrection;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CorrectionError {
    #[error("correction targets movement {index}, but the transaction has {len} movements")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Rewrite the referenced lines. Account and magnitude are replaced; a debit
/// line stays a debit and a credit line stays a credit.
///
/// The result may no longer balance; it is meant to be resubmitted, which
/// re-runs the balance check.
pub fn apply_corrections(
    movements: &[MovementDraft],
    plan: &[MovementCorrection],
) -> Result<Vec<MovementDraft>, CorrectionError> {
    let mut corrected = movements.to_vec();

    for correction in plan {
        let len = corrected.len();
        let line = corrected
            .get_mut(correction.movement_index)
            .ok_or(CorrectionError::IndexOutOfRange {
                index: correction.movement_index,
                len,
            })?;

        if let Some(account) = correction.account {
            line.account = Some(account);
        }
        if let Some(amount) = correction.amount {
            *line = line.clone().with_amount(amount);
        }
    }

    debug!(
        movements = movements.len(),
        corrections = plan.len(),
        "Correction plan applied"
    );
    Ok(corrected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asiento_types::{AccountId, Money, Side, ThirdPartyId};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn substitutes_account_and_keeps_amount() {
        let tp = ThirdPartyId::new();
        let learned = AccountId::new();
        let lines = vec![
            MovementDraft::debit(AccountId::new(), tp, Money::new(dec!(200))),
            MovementDraft::credit(AccountId::new(), tp, Money::new(dec!(200))),
        ];
        let out = apply_corrections(
            &lines,
            &[MovementCorrection {
                movement_index: 0,
                account: Some(learned),
                amount: None,
            }],
        )
        .unwrap();

        assert_eq!(out[0].account, Some(learned));
        assert_eq!(out[0].debit, Money::new(dec!(200)));
        assert_eq!(out[1], lines[1]);
    }

    #[test]
    fn amount_substitution_keeps_credit_side() {
        let lines = vec![
            MovementDraft::debit(AccountId::new(), ThirdPartyId::new(), Money::new(dec!(500))),
            MovementDraft::credit(AccountId::new(), ThirdPartyId::new(), Money::new(dec!(500))),
        ];
        let out = apply_corrections(
            &lines,
            &[MovementCorrection {
                movement_index: 1,
                account: None,
                amount: Some(Money::new(dec!(200))),
            }],
        )
        .unwrap();

        assert_eq!(out[1].credit, Money::new(dec!(200)));
        assert!(out[1].debit.is_zero());
        // Not rebalanced here.
        assert_eq!(out[0].debit, Money::new(dec!(500)));
    }

    #[test]
    fn out_of_range_index_fails() {
        let lines = vec![MovementDraft::debit(AccountId::new(), ThirdPartyId::new(), Money::from_minor(1))];
        let err = apply_corrections(
            &lines,
            &[MovementCorrection {
                movement_index: 3,
                account: None,
                amount: None,
            }],
        )
        .unwrap_err();
        assert_eq!(err, CorrectionError::IndexOutOfRange { index: 3, len: 1 });
    }

    proptest! {
        #[test]
        fn orientation_is_preserved(
            sides in proptest::collection::vec(any::<bool>(), 1..8),
            new_amount in 1i64..10_000_000,
            target in 0usize..8,
        ) {
            let lines: Vec<MovementDraft> = sides
                .iter()
                .map(|is_debit| {
                    let amount = Money::from_minor(100);
                    if *is_debit {
                        MovementDraft::debit(AccountId::new(), ThirdPartyId::new(), amount)
                    } else {
                        MovementDraft::credit(AccountId::new(), ThirdPartyId::new(), amount)
                    }
                })
                .collect();
            let index = target % lines.len();
            let plan = [MovementCorrection {
                movement_index: index,
                account: Some(AccountId::new()),
                amount: Some(Money::from_minor(new_amount)),
            }];

            let out = apply_corrections(&lines, &plan).unwrap();
            for (before, after) in lines.iter().zip(out.iter()) {
                prop_assert_eq!(before.side(), after.side());
            }
            let expected = if sides[index] { Side::Debit } else { Side::Credit };
            prop_assert_eq!(out[index].side(), Some(expected));
            prop_assert_eq!(out[index].amount(), Money::from_minor(new_amount));
        }
    }
}
