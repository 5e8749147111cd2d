use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, MovementId, ThirdPartyId, TransactionId};
use crate::money::Money;

/// Orientation of a movement line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Debit,
    Credit,
}

/// Proposed movement line, as submitted by a caller.
///
/// Account and third party are optional so that validation can report which
/// line is incomplete instead of failing at deserialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementDraft {
    #[serde(default)]
    pub account: Option<AccountId>,
    #[serde(default)]
    pub third_party: Option<ThirdPartyId>,
    #[serde(default)]
    pub debit: Money,
    #[serde(default)]
    pub credit: Money,
    #[serde(default)]
    pub description: Option<String>,
}

impl MovementDraft {
    pub fn debit(account: AccountId, third_party: ThirdPartyId, amount: Money) -> Self {
        Self {
            account: Some(account),
            third_party: Some(third_party),
            debit: amount,
            credit: Money::ZERO,
            description: None,
        }
    }

    pub fn credit(account: AccountId, third_party: ThirdPartyId, amount: Money) -> Self {
        Self {
            account: Some(account),
            third_party: Some(third_party),
            debit: Money::ZERO,
            credit: amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The nonzero side's magnitude, or zero.
    pub fn amount(&self) -> Money {
        if !self.debit.is_zero() {
            self.debit
        } else {
            self.credit
        }
    }

    /// `None` when neither side carries an amount.
    pub fn side(&self) -> Option<Side> {
        if !self.debit.is_zero() {
            Some(Side::Debit)
        } else if !self.credit.is_zero() {
            Some(Side::Credit)
        } else {
            None
        }
    }

    /// Same line with its magnitude replaced on the side it already uses.
    /// A line with no side is treated as a debit.
    pub fn with_amount(mut self, amount: Money) -> Self {
        match self.side() {
            Some(Side::Credit) => {
                self.debit = Money::ZERO;
                self.credit = amount;
            }
            _ => {
                self.debit = amount;
                self.credit = Money::ZERO;
            }
        }
        self
    }
}

/// Persisted movement line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    pub third_party_id: ThirdPartyId,
    pub debit: Money,
    pub credit: Money,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movement {
    pub fn amount(&self) -> Money {
        if !self.debit.is_zero() {
            self.debit
        } else {
            self.credit
        }
    }

    pub fn side(&self) -> Side {
        if !self.debit.is_zero() {
            Side::Debit
        } else {
            Side::Credit
        }
    }

    /// Draft view, used to re-validate a transaction after an edit.
    pub fn to_draft(&self) -> MovementDraft {
        MovementDraft {
            account: Some(self.account_id),
            third_party: Some(self.third_party_id),
            debit: self.debit,
            credit: self.credit,
            description: self.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_and_amount_follow_nonzero_column() {
        let account = AccountId::new();
        let tp = ThirdPartyId::new();
        let d = MovementDraft::debit(account, tp, Money::from_minor(500));
        let c = MovementDraft::credit(account, tp, Money::from_minor(700));

        assert_eq!(d.side(), Some(Side::Debit));
        assert_eq!(d.amount(), Money::from_minor(500));
        assert_eq!(c.side(), Some(Side::Credit));
        assert_eq!(c.amount(), Money::from_minor(700));
    }

    #[test]
    fn with_amount_keeps_orientation() {
        let c = MovementDraft::credit(AccountId::new(), ThirdPartyId::new(), Money::from_minor(1));
        let c = c.with_amount(Money::from_minor(900));
        assert_eq!(c.credit, Money::from_minor(900));
        assert!(c.debit.is_zero());
    }

    #[test]
    fn draft_deserializes_with_missing_fields() {
        let draft: MovementDraft = serde_json::from_str(r#"{"debit": "10.5"}"#).unwrap();
        assert_eq!(draft.account, None);
        assert_eq!(draft.debit, Money::from_minor(1050));
        assert!(draft.credit.is_zero());
    }
}
