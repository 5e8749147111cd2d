use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, CompanyId, RuleId, ThirdPartyId};
use crate::money::Money;

/// Learned preference: for this (company, third party), book to `account_id`.
///
/// `confidence` counts consecutive confirmations of the same account and is
/// never below 1. `average_amount` is the incremental mean of the amounts
/// observed since the last override. `version` is bumped on every write and
/// checked by the store to reject stale updates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub id: RuleId,
    pub company_id: CompanyId,
    pub third_party_id: ThirdPartyId,
    pub account_id: AccountId,
    pub confidence: u32,
    pub average_amount: Option<Money>,
    pub last_amount: Option<Money>,
    pub min_amount: Option<Money>,
    pub max_amount: Option<Money>,
    pub created_by_user: bool,
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClassificationRule {
    /// Manually created rule: confidence 1, no amount history.
    pub fn manual(company_id: CompanyId, third_party_id: ThirdPartyId, account_id: AccountId) -> Self {
        let now = Utc::now();
        Self {
            id: RuleId::new(),
            company_id,
            third_party_id,
            account_id,
            confidence: 1,
            average_amount: None,
            last_amount: None,
            min_amount: None,
            max_amount: None,
            created_by_user: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Historical average, treating a missing average as zero.
    pub fn average(&self) -> Money {
        self.average_amount.unwrap_or(Money::ZERO)
    }

    pub fn key(&self) -> (CompanyId, ThirdPartyId) {
        (self.company_id, self.third_party_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_rule_has_no_history() {
        let rule = ClassificationRule::manual(CompanyId::new(), ThirdPartyId::new(), AccountId::new());
        assert_eq!(rule.confidence, 1);
        assert_eq!(rule.average(), Money::ZERO);
        assert!(rule.created_by_user);
        assert_eq!(rule.version, 0);
    }
}
