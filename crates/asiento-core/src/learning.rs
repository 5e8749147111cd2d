//! Rule learning from user edits.

use std::sync::Arc;

use asiento_storage::{RecordRepository, StorageError};
use asiento_types::{AccountId, ClassificationRule, CompanyId, Money, RuleId, ThirdPartyId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::LedgerError;

/// A user booking `amount` for `third_party_id` to `account_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub company_id: CompanyId,
    pub third_party_id: ThirdPartyId,
    pub account_id: AccountId,
    pub amount: Money,
}

/// Update policy.
///
/// - no rule: new rule, confidence 1, average = amount
/// - same account: confidence + 1, incremental mean
/// - other account: override, confidence back to 1, average = amount
///
/// The returned rule keeps `existing.version` so the store can detect a
/// concurrent write.
pub fn learn(
    existing: Option<&ClassificationRule>,
    observation: &Observation,
    now: DateTime<Utc>,
) -> ClassificationRule {
    let amount = observation.amount;

    match existing {
        None => ClassificationRule {
            id: RuleId::new(),
            company_id: observation.company_id,
            third_party_id: observation.third_party_id,
            account_id: observation.account_id,
            confidence: 1,
            average_amount: Some(amount),
            last_amount: Some(amount),
            min_amount: Some(amount),
            max_amount: Some(amount),
            created_by_user: true,
            version: 0,
            created_at: now,
            updated_at: now,
        },
        Some(rule) if rule.account_id == observation.account_id => {
            let confidence = rule.confidence.saturating_add(1);
            let average = match rule.average_amount {
                Some(avg) => {
                    let delta = (amount.amount() - avg.amount()) / Decimal::from(confidence);
                    Money::new(avg.amount() + delta)
                }
                None => amount,
            };
            ClassificationRule {
                confidence,
                average_amount: Some(average),
                last_amount: Some(amount),
                min_amount: Some(rule.min_amount.map_or(amount, |m| m.min(amount))),
                max_amount: Some(rule.max_amount.map_or(amount, |m| m.max(amount))),
                updated_at: now,
                ..rule.clone()
            }
        }
        Some(rule) => ClassificationRule {
            account_id: observation.account_id,
            confidence: 1,
            average_amount: Some(amount),
            last_amount: Some(amount),
            min_amount: Some(amount),
            max_amount: Some(amount),
            created_by_user: true,
            updated_at: now,
            ..rule.clone()
        },
    }
}

/// Read-modify-write of rules with optimistic concurrency.
#[derive(Clone)]
pub struct LearningUpdater {
    repo: Arc<dyn RecordRepository>,
    max_conflict_retries: u32,
}

impl LearningUpdater {
    pub fn new(repo: Arc<dyn RecordRepository>, max_conflict_retries: u32) -> Self {
        Self {
            repo,
            max_conflict_retries,
        }
    }

    /// Record that the user booked `amount` for this third party to
    /// `account_id`, creating, confirming or overriding the rule.
    ///
    /// A conflicting concurrent write causes a re-read and re-apply, up to
    /// the configured number of retries. Other storage errors are returned
    /// as is.
    pub async fn record_confirmation(
        &self,
        company_id: CompanyId,
        third_party_id: ThirdPartyId,
        account_id: AccountId,
        amount: Money,
    ) -> Result<ClassificationRule, LedgerError> {
        let observation = Observation {
            company_id,
            third_party_id,
            account_id,
            amount,
        };

        let mut attempt = 0;
        loop {
            let existing = self.repo.get_rule(company_id, third_party_id).await?;
            let next = learn(existing.as_ref(), &observation, Utc::now());

            match self.repo.upsert_rule(next).await {
                Ok(stored) => {
                    match &existing {
                        None => info!(
                            third_party = %third_party_id,
                            account = %account_id,
                            "Rule learned"
                        ),
                        Some(prev) if prev.account_id != account_id => info!(
                            third_party = %third_party_id,
                            from = %prev.account_id,
                            to = %account_id,
                            "Rule overridden"
                        ),
                        Some(_) => debug!(
                            third_party = %third_party_id,
                            confidence = stored.confidence,
                            "Rule confirmed"
                        ),
                    }
                    return Ok(stored);
                }
                Err(StorageError::Conflict(reason)) if attempt < self.max_conflict_retries => {
                    attempt += 1;
                    warn!(
                        third_party = %third_party_id,
                        attempt = attempt,
                        reason = %reason,
                        "Rule update conflicted, retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
