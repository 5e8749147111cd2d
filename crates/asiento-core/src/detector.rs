//! Anomaly detection against learned classification rules.
//!
//! Detection is a pure lookup over a [`RuleSnapshot`]; nothing here touches
//! the store.

use std::collections::HashMap;

use asiento_types::{
    AccountId, ClassificationRule, CompanyId, Money, MovementDraft, RuleId, ThirdPartyId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DetectorConfig;
use crate::error::LedgerError;

/// Read-only view of the rules relevant to one submission, plus display
/// labels used in suggestion text.
#[derive(Debug, Clone, Default)]
pub struct RuleSnapshot {
    rules: HashMap<(CompanyId, ThirdPartyId), ClassificationRule>,
    third_party_names: HashMap<ThirdPartyId, String>,
    account_labels: HashMap<AccountId, String>,
}

impl RuleSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: impl IntoIterator<Item = ClassificationRule>) -> Self {
        let mut snapshot = Self::new();
        for rule in rules {
            snapshot.insert(rule);
        }
        snapshot
    }

    pub fn insert(&mut self, rule: ClassificationRule) {
        self.rules.insert(rule.key(), rule);
    }

    pub fn get(
        &self,
        company_id: CompanyId,
        third_party_id: ThirdPartyId,
    ) -> Option<&ClassificationRule> {
        self.rules.get(&(company_id, third_party_id))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn label_third_party(&mut self, id: ThirdPartyId, name: impl Into<String>) {
        self.third_party_names.insert(id, name.into());
    }

    pub fn label_account(&mut self, id: AccountId, label: impl Into<String>) {
        self.account_labels.insert(id, label.into());
    }

    fn third_party_name(&self, id: ThirdPartyId) -> String {
        self.third_party_names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    fn account_label(&self, id: AccountId) -> String {
        self.account_labels
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    /// The movement's account differs from the learned one.
    AccountMismatch {
        expected_account: AccountId,
        actual_account: AccountId,
        amount: Money,
    },
    /// Account matches but the amount is far from the historical average.
    AmountAnomaly {
        account: AccountId,
        historical_average: Money,
        amount: Money,
    },
}

/// Soft warning about one movement line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub movement_index: usize,
    pub third_party_id: ThirdPartyId,
    pub rule_id: RuleId,
    pub rule_confidence: u32,
    #[serde(flatten)]
    pub kind: AlertKind,
    pub message: String,
}

/// Rule-implied rewrite of one movement line. `None` keeps the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementCorrection {
    pub movement_index: usize,
    #[serde(default)]
    pub account: Option<AccountId>,
    #[serde(default)]
    pub amount: Option<Money>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub alerts: Vec<Alert>,
    pub suggestions: Vec<String>,
    pub correction_plan: Vec<MovementCorrection>,
}

impl DetectionResult {
    pub fn is_clean(&self) -> bool {
        self.alerts.is_empty()
    }
}

/// Compares proposed lines with the learned (company, third party) rules.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// `true` when `amount` falls outside the configured band around a
    /// nonzero `average`. A zero average never flags.
    pub fn amount_deviates(&self, average: Money, amount: Money) -> bool {
        if average.is_zero() {
            return false;
        }
        let average = average.amount();
        let amount = amount.amount();
        amount < average * self.config.low_ratio || amount > average * self.config.high_ratio
    }

    pub fn detect(
        &self,
        company_id: CompanyId,
        movements: &[MovementDraft],
        rules: &RuleSnapshot,
    ) -> DetectionResult {
        let mut result = DetectionResult::default();

        for (index, line) in movements.iter().enumerate() {
            let (Some(account), Some(third_party)) = (line.account, line.third_party) else {
                continue;
            };
            let Some(rule) = rules.get(company_id, third_party) else {
                continue;
            };
            let amount = line.amount();
            let who = rules.third_party_name(third_party);

            if rule.account_id != account {
                let expected = rules.account_label(rule.account_id);
                let actual = rules.account_label(account);
                warn!(
                    movement = index,
                    third_party = %third_party,
                    expected = %rule.account_id,
                    actual = %account,
                    "Account differs from learned rule"
                );
                result.alerts.push(Alert {
                    movement_index: index,
                    third_party_id: third_party,
                    rule_id: rule.id,
                    rule_confidence: rule.confidence,
                    kind: AlertKind::AccountMismatch {
                        expected_account: rule.account_id,
                        actual_account: account,
                        amount,
                    },
                    message: format!(
                        "Movement {} books {} to {}, but it is usually booked to {}",
                        index + 1,
                        who,
                        actual,
                        expected
                    ),
                });
                result.suggestions.push(format!(
                    "Third party {who} is usually booked to account {expected} (confidence {})",
                    rule.confidence
                ));
                result.correction_plan.push(MovementCorrection {
                    movement_index: index,
                    account: Some(rule.account_id),
                    amount: None,
                });
                continue;
            }

            let average = rule.average();
            if self.amount_deviates(average, amount) {
                warn!(
                    movement = index,
                    third_party = %third_party,
                    average = %average,
                    amount = %amount,
                    "Amount deviates from historical average"
                );
                result.alerts.push(Alert {
                    movement_index: index,
                    third_party_id: third_party,
                    rule_id: rule.id,
                    rule_confidence: rule.confidence,
                    kind: AlertKind::AmountAnomaly {
                        account,
                        historical_average: average,
                        amount,
                    },
                    message: format!(
                        "Movement {} for {} is {}, historical average is {}",
                        index + 1,
                        who,
                        amount,
                        average
                    ),
                });
                result.suggestions.push(format!(
                    "Check the amount for {who}: it usually comes in around {average}"
                ));
                result.correction_plan.push(MovementCorrection {
                    movement_index: index,
                    account: None,
                    amount: Some(average),
                });
            }
        }

        debug!(
            company = %company_id,
            movements = movements.len(),
            alerts = result.alerts.len(),
            "Anomaly detection finished"
        );
        result
    }
}
