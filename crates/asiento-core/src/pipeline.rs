//! Submission pipeline: references, balance, anomaly detection, persist.

use std::collections::HashMap;
use std::sync::Arc;

use asiento_storage::RecordRepository;
use asiento_types::{
    Account, AccountId, BalanceError, Company, ThirdParty, ThirdPartyId, Transaction,
    TransactionDraft,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::balance::{validate_balance, BalanceSummary};
use crate::correction::apply_corrections;
use crate::detector::{AnomalyDetector, DetectionResult, MovementCorrection, RuleSnapshot};
use crate::error::LedgerError;
use crate::flow::SubmissionStageMachine;
use crate::nature::{review_nature, NatureWarning};

/// Result of one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Persisted {
        transaction: Transaction,
        warnings: Vec<NatureWarning>,
    },
    Rejected(BalanceError),
    /// Nothing stored; the caller discards, forces or applies the plan.
    AwaitingDecision { detection: DetectionResult },
    Discarded,
}

impl SubmissionOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Persisted { .. } => "persisted",
            Self::Rejected(_) => "rejected",
            Self::AwaitingDecision { .. } => "awaiting_decision",
            Self::Discarded => "discarded",
        }
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            Self::Persisted { transaction, .. } => Some(transaction),
            _ => None,
        }
    }
}

/// Dry-run result: what [`SubmissionPipeline::submit`] would do.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Clean {
        summary: BalanceSummary,
        warnings: Vec<NatureWarning>,
    },
    Rejected(BalanceError),
    AwaitingDecision { detection: DetectionResult },
}

/// Caller's answer to [`SubmissionOutcome::AwaitingDecision`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Discard,
    ForceSave {
        draft: TransactionDraft,
    },
    ApplyCorrections {
        draft: TransactionDraft,
        plan: Vec<MovementCorrection>,
    },
}

/// Records a submission refers to, loaded before any checks run.
struct References {
    company: Company,
    accounts: HashMap<AccountId, Account>,
    third_parties: HashMap<ThirdPartyId, ThirdParty>,
}

#[derive(Clone)]
pub struct SubmissionPipeline {
    repo: Arc<dyn RecordRepository>,
    detector: AnomalyDetector,
}

impl SubmissionPipeline {
    pub fn new(repo: Arc<dyn RecordRepository>, detector: AnomalyDetector) -> Self {
        Self { repo, detector }
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    /// Validate and, when clean, persist `draft`.
    ///
    /// Each call is independent: the same clean draft submitted twice is
    /// stored twice under two numbers.
    pub async fn submit(&self, draft: TransactionDraft) -> Result<SubmissionOutcome, LedgerError> {
        let mut machine = SubmissionStageMachine::new();
        let refs = self.resolve_references(&draft).await?;

        machine.mark_balance_checked()?;
        if let Err(err) = validate_balance(&draft.movements) {
            machine.mark_rejected()?;
            warn!(company = %draft.company_id, error = %err, "Submission rejected");
            return Ok(SubmissionOutcome::Rejected(err));
        }

        machine.mark_anomaly_checked()?;
        let rules = self.rule_snapshot(&draft, &refs).await?;
        let detection = self
            .detector
            .detect(draft.company_id, &draft.movements, &rules);
        if !detection.is_clean() {
            machine.mark_awaiting_decision()?;
            warn!(
                company = %draft.company_id,
                alerts = detection.alerts.len(),
                "Submission held for decision"
            );
            return Ok(SubmissionOutcome::AwaitingDecision { detection });
        }

        self.persist(&mut machine, draft, &refs).await
    }

    /// Run every check [`Self::submit`] runs without storing anything.
    pub async fn validate(&self, draft: &TransactionDraft) -> Result<ValidationOutcome, LedgerError> {
        let refs = self.resolve_references(draft).await?;
        let summary = match validate_balance(&draft.movements) {
            Ok(summary) => summary,
            Err(err) => return Ok(ValidationOutcome::Rejected(err)),
        };

        let rules = self.rule_snapshot(draft, &refs).await?;
        let detection = self
            .detector
            .detect(draft.company_id, &draft.movements, &rules);
        if !detection.is_clean() {
            return Ok(ValidationOutcome::AwaitingDecision { detection });
        }

        Ok(ValidationOutcome::Clean {
            summary,
            warnings: review_nature(&draft.movements, &refs.accounts),
        })
    }

    /// Persist despite anomalies. References and balance are still checked.
    pub async fn force_save(&self, draft: TransactionDraft) -> Result<SubmissionOutcome, LedgerError> {
        let mut machine = SubmissionStageMachine::new();
        let refs = self.resolve_references(&draft).await?;

        machine.mark_balance_checked()?;
        if let Err(err) = validate_balance(&draft.movements) {
            machine.mark_rejected()?;
            warn!(company = %draft.company_id, error = %err, "Forced submission rejected");
            return Ok(SubmissionOutcome::Rejected(err));
        }

        machine.skip_detection()?;
        self.persist(&mut machine, draft, &refs).await
    }

    /// Apply `plan` to the draft's lines and submit the result as new.
    pub async fn apply_corrections_and_resubmit(
        &self,
        mut draft: TransactionDraft,
        plan: &[MovementCorrection],
    ) -> Result<SubmissionOutcome, LedgerError> {
        draft.movements = apply_corrections(&draft.movements, plan)?;
        self.submit(draft).await
    }

    pub fn discard(&self) -> SubmissionOutcome {
        debug!("Submission discarded");
        SubmissionOutcome::Discarded
    }

    pub async fn decide(&self, decision: Decision) -> Result<SubmissionOutcome, LedgerError> {
        match decision {
            Decision::Discard => Ok(self.discard()),
            Decision::ForceSave { draft } => self.force_save(draft).await,
            Decision::ApplyCorrections { draft, plan } => {
                self.apply_corrections_and_resubmit(draft, &plan).await
            }
        }
    }

    async fn persist(
        &self,
        machine: &mut SubmissionStageMachine,
        draft: TransactionDraft,
        refs: &References,
    ) -> Result<SubmissionOutcome, LedgerError> {
        let warnings = review_nature(&draft.movements, &refs.accounts);
        let transaction = self.repo.save_transaction(draft).await?;
        machine.mark_persisted()?;

        info!(
            company = %refs.company.name,
            number = %transaction.number,
            movements = transaction.movements.len(),
            total = %transaction.total_debit(),
            forced = machine.detection_skipped(),
            warnings = warnings.len(),
            "Transaction persisted"
        );
        Ok(SubmissionOutcome::Persisted {
            transaction,
            warnings,
        })
    }

    /// Company plus every account and third party the draft names must exist.
    /// Lines with a missing account or third party are left to the balance
    /// check, which reports them by index.
    async fn resolve_references(&self, draft: &TransactionDraft) -> Result<References, LedgerError> {
        let company = self
            .repo
            .get_company(draft.company_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("company", draft.company_id))?;

        let mut accounts = HashMap::new();
        let mut third_parties = HashMap::new();
        for line in &draft.movements {
            if let Some(id) = line.account {
                if !accounts.contains_key(&id) {
                    let account = self
                        .repo
                        .get_account(id)
                        .await?
                        .ok_or_else(|| LedgerError::not_found("account", id))?;
                    accounts.insert(id, account);
                }
            }
            if let Some(id) = line.third_party {
                if !third_parties.contains_key(&id) {
                    let third_party = self
                        .repo
                        .get_third_party(id)
                        .await?
                        .filter(|tp| !tp.is_deleted)
                        .ok_or_else(|| LedgerError::not_found("third party", id))?;
                    third_parties.insert(id, third_party);
                }
            }
        }

        Ok(References {
            company,
            accounts,
            third_parties,
        })
    }

    async fn rule_snapshot(
        &self,
        draft: &TransactionDraft,
        refs: &References,
    ) -> Result<RuleSnapshot, LedgerError> {
        let mut snapshot = RuleSnapshot::new();
        for (id, third_party) in &refs.third_parties {
            snapshot.label_third_party(*id, third_party.display_name());
            if let Some(rule) = self.repo.get_rule(draft.company_id, *id).await? {
                let label = match refs.accounts.get(&rule.account_id) {
                    Some(account) => Some(account.full_name()),
                    None => self
                        .repo
                        .get_account(rule.account_id)
                        .await?
                        .map(|a| a.full_name()),
                };
                if let Some(label) = label {
                    snapshot.label_account(rule.account_id, label);
                }
                snapshot.insert(rule);
            }
        }
        for (id, account) in &refs.accounts {
            snapshot.label_account(*id, account.full_name());
        }
        Ok(snapshot)
    }
}
