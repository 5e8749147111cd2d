use std::sync::Arc;

use asiento_storage::{
    LedgerLine, MovementFilter, RecordRepository, StorageConfig, TransactionFilter,
    TransactionHeaderUpdate,
};
use asiento_types::{
    Account, AccountId, ClassificationRule, Company, CompanyId, Money, MovementId,
    RecurringTemplate, RuleId, ThirdParty, ThirdPartyId, Transaction, TransactionDraft,
    TransactionId,
};
use chrono::NaiveDate;
use tracing::info;

use crate::balance::validate_balance;
use crate::classifier::{Classification, Classifier};
use crate::config::EngineConfig;
use crate::dashboard::DashboardStats;
use crate::detector::{AnomalyDetector, MovementCorrection, RuleSnapshot};
use crate::editor::{EditOutcome, MovementEdit, MovementEditor};
use crate::error::LedgerError;
use crate::learning::LearningUpdater;
use crate::pipeline::{Decision, SubmissionOutcome, SubmissionPipeline, ValidationOutcome};
use crate::recurring::{RecurringRunner, RecurringSummary};
use crate::report::TrialBalance;
use crate::reversal::reversal_draft;

/// Bookkeeping engine: one repository shared by the submission pipeline,
/// the movement editor, rule learning and reporting.
#[derive(Clone)]
pub struct AsientoEngine {
    repo: Arc<dyn RecordRepository>,
    pipeline: SubmissionPipeline,
    editor: MovementEditor,
    learning: LearningUpdater,
    classifier: Classifier,
    recurring: RecurringRunner,
    config: EngineConfig,
}

impl AsientoEngine {
    /// Validate `config` and wire every component over `repo`.
    pub fn bootstrap(
        repo: Arc<dyn RecordRepository>,
        config: EngineConfig,
    ) -> Result<Self, LedgerError> {
        config.validate()?;

        let detector = AnomalyDetector::new(config.detector.clone())?;
        let learning = LearningUpdater::new(repo.clone(), config.max_conflict_retries);
        let pipeline = SubmissionPipeline::new(repo.clone(), detector.clone());
        let editor = MovementEditor::new(repo.clone(), learning.clone());
        let classifier = Classifier::new(&config, detector);
        let recurring = RecurringRunner::new(repo.clone(), pipeline.clone());

        info!(
            low_ratio = %config.detector.low_ratio,
            high_ratio = %config.detector.high_ratio,
            keyword_rules = config.keywords.len(),
            "Asiento engine ready"
        );
        Ok(Self {
            repo,
            pipeline,
            editor,
            learning,
            classifier,
            recurring,
            config,
        })
    }

    /// Open the configured store and bootstrap over it.
    pub fn open(storage: &StorageConfig, config: EngineConfig) -> Result<Self, LedgerError> {
        let repo = storage.open()?;
        Self::bootstrap(Arc::new(repo), config)
    }

    pub fn repo(&self) -> &Arc<dyn RecordRepository> {
        &self.repo
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &SubmissionPipeline {
        &self.pipeline
    }

    pub fn learning(&self) -> &LearningUpdater {
        &self.learning
    }

    // Submission

    pub async fn submit(&self, draft: TransactionDraft) -> Result<SubmissionOutcome, LedgerError> {
        self.pipeline.submit(draft).await
    }

    pub async fn validate(&self, draft: &TransactionDraft) -> Result<ValidationOutcome, LedgerError> {
        self.pipeline.validate(draft).await
    }

    pub async fn force_save(&self, draft: TransactionDraft) -> Result<SubmissionOutcome, LedgerError> {
        self.pipeline.force_save(draft).await
    }

    pub async fn apply_corrections_and_resubmit(
        &self,
        draft: TransactionDraft,
        plan: &[MovementCorrection],
    ) -> Result<SubmissionOutcome, LedgerError> {
        self.pipeline.apply_corrections_and_resubmit(draft, plan).await
    }

    pub async fn decide(&self, decision: Decision) -> Result<SubmissionOutcome, LedgerError> {
        self.pipeline.decide(decision).await
    }

    pub async fn edit_movement(
        &self,
        movement_id: MovementId,
        edit: MovementEdit,
    ) -> Result<EditOutcome, LedgerError> {
        self.editor.edit_movement(movement_id, edit).await
    }

    // Transaction lifecycle

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("transaction", id))
    }

    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.repo.list_transactions(filter).await?)
    }

    /// Movements of live transactions, newest first.
    pub async fn list_movements(&self, filter: MovementFilter) -> Result<Vec<LedgerLine>, LedgerError> {
        Ok(self.repo.list_movements(filter).await?)
    }

    /// Change date, concept or additional description. Lines are left alone.
    pub async fn update_transaction_header(
        &self,
        id: TransactionId,
        update: TransactionHeaderUpdate,
    ) -> Result<Transaction, LedgerError> {
        if update.is_empty() {
            return self.get_transaction(id).await;
        }
        let tx = self.repo.update_transaction_header(id, update).await?;
        info!(number = %tx.number, "Transaction header updated");
        Ok(tx)
    }

    /// Book a mirror of a live transaction dated `date`. The original is kept.
    pub async fn reverse_transaction(
        &self,
        id: TransactionId,
        date: NaiveDate,
        requested_by: Option<&str>,
    ) -> Result<Transaction, LedgerError> {
        let original = self
            .repo
            .get_transaction(id)
            .await?
            .filter(|tx| !tx.is_deleted)
            .ok_or_else(|| LedgerError::not_found("transaction", id))?;

        let draft = reversal_draft(&original, date, requested_by);
        match self.pipeline.force_save(draft).await? {
            SubmissionOutcome::Persisted { transaction, .. } => {
                info!(
                    original = %original.number,
                    reversal = %transaction.number,
                    "Transaction reversed"
                );
                Ok(transaction)
            }
            SubmissionOutcome::Rejected(err) => Err(err.into()),
            SubmissionOutcome::AwaitingDecision { .. } => {
                Err(LedgerError::stage_violation("persisted", "awaiting_decision"))
            }
            SubmissionOutcome::Discarded => Err(LedgerError::stage_violation("persisted", "discarded")),
        }
    }

    pub async fn soft_delete_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        let tx = self.repo.set_transaction_deleted(id, true).await?;
        info!(number = %tx.number, "Transaction deleted");
        Ok(tx)
    }

    pub async fn restore_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        let tx = self.repo.set_transaction_deleted(id, false).await?;
        info!(number = %tx.number, "Transaction restored");
        Ok(tx)
    }

    // Reference data

    pub async fn register_company(&self, company: Company) -> Result<Company, LedgerError> {
        Ok(self.repo.upsert_company(company).await?)
    }

    pub async fn companies(&self) -> Result<Vec<Company>, LedgerError> {
        Ok(self.repo.list_companies().await?)
    }

    pub async fn register_account(&self, account: Account) -> Result<Account, LedgerError> {
        Ok(self.repo.upsert_account(account).await?)
    }

    pub async fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        Ok(self.repo.list_accounts().await?)
    }

    pub async fn register_third_party(&self, third_party: ThirdParty) -> Result<ThirdParty, LedgerError> {
        Ok(self.repo.upsert_third_party(third_party).await?)
    }

    pub async fn third_parties(&self) -> Result<Vec<ThirdParty>, LedgerError> {
        Ok(self.repo.list_third_parties().await?)
    }

    // Rules

    pub async fn list_rules(&self, company_id: CompanyId) -> Result<Vec<ClassificationRule>, LedgerError> {
        Ok(self.repo.list_rules(company_id).await?)
    }

    /// Set the rule for (company, third party) by hand. An existing rule is
    /// replaced and its statistics reset.
    pub async fn create_manual_rule(
        &self,
        company_id: CompanyId,
        third_party_id: ThirdPartyId,
        account_id: AccountId,
    ) -> Result<ClassificationRule, LedgerError> {
        self.repo
            .get_company(company_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("company", company_id))?;
        self.repo
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", account_id))?;
        self.repo
            .get_third_party(third_party_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("third party", third_party_id))?;

        let mut rule = ClassificationRule::manual(company_id, third_party_id, account_id);
        if let Some(existing) = self.repo.get_rule(company_id, third_party_id).await? {
            rule.id = existing.id;
            rule.version = existing.version;
            rule.created_at = existing.created_at;
        }
        let stored = self.repo.upsert_rule(rule).await?;
        info!(third_party = %third_party_id, account = %account_id, "Manual rule set");
        Ok(stored)
    }

    pub async fn delete_rule(&self, rule_id: RuleId) -> Result<(), LedgerError> {
        self.repo.delete_rule(rule_id).await?;
        info!(rule = %rule_id, "Rule deleted");
        Ok(())
    }

    /// Suggest an expense account. Rules are read, never written.
    pub async fn classify(
        &self,
        company_id: CompanyId,
        third_party_id: ThirdPartyId,
        text: &str,
        amount: Money,
    ) -> Result<Classification, LedgerError> {
        let rules = RuleSnapshot::from_rules(self.repo.get_rule(company_id, third_party_id).await?);
        Ok(self
            .classifier
            .classify(company_id, third_party_id, text, amount, &rules))
    }

    // Reports

    pub async fn trial_balance(
        &self,
        company_id: CompanyId,
        year: i32,
        month: u32,
    ) -> Result<TrialBalance, LedgerError> {
        TrialBalance::load(self.repo.as_ref(), company_id, year, month).await
    }

    pub async fn dashboard(
        &self,
        company_id: CompanyId,
        as_of: NaiveDate,
    ) -> Result<DashboardStats, LedgerError> {
        DashboardStats::load(self.repo.as_ref(), company_id, as_of).await
    }

    // Recurring

    /// Store a template. Its lines must balance.
    pub async fn save_recurring(
        &self,
        template: RecurringTemplate,
    ) -> Result<RecurringTemplate, LedgerError> {
        let draft = template.to_draft(NaiveDate::MIN);
        validate_balance(&draft.movements)?;
        Ok(self.repo.upsert_recurring(template).await?)
    }

    pub async fn list_recurring(
        &self,
        company_id: Option<CompanyId>,
    ) -> Result<Vec<RecurringTemplate>, LedgerError> {
        Ok(self.repo.list_recurring(company_id).await?)
    }

    pub async fn run_recurring(
        &self,
        today: NaiveDate,
        company_id: Option<CompanyId>,
    ) -> Result<RecurringSummary, LedgerError> {
        self.recurring.run(today, company_id).await
    }
}
