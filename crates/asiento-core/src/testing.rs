//! In-memory store whose rule and template writes can be made to fail.

use std::sync::atomic::{AtomicBool, Ordering};

use asiento_storage::{
    InMemoryRepository, LedgerLine, LedgerStore, MovementFilter, MovementUpdate, RecurringStore,
    ReferenceStore, RuleStore, StorageError, StorageResult, TransactionFilter,
    TransactionHeaderUpdate,
};
use asiento_types::{
    Account, AccountId, ClassificationRule, Company, CompanyId, Movement, MovementId,
    RecurringTemplate, RuleId, TemplateId, ThirdParty, ThirdPartyId, Transaction,
    TransactionDraft, TransactionId,
};
use async_trait::async_trait;

#[derive(Debug, Default)]
pub(crate) struct FlakyStore {
    pub inner: InMemoryRepository,
    pub fail_rule_writes: AtomicBool,
    pub fail_template_writes: AtomicBool,
}

impl FlakyStore {
    fn check(flag: &AtomicBool, what: &str) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("{what} write refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl RuleStore for FlakyStore {
    async fn get_rule(
        &self,
        company_id: CompanyId,
        third_party_id: ThirdPartyId,
    ) -> StorageResult<Option<ClassificationRule>> {
        self.inner.get_rule(company_id, third_party_id).await
    }

    async fn get_rule_by_id(&self, rule_id: RuleId) -> StorageResult<Option<ClassificationRule>> {
        self.inner.get_rule_by_id(rule_id).await
    }

    async fn upsert_rule(&self, rule: ClassificationRule) -> StorageResult<ClassificationRule> {
        Self::check(&self.fail_rule_writes, "rule")?;
        self.inner.upsert_rule(rule).await
    }

    async fn delete_rule(&self, rule_id: RuleId) -> StorageResult<()> {
        self.inner.delete_rule(rule_id).await
    }

    async fn list_rules(&self, company_id: CompanyId) -> StorageResult<Vec<ClassificationRule>> {
        self.inner.list_rules(company_id).await
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn save_transaction(&self, draft: TransactionDraft) -> StorageResult<Transaction> {
        self.inner.save_transaction(draft).await
    }

    async fn get_transaction(&self, id: TransactionId) -> StorageResult<Option<Transaction>> {
        self.inner.get_transaction(id).await
    }

    async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> StorageResult<Vec<Transaction>> {
        self.inner.list_transactions(filter).await
    }

    async fn get_movement(&self, id: MovementId) -> StorageResult<Option<Movement>> {
        self.inner.get_movement(id).await
    }

    async fn list_movements(&self, filter: MovementFilter) -> StorageResult<Vec<LedgerLine>> {
        self.inner.list_movements(filter).await
    }

    async fn update_transaction_header(
        &self,
        id: TransactionId,
        update: TransactionHeaderUpdate,
    ) -> StorageResult<Transaction> {
        self.inner.update_transaction_header(id, update).await
    }

    async fn update_movement(
        &self,
        id: MovementId,
        update: MovementUpdate,
    ) -> StorageResult<Movement> {
        self.inner.update_movement(id, update).await
    }

    async fn set_transaction_deleted(
        &self,
        id: TransactionId,
        deleted: bool,
    ) -> StorageResult<Transaction> {
        self.inner.set_transaction_deleted(id, deleted).await
    }
}

#[async_trait]
impl ReferenceStore for FlakyStore {
    async fn get_company(&self, id: CompanyId) -> StorageResult<Option<Company>> {
        self.inner.get_company(id).await
    }

    async fn upsert_company(&self, company: Company) -> StorageResult<Company> {
        self.inner.upsert_company(company).await
    }

    async fn list_companies(&self) -> StorageResult<Vec<Company>> {
        self.inner.list_companies().await
    }

    async fn get_account(&self, id: AccountId) -> StorageResult<Option<Account>> {
        self.inner.get_account(id).await
    }

    async fn get_account_by_code(&self, code: &str) -> StorageResult<Option<Account>> {
        self.inner.get_account_by_code(code).await
    }

    async fn upsert_account(&self, account: Account) -> StorageResult<Account> {
        self.inner.upsert_account(account).await
    }

    async fn list_accounts(&self) -> StorageResult<Vec<Account>> {
        self.inner.list_accounts().await
    }

    async fn get_third_party(&self, id: ThirdPartyId) -> StorageResult<Option<ThirdParty>> {
        self.inner.get_third_party(id).await
    }

    async fn upsert_third_party(&self, third_party: ThirdParty) -> StorageResult<ThirdParty> {
        self.inner.upsert_third_party(third_party).await
    }

    async fn list_third_parties(&self) -> StorageResult<Vec<ThirdParty>> {
        self.inner.list_third_parties().await
    }
}

#[async_trait]
impl RecurringStore for FlakyStore {
    async fn get_recurring(&self, id: TemplateId) -> StorageResult<Option<RecurringTemplate>> {
        self.inner.get_recurring(id).await
    }

    async fn list_recurring(
        &self,
        company_id: Option<CompanyId>,
    ) -> StorageResult<Vec<RecurringTemplate>> {
        self.inner.list_recurring(company_id).await
    }

    async fn upsert_recurring(
        &self,
        template: RecurringTemplate,
    ) -> StorageResult<RecurringTemplate> {
        Self::check(&self.fail_template_writes, "template")?;
        self.inner.upsert_recurring(template).await
    }
}
