use crate::model::{
    LedgerLine, MovementFilter, MovementUpdate, TransactionFilter, TransactionHeaderUpdate,
};
use crate::StorageResult;
use asiento_types::{
    Account, AccountId, ClassificationRule, Company, CompanyId, Movement, MovementId,
    RecurringTemplate, RuleId, TemplateId, ThirdParty, ThirdPartyId, Transaction,
    TransactionDraft, TransactionId,
};
use async_trait::async_trait;

/// Learned classification rules, one per (company, third party).
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn get_rule(
        &self,
        company_id: CompanyId,
        third_party_id: ThirdPartyId,
    ) -> StorageResult<Option<ClassificationRule>>;

    async fn get_rule_by_id(&self, rule_id: RuleId) -> StorageResult<Option<ClassificationRule>>;

    /// Insert or replace the rule for `rule.key()`.
    ///
    /// `rule.version` must equal the stored version (0 when no rule exists),
    /// otherwise the write fails with [`crate::StorageError::Conflict`]. The
    /// stored rule is returned with its version bumped.
    async fn upsert_rule(&self, rule: ClassificationRule) -> StorageResult<ClassificationRule>;

    async fn delete_rule(&self, rule_id: RuleId) -> StorageResult<()>;

    /// Rules of one company, highest confidence first.
    async fn list_rules(&self, company_id: CompanyId) -> StorageResult<Vec<ClassificationRule>>;
}

/// Transactions and their movements.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persist header and movements in one step and assign the next number
    /// of the company. References are checked and the balance invariant
    /// re-verified; on any failure nothing is stored.
    async fn save_transaction(&self, draft: TransactionDraft) -> StorageResult<Transaction>;

    async fn get_transaction(&self, id: TransactionId) -> StorageResult<Option<Transaction>>;

    /// Newest date first, then highest number first.
    async fn list_transactions(&self, filter: TransactionFilter)
        -> StorageResult<Vec<Transaction>>;

    async fn get_movement(&self, id: MovementId) -> StorageResult<Option<Movement>>;

    /// Movements of live transactions, newest date first.
    async fn list_movements(&self, filter: MovementFilter) -> StorageResult<Vec<LedgerLine>>;

    /// Change date, concept or additional description. Deleted
    /// transactions are not found.
    async fn update_transaction_header(
        &self,
        id: TransactionId,
        update: TransactionHeaderUpdate,
    ) -> StorageResult<Transaction>;

    /// Apply `update` to one movement. Rejected when the parent would stop
    /// balancing or the line would become invalid.
    async fn update_movement(
        &self,
        id: MovementId,
        update: MovementUpdate,
    ) -> StorageResult<Movement>;

    /// Soft-delete (`true`) or restore (`false`).
    async fn set_transaction_deleted(
        &self,
        id: TransactionId,
        deleted: bool,
    ) -> StorageResult<Transaction>;
}

/// Companies, chart of accounts and third parties.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn get_company(&self, id: CompanyId) -> StorageResult<Option<Company>>;
    async fn upsert_company(&self, company: Company) -> StorageResult<Company>;
    async fn list_companies(&self) -> StorageResult<Vec<Company>>;

    async fn get_account(&self, id: AccountId) -> StorageResult<Option<Account>>;
    async fn get_account_by_code(&self, code: &str) -> StorageResult<Option<Account>>;
    /// Account codes are unique.
    async fn upsert_account(&self, account: Account) -> StorageResult<Account>;
    /// Ordered by code.
    async fn list_accounts(&self) -> StorageResult<Vec<Account>>;

    async fn get_third_party(&self, id: ThirdPartyId) -> StorageResult<Option<ThirdParty>>;
    /// NITs are unique among live third parties.
    async fn upsert_third_party(&self, third_party: ThirdParty) -> StorageResult<ThirdParty>;
    /// Live third parties ordered by name.
    async fn list_third_parties(&self) -> StorageResult<Vec<ThirdParty>>;
}

/// Recurring transaction templates.
#[async_trait]
pub trait RecurringStore: Send + Sync {
    async fn get_recurring(&self, id: TemplateId) -> StorageResult<Option<RecurringTemplate>>;
    async fn list_recurring(
        &self,
        company_id: Option<CompanyId>,
    ) -> StorageResult<Vec<RecurringTemplate>>;
    async fn upsert_recurring(&self, template: RecurringTemplate)
        -> StorageResult<RecurringTemplate>;
}

/// Unified repository consumed by the engine and the service.
pub trait RecordRepository:
    RuleStore + LedgerStore + ReferenceStore + RecurringStore + Send + Sync
{
}

impl<T> RecordRepository for T where
    T: RuleStore + LedgerStore + ReferenceStore + RecurringStore + Send + Sync
{
}
