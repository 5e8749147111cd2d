//! In-memory reference implementation of the record repository.
//!
//! All collections live behind one lock so that multi-record writes
//! (transaction header plus movements plus number, rule compare-and-swap)
//! are atomic. When opened with a [`SnapshotFile`] the whole store is
//! rewritten to disk after every mutation.

use crate::model::{
    LedgerLine, MovementFilter, MovementUpdate, TransactionFilter, TransactionHeaderUpdate,
};
use crate::snapshot::SnapshotFile;
use crate::traits::{LedgerStore, RecurringStore, ReferenceStore, RuleStore};
use crate::{StorageError, StorageResult};
use asiento_types::numbering;
use asiento_types::{
    balance_tolerance, Account, AccountId, ClassificationRule, Company, CompanyId, Money,
    Movement, MovementId, RecurringTemplate, RuleId, TemplateId, ThirdParty, ThirdPartyId,
    Transaction, TransactionDraft, TransactionId,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Everything the repository holds. Also the snapshot file format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoreState {
    #[serde(default)]
    companies: BTreeMap<CompanyId, Company>,
    #[serde(default)]
    accounts: BTreeMap<AccountId, Account>,
    #[serde(default)]
    third_parties: BTreeMap<ThirdPartyId, ThirdParty>,
    #[serde(default)]
    transactions: BTreeMap<TransactionId, Transaction>,
    #[serde(default)]
    rules: BTreeMap<RuleId, ClassificationRule>,
    #[serde(default)]
    recurring: BTreeMap<TemplateId, RecurringTemplate>,
}

impl StoreState {
    fn require_company(&self, id: CompanyId) -> StorageResult<&Company> {
        self.companies
            .get(&id)
            .ok_or_else(|| StorageError::NotFound(format!("company {id}")))
    }

    fn require_account(&self, id: AccountId) -> StorageResult<&Account> {
        self.accounts
            .get(&id)
            .ok_or_else(|| StorageError::NotFound(format!("account {id}")))
    }

    fn require_third_party(&self, id: ThirdPartyId) -> StorageResult<&ThirdParty> {
        self.third_parties
            .get(&id)
            .filter(|tp| !tp.is_deleted)
            .ok_or_else(|| StorageError::NotFound(format!("third party {id}")))
    }

    fn rule_for(&self, company_id: CompanyId, third_party_id: ThirdPartyId) -> Option<&ClassificationRule> {
        self.rules
            .values()
            .find(|rule| rule.company_id == company_id && rule.third_party_id == third_party_id)
    }

    /// Locate a movement: (transaction id, index within it).
    fn locate_movement(&self, id: MovementId) -> Option<(TransactionId, usize)> {
        self.transactions.values().find_map(|tx| {
            tx.movements
                .iter()
                .position(|m| m.id == id)
                .map(|index| (tx.id, index))
        })
    }

    fn check_line(
        &self,
        index: usize,
        account: Option<AccountId>,
        third_party: Option<ThirdPartyId>,
        debit: Money,
        credit: Money,
    ) -> StorageResult<(AccountId, ThirdPartyId)> {
        let account = account
            .ok_or_else(|| StorageError::InvalidInput(format!("movement {index} has no account")))?;
        let third_party = third_party.ok_or_else(|| {
            StorageError::InvalidInput(format!("movement {index} has no third party"))
        })?;
        self.require_account(account)?;
        self.require_third_party(third_party)?;

        if debit.is_negative() || credit.is_negative() {
            return Err(StorageError::InvalidInput(format!(
                "movement {index} has a negative amount"
            )));
        }
        if debit.is_zero() == credit.is_zero() {
            return Err(StorageError::InvalidInput(format!(
                "movement {index} must be either debit or credit"
            )));
        }
        Ok((account, third_party))
    }
}

fn check_balance(total_debit: Money, total_credit: Money) -> StorageResult<()> {
    if (total_debit - total_credit).abs() >= balance_tolerance() {
        return Err(StorageError::InvariantViolation(format!(
            "transaction does not balance: debit {total_debit}, credit {total_credit}"
        )));
    }
    Ok(())
}

/// In-memory record repository, optionally mirrored to a JSON snapshot.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<StoreState>,
    snapshot: Option<SnapshotFile>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store from `snapshot` (empty when the file does not exist yet)
    /// and keep writing every mutation back to it.
    pub fn with_snapshot(snapshot: SnapshotFile) -> StorageResult<Self> {
        let state = snapshot.load()?;
        Ok(Self {
            state: RwLock::new(state),
            snapshot: Some(snapshot),
        })
    }

    pub fn snapshot(&self) -> Option<&SnapshotFile> {
        self.snapshot.as_ref()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| StorageError::Backend("store lock poisoned".to_string()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| StorageError::Backend("store lock poisoned".to_string()))
    }

    /// Run a mutation under the write lock.
    ///
    /// With a snapshot the mutation runs on a copy of the state, the copy is
    /// written to disk, and only then replaces the live state. A failed write
    /// leaves memory exactly as the last successful snapshot.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut StoreState) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut guard = self.write()?;
        match &self.snapshot {
            Some(snapshot) => {
                let mut next = guard.clone();
                let out = apply(&mut next)?;
                snapshot.write(&next)?;
                *guard = next;
                Ok(out)
            }
            None => apply(&mut guard),
        }
    }
}

#[async_trait]
impl RuleStore for InMemoryRepository {
    async fn get_rule(
        &self,
        company_id: CompanyId,
        third_party_id: ThirdPartyId,
    ) -> StorageResult<Option<ClassificationRule>> {
        let guard = self.read()?;
        Ok(guard.rule_for(company_id, third_party_id).cloned())
    }

    async fn get_rule_by_id(&self, rule_id: RuleId) -> StorageResult<Option<ClassificationRule>> {
        let guard = self.read()?;
        Ok(guard.rules.get(&rule_id).cloned())
    }

    async fn upsert_rule(&self, rule: ClassificationRule) -> StorageResult<ClassificationRule> {
        let stored = self.mutate(|state| {
            state.require_company(rule.company_id)?;
            state.require_third_party(rule.third_party_id)?;
            state.require_account(rule.account_id)?;

            let now = Utc::now();
            let stored = match state.rule_for(rule.company_id, rule.third_party_id) {
                Some(current) => {
                    if current.version != rule.version {
                        return Err(StorageError::Conflict(format!(
                            "rule {} is at version {}, write was based on version {}",
                            current.id, current.version, rule.version
                        )));
                    }
                    ClassificationRule {
                        id: current.id,
                        created_at: current.created_at,
                        version: current.version + 1,
                        updated_at: now,
                        ..rule
                    }
                }
                None => {
                    if rule.version != 0 {
                        return Err(StorageError::Conflict(format!(
                            "rule {} was removed since version {} was read",
                            rule.id, rule.version
                        )));
                    }
                    if state.rules.contains_key(&rule.id) {
                        return Err(StorageError::InvalidInput(format!(
                            "rule {} already belongs to another third party",
                            rule.id
                        )));
                    }
                    ClassificationRule {
                        version: 1,
                        updated_at: now,
                        ..rule
                    }
                }
            };

            state.rules.insert(stored.id, stored.clone());
            Ok(stored)
        })?;
        debug!(
            rule_id = %stored.id,
            version = stored.version,
            confidence = stored.confidence,
            "Rule stored"
        );
        Ok(stored)
    }

    async fn delete_rule(&self, rule_id: RuleId) -> StorageResult<()> {
        self.mutate(|state| {
            if state.rules.remove(&rule_id).is_none() {
                return Err(StorageError::NotFound(format!("rule {rule_id}")));
            }
            Ok(())
        })
    }

    async fn list_rules(&self, company_id: CompanyId) -> StorageResult<Vec<ClassificationRule>> {
        let guard = self.read()?;
        let mut rules: Vec<ClassificationRule> = guard
            .rules
            .values()
            .filter(|rule| rule.company_id == company_id)
            .cloned()
            .collect();
        rules.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
        });
        Ok(rules)
    }
}

#[async_trait]
impl LedgerStore for InMemoryRepository {
    async fn save_transaction(&self, draft: TransactionDraft) -> StorageResult<Transaction> {
        self.mutate(|state| {
            let prefix = state.require_company(draft.company_id)?.transaction_prefix.clone();

            if draft.movements.len() < 2 {
                return Err(StorageError::InvariantViolation(format!(
                    "a transaction needs at least 2 movements, got {}",
                    draft.movements.len()
                )));
            }

            let transaction_id = TransactionId::new();
            let now = Utc::now();
            let mut movements = Vec::with_capacity(draft.movements.len());
            for (index, line) in draft.movements.into_iter().enumerate() {
                let (account_id, third_party_id) =
                    state.check_line(index, line.account, line.third_party, line.debit, line.credit)?;
                movements.push(Movement {
                    id: MovementId::new(),
                    transaction_id,
                    account_id,
                    third_party_id,
                    debit: line.debit,
                    credit: line.credit,
                    description: line.description,
                    created_at: now,
                    updated_at: now,
                });
            }
            check_balance(
                movements.iter().map(|m| m.debit).sum(),
                movements.iter().map(|m| m.credit).sum(),
            )?;

            let number = numbering::next_number(
                &prefix,
                state
                    .transactions
                    .values()
                    .filter(|tx| tx.company_id == draft.company_id)
                    .map(|tx| tx.number.as_str()),
            );

            let transaction = Transaction {
                id: transaction_id,
                company_id: draft.company_id,
                number,
                date: draft.date,
                concept: draft.concept,
                additional_description: draft.additional_description,
                movements,
                created_at: now,
                updated_at: now,
                is_deleted: false,
                deleted_at: None,
            };
            state.transactions.insert(transaction.id, transaction.clone());
            Ok(transaction)
        })
    }

    async fn get_transaction(&self, id: TransactionId) -> StorageResult<Option<Transaction>> {
        let guard = self.read()?;
        Ok(guard.transactions.get(&id).cloned())
    }

    async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> StorageResult<Vec<Transaction>> {
        let guard = self.read()?;
        let mut values: Vec<Transaction> = guard
            .transactions
            .values()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect();
        values.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.number.cmp(&a.number)));
        Ok(filter.window.apply(values))
    }

    async fn get_movement(&self, id: MovementId) -> StorageResult<Option<Movement>> {
        let guard = self.read()?;
        Ok(guard.locate_movement(id).and_then(|(tx_id, index)| {
            guard
                .transactions
                .get(&tx_id)
                .and_then(|tx| tx.movements.get(index))
                .cloned()
        }))
    }

    async fn list_movements(&self, filter: MovementFilter) -> StorageResult<Vec<LedgerLine>> {
        let guard = self.read()?;
        let mut lines: Vec<LedgerLine> = guard
            .transactions
            .values()
            .flat_map(|tx| {
                tx.movements
                    .iter()
                    .filter(|m| filter.matches(tx, m))
                    .map(move |m| LedgerLine::new(tx, m))
            })
            .collect();
        lines.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.transaction_number.cmp(&a.transaction_number))
        });
        Ok(filter.window.apply(lines))
    }

    async fn update_transaction_header(
        &self,
        id: TransactionId,
        update: TransactionHeaderUpdate,
    ) -> StorageResult<Transaction> {
        if update.concept.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(StorageError::InvalidInput("concept must not be empty".to_string()));
        }
        self.mutate(|state| {
            let tx = state
                .transactions
                .get_mut(&id)
                .filter(|tx| !tx.is_deleted)
                .ok_or_else(|| StorageError::NotFound(format!("transaction {id}")))?;
            if let Some(date) = update.date {
                tx.date = date;
            }
            if let Some(concept) = update.concept {
                tx.concept = concept.trim().to_string();
            }
            if let Some(description) = update.additional_description {
                let description = description.trim();
                tx.additional_description =
                    (!description.is_empty()).then(|| description.to_string());
            }
            tx.updated_at = Utc::now();
            Ok(tx.clone())
        })
    }

    async fn update_movement(
        &self,
        id: MovementId,
        update: MovementUpdate,
    ) -> StorageResult<Movement> {
        self.mutate(|state| {
            let (tx_id, index) = state
                .locate_movement(id)
                .ok_or_else(|| StorageError::NotFound(format!("movement {id}")))?;

            let (updated, total_debit, total_credit) = {
                let tx = state
                    .transactions
                    .get(&tx_id)
                    .ok_or_else(|| StorageError::NotFound(format!("transaction {tx_id}")))?;
                if tx.is_deleted {
                    return Err(StorageError::NotFound(format!(
                        "movement {id} belongs to deleted transaction {}",
                        tx.number
                    )));
                }
                let updated = update.applied_to(&tx.movements[index]);
                let lines = tx
                    .movements
                    .iter()
                    .enumerate()
                    .map(|(i, m)| if i == index { &updated } else { m });
                let (debit, credit) = lines.fold((Money::ZERO, Money::ZERO), |(d, c), m| {
                    (d + m.debit, c + m.credit)
                });
                (updated, debit, credit)
            };

            state.check_line(
                index,
                Some(updated.account_id),
                Some(updated.third_party_id),
                updated.debit,
                updated.credit,
            )?;
            check_balance(total_debit, total_credit)?;

            if let Some(tx) = state.transactions.get_mut(&tx_id) {
                tx.updated_at = updated.updated_at;
                tx.movements[index] = updated.clone();
            }
            Ok(updated)
        })
    }

    async fn set_transaction_deleted(
        &self,
        id: TransactionId,
        deleted: bool,
    ) -> StorageResult<Transaction> {
        self.mutate(|state| {
            let tx = state
                .transactions
                .get_mut(&id)
                .ok_or_else(|| StorageError::NotFound(format!("transaction {id}")))?;
            let now = Utc::now();
            tx.is_deleted = deleted;
            tx.deleted_at = deleted.then_some(now);
            tx.updated_at = now;
            Ok(tx.clone())
        })
    }
}

#[async_trait]
impl ReferenceStore for InMemoryRepository {
    async fn get_company(&self, id: CompanyId) -> StorageResult<Option<Company>> {
        let guard = self.read()?;
        Ok(guard.companies.get(&id).cloned())
    }

    async fn upsert_company(&self, company: Company) -> StorageResult<Company> {
        if company.transaction_prefix.trim().is_empty() {
            return Err(StorageError::InvalidInput(
                "transaction prefix must not be empty".to_string(),
            ));
        }
        self.mutate(|state| {
            state.companies.insert(company.id, company.clone());
            Ok(company)
        })
    }

    async fn list_companies(&self) -> StorageResult<Vec<Company>> {
        let guard = self.read()?;
        let mut values: Vec<Company> = guard.companies.values().cloned().collect();
        values.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(values)
    }

    async fn get_account(&self, id: AccountId) -> StorageResult<Option<Account>> {
        let guard = self.read()?;
        Ok(guard.accounts.get(&id).cloned())
    }

    async fn get_account_by_code(&self, code: &str) -> StorageResult<Option<Account>> {
        let guard = self.read()?;
        let code = code.trim();
        Ok(guard.accounts.values().find(|a| a.code == code).cloned())
    }

    async fn upsert_account(&self, account: Account) -> StorageResult<Account> {
        if account.code.is_empty() || !account.code.chars().all(|c| c.is_ascii_digit()) {
            return Err(StorageError::InvalidInput(format!(
                "account code '{}' must be digits only",
                account.code
            )));
        }
        self.mutate(|state| {
            if let Some(other) = state
                .accounts
                .values()
                .find(|a| a.code == account.code && a.id != account.id)
            {
                return Err(StorageError::Conflict(format!(
                    "account code {} is already used by {}",
                    account.code, other.id
                )));
            }
            state.accounts.insert(account.id, account.clone());
            Ok(account)
        })
    }

    async fn list_accounts(&self) -> StorageResult<Vec<Account>> {
        let guard = self.read()?;
        let mut values: Vec<Account> = guard.accounts.values().cloned().collect();
        values.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(values)
    }

    async fn get_third_party(&self, id: ThirdPartyId) -> StorageResult<Option<ThirdParty>> {
        let guard = self.read()?;
        Ok(guard.third_parties.get(&id).cloned())
    }

    async fn upsert_third_party(&self, third_party: ThirdParty) -> StorageResult<ThirdParty> {
        self.mutate(|state| {
            if !third_party.is_deleted {
                if let Some(other) = state.third_parties.values().find(|tp| {
                    !tp.is_deleted && tp.nit == third_party.nit && tp.id != third_party.id
                }) {
                    return Err(StorageError::Conflict(format!(
                        "NIT {} is already registered to {}",
                        third_party.nit, other.name
                    )));
                }
            }
            state
                .third_parties
                .insert(third_party.id, third_party.clone());
            Ok(third_party)
        })
    }

    async fn list_third_parties(&self) -> StorageResult<Vec<ThirdParty>> {
        let guard = self.read()?;
        let mut values: Vec<ThirdParty> = guard
            .third_parties
            .values()
            .filter(|tp| !tp.is_deleted)
            .cloned()
            .collect();
        values.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(values)
    }
}

#[async_trait]
impl RecurringStore for InMemoryRepository {
    async fn get_recurring(&self, id: TemplateId) -> StorageResult<Option<RecurringTemplate>> {
        let guard = self.read()?;
        Ok(guard.recurring.get(&id).cloned())
    }

    async fn list_recurring(
        &self,
        company_id: Option<CompanyId>,
    ) -> StorageResult<Vec<RecurringTemplate>> {
        let guard = self.read()?;
        let mut values: Vec<RecurringTemplate> = guard
            .recurring
            .values()
            .filter(|t| company_id.map_or(true, |c| t.company_id == c))
            .cloned()
            .collect();
        values.sort_by(|a, b| {
            a.day_of_month
                .cmp(&b.day_of_month)
                .then_with(|| a.concept.cmp(&b.concept))
        });
        Ok(values)
    }

    async fn upsert_recurring(
        &self,
        template: RecurringTemplate,
    ) -> StorageResult<RecurringTemplate> {
        if !(1..=31).contains(&template.day_of_month) {
            return Err(StorageError::InvalidInput(format!(
                "day of month {} is outside 1..=31",
                template.day_of_month
            )));
        }
        self.mutate(|state| {
            state.require_company(template.company_id)?;
            state.recurring.insert(template.id, template.clone());
            Ok(template)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QueryWindow;
    use asiento_types::MovementDraft;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    struct Fixture {
        repo: InMemoryRepository,
        company: CompanyId,
        bank: AccountId,
        services: AccountId,
        vendor: ThirdPartyId,
    }

    async fn fixture() -> Fixture {
        let repo = InMemoryRepository::new();
        let company = repo
            .upsert_company(Company::new("Cortijo SAS", "900123456"))
            .await
            .unwrap();
        let bank = repo.upsert_account(Account::new("1110", "Bancos")).await.unwrap();
        let services = repo
            .upsert_account(Account::new("5135", "Servicios"))
            .await
            .unwrap();
        let vendor = repo
            .upsert_third_party(ThirdParty::new("Aseo Total", "900123456").unwrap())
            .await
            .unwrap();
        Fixture {
            repo,
            company: company.id,
            bank: bank.id,
            services: services.id,
            vendor: vendor.id,
        }
    }

    fn draft(f: &Fixture, amount: Money) -> TransactionDraft {
        TransactionDraft::new(f.company, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(), "Aseo marzo")
            .with_movement(MovementDraft::debit(f.services, f.vendor, amount))
            .with_movement(MovementDraft::credit(f.bank, f.vendor, amount))
    }

    #[tokio::test]
    async fn save_assigns_sequential_numbers() {
        let f = fixture().await;
        let amount = Money::new(dec!(150000));
        let first = f.repo.save_transaction(draft(&f, amount)).await.unwrap();
        let second = f.repo.save_transaction(draft(&f, amount)).await.unwrap();

        assert_eq!(first.number, "TRX-00001");
        assert_eq!(second.number, "TRX-00002");
        assert_eq!(first.movements.len(), 2);
        assert!(first.movements.iter().all(|m| m.transaction_id == first.id));
    }

    #[tokio::test]
    async fn save_with_unknown_account_stores_nothing() {
        let f = fixture().await;
        let mut bad = draft(&f, Money::new(dec!(10)));
        bad.movements[1].account = Some(AccountId::new());

        let err = f.repo.save_transaction(bad).await.unwrap_err();
        assert!(err.is_not_found());
        let all = f
            .repo
            .list_transactions(TransactionFilter::default())
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn save_rejects_unbalanced_and_two_sided_lines() {
        let f = fixture().await;
        let mut unbalanced = draft(&f, Money::new(dec!(10)));
        unbalanced.movements[1].credit = Money::new(dec!(9));
        assert!(matches!(
            f.repo.save_transaction(unbalanced).await,
            Err(StorageError::InvariantViolation(_))
        ));

        let mut two_sided = draft(&f, Money::new(dec!(10)));
        two_sided.movements[0].credit = Money::new(dec!(10));
        assert!(matches!(
            f.repo.save_transaction(two_sided).await,
            Err(StorageError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn upsert_rule_rejects_stale_version() {
        let f = fixture().await;
        let rule = ClassificationRule::manual(f.company, f.vendor, f.services);
        let stored = f.repo.upsert_rule(rule.clone()).await.unwrap();
        assert_eq!(stored.version, 1);

        let mut next = stored.clone();
        next.confidence = 2;
        let bumped = f.repo.upsert_rule(next).await.unwrap();
        assert_eq!(bumped.version, 2);
        assert_eq!(bumped.id, stored.id);

        // Written against version 1 after version 2 landed.
        let err = f.repo.upsert_rule(stored).await.unwrap_err();
        assert!(err.is_conflict());

        // A fresh rule for an existing key is stale too.
        let err = f.repo.upsert_rule(rule).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn rules_list_by_confidence_and_delete() {
        let f = fixture().await;
        let other = f
            .repo
            .upsert_third_party(ThirdParty::new("Claro", "800153993").unwrap())
            .await
            .unwrap();
        let low = f
            .repo
            .upsert_rule(ClassificationRule::manual(f.company, f.vendor, f.services))
            .await
            .unwrap();
        let mut high = ClassificationRule::manual(f.company, other.id, f.services);
        high.confidence = 7;
        let high = f.repo.upsert_rule(high).await.unwrap();

        let listed = f.repo.list_rules(f.company).await.unwrap();
        assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![high.id, low.id]);

        f.repo.delete_rule(low.id).await.unwrap();
        assert!(f.repo.get_rule(f.company, f.vendor).await.unwrap().is_none());
        assert!(f.repo.delete_rule(low.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_movement_keeps_transaction_balanced() {
        let f = fixture().await;
        let tx = f
            .repo
            .save_transaction(draft(&f, Money::new(dec!(100))))
            .await
            .unwrap();
        let line = tx.movements[0].id;

        let err = f
            .repo
            .update_movement(
                line,
                MovementUpdate {
                    debit: Some(Money::new(dec!(90))),
                    ..MovementUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvariantViolation(_)));

        let moved = f
            .repo
            .update_movement(
                line,
                MovementUpdate {
                    account_id: Some(f.bank),
                    ..MovementUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.account_id, f.bank);
        assert_eq!(moved.debit, Money::new(dec!(100)));
        let stored = f.repo.get_movement(line).await.unwrap().unwrap();
        assert_eq!(stored.account_id, f.bank);
    }

    #[tokio::test]
    async fn soft_delete_hides_and_restore_returns() {
        let f = fixture().await;
        let tx = f
            .repo
            .save_transaction(draft(&f, Money::new(dec!(5))))
            .await
            .unwrap();

        let deleted = f.repo.set_transaction_deleted(tx.id, true).await.unwrap();
        assert!(deleted.is_deleted);
        assert!(deleted.deleted_at.is_some());
        let live = f
            .repo
            .list_transactions(TransactionFilter::for_company(f.company))
            .await
            .unwrap();
        assert!(live.is_empty());

        let restored = f.repo.set_transaction_deleted(tx.id, false).await.unwrap();
        assert!(!restored.is_deleted);
        assert_eq!(restored.deleted_at, None);
    }

    #[tokio::test]
    async fn movements_filter_by_account_and_skip_deleted() {
        let f = fixture().await;
        let first = f.repo.save_transaction(draft(&f, Money::new(dec!(10)))).await.unwrap();
        let mut later = draft(&f, Money::new(dec!(20)));
        later.date = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        f.repo.save_transaction(later).await.unwrap();

        let services = MovementFilter {
            account_id: Some(f.services),
            ..MovementFilter::default()
        };
        let lines = f.repo.list_movements(services.clone()).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].transaction_number, "TRX-00002");
        assert_eq!(lines[0].movement.debit, Money::new(dec!(20)));
        assert!(lines.iter().all(|l| l.movement.account_id == f.services));

        let march = MovementFilter {
            company_id: Some(f.company),
            to: NaiveDate::from_ymd_opt(2024, 3, 31),
            ..MovementFilter::default()
        };
        assert_eq!(f.repo.list_movements(march).await.unwrap().len(), 2);

        f.repo.set_transaction_deleted(first.id, true).await.unwrap();
        let lines = f.repo.list_movements(services).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].concept, "Aseo marzo");
    }

    #[tokio::test]
    async fn header_update_changes_only_given_fields() {
        let f = fixture().await;
        let tx = f.repo.save_transaction(draft(&f, Money::new(dec!(10)))).await.unwrap();

        let updated = f
            .repo
            .update_transaction_header(
                tx.id,
                TransactionHeaderUpdate {
                    concept: Some("  Aseo marzo sede norte ".to_string()),
                    additional_description: Some("Factura 881".to_string()),
                    ..TransactionHeaderUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.concept, "Aseo marzo sede norte");
        assert_eq!(updated.additional_description.as_deref(), Some("Factura 881"));
        assert_eq!(updated.date, tx.date);
        assert_eq!(updated.number, tx.number);
        assert_eq!(updated.movements, tx.movements);

        let cleared = f
            .repo
            .update_transaction_header(
                tx.id,
                TransactionHeaderUpdate {
                    additional_description: Some(String::new()),
                    ..TransactionHeaderUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.additional_description, None);

        let blank = TransactionHeaderUpdate {
            concept: Some(" ".to_string()),
            ..TransactionHeaderUpdate::default()
        };
        assert!(matches!(
            f.repo.update_transaction_header(tx.id, blank).await,
            Err(StorageError::InvalidInput(_))
        ));

        f.repo.set_transaction_deleted(tx.id, true).await.unwrap();
        let err = f
            .repo
            .update_transaction_header(tx.id, TransactionHeaderUpdate::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_filters_search_and_window() {
        let f = fixture().await;
        for concept in ["Aseo enero", "Arriendo enero", "Aseo febrero"] {
            let mut d = draft(&f, Money::new(dec!(1)));
            d.concept = concept.to_string();
            f.repo.save_transaction(d).await.unwrap();
        }

        let filter = TransactionFilter {
            search: Some("aseo".to_string()),
            ..TransactionFilter::for_company(f.company)
        };
        assert_eq!(f.repo.list_transactions(filter.clone()).await.unwrap().len(), 2);

        let paged = TransactionFilter {
            window: QueryWindow { limit: 1, offset: 1 },
            ..filter
        };
        let page = f.repo.list_transactions(paged).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].number, "TRX-00001");
    }

    #[tokio::test]
    async fn duplicate_codes_and_nits_conflict() {
        let f = fixture().await;
        let err = f
            .repo
            .upsert_account(Account::new("5135", "Otra"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let err = f
            .repo
            .upsert_third_party(ThirdParty::new("Copia", "900123456").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
