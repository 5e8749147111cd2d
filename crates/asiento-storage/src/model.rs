use asiento_types::{AccountId, CompanyId, Money, Movement, ThirdPartyId, Transaction};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Generic query window for paged reads. `limit == 0` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

impl QueryWindow {
    pub fn apply<T>(self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        if self.limit == 0 {
            iter.collect()
        } else {
            iter.take(self.limit).collect()
        }
    }
}

/// Transaction listing filter. Soft-deleted rows are excluded unless
/// `include_deleted` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    /// Case-insensitive match on number, concept or additional description.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
    #[serde(default)]
    pub window: QueryWindow,
}

impl TransactionFilter {
    pub fn for_company(company_id: CompanyId) -> Self {
        Self {
            company_id: Some(company_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        if tx.is_deleted && !self.include_deleted {
            return false;
        }
        if self.company_id.is_some_and(|c| c != tx.company_id) {
            return false;
        }
        if self.from.is_some_and(|from| tx.date < from) {
            return false;
        }
        if self.to.is_some_and(|to| tx.date > to) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                tx.number.to_lowercase().contains(&needle)
                    || tx.concept.to_lowercase().contains(&needle)
                    || tx
                        .additional_description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

/// Movement listing filter, newest transaction date first. Lines of
/// soft-deleted transactions are never listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub third_party_id: Option<ThirdPartyId>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub window: QueryWindow,
}

impl MovementFilter {
    fn transaction_scope(&self) -> TransactionFilter {
        TransactionFilter {
            company_id: self.company_id,
            from: self.from,
            to: self.to,
            ..TransactionFilter::default()
        }
    }

    pub fn matches(&self, tx: &Transaction, movement: &Movement) -> bool {
        self.transaction_scope().matches(tx)
            && self.account_id.map_or(true, |a| a == movement.account_id)
            && self.third_party_id.map_or(true, |t| t == movement.third_party_id)
    }
}

/// A movement together with the header fields of its transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub transaction_number: String,
    pub date: NaiveDate,
    pub concept: String,
    #[serde(flatten)]
    pub movement: Movement,
}

impl LedgerLine {
    pub fn new(tx: &Transaction, movement: &Movement) -> Self {
        Self {
            transaction_number: tx.number.clone(),
            date: tx.date,
            concept: tx.concept.clone(),
            movement: movement.clone(),
        }
    }
}

/// Edit of a transaction header. Movements are edited one at a time through
/// [`MovementUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeaderUpdate {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub concept: Option<String>,
    /// An empty string clears the description.
    #[serde(default)]
    pub additional_description: Option<String>,
}

impl TransactionHeaderUpdate {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.concept.is_none() && self.additional_description.is_none()
    }
}

/// Partial edit of a persisted movement. `None` leaves a field unchanged.
///
/// Setting one side's amount clears the other, so a line stays pure debit or
/// pure credit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementUpdate {
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub third_party_id: Option<ThirdPartyId>,
    #[serde(default)]
    pub debit: Option<Money>,
    #[serde(default)]
    pub credit: Option<Money>,
    #[serde(default)]
    pub description: Option<String>,
}

impl MovementUpdate {
    pub fn is_empty(&self) -> bool {
        self.account_id.is_none()
            && self.third_party_id.is_none()
            && self.debit.is_none()
            && self.credit.is_none()
            && self.description.is_none()
    }

    /// Copy of `movement` with this update applied.
    pub fn applied_to(&self, movement: &Movement) -> Movement {
        let mut next = movement.clone();
        if let Some(account) = self.account_id {
            next.account_id = account;
        }
        if let Some(third_party) = self.third_party_id {
            next.third_party_id = third_party;
        }
        match (self.debit, self.credit) {
            (Some(debit), Some(credit)) => {
                next.debit = debit;
                next.credit = credit;
            }
            (Some(debit), None) => {
                next.debit = debit;
                next.credit = Money::ZERO;
            }
            (None, Some(credit)) => {
                next.debit = Money::ZERO;
                next.credit = credit;
            }
            (None, None) => {}
        }
        if let Some(description) = &self.description {
            next.description = Some(description.clone());
        }
        next.updated_at = Utc::now();
        next
    }
}
