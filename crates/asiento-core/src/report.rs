//! Monthly trial balance per (account, third party).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use asiento_storage::{RecordRepository, TransactionFilter};
use asiento_types::{
    nit, Account, AccountId, CompanyId, Money, ThirdParty, ThirdPartyId, Transaction,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("invalid period {year}-{month:02}")]
    InvalidPeriod { year: i32, month: u32 },

    #[error("CSV rendering failed: {0}")]
    Csv(String),
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

/// One (account, third party) line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account_code: String,
    pub account_name: String,
    pub third_party_nit: String,
    pub third_party_name: String,
    pub opening_balance: Money,
    pub debits: Money,
    pub credits: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceTotals {
    pub opening_balance: Money,
    pub debits: Money,
    pub credits: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub company_id: CompanyId,
    pub year: i32,
    pub month: u32,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub rows: Vec<TrialBalanceRow>,
    pub totals: TrialBalanceTotals,
}

/// Names used to label report rows.
#[derive(Debug, Clone, Default)]
pub struct ChartLookup {
    pub accounts: HashMap<AccountId, Account>,
    pub third_parties: HashMap<ThirdPartyId, ThirdParty>,
}

impl ChartLookup {
    pub fn new(accounts: Vec<Account>, third_parties: Vec<ThirdParty>) -> Self {
        Self {
            accounts: accounts.into_iter().map(|a| (a.id, a)).collect(),
            third_parties: third_parties.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    /// Names for every line of `transactions`, including third parties that
    /// were deleted after their movements were booked.
    pub async fn load(
        repo: &dyn RecordRepository,
        transactions: &[Transaction],
    ) -> Result<Self, LedgerError> {
        let mut lookup = Self::new(repo.list_accounts().await?, repo.list_third_parties().await?);
        let missing: BTreeSet<ThirdPartyId> = transactions
            .iter()
            .flat_map(|tx| tx.movements.iter().map(|m| m.third_party_id))
            .filter(|id| !lookup.third_parties.contains_key(id))
            .collect();
        for id in missing {
            if let Some(third_party) = repo.get_third_party(id).await? {
                lookup.third_parties.insert(id, third_party);
            }
        }
        Ok(lookup)
    }
}

type RowKey = (String, String, String, String);

#[derive(Default)]
struct Sums {
    opening: Money,
    debits: Money,
    credits: Money,
}

/// First and last day of `year-month`.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), ReportError> {
    let invalid = || ReportError::InvalidPeriod { year, month };
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    let end = next.pred_opt().ok_or_else(invalid)?;
    Ok((start, end))
}

impl TrialBalance {
    /// Build the report from `transactions`. Other companies, soft-deleted
    /// transactions and movements dated after the month are ignored.
    pub fn build(
        company_id: CompanyId,
        year: i32,
        month: u32,
        transactions: &[Transaction],
        lookup: &ChartLookup,
    ) -> Result<Self, ReportError> {
        let (period_start, period_end) = month_bounds(year, month)?;
        let mut sums: BTreeMap<RowKey, Sums> = BTreeMap::new();

        for tx in transactions {
            if tx.company_id != company_id || tx.is_deleted || tx.date > period_end {
                continue;
            }
            let in_period = tx.date >= period_start;
            for movement in &tx.movements {
                let key = row_key(movement.account_id, movement.third_party_id, lookup);
                let entry = sums.entry(key).or_default();
                if in_period {
                    entry.debits += movement.debit;
                    entry.credits += movement.credit;
                } else {
                    entry.opening += movement.debit - movement.credit;
                }
            }
        }

        let mut totals = TrialBalanceTotals::default();
        let rows: Vec<TrialBalanceRow> = sums
            .into_iter()
            .map(|((account_code, account_name, third_party_nit, third_party_name), s)| {
                let closing = s.opening + s.debits - s.credits;
                totals.opening_balance += s.opening;
                totals.debits += s.debits;
                totals.credits += s.credits;
                totals.closing_balance += closing;
                TrialBalanceRow {
                    account_code,
                    account_name,
                    third_party_nit,
                    third_party_name,
                    opening_balance: s.opening,
                    debits: s.debits,
                    credits: s.credits,
                    closing_balance: closing,
                }
            })
            .collect();

        debug!(company = %company_id, year, month, rows = rows.len(), "Trial balance built");
        Ok(Self {
            company_id,
            year,
            month,
            period_start,
            period_end,
            rows,
            totals,
        })
    }

    /// Fetch everything the report needs from `repo` and build it.
    pub async fn load(
        repo: &dyn RecordRepository,
        company_id: CompanyId,
        year: i32,
        month: u32,
    ) -> Result<Self, LedgerError> {
        let (_, period_end) = month_bounds(year, month)?;
        repo.get_company(company_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("company", company_id))?;

        let transactions = repo
            .list_transactions(TransactionFilter {
                to: Some(period_end),
                ..TransactionFilter::for_company(company_id)
            })
            .await?;
        let lookup = ChartLookup::load(repo, &transactions).await?;
        Ok(Self::build(company_id, year, month, &transactions, &lookup)?)
    }

    /// Header, one record per row, then a totals record.
    pub fn to_csv(&self) -> Result<Vec<u8>, ReportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "account_code",
            "account_name",
            "third_party_nit",
            "third_party_name",
            "opening_balance",
            "debits",
            "credits",
            "closing_balance",
        ])?;
        for row in &self.rows {
            writer.write_record([
                row.account_code.as_str(),
                row.account_name.as_str(),
                row.third_party_nit.as_str(),
                row.third_party_name.as_str(),
                &row.opening_balance.to_string(),
                &row.debits.to_string(),
                &row.credits.to_string(),
                &row.closing_balance.to_string(),
            ])?;
        }
        writer.write_record([
            "TOTAL",
            "",
            "",
            "",
            &self.totals.opening_balance.to_string(),
            &self.totals.debits.to_string(),
            &self.totals.credits.to_string(),
            &self.totals.closing_balance.to_string(),
        ])?;
        writer
            .into_inner()
            .map_err(|e| ReportError::Csv(e.to_string()))
    }
}

/// NITs stored with their check digit are shown formatted.
fn display_nit(raw: &str) -> String {
    if raw.len() == 10 {
        nit::format_nit(raw)
    } else {
        raw.to_string()
    }
}

fn row_key(account_id: AccountId, third_party_id: ThirdPartyId, lookup: &ChartLookup) -> RowKey {
    let (code, name) = lookup
        .accounts
        .get(&account_id)
        .map(|a| (a.code.clone(), a.name.clone()))
        .unwrap_or_else(|| (account_id.to_string(), String::new()));
    let (tp_nit, tp_name) = lookup
        .third_parties
        .get(&third_party_id)
        .map(|t| (display_nit(&t.nit), t.name.clone()))
        .unwrap_or_else(|| (String::new(), third_party_id.to_string()));
    (code, name, tp_nit, tp_name)
}
