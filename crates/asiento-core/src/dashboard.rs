//! Activity summary of one company: current month, all time, busiest
//! accounts and a six-month trend.

use std::collections::HashMap;

use asiento_storage::{RecordRepository, TransactionFilter};
use asiento_types::{AccountId, CompanyId, Money, Movement, Transaction};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LedgerError;
use crate::report::{month_bounds, ChartLookup, ReportError};

pub const TOP_ACCOUNTS: usize = 5;
pub const TREND_MONTHS: u32 = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub debits: Money,
    pub credits: Money,
    pub movement_count: usize,
    /// Debits minus credits.
    pub balance: Money,
}

impl PeriodTotals {
    fn record(&mut self, movement: &Movement) {
        self.debits += movement.debit;
        self.credits += movement.credit;
        self.movement_count += 1;
        self.balance = self.debits - self.credits;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountActivity {
    pub account_code: String,
    pub account_name: String,
    /// Debits plus credits.
    pub total: Money,
    pub movement_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthActivity {
    /// `YYYY-MM`.
    pub month: String,
    #[serde(flatten)]
    pub totals: PeriodTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub company_id: CompanyId,
    pub as_of: NaiveDate,
    /// From the first of `as_of`'s month up to `as_of`.
    pub current_month: PeriodTotals,
    pub all_time: PeriodTotals,
    pub top_accounts: Vec<AccountActivity>,
    /// Calendar months, oldest first, ending with `as_of`'s month.
    pub monthly_trend: Vec<MonthActivity>,
}

struct TrendMonth {
    label: String,
    start: NaiveDate,
    end: NaiveDate,
    totals: PeriodTotals,
}

fn trend_months(as_of: NaiveDate) -> Result<Vec<TrendMonth>, ReportError> {
    let current = as_of.year() * 12 + as_of.month0() as i32;
    (0..TREND_MONTHS as i32)
        .rev()
        .map(|back| {
            let index = current - back;
            let (year, month) = (index.div_euclid(12), index.rem_euclid(12) as u32 + 1);
            let (start, end) = month_bounds(year, month)?;
            Ok(TrendMonth {
                label: format!("{year:04}-{month:02}"),
                start,
                end,
                totals: PeriodTotals::default(),
            })
        })
        .collect()
}

impl DashboardStats {
    /// Soft-deleted and other companies' transactions are ignored.
    pub fn build(
        company_id: CompanyId,
        as_of: NaiveDate,
        transactions: &[Transaction],
        lookup: &ChartLookup,
    ) -> Result<Self, ReportError> {
        let (month_start, _) = month_bounds(as_of.year(), as_of.month())?;
        let mut trend = trend_months(as_of)?;
        let mut current_month = PeriodTotals::default();
        let mut all_time = PeriodTotals::default();
        let mut per_account: HashMap<AccountId, (Money, usize)> = HashMap::new();

        for tx in transactions {
            if tx.company_id != company_id || tx.is_deleted {
                continue;
            }
            let mut slot = trend
                .iter_mut()
                .find(|m| (m.start..=m.end).contains(&tx.date));
            let this_month = (month_start..=as_of).contains(&tx.date);
            for movement in &tx.movements {
                all_time.record(movement);
                if this_month {
                    current_month.record(movement);
                }
                if let Some(month) = slot.as_deref_mut() {
                    month.totals.record(movement);
                }
                let entry = per_account.entry(movement.account_id).or_default();
                entry.0 += movement.debit + movement.credit;
                entry.1 += 1;
            }
        }

        let mut top_accounts: Vec<AccountActivity> = per_account
            .into_iter()
            .map(|(account_id, (total, movement_count))| {
                let (account_code, account_name) = lookup
                    .accounts
                    .get(&account_id)
                    .map(|a| (a.code.clone(), a.name.clone()))
                    .unwrap_or_else(|| (account_id.to_string(), String::new()));
                AccountActivity {
                    account_code,
                    account_name,
                    total,
                    movement_count,
                }
            })
            .collect();
        top_accounts.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then_with(|| a.account_code.cmp(&b.account_code))
        });
        top_accounts.truncate(TOP_ACCOUNTS);

        debug!(
            company = %company_id,
            %as_of,
            movements = all_time.movement_count,
            "Dashboard built"
        );
        Ok(Self {
            company_id,
            as_of,
            current_month,
            all_time,
            top_accounts,
            monthly_trend: trend
                .into_iter()
                .map(|m| MonthActivity {
                    month: m.label,
                    totals: m.totals,
                })
                .collect(),
        })
    }

    pub async fn load(
        repo: &dyn RecordRepository,
        company_id: CompanyId,
        as_of: NaiveDate,
    ) -> Result<Self, LedgerError> {
        repo.get_company(company_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("company", company_id))?;
        let transactions = repo
            .list_transactions(TransactionFilter::for_company(company_id))
            .await?;
        let lookup = ChartLookup::load(repo, &transactions).await?;
        Ok(Self::build(company_id, as_of, &transactions, &lookup)?)
    }
}
