use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, CompanyId, TemplateId, ThirdPartyId};
use crate::money::Money;
use crate::movement::MovementDraft;
use crate::transaction::TransactionDraft;

/// One line of a recurring template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementTemplate {
    pub account_id: AccountId,
    pub third_party_id: ThirdPartyId,
    #[serde(default)]
    pub debit: Money,
    #[serde(default)]
    pub credit: Money,
    #[serde(default)]
    pub description: Option<String>,
}

/// Transaction generated once a month on `day_of_month`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    pub id: TemplateId,
    pub company_id: CompanyId,
    pub concept: String,
    #[serde(default)]
    pub additional_description: Option<String>,
    /// 1..=31; clamped to the length of shorter months.
    pub day_of_month: u8,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub last_generated: Option<NaiveDate>,
    pub movements: Vec<MovementTemplate>,
}

fn default_active() -> bool {
    true
}

impl RecurringTemplate {
    /// Whether this template was already generated in `date`'s month.
    pub fn generated_in_month_of(&self, date: NaiveDate) -> bool {
        self.last_generated
            .is_some_and(|last| last.year() == date.year() && last.month() == date.month())
    }

    /// Draft dated `date` with one movement per template line.
    pub fn to_draft(&self, date: NaiveDate) -> TransactionDraft {
        TransactionDraft {
            company_id: self.company_id,
            date,
            concept: self.concept.clone(),
            additional_description: self.additional_description.clone(),
            movements: self
                .movements
                .iter()
                .map(|line| MovementDraft {
                    account: Some(line.account_id),
                    third_party: Some(line.third_party_id),
                    debit: line.debit,
                    credit: line.credit,
                    description: line.description.clone(),
                })
                .collect(),
        }
    }
}
