use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CompanyId, TransactionId};
use crate::money::{balance_tolerance, Money};
use crate::movement::{Movement, MovementDraft};

/// Transaction as submitted, before validation and numbering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub company_id: CompanyId,
    pub date: NaiveDate,
    pub concept: String,
    #[serde(default)]
    pub additional_description: Option<String>,
    pub movements: Vec<MovementDraft>,
}

impl TransactionDraft {
    pub fn new(company_id: CompanyId, date: NaiveDate, concept: impl Into<String>) -> Self {
        Self {
            company_id,
            date,
            concept: concept.into(),
            additional_description: None,
            movements: Vec::new(),
        }
    }

    pub fn with_movement(mut self, movement: MovementDraft) -> Self {
        self.movements.push(movement);
        self
    }
}

/// Persisted journal entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub company_id: CompanyId,
    /// `PREFIX-00001`, unique per company.
    pub number: String,
    pub date: NaiveDate,
    pub concept: String,
    pub additional_description: Option<String>,
    pub movements: Vec<Movement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn total_debit(&self) -> Money {
        self.movements.iter().map(|m| m.debit).sum()
    }

    pub fn total_credit(&self) -> Money {
        self.movements.iter().map(|m| m.credit).sum()
    }

    pub fn is_balanced(&self) -> bool {
        (self.total_debit() - self.total_credit()).abs() < balance_tolerance()
    }

    /// Draft form with the same header and lines.
    pub fn to_draft(&self) -> TransactionDraft {
        TransactionDraft {
            company_id: self.company_id,
            date: self.date,
            concept: self.concept.clone(),
            additional_description: self.additional_description.clone(),
            movements: self.movements.iter().map(Movement::to_draft).collect(),
        }
    }
}
