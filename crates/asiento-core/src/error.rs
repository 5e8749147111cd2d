use asiento_storage::StorageError;
use asiento_types::BalanceError;
use thiserror::Error;

use crate::correction::CorrectionError;
use crate::report::ReportError;

/// Engine errors.
///
/// Anomalies are not errors; they come back as data in
/// [`crate::SubmissionOutcome::AwaitingDecision`].
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("balance check failed: {0}")]
    Balance(#[from] BalanceError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("storage error: {0}")]
    Storage(#[source] StorageError),

    #[error("correction failed: {0}")]
    Correction(#[from] CorrectionError),

    #[error("report failed: {0}")]
    Report(#[from] ReportError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("stage order violation: expected '{expected}', got '{actual}'")]
    Stage {
        expected: &'static str,
        actual: &'static str,
    },
}

impl LedgerError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn stage_violation(expected: &'static str, actual: &'static str) -> Self {
        Self::Stage { expected, actual }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_conflict())
    }
}

/// Storage `NotFound` messages are `"<entity> <id>"`; they surface as
/// [`LedgerError::NotFound`]. Everything else passes through unchanged.
impl From<StorageError> for LedgerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(message) => match message.split_once(' ') {
                Some((entity, id)) => Self::not_found(entity, id),
                None => Self::not_found("record", message),
            },
            other => Self::Storage(other),
        }
    }
}
