//! Asiento bookkeeping engine.
//!
//! Every proposed transaction goes through the same pipeline:
//!
//! 1. **Balance**: at least two lines, each with account, third party and
//!    exactly one positive side, and `|Σdebit − Σcredit| < 0.01`. A failure
//!    rejects the draft outright.
//! 2. **Anomaly detection**: each line is compared with the learned rule for
//!    its (company, third party). A different account or an amount outside
//!    the configured band produces alerts, suggestions and a correction plan.
//!    Nothing is stored; the caller discards, forces the save or applies the
//!    plan and resubmits.
//! 3. **Persist**: the transaction is numbered and saved atomically.
//!
//! Rules change only when a user edits a persisted movement to another
//! account ([`MovementEditor`]), never on submission.
//!
//! [`AsientoEngine`] wires all of it over one [`asiento_storage::RecordRepository`].

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod balance;
pub mod classifier;
pub mod config;
pub mod correction;
pub mod dashboard;
pub mod detector;
pub mod editor;
mod error;
pub mod flow;
pub mod learning;
pub mod nature;
pub mod pipeline;
pub mod recurring;
pub mod report;
pub mod reversal;
mod runtime;
#[cfg(test)]
mod testing;

pub use balance::{is_balanced, validate_balance, BalanceSummary};
pub use classifier::{Classification, ClassificationSource, Classifier, SuggestedAccount};
pub use config::{DetectorConfig, EngineConfig, KeywordRule};
pub use correction::{apply_corrections, CorrectionError};
pub use dashboard::{AccountActivity, DashboardStats, MonthActivity, PeriodTotals};
pub use detector::{
    Alert, AlertKind, AnomalyDetector, DetectionResult, MovementCorrection, RuleSnapshot,
};
pub use editor::{EditOutcome, MovementEdit, MovementEditor};
pub use error::LedgerError;
pub use flow::{SubmissionStage, SubmissionStageMachine};
pub use learning::{learn, LearningUpdater, Observation};
pub use nature::{review_nature, NatureWarning};
pub use pipeline::{Decision, SubmissionOutcome, SubmissionPipeline, ValidationOutcome};
pub use recurring::{due_templates, RecurringFailure, RecurringRunner, RecurringSummary};
pub use report::{ChartLookup, ReportError, TrialBalance, TrialBalanceRow, TrialBalanceTotals};
pub use reversal::{reversal_draft, REVERSAL_CONCEPT_PREFIX};
pub use runtime::AsientoEngine;
