use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Stages of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStage {
    Received,
    BalanceChecked,
    Rejected,
    AnomalyChecked,
    AwaitingDecision,
    Persisted,
}

impl SubmissionStage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::BalanceChecked => "balance_checked",
            Self::Rejected => "rejected",
            Self::AnomalyChecked => "anomaly_checked",
            Self::AwaitingDecision => "awaiting_decision",
            Self::Persisted => "persisted",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::AwaitingDecision | Self::Persisted
        )
    }
}

/// Enforces received -> balance -> {rejected | anomaly} -> {awaiting | persisted}.
#[derive(Debug, Clone)]
pub struct SubmissionStageMachine {
    stage: SubmissionStage,
    detection_skipped: bool,
}

impl Default for SubmissionStageMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionStageMachine {
    pub fn new() -> Self {
        Self {
            stage: SubmissionStage::Received,
            detection_skipped: false,
        }
    }

    pub fn stage(&self) -> SubmissionStage {
        self.stage
    }

    /// Whether this submission went through the force-save path.
    pub fn detection_skipped(&self) -> bool {
        self.detection_skipped
    }

    pub fn mark_balance_checked(&mut self) -> Result<(), LedgerError> {
        self.advance(SubmissionStage::Received, SubmissionStage::BalanceChecked)
    }

    pub fn mark_rejected(&mut self) -> Result<(), LedgerError> {
        self.advance(SubmissionStage::BalanceChecked, SubmissionStage::Rejected)
    }

    pub fn mark_anomaly_checked(&mut self) -> Result<(), LedgerError> {
        self.advance(SubmissionStage::BalanceChecked, SubmissionStage::AnomalyChecked)
    }

    /// Force save: the anomaly stage is passed without running detection.
    pub fn skip_detection(&mut self) -> Result<(), LedgerError> {
        self.advance(SubmissionStage::BalanceChecked, SubmissionStage::AnomalyChecked)?;
        self.detection_skipped = true;
        Ok(())
    }

    pub fn mark_awaiting_decision(&mut self) -> Result<(), LedgerError> {
        self.advance(
            SubmissionStage::AnomalyChecked,
            SubmissionStage::AwaitingDecision,
        )
    }

    pub fn mark_persisted(&mut self) -> Result<(), LedgerError> {
        self.advance(SubmissionStage::AnomalyChecked, SubmissionStage::Persisted)
    }

    fn advance(
        &mut self,
        expected_current: SubmissionStage,
        next: SubmissionStage,
    ) -> Result<(), LedgerError> {
        if self.stage != expected_current {
            return Err(LedgerError::stage_violation(
                expected_current.name(),
                self.stage.name(),
            ));
        }
        self.stage = next;
        Ok(())
    }
}
