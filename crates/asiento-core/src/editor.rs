//! Edits of persisted movements. The only place rules are learned from.

use std::sync::Arc;

use asiento_storage::{MovementUpdate, RecordRepository};
use asiento_types::{ClassificationRule, Movement, MovementId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::balance::validate_balance;
use crate::error::LedgerError;
use crate::learning::LearningUpdater;

/// Changes requested for one movement.
pub type MovementEdit = MovementUpdate;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditOutcome {
    pub movement: Movement,
    /// Set when the edit moved the line to another account.
    pub learned_rule: Option<ClassificationRule>,
    /// The edit is stored but the rule could not be updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_error: Option<String>,
}

#[derive(Clone)]
pub struct MovementEditor {
    repo: Arc<dyn RecordRepository>,
    learning: LearningUpdater,
}

impl MovementEditor {
    pub fn new(repo: Arc<dyn RecordRepository>, learning: LearningUpdater) -> Self {
        Self { repo, learning }
    }

    pub async fn edit_movement(
        &self,
        movement_id: MovementId,
        edit: MovementEdit,
    ) -> Result<EditOutcome, LedgerError> {
        let current = self
            .repo
            .get_movement(movement_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("movement", movement_id))?;
        let parent = self
            .repo
            .get_transaction(current.transaction_id)
            .await?
            .filter(|tx| !tx.is_deleted)
            .ok_or_else(|| LedgerError::not_found("transaction", current.transaction_id))?;

        if edit.is_empty() {
            debug!(movement = %movement_id, "Empty edit, nothing to do");
            return Ok(EditOutcome {
                movement: current,
                learned_rule: None,
                learning_error: None,
            });
        }

        if let Some(account) = edit.account_id {
            self.repo
                .get_account(account)
                .await?
                .ok_or_else(|| LedgerError::not_found("account", account))?;
        }
        if let Some(third_party) = edit.third_party_id {
            self.repo
                .get_third_party(third_party)
                .await?
                .filter(|tp| !tp.is_deleted)
                .ok_or_else(|| LedgerError::not_found("third party", third_party))?;
        }

        let proposed = edit.applied_to(&current);
        let lines: Vec<_> = parent
            .movements
            .iter()
            .map(|m| if m.id == movement_id { proposed.to_draft() } else { m.to_draft() })
            .collect();
        if let Err(err) = validate_balance(&lines) {
            warn!(
                movement = %movement_id,
                transaction = %parent.number,
                error = %err,
                "Edit rejected"
            );
            return Err(err.into());
        }

        let account_changed = proposed.account_id != current.account_id;
        let movement = self.repo.update_movement(movement_id, edit).await?;
        info!(
            movement = %movement_id,
            transaction = %parent.number,
            account_changed,
            "Movement updated"
        );

        let mut outcome = EditOutcome {
            movement,
            learned_rule: None,
            learning_error: None,
        };
        if !account_changed {
            return Ok(outcome);
        }

        // The movement is committed from here on; learning failures are
        // reported in the outcome.
        match self
            .learning
            .record_confirmation(
                parent.company_id,
                outcome.movement.third_party_id,
                outcome.movement.account_id,
                outcome.movement.amount(),
            )
            .await
        {
            Ok(rule) => outcome.learned_rule = Some(rule),
            Err(err) => {
                warn!(
                    movement = %movement_id,
                    transaction = %parent.number,
                    error = %err,
                    "Movement updated but rule learning failed"
                );
                outcome.learning_error = Some(err.to_string());
            }
        }
        Ok(outcome)
    }
}
