//! Monthly generation of recurring transactions.

use std::sync::Arc;

use asiento_storage::RecordRepository;
use asiento_types::{CompanyId, RecurringTemplate, TemplateId, Transaction};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::LedgerError;
use crate::pipeline::{SubmissionOutcome, SubmissionPipeline};
use crate::report::month_bounds;

/// Day a template fires in `today`'s month. Day 31 fires on the 30th in
/// April and on the 28th or 29th in February.
pub fn effective_day(template: &RecurringTemplate, today: NaiveDate) -> u32 {
    let last = month_bounds(today.year(), today.month())
        .map(|(_, end)| end.day())
        .unwrap_or(28);
    u32::from(template.day_of_month).clamp(1, last)
}

/// Active templates that fire today and were not generated this month yet.
pub fn due_templates(templates: &[RecurringTemplate], today: NaiveDate) -> Vec<&RecurringTemplate> {
    templates
        .iter()
        .filter(|t| t.is_active)
        .filter(|t| effective_day(t, today) == today.day())
        .filter(|t| !t.generated_in_month_of(today))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurringFailure {
    pub template_id: TemplateId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecurringSummary {
    pub created: Vec<Transaction>,
    pub awaiting_decision: Vec<TemplateId>,
    pub rejected: Vec<TemplateId>,
    pub errors: Vec<RecurringFailure>,
}

/// Submits due templates through the normal pipeline. Held or rejected
/// templates are not marked and come up again on their next run that day.
#[derive(Clone)]
pub struct RecurringRunner {
    repo: Arc<dyn RecordRepository>,
    pipeline: SubmissionPipeline,
}

impl RecurringRunner {
    pub fn new(repo: Arc<dyn RecordRepository>, pipeline: SubmissionPipeline) -> Self {
        Self { repo, pipeline }
    }

    pub async fn run(
        &self,
        today: NaiveDate,
        company_id: Option<CompanyId>,
    ) -> Result<RecurringSummary, LedgerError> {
        let templates = self.repo.list_recurring(company_id).await?;
        let mut summary = RecurringSummary::default();

        for template in due_templates(&templates, today) {
            let draft = template.to_draft(today);
            match self.pipeline.submit(draft).await {
                Ok(SubmissionOutcome::Persisted { transaction, .. }) => {
                    let marked = RecurringTemplate {
                        last_generated: Some(today),
                        ..template.clone()
                    };
                    info!(
                        template = %template.id,
                        number = %transaction.number,
                        "Recurring transaction generated"
                    );
                    if let Err(err) = self.repo.upsert_recurring(marked).await {
                        warn!(
                            template = %template.id,
                            number = %transaction.number,
                            error = %err,
                            "Generated transaction but could not mark the template"
                        );
                        summary.errors.push(RecurringFailure {
                            template_id: template.id,
                            error: format!(
                                "{} was generated but the template was not marked: {err}",
                                transaction.number
                            ),
                        });
                    }
                    summary.created.push(transaction);
                }
                Ok(SubmissionOutcome::AwaitingDecision { detection }) => {
                    warn!(
                        template = %template.id,
                        alerts = detection.alerts.len(),
                        "Recurring transaction held for decision"
                    );
                    summary.awaiting_decision.push(template.id);
                }
                Ok(SubmissionOutcome::Rejected(err)) => {
                    warn!(template = %template.id, error = %err, "Recurring template does not balance");
                    summary.rejected.push(template.id);
                }
                Ok(SubmissionOutcome::Discarded) => {}
                Err(err) => {
                    warn!(template = %template.id, error = %err, "Recurring generation failed");
                    summary.errors.push(RecurringFailure {
                        template_id: template.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        debug!(
            %today,
            created = summary.created.len(),
            held = summary.awaiting_decision.len(),
            rejected = summary.rejected.len(),
            errors = summary.errors.len(),
            "Recurring run finished"
        );
        Ok(summary)
    }
}
