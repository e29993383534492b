use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::domain::{AnonId, QuestionnaireId, ReportScope};
use super::report::{ReportAggregator, ReportRecord};
use super::repository::{AnalyticsStore, RepositoryError};
use super::scoring::{DiagnosticRecord, ScoringEngine};

/// Outcome of scoring one respondent.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticOutcome {
    Computed(DiagnosticRecord),
    NoAnswers,
    QuestionnaireNotFound,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub ok: usize,
    pub failed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("questionnaire {0} not found")]
    QuestionnaireNotFound(QuestionnaireId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Scores finished conversations and builds scoped reports from stored diagnostics.
pub struct SurveyAnalyticsService<S> {
    store: Arc<S>,
    engine: ScoringEngine,
    aggregator: ReportAggregator,
}

impl<S> SurveyAnalyticsService<S>
where
    S: AnalyticsStore + 'static,
{
    pub fn new(store: Arc<S>, engine: ScoringEngine) -> Self {
        Self {
            store,
            engine,
            aggregator: ReportAggregator,
        }
    }

    /// Scores the stored answers and persists a new diagnostic.
    ///
    /// Safe to re-run: the diagnostic content depends only on the stored answers and definition.
    pub fn compute_diagnostic(
        &self,
        anon_id: &AnonId,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<DiagnosticOutcome, AnalyticsError> {
        let Some(answers) = self
            .store
            .answers(anon_id, questionnaire_id)?
            .filter(|collection| !collection.answers.is_empty())
        else {
            debug!(%anon_id, %questionnaire_id, "no answers to score");
            return Ok(DiagnosticOutcome::NoAnswers);
        };

        let Some(questionnaire) = self.store.questionnaire(questionnaire_id)? else {
            warn!(%anon_id, %questionnaire_id, "answers reference an unknown questionnaire");
            return Ok(DiagnosticOutcome::QuestionnaireNotFound);
        };

        let questions = self.store.questions(questionnaire_id)?;
        let diagnostic = self.engine.score(&answers, &questionnaire, &questions);
        let record = DiagnosticRecord {
            diagnostic,
            computed_at: Utc::now(),
        };
        self.store.create_diagnostic(record.clone())?;

        info!(
            %anon_id,
            %questionnaire_id,
            dimensions = record.diagnostic.dimensions.len(),
            global = record.diagnostic.global_classification.as_str(),
            "diagnostic computed"
        );
        Ok(DiagnosticOutcome::Computed(record))
    }

    /// Recomputes each respondent independently; a failure never stops the batch.
    pub fn recompute_batch(
        &self,
        anon_ids: &[AnonId],
        questionnaire_id: &QuestionnaireId,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for anon_id in anon_ids {
            match self.compute_diagnostic(anon_id, questionnaire_id) {
                Ok(DiagnosticOutcome::Computed(_)) => summary.ok += 1,
                Ok(outcome) => {
                    debug!(%anon_id, ?outcome, "respondent skipped in batch");
                    summary.failed += 1;
                }
                Err(err) => {
                    error!(%anon_id, error = %err, "diagnostic recompute failed");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Aggregates the latest diagnostic of every respondent in scope and persists the report.
    pub fn generate_report(
        &self,
        questionnaire_id: &QuestionnaireId,
        scope: ReportScope,
        generated_by: &str,
    ) -> Result<ReportRecord, AnalyticsError> {
        if self.store.questionnaire(questionnaire_id)?.is_none() {
            return Err(AnalyticsError::QuestionnaireNotFound(
                questionnaire_id.clone(),
            ));
        }

        let anon_ids = self
            .store
            .anon_ids_in_scope(scope.organization_id(), scope.sector_id())?;
        let diagnostics = if anon_ids.is_empty() {
            Vec::new()
        } else {
            self.store.find_diagnostics(&anon_ids, questionnaire_id)?
        };

        let report = self.aggregator.generate(&diagnostics, scope);
        let record = ReportRecord {
            questionnaire_id: questionnaire_id.clone(),
            generated_by: generated_by.to_string(),
            generated_at: Utc::now(),
            report,
        };
        self.store.create_report(record.clone())?;

        info!(
            %questionnaire_id,
            respondents = record.report.metrics.total_respondents,
            "report generated"
        );
        Ok(record)
    }
}
