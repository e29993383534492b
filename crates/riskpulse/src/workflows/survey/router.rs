use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use super::analytics::{DiagnosticOutcome, SurveyAnalyticsService};
use super::conversation::{CompletedQuestionnaire, ConversationEngine, InboundMessage};
use super::domain::{AnonId, QuestionnaireId, ReportScope};
use super::repository::{AnalyticsStore, MessageDispatcher, SurveyStore};
use crate::error::AppError;

/// Conversation engine and analytics service sharing one store.
pub struct SurveyServices<S, D> {
    pub engine: ConversationEngine<S, D>,
    pub analytics: Arc<SurveyAnalyticsService<S>>,
}

impl<S, D> SurveyServices<S, D>
where
    S: SurveyStore + AnalyticsStore + 'static,
    D: MessageDispatcher + 'static,
{
    pub fn new(engine: ConversationEngine<S, D>, analytics: SurveyAnalyticsService<S>) -> Self {
        Self {
            engine,
            analytics: Arc::new(analytics),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticRequest {
    pub anon_id: AnonId,
    pub questionnaire_id: QuestionnaireId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub anon_ids: Vec<AnonId>,
    pub questionnaire_id: QuestionnaireId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    pub questionnaire_id: QuestionnaireId,
    pub scope: ReportScope,
    #[serde(default)]
    pub generated_by: Option<String>,
}

/// Router builder exposing the inbound channel webhook and the analytics endpoints.
pub fn survey_router<S, D>(services: Arc<SurveyServices<S, D>>) -> Router
where
    S: SurveyStore + AnalyticsStore + 'static,
    D: MessageDispatcher + 'static,
{
    Router::new()
        .route("/api/v1/bot/incoming", post(incoming_handler::<S, D>))
        .route("/api/v1/diagnostics", post(diagnostic_handler::<S, D>))
        .route("/api/v1/diagnostics/batch", post(batch_handler::<S, D>))
        .route("/api/v1/reports", post(report_handler::<S, D>))
        .with_state(services)
}

pub(crate) async fn incoming_handler<S, D>(
    State(services): State<Arc<SurveyServices<S, D>>>,
    Json(message): Json<InboundMessage>,
) -> Result<Response, AppError>
where
    S: SurveyStore + AnalyticsStore + 'static,
    D: MessageDispatcher + 'static,
{
    let reply = match services.engine.handle_incoming(&message) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(error = %err, "inbound message not handled");
            return Err(err.into());
        }
    };

    if let Some(completed) = reply.completed.clone() {
        schedule_diagnostic(Arc::clone(&services.analytics), completed);
    }
    let payload = json!({
        "reply": reply.text,
        "status": reply.status.label(),
    });
    Ok((StatusCode::OK, Json(payload)).into_response())
}

pub(crate) async fn diagnostic_handler<S, D>(
    State(services): State<Arc<SurveyServices<S, D>>>,
    Json(request): Json<DiagnosticRequest>,
) -> Result<Response, AppError>
where
    S: SurveyStore + AnalyticsStore + 'static,
    D: MessageDispatcher + 'static,
{
    let outcome = services
        .analytics
        .compute_diagnostic(&request.anon_id, &request.questionnaire_id)?;

    let response = match outcome {
        DiagnosticOutcome::Computed(record) => {
            (StatusCode::CREATED, Json(record)).into_response()
        }
        DiagnosticOutcome::NoAnswers => {
            let payload = json!({
                "error": "no answers recorded for respondent",
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        DiagnosticOutcome::QuestionnaireNotFound => {
            let payload = json!({
                "error": format!("questionnaire {} not found", request.questionnaire_id),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
    };
    Ok(response)
}

pub(crate) async fn batch_handler<S, D>(
    State(services): State<Arc<SurveyServices<S, D>>>,
    Json(request): Json<BatchRequest>,
) -> Response
where
    S: SurveyStore + AnalyticsStore + 'static,
    D: MessageDispatcher + 'static,
{
    let summary = services
        .analytics
        .recompute_batch(&request.anon_ids, &request.questionnaire_id);
    (StatusCode::OK, Json(summary)).into_response()
}

pub(crate) async fn report_handler<S, D>(
    State(services): State<Arc<SurveyServices<S, D>>>,
    Json(request): Json<ReportRequest>,
) -> Result<Response, AppError>
where
    S: SurveyStore + AnalyticsStore + 'static,
    D: MessageDispatcher + 'static,
{
    let generated_by = request.generated_by.as_deref().unwrap_or("api");
    let record =
        services
            .analytics
            .generate_report(&request.questionnaire_id, request.scope, generated_by)?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

/// Scores a finished questionnaire off the request path.
fn schedule_diagnostic<S>(
    analytics: Arc<SurveyAnalyticsService<S>>,
    completed: CompletedQuestionnaire,
) where
    S: AnalyticsStore + 'static,
{
    tokio::task::spawn_blocking(move || {
        if let Err(err) =
            analytics.compute_diagnostic(&completed.anon_id, &completed.questionnaire_id)
        {
            error!(
                anon_id = %completed.anon_id,
                questionnaire_id = %completed.questionnaire_id,
                error = %err,
                "background diagnostic failed"
            );
        }
    });
}
