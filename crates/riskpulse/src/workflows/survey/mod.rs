//! Psychosocial-risk questionnaire delivered over a turn-based messaging channel.
//!
//! The conversation engine registers respondents and walks them through the active
//! questionnaire, the scoring engine turns an answer collection into a per-dimension
//! diagnostic, and the report aggregator rolls diagnostics up to organization or sector scope.

pub mod analytics;
pub mod conversation;
pub mod domain;
pub mod memory;
pub mod parser;
pub mod report;
pub mod repository;
pub mod router;
pub mod scoring;

#[cfg(test)]
mod tests;

pub use analytics::{AnalyticsError, BatchSummary, DiagnosticOutcome, SurveyAnalyticsService};
pub use conversation::{
    CompletedQuestionnaire, ConversationEngine, ConversationError, ConversationReply,
    ConversationStage, ConversationState, ConversationStatus, EngineOptions, InboundMessage,
};
pub use domain::{
    AnonId, Answer, AnswerCollection, AnswerOption, AnswerValue, DimensionSign, Organization,
    OrganizationId, Question, Questionnaire, QuestionnaireId, ReportScope, ScaleType, Sector,
    SectorId, SelectionPayload, SubQuestion, SubQuestionResponse, TriggerCondition,
    COPSOQ_CURTA_BR, COPSOQ_MEDIA_PT,
};
pub use memory::InMemorySurveyStore;
pub use report::{Report, ReportAggregator, ReportRecord};
pub use repository::{
    DeliveryError, MessageDispatcher, NoopDispatcher, QuestionPrompt, RepositoryError,
};
pub use router::{survey_router, SurveyServices};
pub use scoring::{Classification, Diagnostic, DiagnosticRecord, ScoringEngine};
