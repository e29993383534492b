use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conversation::ConversationState;
use super::domain::{
    AnonId, Answer, AnswerCollection, AnswerOption, Organization, OrganizationId, Question,
    Questionnaire, QuestionnaireId, Sector, SectorId,
};
use super::report::ReportRecord;
use super::scoring::DiagnosticRecord;

/// Respondent record keyed by channel address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Respondent {
    pub address: String,
    pub anon_id: AnonId,
    pub membership: Option<Membership>,
    pub registered_at: DateTime<Utc>,
    pub conversation: ConversationState,
}

/// Organization placement recorded during registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub organization_id: OrganizationId,
    pub sector_id: Option<SectorId>,
    pub unit: Option<String>,
}

/// Outcome of appending an answer under an idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Recorded,
    Duplicate,
}

pub trait RespondentRepository: Send + Sync {
    fn find_by_address(&self, address: &str) -> Result<Option<Respondent>, RepositoryError>;
    /// Fails with [`RepositoryError::Conflict`] when the address is already registered.
    fn create_respondent(&self, respondent: Respondent) -> Result<Respondent, RepositoryError>;
    /// Compare-and-swap on `ConversationState::version`.
    ///
    /// Stores `next` with its version set to `expected_version + 1` only when the persisted
    /// state still carries `expected_version`; otherwise fails with
    /// [`RepositoryError::Conflict`].
    fn update_conversation_state(
        &self,
        address: &str,
        expected_version: u64,
        next: ConversationState,
    ) -> Result<ConversationState, RepositoryError>;
    fn assign_membership(&self, address: &str, membership: Membership)
        -> Result<(), RepositoryError>;
    /// Anonymous ids of respondents registered in the organization, optionally one sector.
    fn anon_ids_in_scope(
        &self,
        organization_id: &OrganizationId,
        sector_id: Option<&SectorId>,
    ) -> Result<Vec<AnonId>, RepositoryError>;
}

pub trait QuestionnaireRepository: Send + Sync {
    /// Active questionnaire, restricted to `name` (name or code) when given.
    fn active_questionnaire(
        &self,
        name: Option<&str>,
    ) -> Result<Option<Questionnaire>, RepositoryError>;
    fn questionnaire(&self, id: &QuestionnaireId)
        -> Result<Option<Questionnaire>, RepositoryError>;
    /// Questions in presentation order.
    fn questions(&self, id: &QuestionnaireId) -> Result<Vec<Question>, RepositoryError>;
}

pub trait AnswerRepository: Send + Sync {
    /// Appends `answer`; a key already stored for the same question id is a `Duplicate`.
    fn append_answer(
        &self,
        anon_id: &AnonId,
        questionnaire_id: &QuestionnaireId,
        answer: Answer,
    ) -> Result<AppendOutcome, RepositoryError>;
    fn answers(
        &self,
        anon_id: &AnonId,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Option<AnswerCollection>, RepositoryError>;
}

pub trait OrganizationDirectory: Send + Sync {
    /// Exact code match first; falls back to case-insensitive name matching.
    fn resolve_organizations(&self, query: &str) -> Result<Vec<Organization>, RepositoryError>;
    fn sectors(&self, organization_id: &OrganizationId) -> Result<Vec<Sector>, RepositoryError>;
    fn find_sector_by_name(
        &self,
        organization_id: &OrganizationId,
        name: &str,
    ) -> Result<Option<Sector>, RepositoryError>;
}

pub trait DiagnosticRepository: Send + Sync {
    fn create_diagnostic(&self, record: DiagnosticRecord) -> Result<(), RepositoryError>;
    fn find_diagnostics(
        &self,
        anon_ids: &[AnonId],
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Vec<DiagnosticRecord>, RepositoryError>;
}

pub trait ReportRepository: Send + Sync {
    fn create_report(&self, record: ReportRecord) -> Result<(), RepositoryError>;
}

/// Everything the conversation engine reads and writes.
pub trait SurveyStore:
    RespondentRepository + QuestionnaireRepository + AnswerRepository + OrganizationDirectory
{
}

impl<T> SurveyStore for T where
    T: RespondentRepository + QuestionnaireRepository + AnswerRepository + OrganizationDirectory
{
}

/// Everything the analytics service reads and writes.
pub trait AnalyticsStore:
    RespondentRepository
    + QuestionnaireRepository
    + AnswerRepository
    + DiagnosticRepository
    + ReportRepository
{
}

impl<T> AnalyticsStore for T where
    T: RespondentRepository
        + QuestionnaireRepository
        + AnswerRepository
        + DiagnosticRepository
        + ReportRepository
{
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Interactive rendering of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionPrompt {
    pub question_id: String,
    pub position: usize,
    pub total: usize,
    pub text: String,
    pub options: Vec<AnswerOption>,
}

/// Outbound channel hook for rich (list/button) delivery.
pub trait MessageDispatcher: Send + Sync {
    fn deliver_question(&self, address: &str, prompt: &QuestionPrompt)
        -> Result<(), DeliveryError>;
}

/// Dispatcher for channels that only carry plain text.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatcher;

impl MessageDispatcher for NoopDispatcher {
    fn deliver_question(
        &self,
        _address: &str,
        _prompt: &QuestionPrompt,
    ) -> Result<(), DeliveryError> {
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("message transport unavailable: {0}")]
    Transport(String),
    #[error("message rejected by provider: {0}")]
    Rejected(String),
}
