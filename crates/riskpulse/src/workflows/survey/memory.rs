use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::conversation::ConversationState;
use super::domain::{
    AnonId, Answer, AnswerCollection, Organization, OrganizationId, Question, Questionnaire,
    QuestionnaireId, Sector, SectorId,
};
use super::report::ReportRecord;
use super::repository::{
    AnswerRepository, AppendOutcome, DiagnosticRepository, Membership, OrganizationDirectory,
    QuestionnaireRepository, ReportRepository, RepositoryError, Respondent, RespondentRepository,
};
use super::scoring::DiagnosticRecord;

/// Process-local store backing every survey repository trait.
#[derive(Debug, Default)]
pub struct InMemorySurveyStore {
    respondents: Mutex<HashMap<String, Respondent>>,
    questionnaires: Mutex<Vec<(Questionnaire, Vec<Question>)>>,
    answers: Mutex<HashMap<(AnonId, QuestionnaireId), AnswerCollection>>,
    organizations: Mutex<Vec<Organization>>,
    sectors: Mutex<Vec<Sector>>,
    diagnostics: Mutex<Vec<DiagnosticRecord>>,
    reports: Mutex<Vec<ReportRecord>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
}

impl InMemorySurveyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_questionnaire(
        mut self,
        questionnaire: Questionnaire,
        questions: Vec<Question>,
    ) -> Self {
        if let Ok(entries) = self.questionnaires.get_mut() {
            entries.push((questionnaire, questions));
        }
        self
    }

    pub fn with_organization(mut self, organization: Organization, sectors: Vec<Sector>) -> Self {
        if let Ok(organizations) = self.organizations.get_mut() {
            organizations.push(organization);
        }
        if let Ok(existing) = self.sectors.get_mut() {
            existing.extend(sectors);
        }
        self
    }

    /// Replaces the question list of a stored questionnaire.
    pub fn replace_questions(
        &self,
        questionnaire_id: &QuestionnaireId,
        questions: Vec<Question>,
    ) -> Result<(), RepositoryError> {
        let mut entries = lock(&self.questionnaires)?;
        let (questionnaire, stored) = entries
            .iter_mut()
            .find(|(questionnaire, _)| &questionnaire.id == questionnaire_id)
            .ok_or(RepositoryError::NotFound)?;
        questionnaire.total_questions = questions.len();
        *stored = questions;
        Ok(())
    }

    pub fn diagnostics(&self) -> Result<Vec<DiagnosticRecord>, RepositoryError> {
        Ok(lock(&self.diagnostics)?.clone())
    }

    pub fn reports(&self) -> Result<Vec<ReportRecord>, RepositoryError> {
        Ok(lock(&self.reports)?.clone())
    }
}

impl RespondentRepository for InMemorySurveyStore {
    fn find_by_address(&self, address: &str) -> Result<Option<Respondent>, RepositoryError> {
        Ok(lock(&self.respondents)?.get(address).cloned())
    }

    fn create_respondent(&self, respondent: Respondent) -> Result<Respondent, RepositoryError> {
        let mut respondents = lock(&self.respondents)?;
        if respondents.contains_key(&respondent.address) {
            return Err(RepositoryError::Conflict);
        }
        respondents.insert(respondent.address.clone(), respondent.clone());
        Ok(respondent)
    }

    fn update_conversation_state(
        &self,
        address: &str,
        expected_version: u64,
        mut next: ConversationState,
    ) -> Result<ConversationState, RepositoryError> {
        let mut respondents = lock(&self.respondents)?;
        let respondent = respondents
            .get_mut(address)
            .ok_or(RepositoryError::NotFound)?;
        if respondent.conversation.version != expected_version {
            return Err(RepositoryError::Conflict);
        }
        next.version = expected_version + 1;
        respondent.conversation = next.clone();
        Ok(next)
    }

    fn assign_membership(
        &self,
        address: &str,
        membership: Membership,
    ) -> Result<(), RepositoryError> {
        let mut respondents = lock(&self.respondents)?;
        let respondent = respondents
            .get_mut(address)
            .ok_or(RepositoryError::NotFound)?;
        respondent.membership = Some(membership);
        Ok(())
    }

    fn anon_ids_in_scope(
        &self,
        organization_id: &OrganizationId,
        sector_id: Option<&SectorId>,
    ) -> Result<Vec<AnonId>, RepositoryError> {
        let respondents = lock(&self.respondents)?;
        let mut anon_ids: Vec<AnonId> = respondents
            .values()
            .filter(|respondent| {
                respondent.membership.as_ref().is_some_and(|membership| {
                    &membership.organization_id == organization_id
                        && sector_id.map_or(true, |sector| {
                            membership.sector_id.as_ref() == Some(sector)
                        })
                })
            })
            .map(|respondent| respondent.anon_id.clone())
            .collect();
        anon_ids.sort();
        Ok(anon_ids)
    }
}

impl QuestionnaireRepository for InMemorySurveyStore {
    fn active_questionnaire(
        &self,
        name: Option<&str>,
    ) -> Result<Option<Questionnaire>, RepositoryError> {
        let entries = lock(&self.questionnaires)?;
        Ok(entries
            .iter()
            .map(|(questionnaire, _)| questionnaire)
            .filter(|questionnaire| questionnaire.active)
            .find(|questionnaire| name.map_or(true, |name| questionnaire.matches_name(name)))
            .cloned())
    }

    fn questionnaire(
        &self,
        id: &QuestionnaireId,
    ) -> Result<Option<Questionnaire>, RepositoryError> {
        let entries = lock(&self.questionnaires)?;
        Ok(entries
            .iter()
            .find(|(questionnaire, _)| &questionnaire.id == id)
            .map(|(questionnaire, _)| questionnaire.clone()))
    }

    fn questions(&self, id: &QuestionnaireId) -> Result<Vec<Question>, RepositoryError> {
        let entries = lock(&self.questionnaires)?;
        Ok(entries
            .iter()
            .find(|(questionnaire, _)| &questionnaire.id == id)
            .map(|(_, questions)| questions.clone())
            .unwrap_or_default())
    }
}

impl AnswerRepository for InMemorySurveyStore {
    fn append_answer(
        &self,
        anon_id: &AnonId,
        questionnaire_id: &QuestionnaireId,
        answer: Answer,
    ) -> Result<AppendOutcome, RepositoryError> {
        let mut answers = lock(&self.answers)?;
        let collection = answers
            .entry((anon_id.clone(), questionnaire_id.clone()))
            .or_insert_with(|| AnswerCollection {
                anon_id: anon_id.clone(),
                questionnaire_id: questionnaire_id.clone(),
                answers: Vec::new(),
            });

        let duplicate = answer.idempotency_key.as_ref().is_some_and(|key| {
            collection.answers.iter().any(|existing| {
                existing.idempotency_key.as_ref() == Some(key)
                    && existing.question_id == answer.question_id
            })
        });
        if duplicate {
            return Ok(AppendOutcome::Duplicate);
        }

        collection.answers.push(answer);
        Ok(AppendOutcome::Recorded)
    }

    fn answers(
        &self,
        anon_id: &AnonId,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Option<AnswerCollection>, RepositoryError> {
        let answers = lock(&self.answers)?;
        Ok(answers
            .get(&(anon_id.clone(), questionnaire_id.clone()))
            .cloned())
    }
}

impl OrganizationDirectory for InMemorySurveyStore {
    fn resolve_organizations(&self, query: &str) -> Result<Vec<Organization>, RepositoryError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let organizations = lock(&self.organizations)?;
        let by_code: Vec<Organization> = organizations
            .iter()
            .filter(|organization| organization.code.eq_ignore_ascii_case(query))
            .cloned()
            .collect();
        if !by_code.is_empty() {
            return Ok(by_code);
        }

        let needle = query.to_lowercase();
        let exact: Vec<Organization> = organizations
            .iter()
            .filter(|organization| organization.name.to_lowercase() == needle)
            .cloned()
            .collect();
        if !exact.is_empty() {
            return Ok(exact);
        }

        Ok(organizations
            .iter()
            .filter(|organization| organization.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    fn sectors(&self, organization_id: &OrganizationId) -> Result<Vec<Sector>, RepositoryError> {
        let sectors = lock(&self.sectors)?;
        Ok(sectors
            .iter()
            .filter(|sector| &sector.organization_id == organization_id)
            .cloned()
            .collect())
    }

    fn find_sector_by_name(
        &self,
        organization_id: &OrganizationId,
        name: &str,
    ) -> Result<Option<Sector>, RepositoryError> {
        let needle = name.trim().to_lowercase();
        let sectors = lock(&self.sectors)?;
        Ok(sectors
            .iter()
            .find(|sector| {
                &sector.organization_id == organization_id && sector.name.to_lowercase() == needle
            })
            .cloned())
    }
}

impl DiagnosticRepository for InMemorySurveyStore {
    fn create_diagnostic(&self, record: DiagnosticRecord) -> Result<(), RepositoryError> {
        lock(&self.diagnostics)?.push(record);
        Ok(())
    }

    fn find_diagnostics(
        &self,
        anon_ids: &[AnonId],
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Vec<DiagnosticRecord>, RepositoryError> {
        let diagnostics = lock(&self.diagnostics)?;
        Ok(diagnostics
            .iter()
            .filter(|record| {
                &record.diagnostic.questionnaire_id == questionnaire_id
                    && anon_ids.contains(&record.diagnostic.anon_id)
            })
            .cloned()
            .collect())
    }
}

impl ReportRepository for InMemorySurveyStore {
    fn create_report(&self, record: ReportRecord) -> Result<(), RepositoryError> {
        lock(&self.reports)?.push(record);
        Ok(())
    }
}
