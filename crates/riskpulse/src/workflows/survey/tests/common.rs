use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::workflows::survey::conversation::{
    ConversationEngine, ConversationReply, ConversationState, EngineOptions, InboundMessage,
};
use crate::workflows::survey::domain::{
    AnonId, Answer, AnswerCollection, AnswerOption, AnswerValue, DimensionSign, Organization,
    OrganizationId, Question, Questionnaire, QuestionnaireId, ScaleType, Sector, SectorId,
    SubQuestion, SubQuestionResponse, TriggerCondition, COPSOQ_CURTA_BR,
};
use crate::workflows::survey::memory::InMemorySurveyStore;
use crate::workflows::survey::report::ReportRecord;
use crate::workflows::survey::repository::{
    AnswerRepository, AppendOutcome, DeliveryError, DiagnosticRepository, Membership,
    MessageDispatcher, OrganizationDirectory, QuestionPrompt, QuestionnaireRepository,
    ReportRepository, RepositoryError, Respondent, RespondentRepository,
};
use crate::workflows::survey::scoring::DiagnosticRecord;

pub(super) const ADDRESS: &str = "whatsapp:+5511988887777";

pub(super) fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn organization_id() -> OrganizationId {
    OrganizationId("org-emp001".to_string())
}

pub(super) fn organization() -> Organization {
    Organization {
        id: organization_id(),
        code: "EMP001".to_string(),
        name: "Empresa ABC".to_string(),
    }
}

pub(super) fn logistics() -> Organization {
    Organization {
        id: OrganizationId("org-emp002".to_string()),
        code: "EMP002".to_string(),
        name: "Empresa ABC Logística".to_string(),
    }
}

pub(super) fn sectors() -> Vec<Sector> {
    vec![
        Sector {
            id: SectorId("sector-ti".to_string()),
            organization_id: organization_id(),
            name: "TI".to_string(),
        },
        Sector {
            id: SectorId("sector-rh".to_string()),
            organization_id: organization_id(),
            name: "RH".to_string(),
        },
    ]
}

pub(super) fn questionnaire_id() -> QuestionnaireId {
    QuestionnaireId("copsoq-curta".to_string())
}

pub(super) fn questionnaire() -> Questionnaire {
    Questionnaire {
        id: questionnaire_id(),
        name: "COPSOQ II Curta".to_string(),
        code: COPSOQ_CURTA_BR.to_string(),
        version: "2".to_string(),
        domains: Vec::new(),
        total_questions: 4,
        active: true,
    }
}

pub(super) fn frequency_options() -> Vec<AnswerOption> {
    ["Nunca", "Raramente", "Às vezes", "Frequentemente", "Sempre"]
        .iter()
        .enumerate()
        .map(|(value, label)| AnswerOption {
            value: value as i32,
            label: label.to_string(),
        })
        .collect()
}

pub(super) fn scale_question(
    id: &str,
    domain_code: &str,
    domain: &str,
    dimension: &str,
) -> Question {
    Question {
        question_id: id.to_string(),
        domain_code: Some(domain_code.to_string()),
        domain: domain.to_string(),
        dimension: dimension.to_string(),
        text: format!("Pergunta {id}"),
        scale_type: ScaleType::NumericScale,
        min: None,
        max: None,
        options: frequency_options(),
        multi_select: false,
        inverted: false,
        sign: None,
        sub_question: None,
    }
}

pub(super) fn bullying_question(response: SubQuestionResponse) -> Question {
    let mut question = scale_question("CO_BU_01", "CO", "Comportamentos ofensivos", "Bullying");
    question.text = "Você foi exposto a bullying no seu local de trabalho?".to_string();
    question.sub_question = Some(SubQuestion {
        condition: TriggerCondition::parse("valor > 0").expect("valid condition"),
        text: "Por parte de quem?".to_string(),
        response,
        options: vec![
            "Colegas".to_string(),
            "Gerente, supervisor".to_string(),
            "Subordinados".to_string(),
            "Clientes, fregueses, pacientes".to_string(),
        ],
    });
    question
}

pub(super) fn comment_question() -> Question {
    Question {
        question_id: "COM_01".to_string(),
        domain_code: None,
        domain: "Comentários".to_string(),
        dimension: "Comentários".to_string(),
        text: "Deseja deixar algum comentário?".to_string(),
        scale_type: ScaleType::FreeText,
        min: None,
        max: None,
        options: Vec::new(),
        multi_select: false,
        inverted: false,
        sign: None,
        sub_question: None,
    }
}

pub(super) fn questions_with(response: SubQuestionResponse) -> Vec<Question> {
    vec![
        scale_question("EL_RT_01A", "EL", "Exigências laborais", "Ritmo de trabalho"),
        scale_question("EL_RT_01B", "EL", "Exigências laborais", "Ritmo de trabalho"),
        bullying_question(response),
        comment_question(),
    ]
}

pub(super) fn questions() -> Vec<Question> {
    questions_with(SubQuestionResponse::MultipleChoice)
}

pub(super) fn seeded_store() -> InMemorySurveyStore {
    InMemorySurveyStore::new()
        .with_organization(organization(), sectors())
        .with_organization(logistics(), Vec::new())
        .with_questionnaire(questionnaire(), questions())
}

pub(super) fn answer(question_id: &str, value: AnswerValue, hour: u32) -> Answer {
    Answer {
        question_id: question_id.to_string(),
        value,
        recorded_at: at(hour),
        idempotency_key: None,
    }
}

pub(super) fn collection(anon_id: &str, answers: Vec<Answer>) -> AnswerCollection {
    AnswerCollection {
        anon_id: AnonId(anon_id.to_string()),
        questionnaire_id: questionnaire_id(),
        answers,
    }
}

pub(super) fn member(address: &str, anon_id: &str, sector: Option<&str>) -> Respondent {
    Respondent {
        address: address.to_string(),
        anon_id: AnonId(anon_id.to_string()),
        membership: Some(Membership {
            organization_id: organization_id(),
            sector_id: sector.map(|sector| SectorId(sector.to_string())),
            unit: None,
        }),
        registered_at: at(8),
        conversation: ConversationState::initial(at(8)),
    }
}

#[derive(Debug, Default)]
pub(super) struct RecordingDispatcher {
    pub(super) prompts: Mutex<Vec<QuestionPrompt>>,
    pub(super) fail: bool,
}

impl RecordingDispatcher {
    pub(super) fn failing() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(super) fn delivered(&self) -> Vec<QuestionPrompt> {
        self.prompts.lock().expect("dispatcher lock").clone()
    }
}

impl MessageDispatcher for RecordingDispatcher {
    fn deliver_question(
        &self,
        _address: &str,
        prompt: &QuestionPrompt,
    ) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Transport("provider timeout".to_string()));
        }
        self.prompts.lock().expect("dispatcher lock").push(prompt.clone());
        Ok(())
    }
}

pub(super) type TestEngine<S = InMemorySurveyStore> = ConversationEngine<S, RecordingDispatcher>;

pub(super) fn engine_for<S>(store: Arc<S>) -> (TestEngine<S>, Arc<RecordingDispatcher>)
where
    S: crate::workflows::survey::repository::SurveyStore + 'static,
{
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let engine = ConversationEngine::new(store, Arc::clone(&dispatcher), EngineOptions::default());
    (engine, dispatcher)
}

pub(super) fn send<S>(engine: &TestEngine<S>, body: &str) -> ConversationReply
where
    S: crate::workflows::survey::repository::SurveyStore + 'static,
{
    engine
        .handle_incoming(&InboundMessage::text(ADDRESS, body))
        .expect("message handled")
}

pub(super) fn state_of(store: &InMemorySurveyStore) -> ConversationState {
    store
        .find_by_address(ADDRESS)
        .expect("store available")
        .expect("respondent registered")
        .conversation
}

pub(super) fn anon_id_of(store: &InMemorySurveyStore) -> AnonId {
    store
        .find_by_address(ADDRESS)
        .expect("store available")
        .expect("respondent registered")
        .anon_id
}

/// Drives a fresh respondent through registration up to the first question.
pub(super) fn start_questionnaire<S>(engine: &TestEngine<S>) -> ConversationReply
where
    S: crate::workflows::survey::repository::SurveyStore + 'static,
{
    send(engine, "oi");
    send(engine, "EMP001");
    send(engine, "1");
    send(engine, "pular");
    send(engine, "sim")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Failure {
    StaleWrites,
    Unavailable,
    /// Every state write succeeds but answer appends fail.
    RejectedAnswers,
    /// The next state write first runs a competing action against the inner store.
    Interleaved,
}

type Interleave = Box<dyn FnOnce() + Send>;

/// Wraps the in-memory store and injects one kind of failure.
pub(super) struct FlakyStore {
    pub(super) inner: Arc<InMemorySurveyStore>,
    pub(super) failure: Failure,
    interleave: Mutex<Option<Interleave>>,
}

impl FlakyStore {
    pub(super) fn new(failure: Failure) -> Self {
        Self::over(Arc::new(seeded_store()), failure)
    }

    pub(super) fn over(inner: Arc<InMemorySurveyStore>, failure: Failure) -> Self {
        Self {
            inner,
            failure,
            interleave: Mutex::new(None),
        }
    }

    /// Runs `action` once, right before the next state write reaches `inner`.
    pub(super) fn interleaving(
        inner: Arc<InMemorySurveyStore>,
        action: impl FnOnce() + Send + 'static,
    ) -> Self {
        let store = Self::over(inner, Failure::Interleaved);
        *store.interleave.lock().expect("interleave lock") = Some(Box::new(action));
        store
    }

    fn check(&self) -> Result<(), RepositoryError> {
        match self.failure {
            Failure::Unavailable => {
                Err(RepositoryError::Unavailable("database offline".to_string()))
            }
            Failure::StaleWrites | Failure::RejectedAnswers | Failure::Interleaved => Ok(()),
        }
    }
}

impl RespondentRepository for FlakyStore {
    fn find_by_address(&self, address: &str) -> Result<Option<Respondent>, RepositoryError> {
        self.check()?;
        self.inner.find_by_address(address)
    }

    fn create_respondent(&self, respondent: Respondent) -> Result<Respondent, RepositoryError> {
        self.check()?;
        self.inner.create_respondent(respondent)
    }

    fn update_conversation_state(
        &self,
        address: &str,
        expected_version: u64,
        next: ConversationState,
    ) -> Result<ConversationState, RepositoryError> {
        self.check()?;
        if self.failure == Failure::StaleWrites {
            return Err(RepositoryError::Conflict);
        }
        let action = self.interleave.lock().expect("interleave lock").take();
        if let Some(action) = action {
            action();
        }
        self.inner
            .update_conversation_state(address, expected_version, next)
    }

    fn assign_membership(
        &self,
        address: &str,
        membership: Membership,
    ) -> Result<(), RepositoryError> {
        self.check()?;
        self.inner.assign_membership(address, membership)
    }

    fn anon_ids_in_scope(
        &self,
        organization_id: &OrganizationId,
        sector_id: Option<&SectorId>,
    ) -> Result<Vec<AnonId>, RepositoryError> {
        self.check()?;
        self.inner.anon_ids_in_scope(organization_id, sector_id)
    }
}

impl QuestionnaireRepository for FlakyStore {
    fn active_questionnaire(
        &self,
        name: Option<&str>,
    ) -> Result<Option<Questionnaire>, RepositoryError> {
        self.check()?;
        self.inner.active_questionnaire(name)
    }

    fn questionnaire(
        &self,
        id: &QuestionnaireId,
    ) -> Result<Option<Questionnaire>, RepositoryError> {
        self.check()?;
        self.inner.questionnaire(id)
    }

    fn questions(&self, id: &QuestionnaireId) -> Result<Vec<Question>, RepositoryError> {
        self.check()?;
        self.inner.questions(id)
    }
}

impl AnswerRepository for FlakyStore {
    fn append_answer(
        &self,
        anon_id: &AnonId,
        questionnaire_id: &QuestionnaireId,
        answer: Answer,
    ) -> Result<AppendOutcome, RepositoryError> {
        self.check()?;
        if self.failure == Failure::RejectedAnswers {
            return Err(RepositoryError::Unavailable("answers offline".to_string()));
        }
        self.inner.append_answer(anon_id, questionnaire_id, answer)
    }

    fn answers(
        &self,
        anon_id: &AnonId,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Option<AnswerCollection>, RepositoryError> {
        self.check()?;
        self.inner.answers(anon_id, questionnaire_id)
    }
}

impl OrganizationDirectory for FlakyStore {
    fn resolve_organizations(&self, query: &str) -> Result<Vec<Organization>, RepositoryError> {
        self.check()?;
        self.inner.resolve_organizations(query)
    }

    fn sectors(&self, organization_id: &OrganizationId) -> Result<Vec<Sector>, RepositoryError> {
        self.check()?;
        self.inner.sectors(organization_id)
    }

    fn find_sector_by_name(
        &self,
        organization_id: &OrganizationId,
        name: &str,
    ) -> Result<Option<Sector>, RepositoryError> {
        self.check()?;
        self.inner.find_sector_by_name(organization_id, name)
    }
}

impl DiagnosticRepository for FlakyStore {
    fn create_diagnostic(&self, record: DiagnosticRecord) -> Result<(), RepositoryError> {
        self.check()?;
        self.inner.create_diagnostic(record)
    }

    fn find_diagnostics(
        &self,
        anon_ids: &[AnonId],
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Vec<DiagnosticRecord>, RepositoryError> {
        self.check()?;
        self.inner.find_diagnostics(anon_ids, questionnaire_id)
    }
}

impl ReportRepository for FlakyStore {
    fn create_report(&self, record: ReportRecord) -> Result<(), RepositoryError> {
        self.check()?;
        self.inner.create_report(record)
    }
}

pub(super) fn sign_of(dimension: &str) -> DimensionSign {
    if crate::workflows::survey::scoring::is_protective_dimension(dimension) {
        DimensionSign::Protection
    } else {
        DimensionSign::Risk
    }
}
