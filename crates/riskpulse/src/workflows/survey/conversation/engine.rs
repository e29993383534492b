use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::super::domain::{
    AnonId, Answer, AnswerValue, Organization, Question, QuestionnaireId, SelectionPayload,
};
use super::super::parser::{self, FreeTextRejection};
use super::super::repository::{
    AppendOutcome, MessageDispatcher, Membership, QuestionPrompt, RepositoryError, Respondent,
    SurveyStore,
};
use super::messages;
use super::state::{
    ConversationStage, ConversationState, ConversationStatus, OrganizationChoice,
    PendingSubQuestion, SectorChoice,
};

/// Message received from the channel adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub address: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub selection: Option<SelectionPayload>,
    /// Provider message id; repeated deliveries of the same id are answered from the stored reply.
    #[serde(default)]
    pub message_id: Option<String>,
}

impl InboundMessage {
    pub fn text(address: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            body: body.into(),
            selection: None,
            message_id: None,
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_selection(mut self, selection: SelectionPayload) -> Self {
        self.selection = Some(selection);
        self
    }

    fn selection(&self) -> Option<&SelectionPayload> {
        self.selection.as_ref().filter(|payload| !payload.is_empty())
    }
}

/// Respondent that just finished a questionnaire; the caller schedules scoring for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedQuestionnaire {
    pub anon_id: AnonId,
    pub questionnaire_id: QuestionnaireId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationReply {
    pub text: String,
    pub status: ConversationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<CompletedQuestionnaire>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Restricts questionnaire activation to this name or code.
    pub questionnaire_name: Option<String>,
    pub interactive_delivery: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            questionnaire_name: None,
            interactive_delivery: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("conversation state changed concurrently; retry the message")]
    StaleState,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of evaluating one message against the current stage.
///
/// An answer travels with the transition and is stored only once the state write has won.
struct Transition {
    next: Option<ConversationStage>,
    reply: String,
    completed: Option<CompletedQuestionnaire>,
    prompt: Option<QuestionPrompt>,
    answer: Option<(QuestionnaireId, Answer)>,
}

impl Transition {
    fn stay(reply: impl Into<String>) -> Self {
        Self {
            next: None,
            reply: reply.into(),
            completed: None,
            prompt: None,
            answer: None,
        }
    }

    fn to(stage: ConversationStage, reply: impl Into<String>) -> Self {
        Self {
            next: Some(stage),
            reply: reply.into(),
            completed: None,
            prompt: None,
            answer: None,
        }
    }

    fn with_prompt(mut self, prompt: Option<QuestionPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    fn recording(mut self, questionnaire_id: &QuestionnaireId, answer: Answer) -> Self {
        self.answer = Some((questionnaire_id.clone(), answer));
        self
    }
}

impl From<&Organization> for OrganizationChoice {
    fn from(value: &Organization) -> Self {
        Self {
            id: value.id.clone(),
            name: value.name.clone(),
        }
    }
}

/// Per-respondent state machine driving registration and questionnaire traversal.
pub struct ConversationEngine<S, D> {
    store: Arc<S>,
    dispatcher: Arc<D>,
    options: EngineOptions,
}

impl<S, D> ConversationEngine<S, D>
where
    S: SurveyStore + 'static,
    D: MessageDispatcher + 'static,
{
    pub fn new(store: Arc<S>, dispatcher: Arc<D>, options: EngineOptions) -> Self {
        Self {
            store,
            dispatcher,
            options,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Handles one inbound message and returns the text to send back.
    ///
    /// Invalid input yields a retry prompt and leaves the stored state untouched. Persistence
    /// failures surface as errors so the caller can retry the whole message.
    pub fn handle_incoming(
        &self,
        message: &InboundMessage,
    ) -> Result<ConversationReply, ConversationError> {
        let now = Utc::now();
        let respondent = self.load_or_register(&message.address, now)?;
        let state = &respondent.conversation;

        if state.is_replay_of(message.message_id.as_deref()) {
            debug!(anon_id = %respondent.anon_id, "redelivered message answered from stored reply");
            return Ok(ConversationReply {
                text: state.last_reply.clone().unwrap_or_default(),
                status: state.status(),
                completed: None,
            });
        }

        let transition = if messages::is_reset(&message.body) {
            info!(
                anon_id = %respondent.anon_id,
                from = state.status().label(),
                "conversation reset requested"
            );
            Transition::to(ConversationStage::ValidatingOrg, messages::intro())
        } else {
            self.evaluate(&respondent, message, now)?
        };

        self.apply(&respondent, message, transition, now)
    }

    fn load_or_register(
        &self,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<Respondent, ConversationError> {
        if let Some(respondent) = self.store.find_by_address(address)? {
            return Ok(respondent);
        }

        let respondent = Respondent {
            address: address.to_string(),
            anon_id: AnonId::generate(),
            membership: None,
            registered_at: now,
            conversation: ConversationState::initial(now),
        };

        match self.store.create_respondent(respondent) {
            Ok(created) => {
                info!(anon_id = %created.anon_id, "respondent auto-registered");
                Ok(created)
            }
            // Another delivery registered the address first.
            Err(RepositoryError::Conflict) => self
                .store
                .find_by_address(address)?
                .ok_or(ConversationError::StaleState),
            Err(other) => Err(other.into()),
        }
    }

    fn apply(
        &self,
        respondent: &Respondent,
        message: &InboundMessage,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<ConversationReply, ConversationError> {
        let current = &respondent.conversation;
        let Some(stage) = transition.next else {
            return Ok(ConversationReply {
                text: transition.reply,
                status: current.status(),
                completed: None,
            });
        };

        let from = current.status();
        let next = ConversationState {
            stage,
            version: current.version,
            last_message_id: message.message_id.clone(),
            last_reply: Some(transition.reply.clone()),
            recent_message_ids: current.history_with(message.message_id.as_deref()),
            updated_at: now,
        };

        let saved = match self.store.update_conversation_state(
            &respondent.address,
            current.version,
            next,
        ) {
            Ok(saved) => saved,
            Err(RepositoryError::Conflict) => {
                warn!(anon_id = %respondent.anon_id, "lost conversation state race");
                return Err(ConversationError::StaleState);
            }
            Err(other) => return Err(other.into()),
        };

        if let Some((questionnaire_id, answer)) = transition.answer {
            if let Err(err) = self.record(respondent, &questionnaire_id, answer) {
                self.roll_back(respondent, current, &saved);
                return Err(err);
            }
        }

        debug!(
            anon_id = %respondent.anon_id,
            from = from.label(),
            to = saved.status().label(),
            version = saved.version,
            "conversation transition"
        );

        if let Some(prompt) = transition.prompt.as_ref() {
            self.deliver(respondent, prompt);
        }

        if let Some(completed) = transition.completed.as_ref() {
            info!(
                anon_id = %completed.anon_id,
                questionnaire_id = %completed.questionnaire_id,
                "questionnaire finished"
            );
        }

        Ok(ConversationReply {
            text: transition.reply,
            status: saved.status(),
            completed: transition.completed,
        })
    }

    /// Puts back the state the failed message started from so a redelivery answers again.
    fn roll_back(
        &self,
        respondent: &Respondent,
        previous: &ConversationState,
        saved: &ConversationState,
    ) {
        match self.store.update_conversation_state(
            &respondent.address,
            saved.version,
            previous.clone(),
        ) {
            Ok(_) => warn!(
                anon_id = %respondent.anon_id,
                "answer not stored; conversation state rolled back"
            ),
            Err(err) => error!(
                anon_id = %respondent.anon_id,
                error = %err,
                "answer not stored and conversation state could not be rolled back"
            ),
        }
    }

    fn deliver(&self, respondent: &Respondent, prompt: &QuestionPrompt) {
        if let Err(error) = self.dispatcher.deliver_question(&respondent.address, prompt) {
            warn!(
                anon_id = %respondent.anon_id,
                question_id = %prompt.question_id,
                %error,
                "interactive delivery failed; plain text reply still sent"
            );
        }
    }

    fn evaluate(
        &self,
        respondent: &Respondent,
        message: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<Transition, ConversationError> {
        match &respondent.conversation.stage {
            ConversationStage::Inactive => Ok(Transition::to(
                ConversationStage::ValidatingOrg,
                messages::intro(),
            )),
            ConversationStage::ValidatingOrg => self.validate_organization(message),
            ConversationStage::SelectingOrg { candidates } => {
                self.select_organization(candidates, message)
            }
            ConversationStage::ValidatingSector {
                organization,
                sectors,
            } => self.validate_sector(organization, sectors, message),
            ConversationStage::ValidatingUnit {
                organization,
                sector,
            } => self.validate_unit(respondent, organization, sector.as_ref(), message),
            ConversationStage::AwaitingConfirmation {
                organization,
                sector,
                unit,
            } => {
                if !messages::is_confirmation(&message.body) {
                    debug!(
                        anon_id = %respondent.anon_id,
                        organization = %organization.name,
                        sector = sector.as_ref().map(|s| s.name.as_str()).unwrap_or("-"),
                        unit = unit.as_deref().unwrap_or("-"),
                        "waiting for confirmation keyword"
                    );
                    return Ok(Transition::stay(messages::INVALID_CONFIRMATION));
                }
                self.start_questionnaire(respondent, now)
            }
            ConversationStage::InProgress {
                questionnaire_id,
                current_question_index,
                pending_subquestion,
                started_at,
            } => {
                let cursor = Cursor {
                    questionnaire_id,
                    index: *current_question_index,
                    started_at: *started_at,
                };
                self.answer(respondent, &cursor, pending_subquestion.as_ref(), message, now)
            }
            ConversationStage::Finished { .. } => {
                Ok(Transition::stay(messages::ALREADY_FINISHED))
            }
        }
    }

    fn validate_organization(
        &self,
        message: &InboundMessage,
    ) -> Result<Transition, ConversationError> {
        let query = message.body.trim();
        if query.is_empty() {
            return Ok(Transition::stay(messages::ORGANIZATION_NOT_FOUND));
        }

        let organizations = self.store.resolve_organizations(query)?;
        match organizations.as_slice() {
            [] => Ok(Transition::stay(messages::ORGANIZATION_NOT_FOUND)),
            [organization] => self.enter_organization(OrganizationChoice::from(organization)),
            many => {
                let candidates: Vec<OrganizationChoice> =
                    many.iter().map(OrganizationChoice::from).collect();
                let reply = messages::organization_candidates(&candidates);
                Ok(Transition::to(
                    ConversationStage::SelectingOrg { candidates },
                    reply,
                ))
            }
        }
    }

    fn select_organization(
        &self,
        candidates: &[OrganizationChoice],
        message: &InboundMessage,
    ) -> Result<Transition, ConversationError> {
        if candidates.is_empty() {
            warn!("organization selection without candidates; restarting registration");
            return Ok(Transition::to(
                ConversationStage::ValidatingOrg,
                messages::recovery(),
            ));
        }

        let by_name = || {
            let name = message.body.trim();
            candidates
                .iter()
                .position(|candidate| candidate.name.eq_ignore_ascii_case(name))
        };

        match chosen_index(message, candidates.len()).or_else(by_name) {
            Some(index) => self.enter_organization(candidates[index].clone()),
            None => Ok(Transition::stay(messages::invalid_candidate(
                candidates.len(),
            ))),
        }
    }

    fn enter_organization(
        &self,
        organization: OrganizationChoice,
    ) -> Result<Transition, ConversationError> {
        let sectors: Vec<SectorChoice> = self
            .store
            .sectors(&organization.id)?
            .into_iter()
            .map(|sector| SectorChoice {
                id: sector.id,
                name: sector.name,
            })
            .collect();

        if sectors.is_empty() {
            let reply = messages::organization_confirmed_without_sectors(&organization.name);
            return Ok(Transition::to(
                ConversationStage::ValidatingUnit {
                    organization,
                    sector: None,
                },
                reply,
            ));
        }

        let reply = messages::organization_confirmed(&organization.name, &sectors);
        Ok(Transition::to(
            ConversationStage::ValidatingSector {
                organization,
                sectors,
            },
            reply,
        ))
    }

    fn validate_sector(
        &self,
        organization: &OrganizationChoice,
        sectors: &[SectorChoice],
        message: &InboundMessage,
    ) -> Result<Transition, ConversationError> {
        let name = message.body.trim();
        let listed = chosen_index(message, sectors.len())
            .or_else(|| {
                sectors
                    .iter()
                    .position(|sector| sector.name.eq_ignore_ascii_case(name))
            })
            .map(|index| sectors[index].clone());

        let sector = match listed {
            Some(sector) => Some(sector),
            None if !name.is_empty() => self
                .store
                .find_sector_by_name(&organization.id, name)?
                .map(|sector| SectorChoice {
                    id: sector.id,
                    name: sector.name,
                }),
            None => None,
        };

        match sector {
            Some(sector) => Ok(Transition::to(
                ConversationStage::ValidatingUnit {
                    organization: organization.clone(),
                    sector: Some(sector),
                },
                messages::UNIT_PROMPT,
            )),
            None => Ok(Transition::stay(messages::SECTOR_NOT_FOUND)),
        }
    }

    fn validate_unit(
        &self,
        respondent: &Respondent,
        organization: &OrganizationChoice,
        sector: Option<&SectorChoice>,
        message: &InboundMessage,
    ) -> Result<Transition, ConversationError> {
        let raw = message.body.trim();
        if raw.is_empty() {
            return Ok(Transition::stay(messages::UNIT_PROMPT));
        }
        let unit = (!messages::is_skip_unit(raw)).then(|| raw.to_string());

        self.store.assign_membership(
            &respondent.address,
            Membership {
                organization_id: organization.id.clone(),
                sector_id: sector.map(|sector| sector.id.clone()),
                unit: unit.clone(),
            },
        )?;

        let reply = messages::registration_summary(
            &organization.name,
            sector.map(|sector| sector.name.as_str()),
            unit.as_deref(),
        );
        Ok(Transition::to(
            ConversationStage::AwaitingConfirmation {
                organization: organization.clone(),
                sector: sector.cloned(),
                unit,
            },
            reply,
        ))
    }

    fn start_questionnaire(
        &self,
        respondent: &Respondent,
        now: DateTime<Utc>,
    ) -> Result<Transition, ConversationError> {
        let Some(questionnaire) = self
            .store
            .active_questionnaire(self.options.questionnaire_name.as_deref())?
        else {
            return Ok(Transition::stay(messages::NO_ACTIVE_QUESTIONNAIRE));
        };

        let questions = self.store.questions(&questionnaire.id)?;
        let Some(first) = questions.first() else {
            warn!(
                anon_id = %respondent.anon_id,
                questionnaire_id = %questionnaire.id,
                "active questionnaire has no questions; resetting conversation"
            );
            return Ok(Transition::to(
                ConversationStage::Inactive,
                messages::QUESTIONNAIRE_WITHOUT_QUESTIONS,
            ));
        };

        info!(
            anon_id = %respondent.anon_id,
            questionnaire_id = %questionnaire.id,
            "questionnaire started"
        );

        let reply = messages::format_question(0, questions.len(), first);
        let prompt = self.prompt_for(0, questions.len(), first);
        Ok(Transition::to(
            ConversationStage::InProgress {
                questionnaire_id: questionnaire.id,
                current_question_index: 0,
                pending_subquestion: None,
                started_at: now,
            },
            reply,
        )
        .with_prompt(prompt))
    }

    fn answer(
        &self,
        respondent: &Respondent,
        cursor: &Cursor<'_>,
        pending: Option<&PendingSubQuestion>,
        message: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<Transition, ConversationError> {
        let questions = self.store.questions(cursor.questionnaire_id)?;
        if questions.is_empty() {
            warn!(
                anon_id = %respondent.anon_id,
                questionnaire_id = %cursor.questionnaire_id,
                "questions vanished mid-questionnaire; resetting conversation"
            );
            return Ok(Transition::to(
                ConversationStage::Inactive,
                messages::QUESTIONS_VANISHED,
            ));
        }

        let Some(current) = questions.get(cursor.index) else {
            // The question list shrank below the cursor; what was answered is complete.
            return Ok(self.advance(respondent, cursor, &questions, questions.len(), now));
        };

        if let Some(pending) = pending {
            return self.answer_subquestion(respondent, cursor, &questions, pending, message, now);
        }

        let value = if current.is_free_text() {
            match parser::parse_free_text(&message.body) {
                Ok(text) => AnswerValue::Text(text.to_string()),
                Err(FreeTextRejection::Empty) => {
                    return Ok(Transition::stay(messages::FREE_TEXT_EMPTY))
                }
                Err(FreeTextRejection::TooLong) => {
                    return Ok(Transition::stay(messages::FREE_TEXT_TOO_LONG))
                }
            }
        } else {
            let (min, max) = current.value_range();
            let parsed = match message.selection() {
                Some(selection) => parser::parse_selection(selection, min, max),
                None => parser::parse_answer(&message.body, current.multi_select, min, max),
            };
            match parsed.filter(|value| value.within(min, max)) {
                Some(value) => value,
                None => return Ok(Transition::stay(messages::invalid_answer(min, max))),
            }
        };

        let recorded = Answer {
            question_id: current.question_id.clone(),
            value: value.clone(),
            recorded_at: now,
            idempotency_key: message.message_id.clone(),
        };

        let triggered = current
            .sub_question
            .as_ref()
            .filter(|sub| sub.condition.holds(&value))
            .and_then(|_| PendingSubQuestion::from_question(current));

        if let Some(pending) = triggered {
            let reply = messages::format_subquestion(&pending);
            return Ok(Transition::to(
                ConversationStage::InProgress {
                    questionnaire_id: cursor.questionnaire_id.clone(),
                    current_question_index: cursor.index,
                    pending_subquestion: Some(pending),
                    started_at: cursor.started_at,
                },
                reply,
            )
            .recording(cursor.questionnaire_id, recorded));
        }

        Ok(self
            .advance(respondent, cursor, &questions, cursor.index + 1, now)
            .recording(cursor.questionnaire_id, recorded))
    }

    fn answer_subquestion(
        &self,
        respondent: &Respondent,
        cursor: &Cursor<'_>,
        questions: &[Question],
        pending: &PendingSubQuestion,
        message: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<Transition, ConversationError> {
        let option_count = pending.options.len();
        let chosen = match message.selection() {
            Some(selection) => {
                parser::parse_option_selection(selection, option_count).map(|index| vec![index])
            }
            None => {
                parser::parse_option_indices(&message.body, option_count, pending.allows_multiple())
            }
        };

        let Some(indices) = chosen else {
            return Ok(Transition::stay(messages::invalid_subquestion(option_count)));
        };

        let labels = indices
            .iter()
            .filter_map(|index| pending.options.get(*index))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        let recorded = Answer {
            question_id: pending.answer_question_id(),
            value: AnswerValue::Text(labels),
            recorded_at: now,
            idempotency_key: message.message_id.clone(),
        };

        Ok(self
            .advance(respondent, cursor, questions, cursor.index + 1, now)
            .recording(cursor.questionnaire_id, recorded))
    }

    fn record(
        &self,
        respondent: &Respondent,
        questionnaire_id: &QuestionnaireId,
        answer: Answer,
    ) -> Result<(), ConversationError> {
        let question_id = answer.question_id.clone();
        match self
            .store
            .append_answer(&respondent.anon_id, questionnaire_id, answer)?
        {
            AppendOutcome::Recorded => {
                debug!(anon_id = %respondent.anon_id, %question_id, "answer recorded")
            }
            // Same message and question already stored by an earlier attempt.
            AppendOutcome::Duplicate => {
                warn!(
                    anon_id = %respondent.anon_id,
                    %question_id,
                    "answer already recorded for message"
                )
            }
        }
        Ok(())
    }

    fn advance(
        &self,
        respondent: &Respondent,
        cursor: &Cursor<'_>,
        questions: &[Question],
        next_index: usize,
        now: DateTime<Utc>,
    ) -> Transition {
        let Some(next) = questions.get(next_index) else {
            let mut transition = Transition::to(
                ConversationStage::Finished {
                    questionnaire_id: cursor.questionnaire_id.clone(),
                    started_at: cursor.started_at,
                    finished_at: now,
                },
                messages::FINAL_MESSAGE,
            );
            transition.completed = Some(CompletedQuestionnaire {
                anon_id: respondent.anon_id.clone(),
                questionnaire_id: cursor.questionnaire_id.clone(),
            });
            return transition;
        };

        let reply = messages::format_question(next_index, questions.len(), next);
        let prompt = self.prompt_for(next_index, questions.len(), next);
        Transition::to(
            ConversationStage::InProgress {
                questionnaire_id: cursor.questionnaire_id.clone(),
                current_question_index: next_index,
                pending_subquestion: None,
                started_at: cursor.started_at,
            },
            reply,
        )
        .with_prompt(prompt)
    }

    fn prompt_for(
        &self,
        position: usize,
        total: usize,
        question: &Question,
    ) -> Option<QuestionPrompt> {
        if !self.options.interactive_delivery
            || question.is_free_text()
            || question.options.is_empty()
        {
            return None;
        }

        Some(QuestionPrompt {
            question_id: question.question_id.clone(),
            position: position + 1,
            total,
            text: question.text.clone(),
            options: question.options.clone(),
        })
    }
}

/// Questionnaire position carried through the in-progress handlers.
struct Cursor<'a> {
    questionnaire_id: &'a QuestionnaireId,
    index: usize,
    started_at: DateTime<Utc>,
}

/// 0-based index picked by a selection payload or a single 1-based number in the text.
fn chosen_index(message: &InboundMessage, count: usize) -> Option<usize> {
    match message.selection() {
        Some(selection) => parser::parse_option_selection(selection, count),
        None => parser::parse_option_indices(&message.body, count, false)
            .and_then(|indices| indices.first().copied()),
    }
}
