use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::{
    derived_sub_question_id, OrganizationId, Question, QuestionnaireId, SectorId,
    SubQuestionResponse,
};

/// Flat status label of a conversation, as exposed to callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationStatus {
    Inactive,
    ValidatingOrg,
    SelectingOrg,
    ValidatingSector,
    ValidatingUnit,
    AwaitingConfirmation,
    InProgress,
    Finished,
}

impl ConversationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inactive => "INACTIVE",
            Self::ValidatingOrg => "VALIDATING_ORG",
            Self::SelectingOrg => "SELECTING_ORG",
            Self::ValidatingSector => "VALIDATING_SECTOR",
            Self::ValidatingUnit => "VALIDATING_UNIT",
            Self::AwaitingConfirmation => "AWAITING_CONFIRMATION",
            Self::InProgress => "IN_PROGRESS",
            Self::Finished => "FINISHED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationChoice {
    pub id: OrganizationId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorChoice {
    pub id: SectorId,
    pub name: String,
}

/// Follow-up question awaiting an answer, copied from the parent at trigger time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSubQuestion {
    pub parent_question_id: String,
    pub text: String,
    pub response: SubQuestionResponse,
    pub options: Vec<String>,
}

impl PendingSubQuestion {
    /// `None` when the parent's follow-up has no text or no usable options.
    pub fn from_question(question: &Question) -> Option<Self> {
        let sub = question.sub_question.as_ref()?;
        let text = sub.text.trim();
        let options: Vec<String> = sub
            .options
            .iter()
            .map(|option| option.trim())
            .filter(|option| !option.is_empty())
            .map(str::to_string)
            .collect();
        if text.is_empty() || options.is_empty() {
            return None;
        }

        Some(Self {
            parent_question_id: question.question_id.clone(),
            text: text.to_string(),
            response: sub.response,
            options,
        })
    }

    pub fn allows_multiple(&self) -> bool {
        self.response == SubQuestionResponse::MultipleChoice
    }

    pub fn answer_question_id(&self) -> String {
        derived_sub_question_id(&self.parent_question_id)
    }
}

/// Position in the registration and questionnaire script, with the data each step needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationStage {
    Inactive,
    ValidatingOrg,
    SelectingOrg {
        candidates: Vec<OrganizationChoice>,
    },
    ValidatingSector {
        organization: OrganizationChoice,
        sectors: Vec<SectorChoice>,
    },
    ValidatingUnit {
        organization: OrganizationChoice,
        sector: Option<SectorChoice>,
    },
    AwaitingConfirmation {
        organization: OrganizationChoice,
        sector: Option<SectorChoice>,
        unit: Option<String>,
    },
    InProgress {
        questionnaire_id: QuestionnaireId,
        current_question_index: usize,
        pending_subquestion: Option<PendingSubQuestion>,
        started_at: DateTime<Utc>,
    },
    Finished {
        questionnaire_id: QuestionnaireId,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
}

impl ConversationStage {
    pub fn status(&self) -> ConversationStatus {
        match self {
            Self::Inactive => ConversationStatus::Inactive,
            Self::ValidatingOrg => ConversationStatus::ValidatingOrg,
            Self::SelectingOrg { .. } => ConversationStatus::SelectingOrg,
            Self::ValidatingSector { .. } => ConversationStatus::ValidatingSector,
            Self::ValidatingUnit { .. } => ConversationStatus::ValidatingUnit,
            Self::AwaitingConfirmation { .. } => ConversationStatus::AwaitingConfirmation,
            Self::InProgress { .. } => ConversationStatus::InProgress,
            Self::Finished { .. } => ConversationStatus::Finished,
        }
    }
}

/// Applied message ids remembered per conversation for redelivery detection.
pub const MESSAGE_HISTORY_LIMIT: usize = 32;

/// Persisted per-respondent conversation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub stage: ConversationStage,
    /// Optimistic concurrency counter, bumped by the repository on every write.
    pub version: u64,
    pub last_message_id: Option<String>,
    pub last_reply: Option<String>,
    /// Provider message ids that already moved this conversation, oldest first.
    #[serde(default)]
    pub recent_message_ids: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            stage: ConversationStage::Inactive,
            version: 0,
            last_message_id: None,
            last_reply: None,
            recent_message_ids: Vec::new(),
            updated_at: now,
        }
    }

    pub fn status(&self) -> ConversationStatus {
        self.stage.status()
    }

    pub fn organization_id(&self) -> Option<&OrganizationId> {
        match &self.stage {
            ConversationStage::ValidatingSector { organization, .. }
            | ConversationStage::ValidatingUnit { organization, .. }
            | ConversationStage::AwaitingConfirmation { organization, .. } => {
                Some(&organization.id)
            }
            _ => None,
        }
    }

    pub fn questionnaire_id(&self) -> Option<&QuestionnaireId> {
        match &self.stage {
            ConversationStage::InProgress {
                questionnaire_id, ..
            }
            | ConversationStage::Finished {
                questionnaire_id, ..
            } => Some(questionnaire_id),
            _ => None,
        }
    }

    pub fn current_question_index(&self) -> Option<usize> {
        match &self.stage {
            ConversationStage::InProgress {
                current_question_index,
                ..
            } => Some(*current_question_index),
            _ => None,
        }
    }

    pub fn pending_subquestion(&self) -> Option<&PendingSubQuestion> {
        match &self.stage {
            ConversationStage::InProgress {
                pending_subquestion,
                ..
            } => pending_subquestion.as_ref(),
            _ => None,
        }
    }

    /// Whether `message_id` already moved this conversation, either last or earlier.
    pub fn is_replay_of(&self, message_id: Option<&str>) -> bool {
        let Some(incoming) = message_id else {
            return false;
        };
        self.last_message_id.as_deref() == Some(incoming)
            || self.recent_message_ids.iter().any(|seen| seen == incoming)
    }

    /// Message history after applying `message_id`, keeping the newest entries.
    pub fn history_with(&self, message_id: Option<&str>) -> Vec<String> {
        let mut history = self.recent_message_ids.clone();
        if let Some(id) = message_id {
            history.push(id.to_string());
        }
        let overflow = history.len().saturating_sub(MESSAGE_HISTORY_LIMIT);
        history.drain(..overflow);
        history
    }
}
