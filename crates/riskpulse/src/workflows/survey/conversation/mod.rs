//! Registration and questionnaire traversal over a turn-based channel.

mod engine;
mod messages;
mod state;

pub use engine::{
    CompletedQuestionnaire, ConversationEngine, ConversationError, ConversationReply,
    EngineOptions, InboundMessage,
};
pub use messages::{format_question, format_subquestion};
pub use state::{
    ConversationStage, ConversationState, ConversationStatus, OrganizationChoice,
    PendingSubQuestion, SectorChoice,
};
