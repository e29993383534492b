//! Conversational psychosocial-risk survey engine.
//!
//! Respondents answer a versioned questionnaire over a turn-based messaging channel. The
//! conversation engine drives registration and questionnaire traversal, the scoring engine
//! classifies each psychosocial dimension, and the report aggregator rolls diagnostics up to
//! organization or sector level.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
