use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Short Brazilian version of COPSOQ II (0-4 answer scale).
pub const COPSOQ_CURTA_BR: &str = "COPSOQ_CURTA_BR";
/// Medium Portuguese version of COPSOQ II.
pub const COPSOQ_MEDIA_PT: &str = "COPSOQ_MEDIA_PT";

const DEFAULT_MIN_VALUE: i32 = 1;
const DEFAULT_MAX_VALUE: i32 = 5;
const SUB_QUESTION_SUFFIX: &str = "__sub";

/// Identifier wrapper for questionnaires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionnaireId(pub String);

/// Identifier wrapper for client organizations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

/// Identifier wrapper for sectors within an organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectorId(pub String);

/// Anonymous respondent identifier; the only respondent key analytics ever see.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnonId(pub String);

impl AnonId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for AnonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for QuestionnaireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Domain grouping declared by a questionnaire, with the dimensions it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDescriptor {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub dimensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub id: QuestionnaireId,
    pub name: String,
    /// Version code, e.g. [`COPSOQ_CURTA_BR`]. Drives version-specific scoring tables.
    pub code: String,
    pub version: String,
    #[serde(default)]
    pub domains: Vec<DomainDescriptor>,
    pub total_questions: usize,
    pub active: bool,
}

impl Questionnaire {
    pub fn is_copsoq(&self) -> bool {
        self.code.starts_with("COPSOQ_")
    }

    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.trim();
        self.name.eq_ignore_ascii_case(name) || self.code.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleType {
    NumericScale,
    FreeText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub value: i32,
    pub label: String,
}

/// Whether a higher dimension score signals risk or protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionSign {
    Risk,
    Protection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: String,
    #[serde(default)]
    pub domain_code: Option<String>,
    pub domain: String,
    pub dimension: String,
    pub text: String,
    pub scale_type: ScaleType,
    #[serde(default)]
    pub min: Option<i32>,
    #[serde(default)]
    pub max: Option<i32>,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    #[serde(default)]
    pub multi_select: bool,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    pub sign: Option<DimensionSign>,
    #[serde(default)]
    pub sub_question: Option<SubQuestion>,
}

impl Question {
    /// Accepted `[min, max]` range; labeled options take precedence over declared bounds.
    pub fn value_range(&self) -> (i32, i32) {
        let option_min = self.options.iter().map(|option| option.value).min();
        let option_max = self.options.iter().map(|option| option.value).max();
        match (option_min, option_max) {
            (Some(min), Some(max)) => (min, max),
            _ => (
                self.min.unwrap_or(DEFAULT_MIN_VALUE),
                self.max.unwrap_or(DEFAULT_MAX_VALUE),
            ),
        }
    }

    pub fn is_free_text(&self) -> bool {
        self.scale_type == ScaleType::FreeText
    }

    pub fn sub_question_id(&self) -> String {
        derived_sub_question_id(&self.question_id)
    }
}

pub(crate) fn derived_sub_question_id(parent_id: &str) -> String {
    format!("{parent_id}{SUB_QUESTION_SUFFIX}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubQuestionResponse {
    #[default]
    SingleChoice,
    MultipleChoice,
}

/// Follow-up asked right after the parent question when its trigger holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestion {
    #[serde(default)]
    pub condition: TriggerCondition,
    pub text: String,
    #[serde(default)]
    pub response: SubQuestionResponse,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl ComparisonOperator {
    fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    fn apply(self, value: i32, threshold: i32) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Ge => value >= threshold,
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
            Self::Eq => value == threshold,
            Self::Ne => value != threshold,
        }
    }
}

/// Predicate over the parent answer, written as `"valor > 0"` / `"value >= 2"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TriggerCondition {
    pub operator: ComparisonOperator,
    pub threshold: i32,
}

impl Default for TriggerCondition {
    fn default() -> Self {
        Self {
            operator: ComparisonOperator::Gt,
            threshold: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported trigger condition '{0}'")]
pub struct InvalidCondition(pub String);

impl TriggerCondition {
    pub fn parse(raw: &str) -> Result<Self, InvalidCondition> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let expression = ["valor", "value"]
            .iter()
            .find_map(|subject| trimmed.strip_prefix(subject))
            .unwrap_or(trimmed)
            .trim();

        // Two-character operators first so ">=" is not read as ">".
        let operators = [
            (">=", ComparisonOperator::Ge),
            ("<=", ComparisonOperator::Le),
            ("==", ComparisonOperator::Eq),
            ("!=", ComparisonOperator::Ne),
            (">", ComparisonOperator::Gt),
            ("<", ComparisonOperator::Lt),
            ("=", ComparisonOperator::Eq),
        ];

        let (operator, rest) = operators
            .iter()
            .find_map(|(symbol, operator)| {
                expression
                    .strip_prefix(symbol)
                    .map(|rest| (*operator, rest))
            })
            .ok_or_else(|| InvalidCondition(raw.to_string()))?;

        let threshold = rest
            .trim()
            .parse::<i32>()
            .map_err(|_| InvalidCondition(raw.to_string()))?;

        Ok(Self {
            operator,
            threshold,
        })
    }

    /// List answers trigger when any selected value satisfies the predicate; text never does.
    pub fn holds(&self, value: &AnswerValue) -> bool {
        match value {
            AnswerValue::Numeric(number) => self.operator.apply(*number, self.threshold),
            AnswerValue::MultiNumeric(values) => values
                .iter()
                .any(|number| self.operator.apply(*number, self.threshold)),
            AnswerValue::Text(_) => false,
        }
    }
}

impl TryFrom<String> for TriggerCondition {
    type Error = InvalidCondition;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TriggerCondition> for String {
    fn from(value: TriggerCondition) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TriggerCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value {} {}", self.operator.symbol(), self.threshold)
    }
}

/// Typed answer value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Numeric(i32),
    MultiNumeric(Vec<i32>),
    Text(String),
}

impl AnswerValue {
    /// Builds a numeric value from already-deduplicated selections, collapsing a single one.
    pub fn from_distinct(mut values: Vec<i32>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(Self::Numeric),
            _ => Some(Self::MultiNumeric(values)),
        }
    }

    /// Value fed to scoring: the highest selection of a list, nothing for free text.
    pub fn scoring_value(&self) -> Option<i32> {
        match self {
            Self::Numeric(value) => Some(*value),
            Self::MultiNumeric(values) => values.iter().copied().max(),
            Self::Text(_) => None,
        }
    }

    pub fn within(&self, min: i32, max: i32) -> bool {
        match self {
            Self::Numeric(value) => (min..=max).contains(value),
            Self::MultiNumeric(values) => values.iter().all(|value| (min..=max).contains(value)),
            Self::Text(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub value: AnswerValue,
    pub recorded_at: DateTime<Utc>,
    /// Provider message id that produced the answer, used to drop redelivered messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// Append-only answers of one respondent for one questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerCollection {
    pub anon_id: AnonId,
    pub questionnaire_id: QuestionnaireId,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub organization_id: OrganizationId,
    pub name: String,
}

/// Structured selection attached to an inbound message by the channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPayload {
    #[serde(default)]
    pub list_id: Option<String>,
    #[serde(default)]
    pub list_title: Option<String>,
    #[serde(default)]
    pub button_payload: Option<String>,
    #[serde(default)]
    pub button_text: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl SelectionPayload {
    /// First non-blank value among `list_id`, `button_payload` and `id`.
    pub fn raw_value(&self) -> Option<&str> {
        [&self.list_id, &self.button_payload, &self.id]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.raw_value().is_none()
    }
}

/// Population a report covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportScope {
    Organization {
        organization_id: OrganizationId,
    },
    Sector {
        organization_id: OrganizationId,
        sector_id: SectorId,
    },
}

impl ReportScope {
    pub fn organization_id(&self) -> &OrganizationId {
        match self {
            Self::Organization { organization_id } | Self::Sector { organization_id, .. } => {
                organization_id
            }
        }
    }

    pub fn sector_id(&self) -> Option<&SectorId> {
        match self {
            Self::Organization { .. } => None,
            Self::Sector { sector_id, .. } => Some(sector_id),
        }
    }
}
