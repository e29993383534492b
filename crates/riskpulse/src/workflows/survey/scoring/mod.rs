mod policy;
pub mod rules;
pub mod tables;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    AnonId, AnswerCollection, DimensionSign, Question, Questionnaire, QuestionnaireId,
};
use policy::global_result;
use rules::{classify_tercile, detect_scale_ceiling, invert_value, mean, round2};
pub use tables::{is_protective_dimension, ScoringTables, SumRule, VersionProfile};

/// Three-band risk label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Favorable,
    Intermediate,
    Risk,
}

impl Classification {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Favorable => "favorable",
            Self::Intermediate => "intermediate",
            Self::Risk => "risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionResult {
    pub domain_code: String,
    pub domain: String,
    pub dimension: String,
    pub sign: DimensionSign,
    /// Mean of the (inverted where applicable) item values, rounded to two decimals.
    ///
    /// Tercile classification reads the unrounded mean: a mean of `7/3` shows as `2.33`
    /// yet sits above the lower cut and classifies as intermediate on a risk dimension.
    pub score: f64,
    pub classification: Classification,
    /// Numeric questions the questionnaire declares for this dimension.
    pub total_items: usize,
    pub items_responded: usize,
}

/// Scoring output for one respondent and questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub anon_id: AnonId,
    pub questionnaire_id: QuestionnaireId,
    pub questionnaire_code: String,
    pub dimensions: Vec<DimensionResult>,
    pub global_classification: Classification,
    pub global_score: f64,
}

/// Persisted diagnostic with the moment it was computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub diagnostic: Diagnostic,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey {
    domain_code: String,
    domain: String,
    dimension: String,
    sign: DimensionSign,
}

struct ScoredItem<'a> {
    question_id: &'a str,
    raw: i32,
    scored: i32,
}

/// Stateless evaluator applying the version tables to an answer collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine {
    tables: ScoringTables,
}

impl ScoringEngine {
    pub fn new(tables: ScoringTables) -> Self {
        Self { tables }
    }

    /// Pure function of its inputs: the same answers and definition yield an identical result.
    pub fn score(
        &self,
        answers: &AnswerCollection,
        questionnaire: &Questionnaire,
        questions: &[Question],
    ) -> Diagnostic {
        let copsoq = questionnaire.is_copsoq();
        let profile = if copsoq {
            self.tables.profile(&questionnaire.code)
        } else {
            None
        };

        let latest = latest_numeric_answers(answers, questions);
        let ceiling = profile
            .and_then(|profile| profile.fixed_scale_ceiling)
            .unwrap_or_else(|| detect_scale_ceiling(latest.iter().map(|(_, value)| *value)));

        let mut groups: Vec<(GroupKey, Vec<ScoredItem<'_>>)> = Vec::new();
        for (question, raw) in latest {
            let key = group_key(question, copsoq);
            let inverted = copsoq
                && (question.inverted
                    || profile.is_some_and(|profile| profile.is_inverted(&question.question_id)));
            let item = ScoredItem {
                question_id: &question.question_id,
                raw,
                scored: if inverted {
                    invert_value(raw, ceiling)
                } else {
                    raw
                },
            };

            match groups.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, items)) => items.push(item),
                None => groups.push((key, vec![item])),
            }
        }

        let dimensions: Vec<DimensionResult> = groups
            .into_iter()
            .map(|(key, items)| {
                let scored: Vec<i32> = items.iter().map(|item| item.scored).collect();
                let dimension_mean = mean(&scored);

                let by_sum = profile
                    .and_then(|profile| profile.sum_rule(&key.dimension))
                    .filter(|rule| {
                        let answered: Vec<&str> =
                            items.iter().map(|item| item.question_id).collect();
                        rule.matches(&answered)
                    })
                    .and_then(|rule| rule.classify(items.iter().map(|item| item.raw).sum()));
                // Terciles see the unrounded mean; only the reported score is rounded.
                let classification =
                    by_sum.unwrap_or_else(|| classify_tercile(dimension_mean, key.sign));

                let total_items = questions
                    .iter()
                    .filter(|question| !question.is_free_text())
                    .filter(|question| group_key(question, copsoq) == key)
                    .count();

                DimensionResult {
                    domain_code: key.domain_code,
                    domain: key.domain,
                    dimension: key.dimension,
                    sign: key.sign,
                    score: round2(dimension_mean),
                    classification,
                    total_items,
                    items_responded: items.len(),
                }
            })
            .collect();

        let (global_classification, global_score) = global_result(&dimensions);

        Diagnostic {
            anon_id: answers.anon_id.clone(),
            questionnaire_id: questionnaire.id.clone(),
            questionnaire_code: questionnaire.code.clone(),
            dimensions,
            global_classification,
            global_score,
        }
    }
}

/// Last scored value per known numeric question, in first-answered order.
fn latest_numeric_answers<'q>(
    answers: &AnswerCollection,
    questions: &'q [Question],
) -> Vec<(&'q Question, i32)> {
    let by_id: HashMap<&str, &Question> = questions
        .iter()
        .map(|question| (question.question_id.as_str(), question))
        .collect();

    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut latest: Vec<(&Question, i32)> = Vec::new();
    for answer in &answers.answers {
        let Some(question) = by_id.get(answer.question_id.as_str()).copied() else {
            continue;
        };
        if question.is_free_text() {
            continue;
        }
        let Some(value) = answer.value.scoring_value() else {
            continue;
        };

        match positions.get(question.question_id.as_str()) {
            Some(&index) => latest[index].1 = value,
            None => {
                positions.insert(question.question_id.as_str(), latest.len());
                latest.push((question, value));
            }
        }
    }
    latest
}

fn group_key(question: &Question, copsoq: bool) -> GroupKey {
    let inferred = if is_protective_dimension(&question.dimension) {
        DimensionSign::Protection
    } else {
        DimensionSign::Risk
    };
    let sign = if copsoq {
        question.sign.unwrap_or(inferred)
    } else {
        inferred
    };

    GroupKey {
        domain_code: question
            .domain_code
            .clone()
            .unwrap_or_else(|| question.domain.clone()),
        domain: question.domain.clone(),
        dimension: question.dimension.clone(),
        sign,
    }
}
