use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::{DimensionSign, QuestionnaireId, ReportScope};
use super::super::scoring::Classification;

/// Occurrences of each classification label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationCounts {
    pub favorable: usize,
    pub intermediate: usize,
    pub risk: usize,
}

impl ClassificationCounts {
    pub fn record(&mut self, classification: Classification) {
        match classification {
            Classification::Favorable => self.favorable += 1,
            Classification::Intermediate => self.intermediate += 1,
            Classification::Risk => self.risk += 1,
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.favorable += other.favorable;
        self.intermediate += other.intermediate;
        self.risk += other.risk;
    }

    pub fn total(&self) -> usize {
        self.favorable + self.intermediate + self.risk
    }

    /// Label with the most occurrences; ties resolve risk, then intermediate, then favorable.
    pub fn predominant(&self) -> Option<Classification> {
        if self.total() == 0 {
            return None;
        }
        let ranked = [
            (Classification::Risk, self.risk),
            (Classification::Intermediate, self.intermediate),
            (Classification::Favorable, self.favorable),
        ];
        ranked
            .into_iter()
            .fold(None, |best: Option<(Classification, usize)>, candidate| match best {
                Some((_, count)) if count >= candidate.1 => best,
                _ => Some(candidate),
            })
            .map(|(classification, _)| classification)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionAggregate {
    pub dimension: String,
    pub sign: DimensionSign,
    pub mean_score: f64,
    pub classification: Classification,
    pub counts: ClassificationCounts,
    pub respondents: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainReport {
    pub domain_code: String,
    pub domain: String,
    pub mean_score: f64,
    pub predominant: Classification,
    pub counts: ClassificationCounts,
    pub dimensions: Vec<DimensionAggregate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetrics {
    /// Share of at-risk dimension results scaled to 0-4.
    pub mean_global_risk: f64,
    /// Share of favorable results among protective dimensions, in percent.
    pub protection_index: f64,
    pub total_respondents: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub scope: ReportScope,
    pub metrics: ReportMetrics,
    pub domains: Vec<DomainReport>,
    pub recommendations: Vec<String>,
}

/// Persisted report with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub questionnaire_id: QuestionnaireId,
    pub generated_by: String,
    pub generated_at: DateTime<Utc>,
    pub report: Report,
}
