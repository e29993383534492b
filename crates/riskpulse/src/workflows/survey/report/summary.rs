use std::collections::HashMap;

use super::super::domain::{AnonId, DimensionSign, ReportScope};
use super::super::scoring::rules::{classify_tercile, round2};
use super::super::scoring::{Classification, DiagnosticRecord};
use super::insights::{generate_recommendations, INSUFFICIENT_DATA};
use super::views::{
    ClassificationCounts, DimensionAggregate, DomainReport, Report, ReportMetrics,
};

const RISK_SCALE: f64 = 4.0;
const PERCENT: f64 = 100.0;

#[derive(Debug)]
struct DimensionAccumulator {
    dimension: String,
    sign: DimensionSign,
    scores: Vec<f64>,
    counts: ClassificationCounts,
}

impl DimensionAccumulator {
    fn mean_score(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }
}

#[derive(Debug)]
struct DomainAccumulator {
    domain_code: String,
    domain: String,
    dimensions: Vec<DimensionAccumulator>,
}

/// Rolls the latest diagnostic per respondent up into a scoped report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportAggregator;

impl ReportAggregator {
    pub fn generate(&self, diagnostics: &[DiagnosticRecord], scope: ReportScope) -> Report {
        let included = latest_per_respondent(diagnostics);
        if included.is_empty() {
            return Report {
                scope,
                metrics: ReportMetrics::default(),
                domains: Vec::new(),
                recommendations: vec![INSUFFICIENT_DATA.to_string()],
            };
        }

        let mut domains: Vec<DomainAccumulator> = Vec::new();
        let mut dimension_results = 0usize;
        let mut risk_results = 0usize;
        let mut protective_results = 0usize;
        let mut protective_favorable = 0usize;

        for record in &included {
            for result in &record.diagnostic.dimensions {
                dimension_results += 1;
                if result.classification == Classification::Risk {
                    risk_results += 1;
                }
                if result.sign == DimensionSign::Protection {
                    protective_results += 1;
                    if result.classification == Classification::Favorable {
                        protective_favorable += 1;
                    }
                }

                let domain = match domains.iter().position(|domain| {
                    domain.domain_code == result.domain_code && domain.domain == result.domain
                }) {
                    Some(index) => &mut domains[index],
                    None => {
                        domains.push(DomainAccumulator {
                            domain_code: result.domain_code.clone(),
                            domain: result.domain.clone(),
                            dimensions: Vec::new(),
                        });
                        let last = domains.len() - 1;
                        &mut domains[last]
                    }
                };

                let dimension = match domain.dimensions.iter().position(|dimension| {
                    dimension.dimension == result.dimension && dimension.sign == result.sign
                }) {
                    Some(index) => &mut domain.dimensions[index],
                    None => {
                        domain.dimensions.push(DimensionAccumulator {
                            dimension: result.dimension.clone(),
                            sign: result.sign,
                            scores: Vec::new(),
                            counts: ClassificationCounts::default(),
                        });
                        let last = domain.dimensions.len() - 1;
                        &mut domain.dimensions[last]
                    }
                };

                dimension.scores.push(result.score);
                dimension.counts.record(result.classification);
            }
        }

        let domains: Vec<DomainReport> = domains.into_iter().map(domain_report).collect();

        let mean_global_risk = if dimension_results == 0 {
            0.0
        } else {
            round2(risk_results as f64 / dimension_results as f64 * RISK_SCALE)
        };
        let protection_index = if protective_results == 0 {
            0.0
        } else {
            round2(protective_favorable as f64 / protective_results as f64 * PERCENT)
        };

        let recommendations = generate_recommendations(&domains);

        Report {
            scope,
            metrics: ReportMetrics {
                mean_global_risk,
                protection_index,
                total_respondents: included.len(),
            },
            domains,
            recommendations,
        }
    }
}

fn domain_report(domain: DomainAccumulator) -> DomainReport {
    let mut counts = ClassificationCounts::default();
    let dimension_means: Vec<f64> = domain
        .dimensions
        .iter()
        .map(DimensionAccumulator::mean_score)
        .collect();

    let dimensions: Vec<DimensionAggregate> = domain
        .dimensions
        .into_iter()
        .zip(dimension_means.iter())
        .map(|(accumulator, raw_mean)| {
            counts.merge(&accumulator.counts);
            DimensionAggregate {
                classification: classify_tercile(*raw_mean, accumulator.sign),
                mean_score: round2(*raw_mean),
                respondents: accumulator.scores.len(),
                dimension: accumulator.dimension,
                sign: accumulator.sign,
                counts: accumulator.counts,
            }
        })
        .collect();

    let domain_mean = if dimension_means.is_empty() {
        0.0
    } else {
        dimension_means.iter().sum::<f64>() / dimension_means.len() as f64
    };

    DomainReport {
        domain_code: domain.domain_code,
        domain: domain.domain,
        mean_score: round2(domain_mean),
        predominant: counts.predominant().unwrap_or(Classification::Intermediate),
        counts,
        dimensions,
    }
}

/// Keeps the most recently computed diagnostic per respondent, in first-seen respondent order.
fn latest_per_respondent(diagnostics: &[DiagnosticRecord]) -> Vec<&DiagnosticRecord> {
    let mut positions: HashMap<&AnonId, usize> = HashMap::new();
    let mut latest: Vec<&DiagnosticRecord> = Vec::new();
    for record in diagnostics {
        match positions.get(&record.diagnostic.anon_id) {
            Some(&index) => {
                if record.computed_at >= latest[index].computed_at {
                    latest[index] = record;
                }
            }
            None => {
                positions.insert(&record.diagnostic.anon_id, latest.len());
                latest.push(record);
            }
        }
    }
    latest
}
