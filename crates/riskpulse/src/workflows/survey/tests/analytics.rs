use std::sync::Arc;

use super::common::*;
use crate::workflows::survey::analytics::{
    AnalyticsError, BatchSummary, DiagnosticOutcome, SurveyAnalyticsService,
};
use crate::workflows::survey::domain::{AnonId, AnswerValue, QuestionnaireId, ReportScope, SectorId};
use crate::workflows::survey::memory::InMemorySurveyStore;
use crate::workflows::survey::repository::{AnswerRepository, RespondentRepository};
use crate::workflows::survey::scoring::{Classification, ScoringEngine};

fn service(store: Arc<InMemorySurveyStore>) -> SurveyAnalyticsService<InMemorySurveyStore> {
    SurveyAnalyticsService::new(store, ScoringEngine::default())
}

fn answer_rhythm(store: &InMemorySurveyStore, anon_id: &str, first: i32, second: i32) {
    let anon_id = AnonId(anon_id.to_string());
    for (question_id, value) in [("EL_RT_01A", first), ("EL_RT_01B", second)] {
        store
            .append_answer(
                &anon_id,
                &questionnaire_id(),
                answer(question_id, AnswerValue::Numeric(value), 9),
            )
            .expect("answer stored");
    }
}

#[test]
fn respondent_without_answers_is_skipped() {
    let store = Arc::new(seeded_store());

    let outcome = service(Arc::clone(&store))
        .compute_diagnostic(&AnonId("anon-404".to_string()), &questionnaire_id())
        .expect("no failure");

    assert_eq!(outcome, DiagnosticOutcome::NoAnswers);
    assert!(store.diagnostics().expect("readable").is_empty());
}

#[test]
fn computed_diagnostic_is_persisted() {
    let store = Arc::new(seeded_store());
    answer_rhythm(&store, "anon-1", 4, 4);

    let outcome = service(Arc::clone(&store))
        .compute_diagnostic(&AnonId("anon-1".to_string()), &questionnaire_id())
        .expect("no failure");

    let DiagnosticOutcome::Computed(record) = outcome else {
        panic!("expected a diagnostic, got {outcome:?}");
    };
    assert_eq!(record.diagnostic.global_classification, Classification::Risk);
    assert_eq!(store.diagnostics().expect("readable"), vec![record]);
}

#[test]
fn answers_for_unknown_questionnaire_are_reported() {
    let store = Arc::new(seeded_store());
    let ghost = QuestionnaireId("ghost".to_string());
    store
        .append_answer(
            &AnonId("anon-1".to_string()),
            &ghost,
            answer("EL_RT_01A", AnswerValue::Numeric(2), 9),
        )
        .expect("answer stored");

    let outcome = service(Arc::clone(&store))
        .compute_diagnostic(&AnonId("anon-1".to_string()), &ghost)
        .expect("no failure");

    assert_eq!(outcome, DiagnosticOutcome::QuestionnaireNotFound);
}

#[test]
fn batch_counts_successes_and_failures() {
    let store = Arc::new(seeded_store());
    answer_rhythm(&store, "anon-1", 1, 1);
    answer_rhythm(&store, "anon-2", 3, 3);

    let summary = service(Arc::clone(&store)).recompute_batch(
        &[
            AnonId("anon-1".to_string()),
            AnonId("anon-2".to_string()),
            AnonId("anon-3".to_string()),
        ],
        &questionnaire_id(),
    );

    assert_eq!(summary, BatchSummary { ok: 2, failed: 1 });
    assert_eq!(store.diagnostics().expect("readable").len(), 2);
}

#[test]
fn batch_survives_an_unavailable_store() {
    let store = Arc::new(FlakyStore::new(Failure::Unavailable));
    let service = SurveyAnalyticsService::new(store, ScoringEngine::default());

    let summary = service.recompute_batch(&[AnonId("anon-1".to_string())], &questionnaire_id());

    assert_eq!(summary, BatchSummary { ok: 0, failed: 1 });
}

#[test]
fn report_is_scoped_and_persisted() {
    let store = Arc::new(seeded_store());
    store
        .create_respondent(member("whatsapp:+551100000001", "anon-1", Some("sector-ti")))
        .expect("registered");
    store
        .create_respondent(member("whatsapp:+551100000002", "anon-2", Some("sector-rh")))
        .expect("registered");
    answer_rhythm(&store, "anon-1", 4, 4);
    answer_rhythm(&store, "anon-2", 0, 1);
    // Scored twice; only the latest counts.
    answer_rhythm(&store, "anon-3", 4, 4);

    let service = service(Arc::clone(&store));
    for anon_id in ["anon-1", "anon-2", "anon-2", "anon-3"] {
        service
            .compute_diagnostic(&AnonId(anon_id.to_string()), &questionnaire_id())
            .expect("computed");
    }

    let organization_report = service
        .generate_report(
            &questionnaire_id(),
            ReportScope::Organization {
                organization_id: organization_id(),
            },
            "analyst@empresa.com",
        )
        .expect("report generated");
    assert_eq!(organization_report.report.metrics.total_respondents, 2);
    assert_eq!(organization_report.generated_by, "analyst@empresa.com");
    assert_eq!(organization_report.report.metrics.mean_global_risk, 2.0);

    let sector_report = service
        .generate_report(
            &questionnaire_id(),
            ReportScope::Sector {
                organization_id: organization_id(),
                sector_id: SectorId("sector-rh".to_string()),
            },
            "analyst@empresa.com",
        )
        .expect("report generated");
    assert_eq!(sector_report.report.metrics.total_respondents, 1);
    assert_eq!(sector_report.report.metrics.mean_global_risk, 0.0);

    assert_eq!(store.reports().expect("readable").len(), 2);
}

#[test]
fn report_without_diagnostics_falls_back() {
    let store = Arc::new(seeded_store());

    let record = service(Arc::clone(&store))
        .generate_report(
            &questionnaire_id(),
            ReportScope::Organization {
                organization_id: organization_id(),
            },
            "api",
        )
        .expect("report generated");

    assert_eq!(record.report.metrics.total_respondents, 0);
    assert_eq!(record.report.recommendations, vec!["Sem dados suficientes.".to_string()]);
}

#[test]
fn report_for_unknown_questionnaire_fails() {
    let store = Arc::new(seeded_store());

    let result = service(store).generate_report(
        &QuestionnaireId("ghost".to_string()),
        ReportScope::Organization {
            organization_id: organization_id(),
        },
        "api",
    );

    assert!(matches!(result, Err(AnalyticsError::QuestionnaireNotFound(_))));
}
