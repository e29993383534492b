use crate::infra::{seed_organization, seed_questionnaire, seeded_store, TracingDispatcher};
use chrono::Utc;
use clap::Args;
use riskpulse::error::AppError;
use riskpulse::workflows::survey::{
    AnalyticsError, AnswerCollection, ConversationEngine, ConversationReply, DiagnosticOutcome,
    DiagnosticRecord, EngineOptions, InMemorySurveyStore, InboundMessage, ReportRecord,
    ReportScope, ScoringEngine, SurveyAnalyticsService,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print only the analytics JSON, without the conversation transcripts.
    #[arg(long)]
    pub(crate) skip_transcript: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file holding an answer collection (anon_id, questionnaire_id, answers).
    #[arg(long)]
    pub(crate) answers: PathBuf,
}

struct ScriptedRespondent {
    address: &'static str,
    messages: &'static [&'static str],
}

const RESPONDENTS: [ScriptedRespondent; 2] = [
    ScriptedRespondent {
        address: "whatsapp:+5511900000001",
        messages: &[
            "oi",
            "EMP001",
            "1",
            "pular",
            "sim",
            "4",
            "3",
            "4",
            "3",
            "1",
            "2",
            "1, 2",
            "Equipe sobrecarregada no fechamento do mês",
        ],
    },
    ScriptedRespondent {
        address: "whatsapp:+5511900000002",
        messages: &[
            "olá",
            "Empresa Demonstração",
            "Administrativo",
            "12",
            "SIM",
            "1",
            "1",
            "1",
            "2",
            "4",
            "0",
            "Sem comentários",
        ],
    },
];

#[derive(Debug, Serialize)]
struct DemoSummary {
    diagnostics: Vec<DiagnosticRecord>,
    report: ReportRecord,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(seeded_store());
    let engine = ConversationEngine::new(
        Arc::clone(&store),
        Arc::new(TracingDispatcher),
        EngineOptions {
            questionnaire_name: None,
            interactive_delivery: false,
        },
    );
    let analytics = SurveyAnalyticsService::new(Arc::clone(&store), ScoringEngine::default());

    println!("Psychosocial risk survey demo");
    let mut diagnostics = Vec::new();
    for respondent in &RESPONDENTS {
        let transcript = play_script(&engine, respondent)?;
        if !args.skip_transcript {
            render_transcript(respondent.address, &transcript);
        }

        let completed = transcript
            .iter()
            .find_map(|(_, reply)| reply.completed.clone());
        let Some(completed) = completed else {
            println!("- {} did not finish the questionnaire", respondent.address);
            continue;
        };
        match analytics.compute_diagnostic(&completed.anon_id, &completed.questionnaire_id)? {
            DiagnosticOutcome::Computed(record) => diagnostics.push(record),
            DiagnosticOutcome::NoAnswers => {
                println!("- {} has no stored answers", completed.anon_id)
            }
            DiagnosticOutcome::QuestionnaireNotFound => {
                println!("- questionnaire {} is missing", completed.questionnaire_id)
            }
        }
    }

    let (organization, _) = seed_organization();
    let report = analytics.generate_report(
        &seed_questionnaire().0.id,
        ReportScope::Organization {
            organization_id: organization.id,
        },
        "demo",
    )?;

    let summary = DemoSummary {
        diagnostics,
        report,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn play_script(
    engine: &ConversationEngine<InMemorySurveyStore, TracingDispatcher>,
    respondent: &ScriptedRespondent,
) -> Result<Vec<(&'static str, ConversationReply)>, AppError> {
    respondent
        .messages
        .iter()
        .map(|body| -> Result<_, AppError> {
            let reply = engine.handle_incoming(&InboundMessage::text(respondent.address, *body))?;
            Ok((*body, reply))
        })
        .collect()
}

fn render_transcript(address: &str, transcript: &[(&str, ConversationReply)]) {
    println!("\nConversation with {address}");
    for (body, reply) in transcript {
        println!("> {body}");
        for line in reply.text.lines() {
            println!("  {line}");
        }
        println!("  [{}]", reply.status.label());
    }
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.answers)?;
    let collection: AnswerCollection = serde_json::from_str(&raw)?;
    let record = score_collection(&collection)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn score_collection(collection: &AnswerCollection) -> Result<DiagnosticRecord, AppError> {
    let (questionnaire, questions) = seed_questionnaire();
    if collection.questionnaire_id != questionnaire.id {
        let missing = collection.questionnaire_id.clone();
        return Err(AnalyticsError::QuestionnaireNotFound(missing).into());
    }

    let diagnostic = ScoringEngine::default().score(collection, &questionnaire, &questions);
    Ok(DiagnosticRecord {
        diagnostic,
        computed_at: Utc::now(),
    })
}
