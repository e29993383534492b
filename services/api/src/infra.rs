use metrics_exporter_prometheus::PrometheusHandle;
use riskpulse::workflows::survey::domain::DomainDescriptor;
use riskpulse::workflows::survey::{
    AnswerOption, DeliveryError, InMemorySurveyStore, MessageDispatcher, Organization,
    OrganizationId, Question, QuestionPrompt, Questionnaire, QuestionnaireId, ScaleType, Sector,
    SectorId, SubQuestion, SubQuestionResponse, TriggerCondition, COPSOQ_CURTA_BR,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Dispatcher standing in for the messaging provider: interactive prompts are only logged.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TracingDispatcher;

impl MessageDispatcher for TracingDispatcher {
    fn deliver_question(
        &self,
        address: &str,
        prompt: &QuestionPrompt,
    ) -> Result<(), DeliveryError> {
        info!(
            question_id = %prompt.question_id,
            position = prompt.position,
            total = prompt.total,
            options = prompt.options.len(),
            "interactive question dispatched"
        );
        debug!(%address, text = %prompt.text, "interactive question recipient");
        Ok(())
    }
}

pub(crate) const SEED_ORGANIZATION_ID: &str = "org-demo";
pub(crate) const SEED_QUESTIONNAIRE_ID: &str = "copsoq-curta-br";

pub(crate) fn seed_organization() -> (Organization, Vec<Sector>) {
    let organization_id = OrganizationId(SEED_ORGANIZATION_ID.to_string());
    let sector = |id: &str, name: &str| Sector {
        id: SectorId(id.to_string()),
        organization_id: organization_id.clone(),
        name: name.to_string(),
    };
    let sectors = vec![
        sector("sector-operacoes", "Operações"),
        sector("sector-administrativo", "Administrativo"),
    ];

    (
        Organization {
            id: organization_id.clone(),
            code: "EMP001".to_string(),
            name: "Empresa Demonstração".to_string(),
        },
        sectors,
    )
}

fn frequency_scale() -> Vec<AnswerOption> {
    ["Nunca", "Raramente", "Às vezes", "Frequentemente", "Sempre"]
        .into_iter()
        .zip(0..)
        .map(|(label, value)| AnswerOption {
            value,
            label: label.to_string(),
        })
        .collect()
}

fn scale_question(
    question_id: &str,
    domain_code: &str,
    domain: &str,
    dimension: &str,
    text: &str,
) -> Question {
    Question {
        question_id: question_id.to_string(),
        domain_code: Some(domain_code.to_string()),
        domain: domain.to_string(),
        dimension: dimension.to_string(),
        text: text.to_string(),
        scale_type: ScaleType::NumericScale,
        min: None,
        max: None,
        options: frequency_scale(),
        multi_select: false,
        inverted: false,
        sign: None,
        sub_question: None,
    }
}

/// Abridged COPSOQ II short questionnaire used by the demo and the default service wiring.
pub(crate) fn seed_questionnaire() -> (Questionnaire, Vec<Question>) {
    const DEMANDS: &str = "Exigências laborais";
    const HEALTH: &str = "Saúde e bem-estar";
    const OFFENSIVE: &str = "Comportamentos ofensivos";

    let mut bullying = scale_question(
        "CO_BU_01",
        "CO",
        OFFENSIVE,
        "Bullying",
        "Nos últimos 12 meses, você foi exposto a bullying no seu local de trabalho?",
    );
    if let Ok(condition) = TriggerCondition::parse("valor > 0") {
        bullying.sub_question = Some(SubQuestion {
            condition,
            text: "Por parte de quem?".to_string(),
            response: SubQuestionResponse::MultipleChoice,
            options: [
                "Colegas",
                "Gerente, supervisor",
                "Subordinados",
                "Clientes, fregueses, pacientes",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        });
    }

    let questions = vec![
        scale_question(
            "EL_RT_01A",
            "EL",
            DEMANDS,
            "Ritmo de trabalho",
            "Você precisa trabalhar muito rapidamente?",
        ),
        scale_question(
            "EL_RT_01B",
            "EL",
            DEMANDS,
            "Ritmo de trabalho",
            "Você trabalha em ritmo acelerado ao longo de toda a jornada?",
        ),
        scale_question(
            "SBE_BO_01A",
            "SBE",
            HEALTH,
            "Burnout",
            "Com que frequência você se sente fisicamente esgotado?",
        ),
        scale_question(
            "SBE_BO_01B",
            "SBE",
            HEALTH,
            "Burnout",
            "Com que frequência você se sente emocionalmente esgotado?",
        ),
        scale_question(
            "SBE_SG_01",
            "SBE",
            HEALTH,
            "Saúde geral",
            "Em geral, você diria que a sua saúde é boa?",
        ),
        bullying,
        Question {
            question_id: "COM_01".to_string(),
            domain_code: None,
            domain: "Comentários".to_string(),
            dimension: "Comentários".to_string(),
            text: "Gostaria de deixar algum comentário sobre o seu ambiente de trabalho?"
                .to_string(),
            scale_type: ScaleType::FreeText,
            min: None,
            max: None,
            options: Vec::new(),
            multi_select: false,
            inverted: false,
            sign: None,
            sub_question: None,
        },
    ];

    let domains = vec![
        DomainDescriptor {
            code: "EL".to_string(),
            name: DEMANDS.to_string(),
            dimensions: vec!["Ritmo de trabalho".to_string()],
        },
        DomainDescriptor {
            code: "SBE".to_string(),
            name: HEALTH.to_string(),
            dimensions: vec!["Burnout".to_string(), "Saúde geral".to_string()],
        },
        DomainDescriptor {
            code: "CO".to_string(),
            name: OFFENSIVE.to_string(),
            dimensions: vec!["Bullying".to_string()],
        },
    ];

    let questionnaire = Questionnaire {
        id: QuestionnaireId(SEED_QUESTIONNAIRE_ID.to_string()),
        name: "COPSOQ II Curta".to_string(),
        code: COPSOQ_CURTA_BR.to_string(),
        version: "2".to_string(),
        domains,
        total_questions: questions.len(),
        active: true,
    };

    (questionnaire, questions)
}

pub(crate) fn seeded_store() -> InMemorySurveyStore {
    let (organization, sectors) = seed_organization();
    let (questionnaire, questions) = seed_questionnaire();
    InMemorySurveyStore::new()
        .with_organization(organization, sectors)
        .with_questionnaire(questionnaire, questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskpulse::workflows::survey::repository::QuestionnaireRepository;

    #[test]
    fn seeded_store_exposes_active_questionnaire() {
        let store = seeded_store();
        let questionnaire = store
            .active_questionnaire(None)
            .expect("store available")
            .expect("questionnaire active");

        assert_eq!(questionnaire.code, COPSOQ_CURTA_BR);
        let questions = store.questions(&questionnaire.id).expect("store available");
        assert_eq!(questions.len(), questionnaire.total_questions);
        assert!(questions.iter().any(|question| question.sub_question.is_some()));
    }

    #[test]
    fn tracing_dispatcher_accepts_prompts() {
        let prompt = QuestionPrompt {
            question_id: "EL_RT_01A".to_string(),
            position: 1,
            total: 7,
            text: "Você precisa trabalhar muito rapidamente?".to_string(),
            options: frequency_scale(),
        };

        assert!(TracingDispatcher
            .deliver_question("whatsapp:+5511900000001", &prompt)
            .is_ok());
    }
}
