use super::super::scoring::Classification;
use super::views::DomainReport;

pub const INSUFFICIENT_DATA: &str = "Sem dados suficientes.";
pub const KEEP_MONITORING: &str = "Manter o monitoramento atual e reavaliar periodicamente.";

const RECOMMENDATIONS: [(&str, &str); 24] = [
    (
        "Exigências quantitativas",
        "Revisar a distribuição de tarefas e prazos para equilibrar a carga de trabalho.",
    ),
    (
        "Ritmo de trabalho",
        "Reavaliar metas e ritmo de produção, prevendo pausas regulares ao longo da jornada.",
    ),
    (
        "Exigências emocionais",
        "Oferecer apoio psicológico e espaços de escuta para situações emocionalmente exigentes.",
    ),
    (
        "Influência no trabalho",
        "Ampliar a participação das equipes nas decisões sobre a organização do próprio trabalho.",
    ),
    (
        "Possibilidades de desenvolvimento",
        "Estruturar planos de capacitação e trilhas de desenvolvimento profissional.",
    ),
    ("Significado do trabalho", "Comunicar o propósito e o impacto das atividades de cada equipe."),
    (
        "Compromisso com local de trabalho",
        "Investigar fatores de desengajamento e fortalecer ações de reconhecimento.",
    ),
    (
        "Previsibilidade",
        "Antecipar mudanças e compartilhar informações relevantes com as equipes com antecedência.",
    ),
    ("Recompensas", "Revisar políticas de reconhecimento e valorização do trabalho realizado."),
    (
        "Transparência do papel",
        "Definir com clareza responsabilidades, atribuições e expectativas de cada função.",
    ),
    (
        "Qualidade da liderança",
        "Promover a formação de lideranças em gestão de pessoas e comunicação.",
    ),
    (
        "Apoio social de superiores",
        "Estimular encontros regulares entre lideranças e equipes para acompanhamento e apoio.",
    ),
    ("Apoio social de colegas", "Incentivar a cooperação e a troca de experiências entre colegas."),
    (
        "Confiança vertical",
        "Fortalecer a transparência e a coerência na comunicação entre gestão e equipes.",
    ),
    (
        "Justiça e respeito",
        "Revisar critérios de distribuição de tarefas e de resolução de conflitos para garantir equidade.",
    ),
    (
        "Satisfação no trabalho",
        "Mapear fontes de insatisfação e construir um plano de ação com as equipes.",
    ),
    (
        "Conflito trabalho-família",
        "Avaliar a flexibilidade de horários e o respeito aos períodos de descanso.",
    ),
    ("Saúde geral", "Ampliar ações de promoção de saúde e o acesso a acompanhamento médico."),
    (
        "Burnout",
        "Implementar ações de prevenção ao esgotamento profissional, com acompanhamento da carga e das pausas.",
    ),
    ("Stress", "Desenvolver programas de gestão do estresse e de qualidade de vida no trabalho."),
    (
        "Atenção sexual indesejada",
        "Reforçar a política de prevenção ao assédio sexual e divulgar canais seguros de denúncia.",
    ),
    (
        "Ameaças de violência",
        "Mapear situações de ameaça e estabelecer protocolos de proteção aos trabalhadores.",
    ),
    (
        "Violência física",
        "Adotar medidas imediatas de segurança e protocolos de resposta a episódios de violência.",
    ),
    (
        "Bullying",
        "Instituir política de combate ao assédio moral, com canal de denúncia sigiloso e apuração dos casos.",
    ),
];

fn recommendation_for(dimension: &str) -> String {
    RECOMMENDATIONS
        .iter()
        .find(|(name, _)| *name == dimension)
        .map(|(_, text)| text.to_string())
        .unwrap_or_else(|| {
            format!(
                "Priorizar ações de melhoria na dimensão \"{dimension}\", classificada em risco."
            )
        })
}

/// One recommendation per at-risk dimension, without repeats.
/// A monitoring note stands in when no dimension is at risk.
pub(crate) fn generate_recommendations(domains: &[DomainReport]) -> Vec<String> {
    let mut recommendations: Vec<String> = Vec::new();
    for aggregate in domains.iter().flat_map(|domain| domain.dimensions.iter()) {
        if aggregate.classification != Classification::Risk {
            continue;
        }
        let text = recommendation_for(&aggregate.dimension);
        if !recommendations.contains(&text) {
            recommendations.push(text);
        }
    }

    if recommendations.is_empty() {
        recommendations.push(KEEP_MONITORING.to_string());
    }
    recommendations
}
