use super::super::domain::{COPSOQ_CURTA_BR, COPSOQ_MEDIA_PT};
use super::Classification;

/// Mean at or below this value sits in the lower tercile.
pub const TERCILE_LOWER: f64 = 2.33;
/// Mean at or above this value sits in the upper tercile.
pub const TERCILE_UPPER: f64 = 3.67;

/// Dimensions where a higher score is better.
pub const PROTECTIVE_DIMENSIONS: [&str; 17] = [
    "Influência no trabalho",
    "Possibilidades de desenvolvimento",
    "Significado do trabalho",
    "Compromisso com local de trabalho",
    "Previsibilidade",
    "Recompensas",
    "Transparência do papel",
    "Qualidade da liderança",
    "Apoio social de superiores",
    "Apoio social de colegas",
    "Confiança vertical",
    "Confiança horizontal",
    "Justiça e respeito",
    "Comunidade social no trabalho",
    "Auto-eficácia",
    "Satisfação no trabalho",
    "Saúde geral",
];

pub fn is_protective_dimension(dimension: &str) -> bool {
    PROTECTIVE_DIMENSIONS.contains(&dimension)
}

type Band = Option<(i32, i32)>;

/// Classification of a dimension by the sum of its raw answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SumRule {
    pub dimension: &'static str,
    pub question_ids: &'static [&'static str],
    pub favorable: Band,
    pub intermediate: Band,
    pub risk: Band,
}

impl SumRule {
    /// Band holding `sum`, or `None` when the sum falls outside every band.
    pub fn classify(&self, sum: i32) -> Option<Classification> {
        let inside = |band: Band| band.is_some_and(|(low, high)| (low..=high).contains(&sum));
        if inside(self.favorable) {
            Some(Classification::Favorable)
        } else if inside(self.intermediate) {
            Some(Classification::Intermediate)
        } else if inside(self.risk) {
            Some(Classification::Risk)
        } else {
            None
        }
    }

    /// The rule applies only when the answered ids are exactly its expected ids.
    pub fn matches(&self, answered_ids: &[&str]) -> bool {
        answered_ids.len() == self.question_ids.len()
            && self
                .question_ids
                .iter()
                .all(|expected| answered_ids.contains(expected))
    }
}

const fn rule(
    dimension: &'static str,
    question_ids: &'static [&'static str],
    favorable: Band,
    intermediate: Band,
    risk: Band,
) -> SumRule {
    SumRule {
        dimension,
        question_ids,
        favorable,
        intermediate,
        risk,
    }
}

static CURTA_BR_SUM_RULES: [SumRule; 23] = [
    rule(
        "Exigências quantitativas",
        &["EL_EQ_01A", "EL_EQ_01B"],
        Some((0, 3)),
        Some((4, 4)),
        Some((5, 8)),
    ),
    rule(
        "Ritmo de trabalho",
        &["EL_RT_01A", "EL_RT_01B"],
        Some((0, 3)),
        Some((4, 5)),
        Some((6, 8)),
    ),
    rule(
        "Exigências emocionais",
        &["EL_EE_01A", "EL_EE_01B"],
        Some((0, 3)),
        Some((4, 4)),
        Some((5, 8)),
    ),
    rule(
        "Influência no trabalho",
        &["OTC_IT_01A", "OTC_IT_01B"],
        Some((5, 8)),
        Some((4, 4)),
        Some((0, 3)),
    ),
    rule(
        "Possibilidades de desenvolvimento",
        &["OTC_PD_01A", "OTC_PD_01B"],
        Some((5, 8)),
        Some((4, 4)),
        Some((0, 3)),
    ),
    rule(
        "Significado do trabalho",
        &["OTC_ST_01A", "OTC_ST_01B"],
        Some((6, 8)),
        Some((5, 5)),
        Some((0, 4)),
    ),
    rule(
        "Compromisso com local de trabalho",
        &["OTC_CLT_01A", "OTC_CLT_01B"],
        Some((5, 8)),
        Some((4, 4)),
        Some((0, 3)),
    ),
    rule(
        "Previsibilidade",
        &["RSL_PR_01A", "RSL_PR_01B"],
        Some((5, 8)),
        Some((4, 4)),
        Some((0, 3)),
    ),
    rule("Recompensas", &["RSL_RE_01A", "RSL_RE_01B"], Some((5, 8)), Some((4, 4)), Some((0, 3))),
    rule(
        "Transparência do papel",
        &["RSL_TP_01A", "RSL_TP_01B"],
        Some((6, 8)),
        Some((4, 5)),
        Some((0, 3)),
    ),
    rule(
        "Qualidade da liderança",
        &["RSL_QL_01A", "RSL_QL_01B"],
        Some((5, 8)),
        Some((4, 4)),
        Some((0, 3)),
    ),
    rule(
        "Apoio social de superiores",
        &["RSL_ASS_01A", "RSL_ASS_01B"],
        Some((6, 8)),
        Some((4, 5)),
        Some((0, 3)),
    ),
    rule("Satisfação no trabalho", &["ITI_ST_01"], Some((2, 3)), None, Some((0, 1))),
    rule(
        "Conflito trabalho-família",
        &["ITI_CTF_01A", "ITI_CTF_01B"],
        Some((0, 2)),
        Some((3, 3)),
        Some((4, 6)),
    ),
    rule(
        "Confiança vertical",
        &["VLT_CV_01A", "VLT_CV_01B"],
        Some((5, 8)),
        Some((4, 4)),
        Some((0, 3)),
    ),
    rule(
        "Justiça e respeito",
        &["VLT_JR_01A", "VLT_JR_01B"],
        Some((5, 8)),
        Some((4, 4)),
        Some((0, 3)),
    ),
    rule("Saúde geral", &["SBE_SG_01"], Some((3, 4)), Some((2, 2)), Some((0, 1))),
    rule("Burnout", &["SBE_BO_01A", "SBE_BO_01B"], Some((0, 2)), Some((3, 3)), Some((4, 8))),
    rule("Stress", &["SBE_ST_01A", "SBE_ST_01B"], Some((0, 2)), Some((3, 3)), Some((4, 8))),
    rule("Atenção sexual indesejada", &["CO_ASI_01"], Some((0, 0)), None, Some((1, 4))),
    rule("Ameaças de violência", &["CO_AV_01"], Some((0, 0)), None, Some((1, 4))),
    rule("Violência física", &["CO_VF_01"], Some((0, 0)), None, Some((1, 4))),
    rule("Bullying", &["CO_BU_01"], Some((0, 0)), None, Some((1, 4))),
];

/// Scoring rules specific to one questionnaire version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionProfile {
    pub code: &'static str,
    /// Answer scale ceiling fixed by the version; `None` means detect it from the answers.
    pub fixed_scale_ceiling: Option<i32>,
    pub inverted_items: &'static [&'static str],
    pub sum_rules: &'static [SumRule],
}

impl VersionProfile {
    pub fn is_inverted(&self, question_id: &str) -> bool {
        self.inverted_items.contains(&question_id)
    }

    pub fn sum_rule(&self, dimension: &str) -> Option<&SumRule> {
        self.sum_rules.iter().find(|rule| rule.dimension == dimension)
    }
}

static VERSION_PROFILES: [VersionProfile; 2] = [
    VersionProfile {
        code: COPSOQ_CURTA_BR,
        fixed_scale_ceiling: Some(4),
        inverted_items: &[],
        sum_rules: &CURTA_BR_SUM_RULES,
    },
    VersionProfile {
        code: COPSOQ_MEDIA_PT,
        fixed_scale_ceiling: None,
        inverted_items: &["VLT_CV_03", "VLT_CH_01"],
        sum_rules: &[],
    },
];

/// Immutable lookup over the known questionnaire versions.
#[derive(Debug, Clone, Copy)]
pub struct ScoringTables {
    profiles: &'static [VersionProfile],
}

impl ScoringTables {
    pub fn standard() -> Self {
        Self {
            profiles: &VERSION_PROFILES,
        }
    }

    pub fn profile(&self, code: &str) -> Option<&'static VersionProfile> {
        self.profiles.iter().find(|profile| profile.code == code)
    }
}

impl Default for ScoringTables {
    fn default() -> Self {
        Self::standard()
    }
}
