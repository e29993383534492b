//! Channel wording (pt-BR) and keyword sets of the conversation script.

use super::super::domain::Question;
use super::state::{OrganizationChoice, PendingSubQuestion, SectorChoice};

pub(crate) const CONFIRM_KEYWORD: &str = "sim";
pub(crate) const RESET_KEYWORDS: [&str; 5] =
    ["#reset", "reset", "reiniciar", "recomecar", "recomeçar"];
pub(crate) const SKIP_UNIT_KEYWORDS: [&str; 6] = ["pular", "skip", "na", "n/a", "nao", "não"];

pub(crate) const ORGANIZATION_NOT_FOUND: &str =
    "Empresa não encontrada. Verifique o código e tente novamente.";
pub(crate) const SECTOR_NOT_FOUND: &str =
    "Setor não encontrado. Envie o número ou o nome do seu setor conforme a lista.";
pub(crate) const UNIT_PROMPT: &str =
    "Informe o número da sua unidade (ou 'pular' se não aplicável):";
pub(crate) const INVALID_CONFIRMATION: &str = "Para iniciar o questionário, responda apenas: SIM";
pub(crate) const FINAL_MESSAGE: &str = "Obrigado! Suas respostas foram registradas com sucesso.";
pub(crate) const ALREADY_FINISHED: &str =
    "Você já finalizou o questionário! Se quiser responder novamente, envie: REINICIAR";
pub(crate) const NO_ACTIVE_QUESTIONNAIRE: &str = "Não encontrei um questionário ativo no momento.";
pub(crate) const QUESTIONNAIRE_WITHOUT_QUESTIONS: &str =
    "O questionário está ativo, mas não há perguntas cadastradas.";
pub(crate) const QUESTIONS_VANISHED: &str =
    "Não há perguntas cadastradas. Tente novamente mais tarde.";
pub(crate) const FREE_TEXT_EMPTY: &str = "Resposta inválida. Envie um texto curto.";
pub(crate) const FREE_TEXT_TOO_LONG: &str =
    "Resposta muito longa. Envie no máximo 1000 caracteres.";
pub(crate) const INVALID_SUBQUESTION: &str = "Resposta inválida para sub-pergunta.";

pub(crate) fn intro() -> String {
    concat!(
        "Olá! Vou te enviar um questionário rápido sobre o seu ambiente de trabalho. ",
        "Suas respostas são anônimas e armazenadas de forma segura.\n\n",
        "Para começar, informe o código da sua empresa.\n\n",
        "(Se você quiser recomeçar a qualquer momento, envie: REINICIAR)"
    )
    .to_string()
}

pub(crate) fn recovery() -> String {
    format!("Não consegui retomar sua conversa, vamos recomeçar.\n\n{}", intro())
}

fn numbered<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    labels
        .enumerate()
        .map(|(index, label)| format!("{} - {}", index + 1, label))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn organization_candidates(candidates: &[OrganizationChoice]) -> String {
    format!(
        "Encontrei mais de uma empresa. Envie o número correspondente:\n\n{}",
        numbered(candidates.iter().map(|choice| choice.name.as_str()))
    )
}

pub(crate) fn invalid_candidate(total: usize) -> String {
    format!("Opção inválida. Envie o número da empresa (1 a {total}).")
}

pub(crate) fn organization_confirmed(organization: &str, sectors: &[SectorChoice]) -> String {
    format!(
        "Empresa confirmada: {organization}.\n\nEscolha o seu setor enviando o número ou o nome:\n\n{}",
        numbered(sectors.iter().map(|sector| sector.name.as_str()))
    )
}

pub(crate) fn organization_confirmed_without_sectors(organization: &str) -> String {
    format!("Empresa confirmada: {organization}.\n\n{UNIT_PROMPT}")
}

pub(crate) fn registration_summary(
    organization: &str,
    sector: Option<&str>,
    unit: Option<&str>,
) -> String {
    format!(
        "Pronto! Você está cadastrado como:\nEmpresa: {organization}\nSetor: {}\nUnidade: {}\n\nPara iniciar o questionário, responda: SIM",
        sector.unwrap_or("não informado"),
        unit.unwrap_or("não informada"),
    )
}

pub(crate) fn invalid_answer(min: i32, max: i32) -> String {
    format!("Resposta inválida. Envie apenas um número entre {min} e {max}.")
}

pub(crate) fn invalid_subquestion(option_count: usize) -> String {
    if option_count <= 1 {
        return INVALID_SUBQUESTION.to_string();
    }
    format!("Resposta inválida. Envie o número da opção (1 a {option_count}).")
}

/// `"{n}/{total} - {text}"` plus one `"{value} - {label}"` line per option.
pub fn format_question(position: usize, total: usize, question: &Question) -> String {
    let base = format!("{}/{} - {}", position + 1, total, question.text);
    if question.is_free_text() || question.options.is_empty() {
        return base;
    }

    let options = question
        .options
        .iter()
        .map(|option| format!("{} - {}", option.value, option.label))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{base}\n\n{options}")
}

pub fn format_subquestion(pending: &PendingSubQuestion) -> String {
    format!(
        "{}\n\n{}",
        pending.text,
        numbered(pending.options.iter().map(String::as_str))
    )
}

fn normalized(text: &str) -> String {
    text.trim().to_lowercase()
}

pub(crate) fn is_reset(text: &str) -> bool {
    RESET_KEYWORDS.contains(&normalized(text).as_str())
}

pub(crate) fn is_confirmation(text: &str) -> bool {
    normalized(text) == CONFIRM_KEYWORD
}

pub(crate) fn is_skip_unit(text: &str) -> bool {
    SKIP_UNIT_KEYWORDS.contains(&normalized(text).as_str())
}
