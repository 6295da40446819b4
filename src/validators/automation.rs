// src/validators/automation.rs

use chrono::NaiveTime;
use regex::Regex;

use crate::common::validation::{char_len, ValidationReport};
use crate::models::automation::{Action, ActionKind, Trigger};

/// "HH:MM" -> NaiveTime. Usado também pelo avaliador de janelas de horário.
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn validate_trigger(report: &mut ValidationReport, index: usize, trigger: &Trigger) {
    let field = format!("triggers[{index}]");
    match trigger {
        Trigger::Keyword(k) => {
            report.check(
                !k.keywords.is_empty() && k.keywords.iter().all(|w| !blank(w)),
                &field,
                "Informe ao menos uma palavra-chave não vazia.",
            );
        }
        Trigger::SenderPattern(s) => {
            report.check(!blank(&s.pattern), &field, "O padrão de remetente é obrigatório.");
        }
        Trigger::Priority(p) => {
            report.check(!p.priorities.is_empty(), &field, "Informe ao menos uma prioridade.");
        }
        Trigger::TimeWindow(w) => {
            report.check(
                parse_hhmm(&w.start).is_some() && parse_hhmm(&w.end).is_some(),
                &field,
                "Horários devem estar no formato HH:MM.",
            );
            if let Some(days) = &w.days {
                report.check(
                    !days.is_empty() && days.iter().all(|d| *d <= 6),
                    &field,
                    "Dias da semana devem estar entre 0 (domingo) e 6 (sábado).",
                );
            }
            report.check(
                (-14 * 60..=14 * 60).contains(&w.utc_offset_minutes),
                &field,
                "Fuso horário fora do intervalo permitido.",
            );
        }
        Trigger::ContentRegex(r) => {
            report.check(
                !blank(&r.pattern) && Regex::new(&r.pattern).is_ok(),
                &field,
                "Expressão regular inválida.",
            );
        }
        Trigger::Channel(c) => {
            report.check(!c.channels.is_empty(), &field, "Informe ao menos um canal.");
        }
    }
}

fn validate_action(report: &mut ValidationReport, index: usize, action: &Action) {
    let field = format!("actions[{index}]");
    let ok = match &action.kind {
        ActionKind::AutoReply(p) => !blank(&p.message) || p.template_id.is_some(),
        ActionKind::Forward(p) => !blank(&p.to),
        ActionKind::CreateTicket(_) => true,
        ActionKind::Notify(p) => {
            !p.recipients.is_empty() && p.recipients.iter().all(|r| !blank(r)) && !blank(&p.message)
        }
        ActionKind::AddTags(p) => !p.tags.is_empty() && p.tags.iter().all(|t| !blank(t)),
        ActionKind::AssignAgent(p) => !blank(&p.agent_id),
        ActionKind::Escalate(p) => !blank(&p.to),
        ActionKind::Archive(_) => true,
        ActionKind::MarkPriority(_) => true,
        ActionKind::AiResponse(p) => !blank(&p.tone) && !blank(&p.language),
    };
    report.check(
        ok,
        &field,
        &format!("Parâmetros inválidos para a ação '{}'.", action.kind.type_name()),
    );
}

/// Valida o estado final de uma regra (na criação e após cada atualização).
pub fn validate_rule(name: &str, triggers: &[Trigger], actions: &[Action]) -> ValidationReport {
    let mut report = ValidationReport::new();

    let name_len = char_len(name.trim());
    report.check(
        (1..=255).contains(&name_len),
        "name",
        "O nome deve ter entre 1 e 255 caracteres.",
    );

    report.check(!triggers.is_empty(), "triggers", "A regra precisa de ao menos um gatilho.");
    report.check(!actions.is_empty(), "actions", "A regra precisa de ao menos uma ação.");

    for (i, trigger) in triggers.iter().enumerate() {
        validate_trigger(&mut report, i, trigger);
    }
    for (i, action) in actions.iter().enumerate() {
        validate_action(&mut report, i, action);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::automation::*;

    fn keyword(words: &[&str]) -> Trigger {
        Trigger::Keyword(KeywordTrigger {
            keywords: words.iter().map(|w| w.to_string()).collect(),
            operator: KeywordOperator::Or,
            case_sensitive: false,
        })
    }

    fn tag_action() -> Action {
        Action::new(1, ActionKind::AddTags(AddTagsParams { tags: vec!["suporte".into()] }))
    }

    #[test]
    fn requires_triggers_and_actions() {
        let report = validate_rule("Regra", &[], &[]);
        assert!(report.has_error("triggers"));
        assert!(report.has_error("actions"));

        assert!(validate_rule("Regra", &[keyword(&["help"])], &[tag_action()]).is_valid);
    }

    #[test]
    fn rejects_broken_trigger_configs() {
        let triggers = vec![
            keyword(&[""]),
            Trigger::ContentRegex(ContentRegexTrigger {
                pattern: "([a-z".into(),
                case_insensitive: true,
            }),
            Trigger::TimeWindow(TimeWindowTrigger {
                start: "25:00".into(),
                end: "08:00".into(),
                days: Some(vec![7]),
                utc_offset_minutes: 0,
            }),
        ];
        let report = validate_rule("Regra", &triggers, &[tag_action()]);
        assert!(report.has_error("triggers[0]"));
        assert!(report.has_error("triggers[1]"));
        assert!(report.has_error("triggers[2]"));
    }

    #[test]
    fn parses_hhmm() {
        assert!(parse_hhmm("08:30").is_some());
        assert!(parse_hhmm("8h30").is_none());
    }
}
