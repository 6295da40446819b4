// src/services/rule_matcher.rs

// Avaliação dos gatilhos: funções puras sobre a mensagem, sem efeitos colaterais.

use chrono::{Datelike, Duration, NaiveTime};
use regex::RegexBuilder;

use crate::models::{
    automation::{
        AutomationRule, ConditionLogic, ContentRegexTrigger, KeywordOperator, KeywordTrigger,
        RuleTestResult, TimeWindowTrigger, Trigger, TriggerResult,
    },
    omnibridge::Message,
};
use crate::validators::automation::parse_hhmm;

fn keyword_matches(trigger: &KeywordTrigger, message: &Message) -> bool {
    let keywords: Vec<&str> = trigger
        .keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return false;
    }

    let text = message.searchable_text();
    let contains = |keyword: &str| {
        if trigger.case_sensitive {
            text.contains(keyword)
        } else {
            text.to_lowercase().contains(&keyword.to_lowercase())
        }
    };

    match trigger.operator {
        KeywordOperator::And => keywords.iter().all(|k| contains(k)),
        KeywordOperator::Or => keywords.iter().any(|k| contains(k)),
    }
}

/// Glob com `*` (qualquer sequência) e `?` (um caractere), sem diferenciar maiúsculas.
pub fn glob_matches(pattern: &str, text: &str) -> bool {
    let mut expr = String::with_capacity(pattern.len() + 2);
    expr.push('^');
    for c in pattern.trim().chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');

    RegexBuilder::new(&expr)
        .case_insensitive(true)
        .build()
        .map(|re| re.is_match(text.trim()))
        .unwrap_or(false)
}

/// Janela `[start, end)`; com `end < start` a janela atravessa a meia-noite.
/// `start == end` cobre o dia inteiro.
pub fn in_window(time: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start == end {
        true
    } else if start < end {
        time >= start && time < end
    } else {
        time >= start || time < end
    }
}

fn time_window_matches(trigger: &TimeWindowTrigger, message: &Message) -> bool {
    let (Some(start), Some(end)) = (parse_hhmm(&trigger.start), parse_hhmm(&trigger.end)) else {
        return false;
    };

    let local = message.received_at.naive_utc() + Duration::minutes(trigger.utc_offset_minutes as i64);
    if let Some(days) = &trigger.days {
        let weekday = local.weekday().num_days_from_sunday() as u8;
        if !days.contains(&weekday) {
            return false;
        }
    }
    in_window(local.time(), start, end)
}

fn content_regex_matches(trigger: &ContentRegexTrigger, message: &Message) -> bool {
    match RegexBuilder::new(&trigger.pattern)
        .case_insensitive(trigger.case_insensitive)
        .build()
    {
        Ok(re) => re.is_match(&message.searchable_text()),
        Err(e) => {
            tracing::warn!("Regex inválida em gatilho ({}): {}", trigger.pattern, e);
            false
        }
    }
}

pub fn trigger_matches(trigger: &Trigger, message: &Message) -> bool {
    match trigger {
        Trigger::Keyword(k) => keyword_matches(k, message),
        Trigger::SenderPattern(s) => glob_matches(&s.pattern, &message.from_address),
        Trigger::Priority(p) => p.priorities.contains(&message.priority),
        Trigger::TimeWindow(w) => time_window_matches(w, message),
        Trigger::ContentRegex(r) => content_regex_matches(r, message),
        Trigger::Channel(c) => c.channels.contains(&message.channel_type),
    }
}

/// Regra sem gatilhos nunca casa.
pub fn rule_matches(rule: &AutomationRule, message: &Message) -> bool {
    if rule.triggers.is_empty() {
        return false;
    }
    match rule.condition_logic {
        ConditionLogic::And => rule.triggers.iter().all(|t| trigger_matches(t, message)),
        ConditionLogic::Or => rule.triggers.iter().any(|t| trigger_matches(t, message)),
    }
}

/// Simulação: resultado de cada gatilho e as ações que seriam executadas.
pub fn dry_run(rule: &AutomationRule, message: &Message) -> RuleTestResult {
    let triggers: Vec<TriggerResult> = rule
        .triggers
        .iter()
        .enumerate()
        .map(|(index, trigger)| TriggerResult {
            index,
            trigger_type: trigger.type_name().to_string(),
            matched: trigger_matches(trigger, message),
        })
        .collect();

    let matched = !triggers.is_empty()
        && match rule.condition_logic {
            ConditionLogic::And => triggers.iter().all(|t| t.matched),
            ConditionLogic::Or => triggers.iter().any(|t| t.matched),
        };

    let mut actions = if matched { rule.actions.clone() } else { Vec::new() };
    actions.sort_by_key(|a| a.order);

    RuleTestResult {
        rule_id: rule.id,
        matched,
        condition_logic: rule.condition_logic,
        triggers,
        actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::automation::{
        Action, ActionKind, AddTagsParams, ArchiveParams, ChannelTrigger, ExecutionStats,
        PriorityTrigger, RuleMetadata, SenderPatternTrigger,
    };
    use crate::models::omnibridge::{ChannelType, MessageDirection, MessagePriority, MessageStatus};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn message(content: &str) -> Message {
        let now = Utc::now();
        Message {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            channel_id: None,
            channel_type: ChannelType::Email,
            direction: MessageDirection::Inbound,
            from_address: "Joao@Cliente.com.br".into(),
            from_name: None,
            to_address: None,
            subject: Some("Pedido 123".into()),
            content: content.into(),
            priority: MessagePriority::Normal,
            status: MessageStatus::Unread,
            tags: vec![],
            is_starred: false,
            assigned_to: None,
            parent_id: None,
            ticket_id: None,
            metadata: serde_json::Value::Null,
            received_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    fn keywords(words: &[&str], operator: KeywordOperator) -> Trigger {
        Trigger::Keyword(KeywordTrigger {
            keywords: words.iter().map(|w| w.to_string()).collect(),
            operator,
            case_sensitive: false,
        })
    }

    fn rule(logic: ConditionLogic, triggers: Vec<Trigger>) -> AutomationRule {
        let now = Utc::now();
        AutomationRule {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "r".into(),
            description: None,
            enabled: true,
            priority: 1,
            condition_logic: logic,
            stop_on_match: false,
            triggers,
            actions: vec![
                Action::new(2, ActionKind::Archive(ArchiveParams::default())),
                Action::new(1, ActionKind::AddTags(AddTagsParams { tags: vec!["x".into()] })),
            ],
            stats: ExecutionStats::default(),
            metadata: RuleMetadata::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn keyword_or_and_and() {
        let or = keywords(&["help", "support"], KeywordOperator::Or);
        assert!(trigger_matches(&or, &message("I need HELP")));
        assert!(!trigger_matches(&or, &message("Bom dia")));

        let and = keywords(&["pedido", "atrasado"], KeywordOperator::And);
        assert!(trigger_matches(&and, &message("está atrasado")));
        // "pedido" vem do assunto, mas falta "atrasado"
        assert!(!trigger_matches(&and, &message("Olá")));
    }

    #[test]
    fn case_sensitive_keyword() {
        let t = Trigger::Keyword(KeywordTrigger {
            keywords: vec!["URGENTE".into()],
            operator: KeywordOperator::Or,
            case_sensitive: true,
        });
        assert!(trigger_matches(&t, &message("URGENTE: sem luz")));
        assert!(!trigger_matches(&t, &message("urgente: sem luz")));
    }

    #[test]
    fn sender_glob() {
        assert!(glob_matches("*@cliente.com.br", "joao@CLIENTE.com.br"));
        assert!(glob_matches("j?ao@*", "joao@x.com"));
        assert!(!glob_matches("*@cliente.com", "joao@cliente.com.br"));
        assert!(glob_matches("a.b@c", "a.b@c"));
        assert!(!glob_matches("a.b@c", "axb@c"));

        let t = Trigger::SenderPattern(SenderPatternTrigger {
            pattern: "*@cliente.com.br".into(),
        });
        assert!(trigger_matches(&t, &message("oi")));
    }

    #[test]
    fn window_wraps_midnight() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert!(in_window(t(23, 0), t(18, 0), t(8, 0)));
        assert!(in_window(t(7, 59), t(18, 0), t(8, 0)));
        assert!(!in_window(t(8, 0), t(18, 0), t(8, 0)));
        assert!(in_window(t(9, 0), t(8, 0), t(18, 0)));
        assert!(!in_window(t(18, 0), t(8, 0), t(18, 0)));
    }

    #[test]
    fn window_uses_offset_and_days() {
        let mut msg = message("oi");
        // Sábado 2026-10-17 01:00 UTC = sexta 22:00 em UTC-3
        msg.received_at = Utc.with_ymd_and_hms(2026, 10, 17, 1, 0, 0).unwrap();

        let friday_night = Trigger::TimeWindow(TimeWindowTrigger {
            start: "18:00".into(),
            end: "23:00".into(),
            days: Some(vec![5]),
            utc_offset_minutes: -180,
        });
        assert!(trigger_matches(&friday_night, &msg));

        let utc = Trigger::TimeWindow(TimeWindowTrigger {
            start: "18:00".into(),
            end: "23:00".into(),
            days: None,
            utc_offset_minutes: 0,
        });
        assert!(!trigger_matches(&utc, &msg));
    }

    #[test]
    fn regex_priority_and_channel() {
        let re = Trigger::ContentRegex(ContentRegexTrigger {
            pattern: r"pedido\s+\d+".into(),
            case_insensitive: true,
        });
        assert!(trigger_matches(&re, &message("sobre o PEDIDO 456")));

        let mut msg = message("oi");
        msg.priority = MessagePriority::High;
        let prio = Trigger::Priority(PriorityTrigger {
            priorities: vec![MessagePriority::High, MessagePriority::Urgent],
        });
        assert!(trigger_matches(&prio, &msg));

        let channel = Trigger::Channel(ChannelTrigger {
            channels: vec![ChannelType::Whatsapp],
        });
        assert!(!trigger_matches(&channel, &msg));
    }

    #[test]
    fn condition_logic_combines_triggers() {
        let help = keywords(&["help"], KeywordOperator::Or);
        let whatsapp = Trigger::Channel(ChannelTrigger {
            channels: vec![ChannelType::Whatsapp],
        });
        let msg = message("help me");

        assert!(rule_matches(&rule(ConditionLogic::Or, vec![help.clone(), whatsapp.clone()]), &msg));
        assert!(!rule_matches(&rule(ConditionLogic::And, vec![help, whatsapp]), &msg));
        assert!(!rule_matches(&rule(ConditionLogic::Or, vec![]), &msg));
    }

    #[test]
    fn dry_run_lists_sorted_actions_only_on_match() {
        let r = rule(ConditionLogic::Or, vec![keywords(&["help"], KeywordOperator::Or)]);

        let hit = dry_run(&r, &message("help"));
        assert!(hit.matched);
        assert_eq!(hit.triggers.len(), 1);
        assert_eq!(hit.actions.iter().map(|a| a.order).collect::<Vec<_>>(), vec![1, 2]);

        let miss = dry_run(&r, &message("nada"));
        assert!(!miss.matched);
        assert!(miss.actions.is_empty());
    }
}
